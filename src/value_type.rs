//! EXI Datentyp-Klassifikation eingebauter Schema-Typen.

use core::fmt;

use crate::{Error, Result};

/// Typ eines Characters- oder Attribut-Werts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Boolean,
    Integer,
    Float,
    Decimal,
    Binary,
    DateTime,
}

impl ValueType {
    /// Klassifiziert einen eingebauten Schema-Typ anhand seines Local-Names.
    ///
    /// # Fehler
    ///
    /// Ein unbekannter Name ist `Error::InconsistentProcState`. Es gibt
    /// keinen Default-Typ.
    ///
    /// ```
    /// use exigram::value_type::ValueType;
    ///
    /// assert_eq!(ValueType::classify("int").unwrap(), ValueType::Integer);
    /// assert!(ValueType::classify("foobar").is_err());
    /// ```
    pub fn classify(local_name: &str) -> Result<Self> {
        let vt = match local_name {
            "string" | "duration" | "anyURI" => Self::String,
            "boolean" => Self::Boolean,
            "integer" | "nonPositiveInteger" | "long" | "nonNegativeInteger" | "int"
            | "short" | "byte" | "negativeInteger" | "positiveInteger" => Self::Integer,
            "float" | "double" => Self::Float,
            "decimal" => Self::Decimal,
            "hexBinary" | "base64Binary" => Self::Binary,
            "dateTime" | "time" | "date" | "gYearMonth" | "gYear" | "gMonthDay" | "gDay"
            | "gMonth" => Self::DateTime,
            other => {
                return Err(Error::inconsistent(format!(
                    "no EXI datatype for built-in type {other:?}"
                )));
            }
        };
        Ok(vt)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Binary => "binary",
            Self::DateTime => "dateTime",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_full_table() {
        let cases: &[(&str, ValueType)] = &[
            ("string", ValueType::String),
            ("duration", ValueType::String),
            ("anyURI", ValueType::String),
            ("boolean", ValueType::Boolean),
            ("integer", ValueType::Integer),
            ("nonPositiveInteger", ValueType::Integer),
            ("long", ValueType::Integer),
            ("nonNegativeInteger", ValueType::Integer),
            ("int", ValueType::Integer),
            ("short", ValueType::Integer),
            ("byte", ValueType::Integer),
            ("negativeInteger", ValueType::Integer),
            ("positiveInteger", ValueType::Integer),
            ("float", ValueType::Float),
            ("double", ValueType::Float),
            ("decimal", ValueType::Decimal),
            ("hexBinary", ValueType::Binary),
            ("base64Binary", ValueType::Binary),
            ("dateTime", ValueType::DateTime),
            ("time", ValueType::DateTime),
            ("date", ValueType::DateTime),
            ("gYearMonth", ValueType::DateTime),
            ("gYear", ValueType::DateTime),
            ("gMonthDay", ValueType::DateTime),
            ("gDay", ValueType::DateTime),
            ("gMonth", ValueType::DateTime),
        ];
        for (name, expected) in cases {
            assert_eq!(ValueType::classify(name).unwrap(), *expected, "{name}");
        }
    }

    #[test]
    fn unknown_name_is_inconsistent() {
        let err = ValueType::classify("foobar").unwrap_err();
        assert!(matches!(err, Error::InconsistentProcState(_)));
        assert!(err.to_string().contains("foobar"));
    }

    /// Typen ausserhalb der Tabelle werden nicht still auf String abgebildet.
    #[test]
    fn unlisted_builtins_fail() {
        for name in ["unsignedInt", "token", "anySimpleType", "QName", "Int"] {
            assert!(ValueType::classify(name).is_err(), "{name}");
        }
    }
}
