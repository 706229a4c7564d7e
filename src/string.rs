//! Strings aus Schema-Namen (URIs, Local-Names, Prefixe).
//!
//! Ein [`SchemaString`] ist entweder abwesend oder ein nicht-leerer, geteilter
//! ASCII-String. Die leere Eingabe wird beim Konvertieren zum abwesenden
//! String, daher gibt es genau eine Darstellung fuer "leer".

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::borrow::Borrow;
use std::rc::Rc;

use crate::{Error, Result};

/// Optionaler, geteilter Schema-String.
///
/// `Clone` erhoeht nur den Referenzzaehler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaString(Option<Rc<str>>);

impl SchemaString {
    /// Der abwesende String.
    pub const fn absent() -> Self {
        Self(None)
    }

    /// Konvertiert einen ASCII-Namen in die interne Form.
    ///
    /// Leere Eingabe ergibt den abwesenden String. Nicht-ASCII-Zeichen werden
    /// mit `Error::InvalidName` abgelehnt.
    pub fn from_ascii(s: &str) -> Result<Self> {
        if !s.is_ascii() {
            return Err(Error::InvalidName(format!("non-ASCII name {s:?}").into()));
        }
        if s.is_empty() {
            return Ok(Self(None));
        }
        Ok(Self(Some(Rc::from(s))))
    }

    /// Text des Strings; `""` fuer den abwesenden String.
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }

    /// Bytes des Strings, `None` wenn abwesend.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.0.as_deref().map(str::as_bytes)
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Abwesend oder Laenge 0.
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    /// Bytegleichheit.
    pub fn equals(&self, other: &SchemaString) -> bool {
        self.as_str() == other.as_str()
    }

    /// Vergleich mit einem ASCII-Literal.
    pub fn equals_ascii(&self, ascii: &str) -> bool {
        self.as_str() == ascii
    }

    /// Totale Ordnung fuer die Kanonisierung (siehe [`string_compare`]).
    pub fn compare(&self, other: &SchemaString) -> Ordering {
        string_compare(self.as_bytes(), other.as_bytes())
    }

    /// Code Point an Position `index`.
    ///
    /// # Fehler
    ///
    /// `Error::OutOfBoundBuffer` wenn `index` hinter dem Ende liegt.
    pub fn code_point_at(&self, index: usize) -> Result<u32> {
        let bytes = self.as_str().as_bytes();
        bytes
            .get(index)
            .map(|&b| u32::from(b))
            .ok_or(Error::OutOfBoundBuffer {
                index,
                len: bytes.len(),
            })
    }

    /// Zerlegt den String an `separator`.
    ///
    /// Jede Folge von Separatoren zaehlt als ein Trenner, leere Tokens
    /// entstehen nicht. Ein abwesender String ergibt keine Tokens.
    pub fn split_by_char(&self, separator: u8) -> Vec<SchemaString> {
        let text = self.as_str();
        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        let mut start = 0;
        for pos in memchr::memchr_iter(separator, bytes) {
            if pos > start {
                tokens.push(Self(Some(Rc::from(&text[start..pos]))));
            }
            start = pos + 1;
        }
        if start < bytes.len() {
            tokens.push(Self(Some(Rc::from(&text[start..]))));
        }
        tokens
    }
}

impl Hash for SchemaString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Muss zu str::hash passen (Borrow<str>)
        self.as_str().hash(state);
    }
}

impl Borrow<str> for SchemaString {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialOrd for SchemaString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for SchemaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-Ordnung der Kanonisierung.
///
/// Abwesend sortiert vor jedem vorhandenen String. Sonst Byte fuer Byte bis
/// zur kuerzeren Laenge: das erste unterschiedliche Byte (vorzeichenbehaftet)
/// entscheidet, ein echter Prefix sortiert zuerst.
pub fn string_compare(a: Option<&[u8]>, b: Option<&[u8]>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            for (&x, &y) in a.iter().zip(b) {
                let ord = (x as i8).cmp(&(y as i8));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
    }
}
