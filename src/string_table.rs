//! String Tables (URI, Local-Name, Prefix, Value).
//!
//! Waehrend der Kompilierung sind das die "Meta"-Tabellen in
//! Einfuegereihenfolge. Erst die Kanonisierung (siehe [`crate::canonical`])
//! bringt sie in die Reihenfolge, auf die sich Encoder und Decoder einigen.
//!
//! Tabellen deduplizieren nicht selbst: der Aufrufer macht vorher einen
//! Lookup und fuegt nur bei Miss hinzu.

use crate::hash::DjbBuildHasher;
use crate::string::SchemaString;
use crate::{Error, Result};

/// Initiale Kapazitaet jeder Tabelle.
pub const DEFAULT_TABLE_CAPACITY: usize = 10;

/// Schwelle ab der Lookup von linearer Suche auf einen Hash-Index wechselt.
const INDEX_THRESHOLD: usize = 64;

/// Leerer Namespace (URI-Zeile 0).
pub const URI_EMPTY: &str = "";
/// XML Namespace (URI-Zeile 1).
pub const URI_XML: &str = "http://www.w3.org/XML/1998/namespace";
/// XSI Namespace (URI-Zeile 2).
pub const URI_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// XSD Namespace (URI-Zeile 3).
pub const URI_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Anzahl reservierter URI-Zeilen, die nie umsortiert werden.
pub const RESERVED_URI_ROWS: usize = 4;

/// Laenge des fixen Local-Name-Prefix je reservierter URI-Zeile.
pub const FIXED_LN_PREFIX: [usize; RESERVED_URI_ROWS] = [0, 4, 2, 46];

const XML_LOCAL_NAMES: [&str; 4] = ["base", "id", "lang", "space"];

const XSI_LOCAL_NAMES: [&str; 2] = ["nil", "type"];

/// Eingebaute XSD-Typen in kanonischer Reihenfolge.
pub const XSD_BUILTIN_TYPES: [&str; 46] = [
    "ENTITIES",
    "ENTITY",
    "ID",
    "IDREF",
    "IDREFS",
    "NCName",
    "NMTOKEN",
    "NMTOKENS",
    "NOTATION",
    "Name",
    "QName",
    "anySimpleType",
    "anyType",
    "anyURI",
    "base64Binary",
    "boolean",
    "byte",
    "date",
    "dateTime",
    "decimal",
    "double",
    "duration",
    "float",
    "gDay",
    "gMonth",
    "gMonthDay",
    "gYear",
    "gYearMonth",
    "hexBinary",
    "int",
    "integer",
    "language",
    "long",
    "negativeInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "normalizedString",
    "positiveInteger",
    "short",
    "string",
    "time",
    "token",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

// ============================================================================
// Rows
// ============================================================================

/// Zeile mit einem String als Schluessel.
pub trait TableRow {
    fn string(&self) -> &SchemaString;
}

/// Value-Zeile (zur Compile-Zeit nie befuellt).
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRow {
    pub string: SchemaString,
}

/// Prefix-Zeile.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixRow {
    pub string: SchemaString,
}

/// Local-Name-Zeile mit eigener Value-Tabelle.
#[derive(Debug, Clone)]
pub struct LnRow {
    pub string: SchemaString,
    pub values: ValueTable,
}

/// URI-Zeile mit Local-Name- und Prefix-Tabelle.
///
/// Die Local-Name-Tabelle wird erst angelegt, wenn ein Name unter dieser URI
/// registriert wird. URIs aus Namespace-Wildcards haben keine.
#[derive(Debug, Clone)]
pub struct UriRow {
    pub string: SchemaString,
    pub ln_table: Option<LnTable>,
    pub prefix_table: Option<PrefixTable>,
}

impl TableRow for ValueRow {
    fn string(&self) -> &SchemaString {
        &self.string
    }
}

impl TableRow for PrefixRow {
    fn string(&self) -> &SchemaString {
        &self.string
    }
}

impl TableRow for LnRow {
    fn string(&self) -> &SchemaString {
        &self.string
    }
}

impl TableRow for UriRow {
    fn string(&self) -> &SchemaString {
        &self.string
    }
}

// ============================================================================
// Table
// ============================================================================

/// Wachsende String-Tabelle.
///
/// Fuer kleine Tabellen wird linear gesucht. Ab [`INDEX_THRESHOLD`] Zeilen
/// wird lazy ein `hashbrown` Index mit djb-Hash angelegt.
#[derive(Debug, Clone)]
pub struct Table<R> {
    rows: Vec<R>,
    index: Option<hashbrown::HashMap<SchemaString, u32, DjbBuildHasher>>,
}

pub type UriTable = Table<UriRow>;
pub type LnTable = Table<LnRow>;
pub type PrefixTable = Table<PrefixRow>;
pub type ValueTable = Table<ValueRow>;

impl<R: TableRow> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRow> Table<R> {
    /// Leere Tabelle mit [`DEFAULT_TABLE_CAPACITY`].
    pub fn new() -> Self {
        Self {
            rows: Vec::with_capacity(DEFAULT_TABLE_CAPACITY),
            index: None,
        }
    }

    /// Baut eine Tabelle aus fertigen Zeilen (z.B. nach dem Sortieren).
    pub(crate) fn from_rows(rows: Vec<R>) -> Result<Self> {
        let mut table = Self {
            rows,
            index: None,
        };
        if table.rows.len() >= INDEX_THRESHOLD {
            table.build_index()?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn get(&self, id: u32) -> Option<&R> {
        self.rows.get(id as usize)
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut R> {
        self.rows.get_mut(id as usize)
    }

    pub(crate) fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// String der Zeile `id`.
    pub fn string_at(&self, id: u32) -> Option<&SchemaString> {
        self.get(id).map(TableRow::string)
    }

    /// Exakter Lookup; bei Duplikaten gewinnt die erste Zeile.
    pub fn lookup(&self, value: &str) -> Option<u32> {
        if let Some(ref map) = self.index {
            map.get(value).copied()
        } else {
            self.rows
                .iter()
                .position(|r| r.string().equals_ascii(value))
                .map(|i| i as u32)
        }
    }

    /// Haengt eine Zeile an und gibt ihre ID zurueck.
    pub(crate) fn push(&mut self, row: R) -> Result<u32> {
        let id = u32::try_from(self.rows.len()).map_err(|_| Error::MemoryAllocation)?;
        self.rows.try_reserve(1)?;
        let key = row.string().clone();
        self.rows.push(row);

        if let Some(ref mut map) = self.index {
            map.try_reserve(1).map_err(|_| Error::MemoryAllocation)?;
            map.entry(key).or_insert(id);
        } else if self.rows.len() >= INDEX_THRESHOLD {
            self.build_index()?;
        }
        Ok(id)
    }

    fn build_index(&mut self) -> Result<()> {
        let mut map = hashbrown::HashMap::with_hasher(DjbBuildHasher);
        map.try_reserve(self.rows.len())
            .map_err(|_| Error::MemoryAllocation)?;
        for (i, row) in self.rows.iter().enumerate() {
            map.entry(row.string().clone()).or_insert(i as u32);
        }
        self.index = Some(map);
        Ok(())
    }
}

impl Table<UriRow> {
    /// Neue URI-Zeile ohne Local-Name- und Prefix-Tabelle.
    pub fn add_uri_row(&mut self, uri: SchemaString) -> Result<u32> {
        self.push(UriRow {
            string: uri,
            ln_table: None,
            prefix_table: None,
        })
    }

    pub fn lookup_uri(&self, uri: &str) -> Option<u32> {
        self.lookup(uri)
    }

    /// Local-Name-Tabelle der URI-Zeile, bei Bedarf angelegt.
    pub fn ensure_ln_table(&mut self, uri_id: u32) -> Result<&mut LnTable> {
        let len = self.len();
        let row = self.get_mut(uri_id).ok_or(Error::OutOfBoundBuffer {
            index: uri_id as usize,
            len,
        })?;
        Ok(row.ln_table.get_or_insert_with(LnTable::new))
    }

    /// Local-Name-Tabelle der URI-Zeile, falls vorhanden.
    pub fn ln_table(&self, uri_id: u32) -> Option<&LnTable> {
        self.get(uri_id).and_then(|r| r.ln_table.as_ref())
    }
}

impl Table<LnRow> {
    /// Neue Local-Name-Zeile mit leerer Value-Tabelle.
    pub fn add_ln_row(&mut self, local_name: SchemaString) -> Result<u32> {
        self.push(LnRow {
            string: local_name,
            values: ValueTable::new(),
        })
    }

    pub fn lookup_ln(&self, local_name: &str) -> Option<u32> {
        self.lookup(local_name)
    }
}

impl Table<PrefixRow> {
    pub fn add_prefix_row(&mut self, prefix: SchemaString) -> Result<u32> {
        self.push(PrefixRow { string: prefix })
    }
}

impl Table<ValueRow> {
    pub fn add_value_row(&mut self, value: SchemaString) -> Result<u32> {
        self.push(ValueRow { string: value })
    }
}

/// Meta-URI-Tabelle mit den vier reservierten Zeilen.
///
/// | Zeile | URI | Local-Names | Prefix |
/// |---|---|---|---|
/// | 0 | "" | – | "" |
/// | 1 | XML | base, id, lang, space | xml |
/// | 2 | XSI | nil, type | xsi |
/// | 3 | XSD | 46 eingebaute Typen | – |
pub fn create_initial_meta_tables() -> Result<UriTable> {
    let reserved: [(&str, &[&str], Option<&str>); RESERVED_URI_ROWS] = [
        (URI_EMPTY, &[], Some("")),
        (URI_XML, &XML_LOCAL_NAMES, Some("xml")),
        (URI_XSI, &XSI_LOCAL_NAMES, Some("xsi")),
        (URI_XSD, &XSD_BUILTIN_TYPES, None),
    ];

    let mut uris = UriTable::new();
    for (uri, local_names, prefix) in reserved {
        let uri_id = uris.add_uri_row(SchemaString::from_ascii(uri)?)?;
        let ln_table = uris.ensure_ln_table(uri_id)?;
        for ln in local_names {
            ln_table.add_ln_row(SchemaString::from_ascii(ln)?)?;
        }
        if let Some(prefix) = prefix {
            let mut prefixes = PrefixTable::new();
            prefixes.add_prefix_row(SchemaString::from_ascii(prefix)?)?;
            if let Some(row) = uris.get_mut(uri_id) {
                row.prefix_table = Some(prefixes);
            }
        }
    }
    Ok(uris)
}
