//! Kanonisierung der String-Tabellen.
//!
//! Nach der Konstruktion liegen die Meta-Tabellen in Einfuegereihenfolge vor
//! und alle name-tragenden Productions referenzieren Meta-IDs. Dieser Pass
//!
//! 1. sortiert URI-Zeilen ab Zeile 4 (Zeilen 0..4 bleiben fix),
//! 2. sortiert jede Local-Name-Tabelle hinter ihrem fixen Prefix,
//! 3. schreibt jede verzoegerte Referenz genau einmal um (alte ID → neue ID).
//!
//! Ordnung: [`string_compare`], stabil. Der Pass konsumiert Tabellen und
//! Queue, laeuft also genau einmal.

use log::debug;

use crate::grammar::{Grammar, GrammarId, ProductionAddress, QNameRef};
use crate::string::{SchemaString, string_compare};
use crate::string_table::{
    FIXED_LN_PREFIX, LnRow, LnTable, RESERVED_URI_ROWS, TableRow, UriRow, UriTable,
};
use crate::{Error, Result};

// ============================================================================
// DeferredRef
// ============================================================================

/// Verzoegerte Referenz auf die Zeilen-Felder einer Production.
///
/// `ln` ist `None` fuer `SE(uri:*)` / `AT(uri:*)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredRef {
    pub address: ProductionAddress,
    /// URI-Zeile vor dem Sortieren.
    pub uri: u32,
    /// Local-Name-Zeile vor dem Sortieren.
    pub ln: Option<u32>,
}

// ============================================================================
// RowMapping
// ============================================================================

/// Alte Zeilen-ID → neue Zeilen-ID, indiziert ueber die alte URI-ID.
#[derive(Debug, Clone, Default)]
pub struct RowMapping {
    uri: Vec<u32>,
    ln: Vec<Option<Vec<u32>>>,
}

impl RowMapping {
    /// Neue Position der URI-Zeile `old`.
    pub fn uri(&self, old: u32) -> Result<u32> {
        self.uri
            .get(old as usize)
            .copied()
            .ok_or_else(|| Error::inconsistent(format!("uri row {old} out of range")))
    }

    /// Neue Position der Local-Name-Zeile `old_ln` unter URI `old_uri`.
    ///
    /// # Fehler
    ///
    /// `Error::InconsistentProcState` wenn die URI keine Local-Name-Tabelle hat.
    pub fn ln(&self, old_uri: u32, old_ln: u32) -> Result<u32> {
        let table = self
            .ln
            .get(old_uri as usize)
            .ok_or_else(|| Error::inconsistent(format!("uri row {old_uri} out of range")))?
            .as_ref()
            .ok_or_else(|| Error::inconsistent("missing local-name table"))?;
        table.get(old_ln as usize).copied().ok_or_else(|| {
            Error::inconsistent(format!("local-name row {old_ln} of uri {old_uri} out of range"))
        })
    }

    pub fn qname(&self, old: QNameRef) -> Result<QNameRef> {
        Ok(QNameRef::new(self.uri(old.uri)?, self.ln(old.uri, old.ln)?))
    }
}

/// Ergebnis von [`sort_string_tables`].
#[derive(Debug)]
pub struct SortedTables {
    pub uri_table: UriTable,
    pub mapping: RowMapping,
    /// Anzahl umgeschriebener Productions.
    pub rewritten: usize,
}

// ============================================================================
// Sortierung
// ============================================================================

/// Stabile Sortierung von `rows[fixed..]`.
///
/// Gibt die neue Reihenfolge (alte Indizes) und die Umkehrabbildung zurueck.
fn sorted_order<R: TableRow>(rows: &[R], fixed: usize) -> Result<(Vec<usize>, Vec<u32>)> {
    let mut order = Vec::new();
    order.try_reserve(rows.len())?;
    order.extend(0..rows.len());
    let fixed = fixed.min(rows.len());
    order[fixed..].sort_by(|&a, &b| {
        string_compare(rows[a].string().as_bytes(), rows[b].string().as_bytes())
    });

    let mut new_of_old = Vec::new();
    new_of_old.try_reserve(rows.len())?;
    new_of_old.resize(rows.len(), 0u32);
    for (new, &old) in order.iter().enumerate() {
        new_of_old[old] = u32::try_from(new).map_err(|_| Error::MemoryAllocation)?;
    }
    Ok((order, new_of_old))
}

/// Ordnet `rows` nach `order` um.
fn permute<R>(rows: Vec<R>, order: &[usize]) -> Result<Vec<R>> {
    let mut slots: Vec<Option<R>> = rows.into_iter().map(Some).collect();
    let mut out = Vec::new();
    out.try_reserve(order.len())?;
    for &old in order {
        let row = slots
            .get_mut(old)
            .and_then(Option::take)
            .ok_or_else(|| Error::inconsistent("row permutation is not a bijection"))?;
        out.push(row);
    }
    Ok(out)
}

fn sort_ln_table(table: LnTable, fixed: usize) -> Result<(LnTable, Vec<u32>)> {
    let rows: Vec<LnRow> = table.into_rows();
    let (order, mapping) = sorted_order(&rows, fixed)?;
    Ok((LnTable::from_rows(permute(rows, &order)?)?, mapping))
}

/// Sortiert die Meta-Tabellen und schreibt alle verzoegerten Referenzen um.
///
/// # Fehler
///
/// `Error::InconsistentProcState` wenn eine Referenz keine passende
/// Production adressiert oder ihre Local-Name-Tabelle fehlt.
pub fn sort_string_tables(
    meta: UriTable,
    deferred: Vec<DeferredRef>,
    grammars: &mut [Grammar],
) -> Result<SortedTables> {
    let mut rows: Vec<UriRow> = meta.into_rows();
    let reserved = RESERVED_URI_ROWS.min(rows.len());
    let (order, uri_mapping) = sorted_order(&rows, reserved)?;

    let mut ln_mapping = Vec::new();
    ln_mapping.try_reserve(rows.len())?;
    let mut ln_rows = 0usize;
    for (old, row) in rows.iter_mut().enumerate() {
        match row.ln_table.take() {
            Some(table) => {
                let fixed = FIXED_LN_PREFIX.get(old).copied().unwrap_or(0);
                let (sorted, mapping) = sort_ln_table(table, fixed)?;
                ln_rows += sorted.len();
                row.ln_table = Some(sorted);
                ln_mapping.push(Some(mapping));
            }
            None => ln_mapping.push(None),
        }
    }

    let uri_table = UriTable::from_rows(permute(rows, &order)?)?;
    let mapping = RowMapping {
        uri: uri_mapping,
        ln: ln_mapping,
    };
    debug!(
        "sorted string tables: {} uri rows, {} local-name rows",
        uri_table.len(),
        ln_rows
    );

    let rewritten = deferred.len();
    for d in deferred {
        rewrite(grammars, &mapping, &d)?;
    }
    debug!("rewrote {rewritten} deferred references");

    Ok(SortedTables {
        uri_table,
        mapping,
        rewritten,
    })
}

fn rewrite(grammars: &mut [Grammar], mapping: &RowMapping, d: &DeferredRef) -> Result<()> {
    let ProductionAddress {
        grammar,
        rule,
        production,
    } = d.address;
    let p = grammars
        .get_mut(grammar.index())
        .and_then(|g| g.production_mut(rule, production))
        .ok_or_else(|| {
            Error::inconsistent(format!(
                "deferred reference to missing production {grammar}/{rule}/{production}"
            ))
        })?;

    match d.ln {
        Some(ln) => {
            let q = p.event.qname_mut().ok_or_else(|| {
                Error::inconsistent("deferred qname reference on a production without qname")
            })?;
            if *q != QNameRef::new(d.uri, ln) {
                return Err(Error::inconsistent("deferred reference does not match production"));
            }
            *q = mapping.qname(*q)?;
        }
        None => {
            if p.event.qname().is_some() {
                return Err(Error::inconsistent(
                    "deferred uri reference on a production with qname",
                ));
            }
            let uri = p.event.uri_mut().ok_or_else(|| {
                Error::inconsistent("deferred uri reference on a production without uri")
            })?;
            if *uri != d.uri {
                return Err(Error::inconsistent("deferred reference does not match production"));
            }
            *uri = mapping.uri(d.uri)?;
        }
    }
    Ok(())
}

// ============================================================================
// Element-Index
// ============================================================================

/// Element-Deklaration mit kanonischen Namen und ihrer Grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementEntry {
    pub uri: SchemaString,
    pub local_name: SchemaString,
    /// Kanonische Zeilen-IDs.
    pub qname: QNameRef,
    pub grammar: GrammarId,
}

/// Globale Elemente sortiert nach (URI, Local-Name).
#[derive(Debug, Clone, Default)]
pub struct GlobalElementIndex {
    entries: Vec<ElementEntry>,
}

impl GlobalElementIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementEntry> + '_ {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ElementEntry> {
        self.entries.get(index)
    }

    /// Binaere Suche nach (uri, local_name).
    pub fn lookup(&self, uri: &str, local_name: &str) -> Option<&ElementEntry> {
        let uri = SchemaString::from_ascii(uri).ok()?;
        let local_name = SchemaString::from_ascii(local_name).ok()?;
        self.entries
            .binary_search_by(|e| {
                e.uri
                    .compare(&uri)
                    .then_with(|| e.local_name.compare(&local_name))
            })
            .ok()
            .and_then(|i| self.entries.get(i))
    }
}

/// Sortiert die globalen Elemente (Meta-IDs) nach ihren kanonischen Strings.
pub fn sort_global_elements(
    globals: Vec<(QNameRef, GrammarId)>,
    mapping: &RowMapping,
    uri_table: &UriTable,
) -> Result<GlobalElementIndex> {
    Ok(GlobalElementIndex {
        entries: sort_elements(globals, mapping, uri_table)?,
    })
}

/// Uebersetzt Meta-IDs in kanonische Eintraege, stabil sortiert nach
/// (URI, Local-Name). Gleichnamige Eintraege behalten ihre Reihenfolge.
pub fn sort_elements(
    elements: Vec<(QNameRef, GrammarId)>,
    mapping: &RowMapping,
    uri_table: &UriTable,
) -> Result<Vec<ElementEntry>> {
    let mut entries = Vec::new();
    entries.try_reserve(elements.len())?;
    for (old, grammar) in elements {
        let qname = mapping.qname(old)?;
        let uri = uri_table
            .string_at(qname.uri)
            .ok_or_else(|| Error::inconsistent("element uri row missing"))?
            .clone();
        let local_name = uri_table
            .ln_table(qname.uri)
            .and_then(|t| t.string_at(qname.ln))
            .ok_or_else(|| Error::inconsistent("missing local-name table"))?
            .clone();
        entries.push(ElementEntry {
            uri,
            local_name,
            qname,
            grammar,
        });
    }
    entries.sort_by(|a, b| {
        a.uri
            .compare(&b.uri)
            .then_with(|| a.local_name.compare(&b.local_name))
    });
    Ok(entries)
}
