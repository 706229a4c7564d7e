//! Grammar-Datenmodell: Grammar, Rule (NonTerminal), Production.
//!
//! Eine Grammar ist ein endlicher Automat. Jede [`Rule`] ist ein Zustand, ihre
//! Productions sind die ausgehenden Uebergaenge. Rule-IDs sind innerhalb einer
//! Grammar dicht und eindeutig: Rule `i` hat ID `i`.
//!
//! Name-tragende Events referenzieren Zeilen der URI-/Local-Name-Tabellen.
//! Waehrend der Kompilierung sind das Meta-IDs (Einfuegereihenfolge), gueltig
//! sind sie erst nach der Kanonisierung.

use core::fmt;

use crate::value_type::ValueType;
use crate::{Error, Result};

/// Initiale Kapazitaet des Production-Arrays einer Rule.
const DEFAULT_PROD_CAPACITY: usize = 4;

// ============================================================================
// IDs
// ============================================================================

/// Handle einer Grammar in der Compile-Arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrammarId(pub(crate) u32);

impl GrammarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Zeilen-Referenz (URI-Zeile, Local-Name-Zeile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QNameRef {
    pub uri: u32,
    pub ln: u32,
}

impl QNameRef {
    pub const fn new(uri: u32, ln: u32) -> Self {
        Self { uri, ln }
    }
}

/// Adresse einer Production: (Grammar, Rule-Index, Production-Index).
///
/// Bleibt gueltig wenn Production-Arrays reallokieren.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductionAddress {
    pub grammar: GrammarId,
    pub rule: u32,
    pub production: u32,
}

/// Ziel einer Production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonTermId {
    Rule(u32),
    /// Keine Fortsetzung.
    Void,
}

impl NonTermId {
    /// Verschiebt ein Rule-Ziel um `offset`; `Void` bleibt `Void`.
    pub fn shifted(self, offset: u32) -> Self {
        match self {
            Self::Rule(n) => Self::Rule(n + offset),
            Self::Void => Self::Void,
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// Ausloesendes Event einer Production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// EE
    EndElement,
    /// CH [schema-typed value]
    Characters(ValueType),
    /// CH [untyped value]
    CharactersUntyped,
    /// SE(qname)
    StartElement(QNameRef),
    /// SE(uri:*)
    StartElementNs(u32),
    /// SE(*)
    StartElementAny,
    /// AT(qname) [schema-typed value]
    Attribute(QNameRef, ValueType),
    /// AT(uri:*)
    AttributeNs(u32),
    /// AT(*)
    AttributeAny,
    /// ε-Uebergang ohne Event (Ergebnis der Konkatenation).
    Void,
}

impl Event {
    /// QName-Referenz von SE(qname) / AT(qname).
    pub fn qname(&self) -> Option<QNameRef> {
        match *self {
            Self::StartElement(q) | Self::Attribute(q, _) => Some(q),
            _ => None,
        }
    }

    /// URI-Zeile aller name-tragenden Events.
    pub fn uri(&self) -> Option<u32> {
        match *self {
            Self::StartElement(q) | Self::Attribute(q, _) => Some(q.uri),
            Self::StartElementNs(uri) | Self::AttributeNs(uri) => Some(uri),
            _ => None,
        }
    }

    /// Ob das Event Tabellen-Zeilen referenziert.
    pub fn is_name_carrying(&self) -> bool {
        self.uri().is_some()
    }

    pub(crate) fn qname_mut(&mut self) -> Option<&mut QNameRef> {
        match self {
            Self::StartElement(q) | Self::Attribute(q, _) => Some(q),
            _ => None,
        }
    }

    pub(crate) fn uri_mut(&mut self) -> Option<&mut u32> {
        match self {
            Self::StartElement(q) | Self::Attribute(q, _) => Some(&mut q.uri),
            Self::StartElementNs(uri) | Self::AttributeNs(uri) => Some(uri),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndElement => write!(f, "EE"),
            Self::Characters(vt) => write!(f, "CH [{vt}]"),
            Self::CharactersUntyped => write!(f, "CH [untyped]"),
            Self::StartElement(q) => write!(f, "SE({}:{})", q.uri, q.ln),
            Self::StartElementNs(uri) => write!(f, "SE({uri}:*)"),
            Self::StartElementAny => write!(f, "SE(*)"),
            Self::Attribute(q, vt) => write!(f, "AT({}:{}) [{vt}]", q.uri, q.ln),
            Self::AttributeNs(uri) => write!(f, "AT({uri}:*)"),
            Self::AttributeAny => write!(f, "AT(*)"),
            Self::Void => write!(f, "\u{3b5}"),
        }
    }
}

// ============================================================================
// Production
// ============================================================================

/// Uebergang: Event → naechste Rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Production {
    pub event: Event,
    pub target: NonTermId,
}

impl Production {
    pub const fn new(event: Event, target: NonTermId) -> Self {
        Self { event, target }
    }

    /// `EE` ohne Fortsetzung.
    pub const fn end_element() -> Self {
        Self::new(Event::EndElement, NonTermId::Void)
    }

    /// ε-Uebergang zu Rule `rule`.
    pub const fn epsilon(rule: u32) -> Self {
        Self::new(Event::Void, NonTermId::Rule(rule))
    }

    /// "End-Element ohne weitere Fortsetzung".
    ///
    /// Einziges Praedikat fuer Konkatenation, Escape-Pruefung und
    /// Self-Loop-Umschreibung.
    pub fn is_terminal_end_element(&self) -> bool {
        self.event == Event::EndElement && self.target == NonTermId::Void
    }

    pub fn is_epsilon(&self) -> bool {
        self.event == Event::Void
    }

    /// Kopie mit um `offset` verschobenem Ziel.
    pub fn shifted(&self, offset: u32) -> Self {
        Self::new(self.event, self.target.shifted(offset))
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            NonTermId::Rule(n) => write!(f, "{} -> {n}", self.event),
            NonTermId::Void => write!(f, "{}", self.event),
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

/// Ein NonTerminal mit geordneten Productions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    id: u32,
    productions: Vec<Production>,
}

impl Rule {
    /// Leere Rule mit ID `id` (initRule).
    pub fn new(id: u32) -> Self {
        Self {
            id,
            productions: Vec::with_capacity(DEFAULT_PROD_CAPACITY),
        }
    }

    /// Rule mit gegebenen Productions.
    pub fn with_productions(id: u32, productions: Vec<Production>) -> Self {
        Self { id, productions }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub(crate) fn productions_mut(&mut self) -> &mut [Production] {
        &mut self.productions
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Haengt eine Production an (addProduction).
    pub fn add_production(&mut self, production: Production) -> Result<()> {
        self.productions.try_reserve(1)?;
        self.productions.push(production);
        Ok(())
    }

    /// Ob die Rule eine terminale EE-Production hat.
    pub fn has_end_element(&self) -> bool {
        self.productions.iter().any(Production::is_terminal_end_element)
    }

    /// Kopie mit ID und allen Rule-Zielen um `offset` verschoben.
    pub fn shifted(&self, offset: u32) -> Result<Self> {
        let mut productions = Vec::new();
        productions.try_reserve(self.productions.len())?;
        productions.extend(self.productions.iter().map(|p| p.shifted(offset)));
        Ok(Self {
            id: self.id + offset,
            productions,
        })
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// Geordnete Folge von Rules. Rule 0 ist der Startzustand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    rules: Vec<Rule>,
}

impl Grammar {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Grammar aus Rules; IDs werden auf ihren Index gesetzt.
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let mut grammar = Self { rules };
        grammar.renumber();
        grammar
    }

    pub(crate) fn with_capacity(rules: usize) -> Result<Self> {
        let mut v = Vec::new();
        v.try_reserve(rules)?;
        Ok(Self { rules: v })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub(crate) fn rules_mut(&mut self) -> &mut [Rule] {
        &mut self.rules
    }

    pub fn rule(&self, index: u32) -> Option<&Rule> {
        self.rules.get(index as usize)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Anzahl Rules als `u32` (Offset fuer Konkatenation).
    pub(crate) fn rule_count_u32(&self) -> Result<u32> {
        u32::try_from(self.rules.len()).map_err(|_| Error::MemoryAllocation)
    }

    pub fn push_rule(&mut self, rule: Rule) -> Result<()> {
        self.rules.try_reserve(1)?;
        self.rules.push(rule);
        Ok(())
    }

    /// Setzt jede Rule-ID auf ihren Index.
    pub fn renumber(&mut self) {
        for (i, rule) in self.rules.iter_mut().enumerate() {
            rule.id = i as u32;
        }
    }

    pub fn production(&self, rule: u32, production: u32) -> Option<&Production> {
        self.rule(rule)?.productions.get(production as usize)
    }

    pub(crate) fn production_mut(&mut self, rule: u32, production: u32) -> Option<&mut Production> {
        self.rules
            .get_mut(rule as usize)?
            .productions
            .get_mut(production as usize)
    }

    /// Alle Productions mit ihrer (Rule, Production)-Position.
    pub fn productions(&self) -> impl Iterator<Item = (u32, u32, &Production)> + '_ {
        self.rules.iter().enumerate().flat_map(|(r, rule)| {
            rule.productions
                .iter()
                .enumerate()
                .map(move |(p, prod)| (r as u32, p as u32, prod))
        })
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "  rule {}:", rule.id)?;
            for p in &rule.productions {
                writeln!(f, "    {p}")?;
            }
        }
        Ok(())
    }
}
