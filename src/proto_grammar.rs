//! Grammar-Konstruktion fuer Schema-informed Grammars.
//!
//! Alle Operationen sind Methoden auf [`SchemaCompiler`]: sie nehmen fertige
//! Grammars per [`GrammarId`] und legen das Ergebnis als neue Grammar in der
//! Arena ab. Eingaben werden nie veraendert.
//!
//! # Konkatenation
//!
//! ```text
//! L ⊕ R:  rules = L.rules ++ (R.rules um |L| verschoben)
//!         jede "EE ohne Fortsetzung" in L wird zu  ε → R.rule0
//! ```
//!
//! "EE ohne Fortsetzung" ist immer [`Production::is_terminal_end_element`],
//! auch fuer Escape-Pruefung und Self-Loop.

use crate::compiler::SchemaCompiler;
use crate::grammar::{Event, Grammar, GrammarId, NonTermId, Production, Rule};
use crate::schema::{AttributeWildcard, MaxOccurs, WildcardConstraint};
use crate::value_type::ValueType;
use crate::{Error, Result};

/// Obergrenze der Term-Kopien, die ein Particle ausrollt (`minOccurs` bzw.
/// endliches `maxOccurs`).
pub const MAX_PARTICLE_COPIES: usize = 1 << 16;

/// Ersetzt jede terminale EE-Production der Rule durch `replacement`.
fn redirect_end_elements(rule: &mut Rule, replacement: Production) {
    for p in rule.productions_mut() {
        if p.is_terminal_end_element() {
            *p = replacement;
        }
    }
}

/// `{EE}`
fn end_element_grammar() -> Grammar {
    Grammar::from_rules(vec![Rule::with_productions(
        0,
        vec![Production::end_element()],
    )])
}

/// Zwei Rules: `rule0 {event → 1}`, `rule1 {EE}`.
fn single_event_grammar(event: Event) -> Grammar {
    Grammar::from_rules(vec![
        Rule::with_productions(0, vec![Production::new(event, NonTermId::Rule(1))]),
        Rule::with_productions(1, vec![Production::end_element()]),
    ])
}

fn missing_start_rule(id: GrammarId) -> Error {
    Error::inconsistent(format!("grammar {id} has no start rule"))
}

impl SchemaCompiler {
    /// Kopiert eine Grammar, wendet `edit` an und legt die Kopie ab.
    fn derive(
        &mut self,
        source: GrammarId,
        edit: impl FnOnce(&mut Grammar) -> Result<()>,
    ) -> Result<GrammarId> {
        let mut grammar = self.grammar(source)?.clone();
        edit(&mut grammar)?;
        self.insert(grammar)
    }

    // ========================================================================
    // Konkatenation
    // ========================================================================

    /// `L ⊕ R`.
    pub fn concatenate(&mut self, left: GrammarId, right: GrammarId) -> Result<GrammarId> {
        self.concatenate_all(&[left, right])
    }

    /// Links-Faltung `((g0 ⊕ g1) ⊕ g2) ...` in einem Durchgang.
    ///
    /// Nur das jeweils letzte Segment hat noch terminale EEs, daher wird pro
    /// Anhaengen nur dieses umgeschrieben. Leere Liste ergibt `{EE}`.
    pub fn concatenate_all(&mut self, segments: &[GrammarId]) -> Result<GrammarId> {
        let mut total = 0usize;
        for &id in segments {
            total += self.grammar(id)?.rule_count();
        }
        if segments.is_empty() {
            return self.insert(end_element_grammar());
        }

        let mut out = Grammar::with_capacity(total)?;
        let mut tail = 0usize;
        for (i, &id) in segments.iter().enumerate() {
            let offset = out.rule_count_u32()?;
            if i > 0 {
                let jump = Production::epsilon(offset);
                for rule in &mut out.rules_mut()[tail..] {
                    redirect_end_elements(rule, jump);
                }
            }
            tail = offset as usize;
            for rule in self.grammar(id)?.rules() {
                out.push_rule(rule.shifted(offset)?)?;
            }
        }
        self.insert(out)
    }

    // ========================================================================
    // Simple Types, Attribute, Elemente
    // ========================================================================

    /// `rule0 {CH[vt] → 1}`, `rule1 {EE}`.
    ///
    /// # Fehler
    ///
    /// `Error::InconsistentProcState` fuer einen unbekannten Basistyp.
    pub fn simple_type(&mut self, type_name: &str) -> Result<GrammarId> {
        let vt = ValueType::classify(type_name)?;
        self.insert(single_event_grammar(Event::Characters(vt)))
    }

    /// Leerer Content: `{EE}`.
    pub fn simple_empty_type(&mut self) -> Result<GrammarId> {
        self.insert(end_element_grammar())
    }

    /// Attribute Use. Optionale Attribute bekommen ein EE-Escape in rule0.
    pub fn attribute_use(
        &mut self,
        required: bool,
        local_name: &str,
        ns: &str,
        type_name: &str,
    ) -> Result<GrammarId> {
        let vt = ValueType::classify(type_name)?;
        let qname = self.register_qname(ns, local_name)?;
        let mut grammar = single_event_grammar(Event::Attribute(qname, vt));
        if !required && let Some(rule0) = grammar.rules_mut().first_mut() {
            rule0.add_production(Production::end_element())?;
        }
        self.insert(grammar)
    }

    /// `rule0 {SE(qname) → 1}`, `rule1 {EE}`.
    pub fn element_term(&mut self, local_name: &str, ns: &str) -> Result<GrammarId> {
        let qname = self.register_qname(ns, local_name)?;
        self.insert(single_event_grammar(Event::StartElement(qname)))
    }

    /// Element-Wildcard.
    ///
    /// `##any` und `##other` → `SE(*)`, Namespace-Liste → ein `SE(uri:*)` je
    /// Namespace.
    pub fn wildcard_term(&mut self, constraint: &WildcardConstraint) -> Result<GrammarId> {
        let mut start = Rule::new(0);
        match constraint {
            WildcardConstraint::Any | WildcardConstraint::Not(_) => {
                start.add_production(Production::new(Event::StartElementAny, NonTermId::Rule(1)))?;
            }
            WildcardConstraint::Namespaces(namespaces) => {
                if namespaces.is_empty() {
                    return Err(Error::EmptyNamespaceList);
                }
                for ns in namespaces {
                    let uri = self.register_uri(ns)?;
                    start.add_production(Production::new(
                        Event::StartElementNs(uri),
                        NonTermId::Rule(1),
                    ))?;
                }
            }
        }
        let end = Rule::with_productions(1, vec![Production::end_element()]);
        self.insert(Grammar::from_rules(vec![start, end]))
    }

    // ========================================================================
    // Complex Types
    // ========================================================================

    /// Attribute (in der gegebenen Reihenfolge) ⊕ Content.
    ///
    /// Ohne Attribute und Wildcard ist das Ergebnis der Content selbst. Mit
    /// Wildcard wird ein `{EE}`-Segment angehaengt und jedes Attribut-Segment
    /// bekommt die Wildcard-Productions in rule0.
    pub fn complex_type(
        &mut self,
        attributes: &[GrammarId],
        wildcard: Option<&AttributeWildcard>,
        content: GrammarId,
    ) -> Result<GrammarId> {
        let mut segments = Vec::new();
        segments.try_reserve(attributes.len() + 2)?;
        segments.extend_from_slice(attributes);

        if let Some(wildcard) = wildcard {
            let events = self.attribute_wildcard_events(wildcard)?;
            segments.push(self.simple_empty_type()?);
            for seg in &mut segments {
                *seg = self.with_attribute_events(*seg, &events)?;
            }
        }

        if segments.is_empty() {
            return Ok(content);
        }
        segments.push(content);
        self.concatenate_all(&segments)
    }

    /// Wie [`Self::complex_type`] mit leerem Content.
    pub fn complex_empty_type(
        &mut self,
        attributes: &[GrammarId],
        wildcard: Option<&AttributeWildcard>,
    ) -> Result<GrammarId> {
        let content = self.simple_empty_type()?;
        self.complex_type(attributes, wildcard, content)
    }

    /// Kopie mit Attribut-Wildcard-Productions (→ rule0) in rule0.
    pub fn with_attribute_wildcard(
        &mut self,
        grammar: GrammarId,
        wildcard: &AttributeWildcard,
    ) -> Result<GrammarId> {
        let events = self.attribute_wildcard_events(wildcard)?;
        self.with_attribute_events(grammar, &events)
    }

    fn attribute_wildcard_events(&mut self, wildcard: &AttributeWildcard) -> Result<Vec<Event>> {
        match wildcard {
            AttributeWildcard::Any | AttributeWildcard::Not(_) => Ok(vec![Event::AttributeAny]),
            AttributeWildcard::Namespaces(namespaces) => {
                if namespaces.is_empty() {
                    return Err(Error::EmptyNamespaceList);
                }
                let mut events = Vec::new();
                events.try_reserve(namespaces.len())?;
                for ns in namespaces {
                    events.push(Event::AttributeNs(self.register_uri(ns)?));
                }
                Ok(events)
            }
        }
    }

    fn with_attribute_events(&mut self, grammar: GrammarId, events: &[Event]) -> Result<GrammarId> {
        self.derive(grammar, |g| {
            let rule0 = g
                .rules_mut()
                .first_mut()
                .ok_or_else(|| missing_start_rule(grammar))?;
            for &event in events {
                rule0.add_production(Production::new(event, NonTermId::Rule(0)))?;
            }
            Ok(())
        })
    }

    /// Ur-Type (`xs:anyType`).
    ///
    /// ```text
    /// rule0 {AT(*) → 0, SE(*) → 1, EE, CH → 1}
    /// rule1 {SE(*) → 1, EE, CH → 1}
    /// ```
    pub fn complex_ur_type(&mut self) -> Result<GrammarId> {
        let rule0 = Rule::with_productions(
            0,
            vec![
                Production::new(Event::AttributeAny, NonTermId::Rule(0)),
                Production::new(Event::StartElementAny, NonTermId::Rule(1)),
                Production::end_element(),
                Production::new(Event::CharactersUntyped, NonTermId::Rule(1)),
            ],
        );
        let rule1 = Rule::with_productions(
            1,
            vec![
                Production::new(Event::StartElementAny, NonTermId::Rule(1)),
                Production::end_element(),
                Production::new(Event::CharactersUntyped, NonTermId::Rule(1)),
            ],
        );
        self.insert(Grammar::from_rules(vec![rule0, rule1]))
    }

    /// `rule0 {AT(*) → 0, EE}`
    pub fn complex_ur_empty_type(&mut self) -> Result<GrammarId> {
        self.insert(Grammar::from_rules(vec![Rule::with_productions(
            0,
            vec![
                Production::new(Event::AttributeAny, NonTermId::Rule(0)),
                Production::end_element(),
            ],
        )]))
    }

    // ========================================================================
    // Particles
    // ========================================================================

    /// Wiederholung eines Terms.
    ///
    /// - `min` Pflichtkopien
    /// - endliches `max`: `max - min` optionale Kopien (EE-Escape in rule0)
    /// - `unbounded`: eine optionale Kopie als Self-Loop
    ///
    /// `(1, 1)` liefert den Term selbst, `max == 0` den leeren Content.
    ///
    /// # Fehler
    ///
    /// - `Error::InvalidParticleOccurs` wenn `max < min`.
    /// - `Error::OutOfBoundBuffer` wenn mehr als [`MAX_PARTICLE_COPIES`]
    ///   Kopien ausgerollt wuerden.
    pub fn particle(&mut self, min: usize, max: MaxOccurs, term: GrammarId) -> Result<GrammarId> {
        self.grammar(term)?;
        match max {
            MaxOccurs::Bounded(max) if max < min => {
                return Err(Error::InvalidParticleOccurs { min, max });
            }
            MaxOccurs::Bounded(0) => return self.simple_empty_type(),
            MaxOccurs::Bounded(1) if min == 1 => return Ok(term),
            _ => {}
        }
        let copies = match max {
            MaxOccurs::Bounded(max) => max,
            MaxOccurs::Unbounded => min.saturating_add(1),
        };
        if copies > MAX_PARTICLE_COPIES {
            return Err(Error::OutOfBoundBuffer {
                index: copies,
                len: MAX_PARTICLE_COPIES,
            });
        }

        let mut segments = Vec::new();
        segments.try_reserve(min + 1)?;
        segments.extend(core::iter::repeat_n(term, min));

        match max {
            MaxOccurs::Bounded(max) if max > min => {
                let optional = self.with_escape(term)?;
                segments.try_reserve(max - min)?;
                segments.extend(core::iter::repeat_n(optional, max - min));
            }
            MaxOccurs::Unbounded => {
                let optional = self.with_escape(term)?;
                segments.push(self.self_loop(optional)?);
            }
            MaxOccurs::Bounded(_) => {}
        }

        match segments.as_slice() {
            [single] => Ok(*single),
            _ => self.concatenate_all(&segments),
        }
    }

    /// Term mit EE-Escape in rule0 (unveraendert wenn schon vorhanden).
    fn with_escape(&mut self, term: GrammarId) -> Result<GrammarId> {
        let rule0 = self
            .grammar(term)?
            .rule(0)
            .ok_or_else(|| missing_start_rule(term))?;
        if rule0.has_end_element() {
            return Ok(term);
        }
        self.derive(term, |g| {
            let rule0 = g.rules_mut().first_mut().ok_or_else(|| missing_start_rule(term))?;
            rule0.add_production(Production::end_element())
        })
    }

    /// Self-Loop: terminale EEs in allen Rules ausser rule0 werden `ε → 0`.
    fn self_loop(&mut self, term: GrammarId) -> Result<GrammarId> {
        self.derive(term, |g| {
            for rule in g.rules_mut().iter_mut().skip(1) {
                redirect_end_elements(rule, Production::epsilon(0));
            }
            Ok(())
        })
    }

    // ========================================================================
    // Model Groups
    // ========================================================================

    /// Sequence: Konkatenation in Deklarationsreihenfolge.
    pub fn sequence(&mut self, terms: &[GrammarId]) -> Result<GrammarId> {
        match terms {
            [] => self.simple_empty_type(),
            [single] => {
                self.grammar(*single)?;
                Ok(*single)
            }
            _ => self.concatenate_all(terms),
        }
    }

    /// Choice.
    ///
    /// rule0 enthaelt ein `ε` zur rule0 jeder Alternative; die Alternativen
    /// folgen mit eigener Fortsetzung und eigenem EE.
    pub fn choice(&mut self, terms: &[GrammarId]) -> Result<GrammarId> {
        if terms.is_empty() {
            return self.insert(end_element_grammar());
        }
        let mut start = Rule::new(0);
        let mut offset = 1u32;
        let mut total = 1usize;
        for &id in terms {
            let count = self.grammar(id)?.rule_count_u32()?;
            start.add_production(Production::epsilon(offset))?;
            offset += count;
            total += count as usize;
        }

        let mut out = Grammar::with_capacity(total)?;
        out.push_rule(start)?;
        for &id in terms {
            let offset = out.rule_count_u32()?;
            for rule in self.grammar(id)?.rules() {
                out.push_rule(rule.shifted(offset)?)?;
            }
        }
        self.insert(out)
    }

    /// All-Group: jeder Term in beliebiger Reihenfolge.
    ///
    /// rule0 `{EE, ε → Term_i ...}`; das Ende jedes Terms fuehrt per `ε` zurueck
    /// zu rule0.
    pub fn all(&mut self, terms: &[GrammarId]) -> Result<GrammarId> {
        let mut start = Rule::new(0);
        start.add_production(Production::end_element())?;
        let mut offset = 1u32;
        let mut total = 1usize;
        for &id in terms {
            let count = self.grammar(id)?.rule_count_u32()?;
            start.add_production(Production::epsilon(offset))?;
            offset += count;
            total += count as usize;
        }

        let mut out = Grammar::with_capacity(total)?;
        out.push_rule(start)?;
        for &id in terms {
            let offset = out.rule_count_u32()?;
            for rule in self.grammar(id)?.rules() {
                let mut copy = rule.shifted(offset)?;
                redirect_end_elements(&mut copy, Production::epsilon(0));
                out.push_rule(copy)?;
            }
        }
        self.insert(out)
    }

    /// Mixed Content: `CH[untyped] → i` in jeder Rule `i`.
    pub fn mixed_content(&mut self, content: GrammarId) -> Result<GrammarId> {
        self.derive(content, |g| {
            for rule in g.rules_mut() {
                let id = rule.id();
                rule.add_production(Production::new(Event::CharactersUntyped, NonTermId::Rule(id)))?;
            }
            Ok(())
        })
    }

    /// Element-Grammar: neu nummerierte Kopie der Typ-Grammar.
    pub fn element_grammar(&mut self, type_grammar: GrammarId) -> Result<GrammarId> {
        self.derive(type_grammar, |g| {
            g.renumber();
            Ok(())
        })
    }
}
