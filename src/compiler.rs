//! Compile-Kontext und Treiber der Schema-Kompilierung.
//!
//! Der [`SchemaCompiler`] besitzt die Arena aller Grammars (`Vec<Grammar>`,
//! indiziert ueber [`GrammarId`]), die Meta-String-Tabellen, die Queue der
//! verzoegerten Referenzen und einen Arbeits-Stack fuer die Komposition.
//! Grammars in der Arena sind unveraenderlich: jede Ableitung legt einen
//! neuen Eintrag an.
//!
//! Ablauf:
//!
//! ```text
//! SchemaInfo → compile_type / compile_element (bottom-up)
//!            → finish(): Kanonisierung → CompiledSchema
//! ```
//!
//! Bei einem Fehler wird der Kontext verworfen, es gibt kein Teil-Schema.

use std::rc::Rc;

use log::{debug, warn};

use crate::canonical::{self, DeferredRef, ElementEntry, GlobalElementIndex};
use crate::grammar::{Grammar, GrammarId, ProductionAddress, QNameRef};
use crate::hash::composite64;
use crate::options::CompileOptions;
use crate::qname::QName;
use crate::schema::{
    AttributeUse, Compositor, ContentType, ElementDeclaration, Particle, ParticleTerm,
    SchemaInfo, SimpleTypeVariety, TypeDefinition,
};
use crate::string::SchemaString;
use crate::string_table::{UriTable, create_initial_meta_tables};
use crate::{Error, FastHashMap, FastIndexMap, Result};

// ============================================================================
// GrammarStack
// ============================================================================

/// Arbeits-Stack der Komposition (nicht Teil des fertigen Schemas).
#[derive(Debug, Default)]
pub(crate) struct GrammarStack {
    items: Vec<GrammarId>,
}

impl GrammarStack {
    pub(crate) fn push(&mut self, id: GrammarId) -> Result<()> {
        self.items.try_reserve(1)?;
        self.items.push(id);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<GrammarId> {
        self.items
            .pop()
            .ok_or(Error::OutOfBoundBuffer { index: 0, len: 0 })
    }

    /// Nimmt die obersten `n` Eintraege in Push-Reihenfolge.
    pub(crate) fn pop_n(&mut self, n: usize) -> Result<Vec<GrammarId>> {
        let len = self.items.len();
        if n > len {
            return Err(Error::OutOfBoundBuffer { index: n, len });
        }
        Ok(self.items.split_off(len - n))
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

// ============================================================================
// TypeGrammars
// ============================================================================

/// Grammar-Paar eines Typs: `Type` und `TypeEmpty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeGrammars {
    pub grammar: GrammarId,
    pub empty: GrammarId,
}

// ============================================================================
// SchemaCompiler
// ============================================================================

/// Compile-Kontext.
///
/// Die Konstruktions-Operationen (`concatenate`, `particle`, ...) liegen in
/// [`crate::proto_grammar`].
#[derive(Debug)]
pub struct SchemaCompiler {
    pub(crate) grammars: Vec<Grammar>,
    pub(crate) meta_uris: UriTable,
    pub(crate) deferred: Vec<DeferredRef>,
    pub(crate) stack: GrammarStack,
    options: CompileOptions,
    types: FastIndexMap<QName, TypeGrammars>,
    /// Benannte Typen, deren Kompilierung gerade laeuft.
    active: Vec<Rc<QName>>,
    /// Ur-Type-Grammar, einmal gebaut.
    ur_type: Option<GrammarId>,
    globals: Vec<(QNameRef, GrammarId)>,
    locals: Vec<(QNameRef, GrammarId)>,
    /// (Element, Typ-Grammar) → Element-Grammar.
    local_grammars: FastHashMap<(QNameRef, GrammarId), GrammarId>,
    /// Lokale Elemente mit rekursivem Typ, aufgeloest in `finish()`.
    pending_locals: Vec<(QNameRef, Rc<TypeDefinition>)>,
}

impl SchemaCompiler {
    /// Neuer Kontext mit den reservierten Meta-Tabellen.
    pub fn new() -> Result<Self> {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Result<Self> {
        Ok(Self {
            grammars: Vec::new(),
            meta_uris: create_initial_meta_tables()?,
            deferred: Vec::new(),
            stack: GrammarStack::default(),
            options,
            types: FastIndexMap::default(),
            active: Vec::new(),
            ur_type: None,
            globals: Vec::new(),
            locals: Vec::new(),
            local_grammars: FastHashMap::default(),
            pending_locals: Vec::new(),
        })
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Grammar aus der Arena.
    ///
    /// # Fehler
    ///
    /// `Error::NullPointerRef` fuer eine unbekannte ID.
    pub fn grammar(&self, id: GrammarId) -> Result<&Grammar> {
        self.grammars
            .get(id.index())
            .ok_or_else(|| Error::null_ref(format!("unknown grammar {id}")))
    }

    pub fn grammar_count(&self) -> usize {
        self.grammars.len()
    }

    /// Meta-URI-Tabelle in Einfuegereihenfolge.
    pub fn meta_uri_table(&self) -> &UriTable {
        &self.meta_uris
    }

    /// Verzoegerte Referenzen (eine pro name-tragender Production in der Arena).
    pub fn deferred_refs(&self) -> &[DeferredRef] {
        &self.deferred
    }

    /// Legt eine Grammar in der Arena ab.
    ///
    /// Fuer jede name-tragende Production wird eine verzoegerte Referenz
    /// eingereiht, auch fuer Kopien.
    pub(crate) fn insert(&mut self, grammar: Grammar) -> Result<GrammarId> {
        let id = GrammarId(u32::try_from(self.grammars.len()).map_err(|_| Error::MemoryAllocation)?);
        for (rule, production, p) in grammar.productions() {
            let Some(uri) = p.event.uri() else {
                continue;
            };
            self.deferred.try_reserve(1)?;
            self.deferred.push(DeferredRef {
                address: ProductionAddress {
                    grammar: id,
                    rule,
                    production,
                },
                uri,
                ln: p.event.qname().map(|q| q.ln),
            });
        }
        self.grammars.try_reserve(1)?;
        self.grammars.push(grammar);
        Ok(id)
    }

    /// Registriert eine URI in der Meta-Tabelle (Lookup, sonst Append).
    pub(crate) fn register_uri(&mut self, ns: &str) -> Result<u32> {
        match self.meta_uris.lookup_uri(ns) {
            Some(id) => Ok(id),
            None => self.meta_uris.add_uri_row(SchemaString::from_ascii(ns)?),
        }
    }

    /// Registriert (ns, local) in den Meta-Tabellen.
    pub(crate) fn register_qname(&mut self, ns: &str, local_name: &str) -> Result<QNameRef> {
        let uri = self.register_uri(ns)?;
        let ln_table = self.meta_uris.ensure_ln_table(uri)?;
        let ln = match ln_table.lookup_ln(local_name) {
            Some(id) => id,
            None => ln_table.add_ln_row(SchemaString::from_ascii(local_name)?)?,
        };
        Ok(QNameRef::new(uri, ln))
    }

    /// Registriert ein globales Element mit seiner Grammar.
    pub fn register_global_element(
        &mut self,
        ns: &str,
        local_name: &str,
        grammar: GrammarId,
    ) -> Result<()> {
        self.grammar(grammar)?;
        let qname = self.register_qname(ns, local_name)?;
        self.globals.try_reserve(1)?;
        self.globals.push((qname, grammar));
        Ok(())
    }

    /// Registriert ein lokales Element; je (Element, Typ-Grammar) entsteht
    /// nur eine Element-Grammar.
    pub fn register_local_element(
        &mut self,
        qname: QNameRef,
        type_grammar: GrammarId,
    ) -> Result<GrammarId> {
        if let Some(&done) = self.local_grammars.get(&(qname, type_grammar)) {
            return Ok(done);
        }
        let grammar = self.element_grammar(type_grammar)?;
        self.local_grammars
            .try_reserve(1)
            .map_err(|_| Error::MemoryAllocation)?;
        self.local_grammars.insert((qname, type_grammar), grammar);
        self.locals.try_reserve(1)?;
        self.locals.push((qname, grammar));
        Ok(grammar)
    }

    /// Registriert die Grammars eines benannten Typs.
    pub fn register_type(&mut self, name: QName, grammars: TypeGrammars) -> Result<()> {
        self.grammar(grammars.grammar)?;
        self.grammar(grammars.empty)?;
        self.types.try_reserve(1).map_err(|_| Error::MemoryAllocation)?;
        self.types.insert(name, grammars);
        Ok(())
    }

    // ========================================================================
    // Treiber
    // ========================================================================

    /// Kompiliert einen Typ; benannte Typen nur einmal.
    ///
    /// # Fehler
    ///
    /// `Error::InconsistentProcState` wenn ein benannter Typ waehrend seiner
    /// eigenen Kompilierung erneut angefordert wird.
    pub fn compile_type(&mut self, def: &TypeDefinition) -> Result<TypeGrammars> {
        let Some(name) = def.name() else {
            return self.build_type(def);
        };
        if let Some(done) = self.types.get(&**name) {
            return Ok(*done);
        }
        if self.active.contains(name) {
            return Err(Error::inconsistent(format!("type {name} requested while compiling it")));
        }

        self.active.try_reserve(1)?;
        self.active.push(Rc::clone(name));
        let built = self.build_type(def);
        self.active.pop();
        let grammars = built?;
        self.register_type((**name).clone(), grammars)?;
        Ok(grammars)
    }

    fn build_type(&mut self, def: &TypeDefinition) -> Result<TypeGrammars> {
        let grammars = match def {
            TypeDefinition::Simple {
                variety, base_type, ..
            } => match variety {
                SimpleTypeVariety::Atomic => TypeGrammars {
                    grammar: self.simple_type(base_type)?,
                    empty: self.simple_empty_type()?,
                },
                SimpleTypeVariety::List { .. } => {
                    return Err(Error::not_implemented("xs:list simple types"));
                }
                SimpleTypeVariety::Union { .. } => {
                    return Err(Error::not_implemented("xs:union simple types"));
                }
            },
            TypeDefinition::Complex {
                attributes,
                attribute_wildcard,
                content,
                ..
            } => {
                let mut uses: Vec<&AttributeUse> = attributes.iter().collect();
                if self.options.sort_attributes {
                    uses.sort_by(|a, b| {
                        a.qname
                            .local_name
                            .cmp(&b.qname.local_name)
                            .then_with(|| a.qname.uri.cmp(&b.qname.uri))
                    });
                }
                let mut attr_grammars = Vec::with_capacity(uses.len());
                for attr in uses {
                    attr_grammars.push(self.attribute_use(
                        attr.required,
                        &attr.qname.local_name,
                        &attr.qname.uri,
                        &attr.base_type,
                    )?);
                }

                let content_grammar = match content {
                    ContentType::Empty => self.simple_empty_type()?,
                    ContentType::Simple(base_type) => self.simple_type(base_type)?,
                    ContentType::ElementOnly(particle) => {
                        self.compile_particle(particle)?;
                        self.stack.pop()?
                    }
                    ContentType::Mixed(particle) => {
                        self.compile_particle(particle)?;
                        let content = self.stack.pop()?;
                        self.mixed_content(content)?
                    }
                };

                let wildcard = attribute_wildcard.as_ref();
                TypeGrammars {
                    grammar: self.complex_type(&attr_grammars, wildcard, content_grammar)?,
                    empty: self.complex_empty_type(&attr_grammars, wildcard)?,
                }
            }
        };

        Ok(grammars)
    }

    /// Ur-Type-Grammar (`xs:anyType`), in der Arena geteilt.
    fn ur_type_grammar(&mut self) -> Result<GrammarId> {
        if let Some(id) = self.ur_type {
            return Ok(id);
        }
        let id = self.complex_ur_type()?;
        self.ur_type = Some(id);
        Ok(id)
    }

    /// Kompiliert ein Particle und legt das Ergebnis auf den Stack.
    fn compile_particle(&mut self, particle: &Particle) -> Result<()> {
        match &particle.term {
            ParticleTerm::Element(decl) => {
                if !decl.substitution_group.is_empty() {
                    return Err(Error::not_implemented("substitution groups"));
                }
                let qname = self.register_qname(&decl.qname.uri, &decl.qname.local_name)?;
                match &decl.type_definition {
                    // Rekursion ueber einen benannten Typ: nach dem Walk aufloesen
                    Some(def) if def.name().is_some_and(|n| self.active.contains(n)) => {
                        self.pending_locals.try_reserve(1)?;
                        self.pending_locals.push((qname, Rc::clone(def)));
                    }
                    Some(def) => {
                        let type_grammar = self.compile_type(def)?.grammar;
                        self.register_local_element(qname, type_grammar)?;
                    }
                    None => {
                        let type_grammar = self.ur_type_grammar()?;
                        self.register_local_element(qname, type_grammar)?;
                    }
                }
                let term = self.element_term(&decl.qname.local_name, &decl.qname.uri)?;
                self.stack.push(term)?;
            }
            ParticleTerm::Wildcard(wildcard) => {
                let term = self.wildcard_term(&wildcard.constraint)?;
                self.stack.push(term)?;
            }
            ParticleTerm::ModelGroup(group) => {
                for child in &group.particles {
                    self.compile_particle(child)?;
                }
                let terms = self.stack.pop_n(group.particles.len())?;
                let term = match group.compositor {
                    Compositor::Sequence => self.sequence(&terms)?,
                    Compositor::Choice => self.choice(&terms)?,
                    Compositor::All => self.all(&terms)?,
                };
                self.stack.push(term)?;
            }
        }

        let term = self.stack.pop()?;
        let grammar = self.particle(particle.min_occurs, particle.max_occurs, term)?;
        self.stack.push(grammar)
    }

    /// Element-Grammar einer Deklaration (Ur-Type wenn ohne Typ).
    pub fn compile_element(&mut self, decl: &ElementDeclaration) -> Result<GrammarId> {
        let type_grammar = match &decl.type_definition {
            Some(def) => self.compile_type(def)?.grammar,
            None => self.ur_type_grammar()?,
        };
        self.element_grammar(type_grammar)
    }

    /// Loest lokale Elemente mit rekursivem Typ auf; der Typ ist jetzt fertig.
    fn resolve_pending_locals(&mut self) -> Result<()> {
        for (qname, def) in core::mem::take(&mut self.pending_locals) {
            let what = match def.name() {
                Some(name) => format!("local element of type {name}"),
                None => "local element".to_owned(),
            };
            self.run_skippable(&what, |c| {
                let type_grammar = c.compile_type(&def)?.grammar;
                c.register_local_element(qname, type_grammar)
            })?;
        }
        Ok(())
    }

    /// Fuehrt `step` aus; bei `NotImplementedYet` und `skip_unsupported`
    /// wird gewarnt und der Stack zurueckgesetzt.
    fn run_skippable<T>(
        &mut self,
        what: &dyn core::fmt::Display,
        step: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<T>> {
        let depth = self.stack.len();
        match step(self) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_implemented() && self.options.skip_unsupported => {
                warn!("skipping {what}: {e}");
                self.stack.truncate(depth);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Kanonisiert die Tabellen und uebergibt die Arena an das Schema.
    pub fn finish(mut self) -> Result<CompiledSchema> {
        self.resolve_pending_locals()?;
        let Self {
            mut grammars,
            meta_uris,
            deferred,
            stack,
            types,
            globals,
            locals,
            ..
        } = self;

        if stack.len() != 0 {
            return Err(Error::inconsistent(format!(
                "{} grammars left on the work stack",
                stack.len()
            )));
        }

        let sorted = canonical::sort_string_tables(meta_uris, deferred, &mut grammars)?;
        let global_elements =
            canonical::sort_global_elements(globals, &sorted.mapping, &sorted.uri_table)?;
        let local_elements = canonical::sort_elements(locals, &sorted.mapping, &sorted.uri_table)?;

        let mut element_grammars = FastHashMap::default();
        element_grammars
            .try_reserve(global_elements.len())
            .map_err(|_| Error::MemoryAllocation)?;
        for e in global_elements.iter() {
            element_grammars.insert(composite64(e.qname.uri, e.qname.ln), e.grammar);
        }

        debug!(
            "compiled schema: {} grammars, {} named types, {} global elements, {} local elements",
            grammars.len(),
            types.len(),
            global_elements.len(),
            local_elements.len()
        );

        Ok(CompiledSchema {
            grammars,
            uri_table: sorted.uri_table,
            global_elements,
            local_elements,
            types,
            element_grammars,
        })
    }
}

// ============================================================================
// Einstiegspunkte
// ============================================================================

/// Kompiliert ein Schema mit Default-Optionen.
pub fn compile(schema: &SchemaInfo) -> Result<CompiledSchema> {
    compile_with_options(schema, CompileOptions::default())
}

/// Kompiliert ein Schema.
///
/// Benannte Typen in Deklarationsreihenfolge, danach globale Elemente.
pub fn compile_with_options(schema: &SchemaInfo, options: CompileOptions) -> Result<CompiledSchema> {
    let mut compiler = SchemaCompiler::with_options(options)?;

    for def in schema.type_definitions() {
        let what = def
            .name()
            .map(|n| format!("type {n}"))
            .unwrap_or_else(|| "anonymous type".to_owned());
        compiler.run_skippable(&what, |c| c.compile_type(def))?;
    }

    for decl in schema.global_elements() {
        let what = format!("element {}", decl.qname);
        let grammar = compiler.run_skippable(&what, |c| c.compile_element(decl))?;
        if let Some(grammar) = grammar {
            compiler.register_global_element(&decl.qname.uri, &decl.qname.local_name, grammar)?;
        }
    }

    debug!(
        "walked schema: {} arena grammars, {} deferred references",
        compiler.grammar_count(),
        compiler.deferred_refs().len()
    );
    compiler.finish()
}

// ============================================================================
// CompiledSchema
// ============================================================================

/// Fertiges, unveraenderliches Schema.
#[derive(Debug)]
pub struct CompiledSchema {
    grammars: Vec<Grammar>,
    uri_table: UriTable,
    global_elements: GlobalElementIndex,
    local_elements: Vec<ElementEntry>,
    types: FastIndexMap<QName, TypeGrammars>,
    element_grammars: FastHashMap<u64, GrammarId>,
}

impl CompiledSchema {
    pub fn grammar(&self, id: GrammarId) -> Option<&Grammar> {
        self.grammars.get(id.index())
    }

    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    /// Kanonische URI-Tabelle (mit Local-Name- und Prefix-Tabellen).
    pub fn uri_table(&self) -> &UriTable {
        &self.uri_table
    }

    pub fn global_elements(&self) -> &GlobalElementIndex {
        &self.global_elements
    }

    /// Grammars eines benannten Typs.
    pub fn type_grammar(&self, uri: &str, local_name: &str) -> Option<TypeGrammars> {
        self.types.get(&QName::new(uri, local_name)).copied()
    }

    /// Benannte Typen in Deklarationsreihenfolge.
    pub fn type_grammars(&self) -> impl Iterator<Item = (&QName, &TypeGrammars)> + '_ {
        self.types.iter()
    }

    /// Element-Grammar eines globalen Elements nach kanonischen Zeilen-IDs.
    pub fn element_grammar_by_ids(&self, qname: QNameRef) -> Option<GrammarId> {
        self.element_grammars
            .get(&composite64(qname.uri, qname.ln))
            .copied()
    }

    /// Element-Grammar eines globalen Elements nach Namen.
    pub fn element_grammar(&self, uri: &str, local_name: &str) -> Option<GrammarId> {
        self.global_elements
            .lookup(uri, local_name)
            .map(|e: &ElementEntry| e.grammar)
    }

    /// Lokale Elemente, sortiert nach (URI, Local-Name).
    ///
    /// Ein Name kann mehrfach mit verschiedenen Typen vorkommen.
    pub fn local_elements(&self) -> &[ElementEntry] {
        &self.local_elements
    }

    /// Element-Grammars aller lokalen Deklarationen mit diesem Namen.
    pub fn local_element_grammars<'a>(
        &'a self,
        uri: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = GrammarId> + 'a {
        self.local_elements
            .iter()
            .filter(move |e| e.uri.equals_ascii(uri) && e.local_name.equals_ascii(local_name))
            .map(|e| e.grammar)
    }

    /// Strings zu einer kanonischen Zeilen-Referenz.
    pub fn resolve(&self, qname: QNameRef) -> Option<(Rc<str>, Rc<str>)> {
        let uri = self.uri_table.string_at(qname.uri)?;
        let ln = self.uri_table.ln_table(qname.uri)?.string_at(qname.ln)?;
        Some((Rc::from(uri.as_str()), Rc::from(ln.as_str())))
    }
}
