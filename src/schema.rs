//! Schema-Datenmodell als Eingabe der Grammar-Kompilierung.
//!
//! Das Modell ist bereits geparst: Namen, Occurrence-Grenzen und die
//! eingebauten Basistypen einfacher Typen liegen fertig vor. XML- oder
//! XSD-Text wird hier nicht verarbeitet.

use std::rc::Rc;

use crate::Result;
use crate::qname::QName;

// ============================================================================
// Simple Type Variety
// ============================================================================

/// Variety eines Simple Types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SimpleTypeVariety {
    #[default]
    Atomic,
    /// Whitespace-separierte Liste.
    List { item_type: Option<Rc<QName>> },
    Union { member_types: Vec<Rc<QName>> },
}

// ============================================================================
// Type Definition
// ============================================================================

/// Type-Definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    /// Simple Type: nur CH-Content.
    Simple {
        /// Some fuer benannte Typen, None fuer anonyme.
        name: Option<Rc<QName>>,
        variety: SimpleTypeVariety,
        /// Local-Name des eingebauten XSD-Basistyps (z.B. "int").
        base_type: Rc<str>,
    },
    /// Complex Type: Attribute + Content.
    Complex {
        name: Option<Rc<QName>>,
        /// Attribute Uses in Deklarationsreihenfolge.
        attributes: Vec<AttributeUse>,
        attribute_wildcard: Option<AttributeWildcard>,
        content: ContentType,
    },
}

impl TypeDefinition {
    pub fn name(&self) -> Option<&Rc<QName>> {
        match self {
            Self::Simple { name, .. } | Self::Complex { name, .. } => name.as_ref(),
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Simple { .. })
    }

    /// Anonymer atomarer Simple Type mit eingebautem Basistyp.
    pub fn simple(base_type: impl Into<Rc<str>>) -> Self {
        Self::Simple {
            name: None,
            variety: SimpleTypeVariety::Atomic,
            base_type: base_type.into(),
        }
    }

    /// Anonymer Complex Type.
    pub fn complex(attributes: Vec<AttributeUse>, content: ContentType) -> Self {
        Self::Complex {
            name: None,
            attributes,
            attribute_wildcard: None,
            content,
        }
    }

    /// Setzt den Namen (benannter Typ).
    pub fn with_name(mut self, qname: QName) -> Self {
        match &mut self {
            Self::Simple { name, .. } | Self::Complex { name, .. } => {
                *name = Some(Rc::new(qname));
            }
        }
        self
    }

    /// Setzt die Attribute Wildcard (nur Complex Types).
    pub fn with_attribute_wildcard(mut self, wildcard: AttributeWildcard) -> Self {
        if let Self::Complex {
            attribute_wildcard, ..
        } = &mut self
        {
            *attribute_wildcard = Some(wildcard);
        }
        self
    }
}

// ============================================================================
// Attribute Use
// ============================================================================

/// Attribute Use eines Complex Types.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUse {
    pub qname: Rc<QName>,
    pub required: bool,
    /// Local-Name des eingebauten XSD-Basistyps des Attributwerts.
    pub base_type: Rc<str>,
}

impl AttributeUse {
    pub fn new(qname: QName, required: bool, base_type: impl Into<Rc<str>>) -> Self {
        Self {
            qname: Rc::new(qname),
            required,
            base_type: base_type.into(),
        }
    }
}

// ============================================================================
// Attribute Wildcard
// ============================================================================

/// Attribute Wildcard (`xs:anyAttribute`).
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeWildcard {
    /// ##any
    Any,
    /// ##other bzw. not(namespace); EXI hat dafuer nur AT(*).
    Not(Option<String>),
    /// Explizite Namespace-Liste ("" = kein Namespace).
    Namespaces(Vec<String>),
}

// ============================================================================
// Content Type
// ============================================================================

/// Content Type eines Complex Types.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentType {
    Empty,
    /// Simple Content mit eingebautem Basistyp.
    Simple(Rc<str>),
    ElementOnly(Particle),
    Mixed(Particle),
}

// ============================================================================
// MaxOccurs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(usize),
    Unbounded,
}

// ============================================================================
// Wildcard
// ============================================================================

/// Namespace-Constraint einer Element-Wildcard.
#[derive(Debug, Clone, PartialEq)]
pub enum WildcardConstraint {
    Any,
    Not(Option<String>),
    Namespaces(Vec<String>),
}

/// Element-Wildcard (`xs:any`).
#[derive(Debug, Clone, PartialEq)]
pub struct Wildcard {
    pub constraint: WildcardConstraint,
}

impl Wildcard {
    pub fn new(constraint: WildcardConstraint) -> Self {
        Self { constraint }
    }

    /// `##any`.
    pub fn any() -> Self {
        Self::new(WildcardConstraint::Any)
    }
}

// ============================================================================
// ElementDeclaration
// ============================================================================

/// Element-Deklaration.
///
/// Ohne Type-Definition gilt der Ur-Type (`xs:anyType`).
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDeclaration {
    pub qname: Rc<QName>,
    /// Mitglieder der Substitution Group (ohne das Element selbst).
    pub substitution_group: Vec<Rc<QName>>,
    pub type_definition: Option<Rc<TypeDefinition>>,
}

impl ElementDeclaration {
    pub fn new(qname: QName) -> Self {
        Self {
            qname: Rc::new(qname),
            substitution_group: Vec::new(),
            type_definition: None,
        }
    }

    pub fn with_type(mut self, type_def: Rc<TypeDefinition>) -> Self {
        self.type_definition = Some(type_def);
        self
    }

    pub fn with_substitution_group(mut self, members: Vec<QName>) -> Self {
        self.substitution_group = members.into_iter().map(Rc::new).collect();
        self
    }
}

// ============================================================================
// Model Group
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    Sequence,
    Choice,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelGroup {
    pub compositor: Compositor,
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    pub fn new(compositor: Compositor, particles: Vec<Particle>) -> Self {
        Self {
            compositor,
            particles,
        }
    }

    pub fn sequence(particles: Vec<Particle>) -> Self {
        Self::new(Compositor::Sequence, particles)
    }

    pub fn choice(particles: Vec<Particle>) -> Self {
        Self::new(Compositor::Choice, particles)
    }

    pub fn all(particles: Vec<Particle>) -> Self {
        Self::new(Compositor::All, particles)
    }
}

// ============================================================================
// Particle
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ParticleTerm {
    Element(ElementDeclaration),
    Wildcard(Wildcard),
    ModelGroup(ModelGroup),
}

/// Term mit Wiederholungsgrenzen.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub min_occurs: usize,
    pub max_occurs: MaxOccurs,
    pub term: ParticleTerm,
}

impl Particle {
    /// Erstellt ein Particle mit Validierung.
    ///
    /// # Fehler
    ///
    /// - `Error::InvalidParticleOccurs` wenn max < min
    pub fn new(min_occurs: usize, max_occurs: MaxOccurs, term: ParticleTerm) -> Result<Self> {
        let p = Self::new_unchecked(min_occurs, max_occurs, term);
        p.validate()?;
        Ok(p)
    }

    /// Ohne Validierung; die Kompilierung prueft die Grenzen erneut.
    pub fn new_unchecked(min_occurs: usize, max_occurs: MaxOccurs, term: ParticleTerm) -> Self {
        Self {
            min_occurs,
            max_occurs,
            term,
        }
    }

    pub fn once(term: ParticleTerm) -> Self {
        Self::new_unchecked(1, MaxOccurs::Bounded(1), term)
    }

    pub fn optional(term: ParticleTerm) -> Self {
        Self::new_unchecked(0, MaxOccurs::Bounded(1), term)
    }

    pub fn zero_or_more(term: ParticleTerm) -> Self {
        Self::new_unchecked(0, MaxOccurs::Unbounded, term)
    }

    pub fn one_or_more(term: ParticleTerm) -> Self {
        Self::new_unchecked(1, MaxOccurs::Unbounded, term)
    }

    /// # Fehler
    ///
    /// - `Error::InvalidParticleOccurs` wenn max < min
    pub fn validate(&self) -> Result<()> {
        match self.max_occurs {
            MaxOccurs::Bounded(max) if max < self.min_occurs => {
                Err(crate::Error::InvalidParticleOccurs {
                    min: self.min_occurs,
                    max,
                })
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SchemaInfo
// ============================================================================

/// Kompilierbares Schema: benannte Typen und globale Elemente.
///
/// ```
/// use std::rc::Rc;
/// use exigram::qname::QName;
/// use exigram::schema::{ElementDeclaration, SchemaInfo, TypeDefinition};
///
/// let price = Rc::new(TypeDefinition::simple("decimal").with_name(QName::new("urn:shop", "Price")));
/// let schema = SchemaInfo::builder()
///     .type_definition(Rc::clone(&price))
///     .global_element(ElementDeclaration::new(QName::new("urn:shop", "price")).with_type(price))
///     .build();
/// assert_eq!(schema.type_definitions().len(), 1);
/// assert_eq!(schema.global_elements().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaInfo {
    /// Benannte Typen in Deklarationsreihenfolge.
    type_definitions: Vec<Rc<TypeDefinition>>,
    /// Globale Elemente in Deklarationsreihenfolge.
    global_elements: Vec<Rc<ElementDeclaration>>,
}

impl SchemaInfo {
    pub fn builder() -> SchemaInfoBuilder {
        SchemaInfoBuilder::default()
    }

    pub fn type_definitions(&self) -> &[Rc<TypeDefinition>] {
        &self.type_definitions
    }

    pub fn global_elements(&self) -> &[Rc<ElementDeclaration>] {
        &self.global_elements
    }

    /// Benannter Typ nach QName.
    pub fn get_type(&self, qname: &QName) -> Option<&Rc<TypeDefinition>> {
        self.type_definitions
            .iter()
            .find(|t| t.name().is_some_and(|n| **n == *qname))
    }
}

/// Builder fuer [`SchemaInfo`].
#[derive(Debug, Default)]
pub struct SchemaInfoBuilder {
    type_definitions: Vec<Rc<TypeDefinition>>,
    global_elements: Vec<Rc<ElementDeclaration>>,
}

impl SchemaInfoBuilder {
    /// Fuegt einen benannten Typ hinzu. Anonyme Typen werden ignoriert.
    pub fn type_definition(mut self, def: Rc<TypeDefinition>) -> Self {
        if def.name().is_some() {
            self.type_definitions.push(def);
        }
        self
    }

    pub fn global_element(mut self, decl: ElementDeclaration) -> Self {
        self.global_elements.push(Rc::new(decl));
        self
    }

    pub fn build(self) -> SchemaInfo {
        SchemaInfo {
            type_definitions: self.type_definitions,
            global_elements: self.global_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn elem(local: &str) -> ParticleTerm {
        ParticleTerm::Element(ElementDeclaration::new(QName::new("", local)))
    }

    #[test]
    fn particle_validation() {
        assert!(Particle::new(1, MaxOccurs::Bounded(3), elem("a")).is_ok());
        assert!(Particle::new(2, MaxOccurs::Unbounded, elem("a")).is_ok());
        let err = Particle::new(3, MaxOccurs::Bounded(1), elem("a")).unwrap_err();
        assert_eq!(err, Error::InvalidParticleOccurs { min: 3, max: 1 });
    }

    #[test]
    fn particle_shorthands() {
        assert_eq!(Particle::once(elem("a")).min_occurs, 1);
        assert_eq!(Particle::optional(elem("a")).max_occurs, MaxOccurs::Bounded(1));
        assert_eq!(Particle::zero_or_more(elem("a")).max_occurs, MaxOccurs::Unbounded);
        assert_eq!(Particle::one_or_more(elem("a")).min_occurs, 1);
    }

    #[test]
    fn type_definition_builders() {
        let t = TypeDefinition::complex(Vec::new(), ContentType::Empty)
            .with_name(QName::new("urn:a", "T"))
            .with_attribute_wildcard(AttributeWildcard::Any);
        assert_eq!(t.name().map(|n| &*n.local_name), Some("T"));
        assert!(!t.is_simple());
        match t {
            TypeDefinition::Complex {
                attribute_wildcard, ..
            } => assert_eq!(attribute_wildcard, Some(AttributeWildcard::Any)),
            TypeDefinition::Simple { .. } => panic!("complex erwartet"),
        }
    }

    #[test]
    fn builder_skips_anonymous_types() {
        let schema = SchemaInfo::builder()
            .type_definition(Rc::new(TypeDefinition::simple("int")))
            .type_definition(Rc::new(
                TypeDefinition::simple("int").with_name(QName::new("", "Count")),
            ))
            .build();
        assert_eq!(schema.type_definitions().len(), 1);
        assert!(schema.get_type(&QName::new("", "Count")).is_some());
        assert!(schema.get_type(&QName::new("", "Other")).is_none());
    }
}
