//! JSON-Front-End fuer das Typ-Modell.
//!
//! Liest eine strukturelle Beschreibung (kein XML Schema) in ein
//! [`SchemaInfo`]. Format:
//!
//! ```json
//! {
//!   "types": [
//!     {"name": "Price", "ns": "urn:shop", "kind": "simple", "base": "decimal"},
//!     {"name": "Item", "ns": "urn:shop", "kind": "complex",
//!      "attributes": [{"name": "id", "type": "int", "required": true}],
//!      "content": {"kind": "elementOnly", "particle":
//!        {"sequence": [{"element": {"name": "price", "ns": "urn:shop",
//!                                   "type": "{urn:shop}Price"}}]}}}
//!   ],
//!   "elements": [{"name": "item", "ns": "urn:shop", "type": "{urn:shop}Item"}]
//! }
//! ```
//!
//! Typ-Referenzen sind Clark-Namen. Im XSD-Namespace bezeichnen sie
//! eingebaute Typen (`anyType` = Ur-Type), sonst vorher deklarierte Typen.
//! Ein Element ohne `"type"` hat den Ur-Type.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::qname::QName;
use crate::schema::{
    AttributeUse, AttributeWildcard, ContentType, ElementDeclaration, MaxOccurs, ModelGroup,
    Particle, ParticleTerm, SchemaInfo, SimpleTypeVariety, TypeDefinition, Wildcard,
    WildcardConstraint,
};
use crate::string_table::URI_XSD;
use crate::{Error, FastHashMap, Result};

type Object = Map<String, Value>;

/// Parst ein Typ-Modell aus JSON-Text.
pub fn parse_schema(json: &str) -> Result<SchemaInfo> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| Error::ModelParse(format!("JSON parse error: {e}")))?;
    schema_from_value(&value)
}

/// Parst ein Typ-Modell aus einem bereits gelesenen JSON-Wert.
pub fn schema_from_value(value: &Value) -> Result<SchemaInfo> {
    let root = as_object(value, "document")?;
    let mut reader = ModelReader::default();
    let mut builder = SchemaInfo::builder();

    for item in optional_array(root, "types")? {
        let def = Rc::new(reader.type_definition(as_object(item, "type")?, true)?);
        if let Some(name) = def.name() {
            reader.types.insert((**name).clone(), Rc::clone(&def));
        }
        builder = builder.type_definition(def);
    }

    for item in optional_array(root, "elements")? {
        builder = builder.global_element(reader.element(as_object(item, "element")?)?);
    }

    Ok(builder.build())
}

#[derive(Default)]
struct ModelReader {
    /// Bisher deklarierte benannte Typen.
    types: FastHashMap<QName, Rc<TypeDefinition>>,
}

impl ModelReader {
    fn type_definition(&self, obj: &Object, named: bool) -> Result<TypeDefinition> {
        let kind = required_str(obj, "kind")?;
        let def = match kind {
            "simple" => {
                let base = required_str(obj, "base")?;
                let variety = match optional_str(obj, "variety")?.unwrap_or("atomic") {
                    "atomic" => SimpleTypeVariety::Atomic,
                    "list" => SimpleTypeVariety::List {
                        item_type: optional_str(obj, "itemType")?
                            .map(|t| clark(t).map(Rc::new))
                            .transpose()?,
                    },
                    "union" => {
                        let mut members = Vec::new();
                        for m in optional_array(obj, "memberTypes")? {
                            members.push(Rc::new(clark(as_str(m, "memberTypes")?)?));
                        }
                        SimpleTypeVariety::Union {
                            member_types: members,
                        }
                    }
                    other => {
                        return Err(Error::ModelParse(format!("unknown simple type variety {other:?}")));
                    }
                };
                TypeDefinition::Simple {
                    name: None,
                    variety,
                    base_type: base.into(),
                }
            }
            "complex" => {
                let mut attributes = Vec::new();
                for a in optional_array(obj, "attributes")? {
                    let a = as_object(a, "attribute")?;
                    attributes.push(AttributeUse::new(
                        name_of(a)?,
                        optional_bool(a, "required")?.unwrap_or(false),
                        optional_str(a, "type")?.unwrap_or("string"),
                    ));
                }
                let content = match obj.get("content") {
                    Some(c) => self.content(as_object(c, "content")?)?,
                    None => ContentType::Empty,
                };
                let mut def = TypeDefinition::complex(attributes, content);
                if let Some(w) = obj.get("attributeWildcard") {
                    def = def.with_attribute_wildcard(attribute_wildcard(as_object(
                        w,
                        "attributeWildcard",
                    )?)?);
                }
                def
            }
            other => return Err(Error::ModelParse(format!("unknown type kind {other:?}"))),
        };

        if named {
            Ok(def.with_name(name_of(obj)?))
        } else {
            Ok(def)
        }
    }

    fn content(&self, obj: &Object) -> Result<ContentType> {
        match required_str(obj, "kind")? {
            "empty" => Ok(ContentType::Empty),
            "simple" => Ok(ContentType::Simple(required_str(obj, "type")?.into())),
            "elementOnly" => Ok(ContentType::ElementOnly(self.particle(required_object(
                obj, "particle",
            )?)?)),
            "mixed" => Ok(ContentType::Mixed(self.particle(required_object(obj, "particle")?)?)),
            other => Err(Error::ModelParse(format!("unknown content kind {other:?}"))),
        }
    }

    fn particle(&self, obj: &Object) -> Result<Particle> {
        let min = match obj.get("minOccurs") {
            Some(v) => as_usize(v, "minOccurs")?,
            None => 1,
        };
        let max = match obj.get("maxOccurs") {
            Some(Value::String(s)) if s == "unbounded" => MaxOccurs::Unbounded,
            Some(v) => MaxOccurs::Bounded(as_usize(v, "maxOccurs")?),
            None => MaxOccurs::Bounded(1),
        };

        let term = if let Some(e) = obj.get("element") {
            ParticleTerm::Element(self.element(as_object(e, "element")?)?)
        } else if let Some(w) = obj.get("wildcard") {
            ParticleTerm::Wildcard(Wildcard::new(wildcard_constraint(as_object(w, "wildcard")?)?))
        } else if let Some(v) = obj.get("sequence") {
            ParticleTerm::ModelGroup(ModelGroup::sequence(self.particles(v, "sequence")?))
        } else if let Some(v) = obj.get("choice") {
            ParticleTerm::ModelGroup(ModelGroup::choice(self.particles(v, "choice")?))
        } else if let Some(v) = obj.get("all") {
            ParticleTerm::ModelGroup(ModelGroup::all(self.particles(v, "all")?))
        } else {
            return Err(Error::ModelParse("particle without term".into()));
        };

        Particle::new(min, max, term)
    }

    fn particles(&self, value: &Value, what: &str) -> Result<Vec<Particle>> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::ModelParse(format!("{what} must be an array")))?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.particle(as_object(item, what)?)?);
        }
        Ok(out)
    }

    fn element(&self, obj: &Object) -> Result<ElementDeclaration> {
        let mut decl = ElementDeclaration::new(name_of(obj)?);
        if let Some(t) = self.element_type(obj.get("type"))? {
            decl = decl.with_type(t);
        }
        let mut members = Vec::new();
        for m in optional_array(obj, "substitutionGroup")? {
            members.push(clark(as_str(m, "substitutionGroup")?)?);
        }
        if !members.is_empty() {
            decl = decl.with_substitution_group(members);
        }
        Ok(decl)
    }

    /// `None` = Ur-Type.
    fn element_type(&self, value: Option<&Value>) -> Result<Option<Rc<TypeDefinition>>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(reference)) => self.resolve(reference),
            Some(Value::Object(inline)) => Ok(Some(Rc::new(self.type_definition(inline, false)?))),
            Some(_) => Err(Error::ModelParse("element type must be a name or an object".into())),
        }
    }

    fn resolve(&self, reference: &str) -> Result<Option<Rc<TypeDefinition>>> {
        let qname = clark(reference)?;
        if &*qname.uri == URI_XSD {
            if &*qname.local_name == "anyType" {
                return Ok(None);
            }
            return Ok(Some(Rc::new(TypeDefinition::simple(Rc::clone(&qname.local_name)))));
        }
        self.types
            .get(&qname)
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::ModelParse(format!("unknown type {qname}")))
    }
}

// ============================================================================
// Wildcards
// ============================================================================

fn namespace_list(obj: &Object, what: &str) -> Result<Option<Vec<String>>> {
    match obj.get("namespaces") {
        None => Ok(None),
        Some(v) => {
            let items = v
                .as_array()
                .ok_or_else(|| Error::ModelParse(format!("{what}.namespaces must be an array")))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(as_str(item, "namespaces")?.to_owned());
            }
            Ok(Some(out))
        }
    }
}

fn wildcard_constraint(obj: &Object) -> Result<WildcardConstraint> {
    if let Some(list) = namespace_list(obj, "wildcard")? {
        return Ok(WildcardConstraint::Namespaces(list));
    }
    if obj.contains_key("not") {
        return Ok(WildcardConstraint::Not(optional_str(obj, "not")?.map(str::to_owned)));
    }
    Ok(WildcardConstraint::Any)
}

fn attribute_wildcard(obj: &Object) -> Result<AttributeWildcard> {
    Ok(match wildcard_constraint(obj)? {
        WildcardConstraint::Any => AttributeWildcard::Any,
        WildcardConstraint::Not(ns) => AttributeWildcard::Not(ns),
        WildcardConstraint::Namespaces(list) => AttributeWildcard::Namespaces(list),
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn clark(text: &str) -> Result<QName> {
    QName::from_clark(text).ok_or_else(|| Error::ModelParse(format!("invalid qualified name {text:?}")))
}

fn name_of(obj: &Object) -> Result<QName> {
    Ok(QName::new(
        optional_str(obj, "ns")?.unwrap_or(""),
        required_str(obj, "name")?,
    ))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Object> {
    value
        .as_object()
        .ok_or_else(|| Error::ModelParse(format!("{what} must be an object")))
}

fn as_str<'a>(value: &'a Value, what: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::ModelParse(format!("{what} must be a string")))
}

fn as_usize(value: &Value, what: &str) -> Result<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| Error::ModelParse(format!("{what} must be a non-negative integer")))
}

fn required_str<'a>(obj: &'a Object, key: &str) -> Result<&'a str> {
    let value = obj
        .get(key)
        .ok_or_else(|| Error::ModelParse(format!("missing field {key:?}")))?;
    as_str(value, key)
}

fn optional_str<'a>(obj: &'a Object, key: &str) -> Result<Option<&'a str>> {
    obj.get(key).map(|v| as_str(v, key)).transpose()
}

fn optional_bool(obj: &Object, key: &str) -> Result<Option<bool>> {
    obj.get(key)
        .map(|v| {
            v.as_bool()
                .ok_or_else(|| Error::ModelParse(format!("{key} must be a boolean")))
        })
        .transpose()
}

fn required_object<'a>(obj: &'a Object, key: &str) -> Result<&'a Object> {
    let value = obj
        .get(key)
        .ok_or_else(|| Error::ModelParse(format!("missing field {key:?}")))?;
    as_object(value, key)
}

fn optional_array<'a>(obj: &'a Object, key: &str) -> Result<&'a [Value]> {
    match obj.get(key) {
        None => Ok(&[]),
        Some(v) => v
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| Error::ModelParse(format!("{key} must be an array"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_example() {
        let json = r#"{
          "types": [
            {"name": "Price", "ns": "urn:shop", "kind": "simple", "base": "decimal"},
            {"name": "Item", "ns": "urn:shop", "kind": "complex",
             "attributes": [{"name": "id", "type": "int", "required": true}],
             "content": {"kind": "elementOnly", "particle":
               {"sequence": [{"element": {"name": "price", "ns": "urn:shop",
                                          "type": "{urn:shop}Price"}}]}}}
          ],
          "elements": [{"name": "item", "ns": "urn:shop", "type": "{urn:shop}Item"}]
        }"#;
        let schema = parse_schema(json).unwrap();
        assert_eq!(schema.type_definitions().len(), 2);
        let item = schema.get_type(&QName::new("urn:shop", "Item")).unwrap();
        match &**item {
            TypeDefinition::Complex {
                attributes, content, ..
            } => {
                assert_eq!(attributes.len(), 1);
                assert!(attributes[0].required);
                assert_eq!(&*attributes[0].base_type, "int");
                assert!(matches!(content, ContentType::ElementOnly(_)));
            }
            TypeDefinition::Simple { .. } => panic!("complex erwartet"),
        }
        let root = &schema.global_elements()[0];
        assert!(Rc::ptr_eq(root.type_definition.as_ref().unwrap(), item));
    }

    #[test]
    fn builtin_and_ur_type_references() {
        let json = r#"{"elements": [
            {"name": "a", "type": "{http://www.w3.org/2001/XMLSchema}boolean"},
            {"name": "b", "type": "{http://www.w3.org/2001/XMLSchema}anyType"},
            {"name": "c"}
        ]}"#;
        let schema = parse_schema(json).unwrap();
        let elems = schema.global_elements();
        match elems[0].type_definition.as_deref() {
            Some(TypeDefinition::Simple { base_type, .. }) => assert_eq!(&**base_type, "boolean"),
            other => panic!("simple erwartet, war {other:?}"),
        }
        assert!(elems[1].type_definition.is_none());
        assert!(elems[2].type_definition.is_none());
    }

    #[test]
    fn occurs_and_wildcards() {
        let json = r#"{"types": [{"name": "T", "kind": "complex",
            "attributeWildcard": {"namespaces": ["urn:x"]},
            "content": {"kind": "mixed", "particle": {"choice": [
                {"minOccurs": 0, "maxOccurs": "unbounded", "wildcard": {"not": "urn:y"}},
                {"maxOccurs": 3, "element": {"name": "e"}}
            ]}}}]}"#;
        let schema = parse_schema(json).unwrap();
        let TypeDefinition::Complex {
            attribute_wildcard,
            content: ContentType::Mixed(particle),
            ..
        } = &*schema.type_definitions()[0]
        else {
            panic!("mixed complex type erwartet");
        };
        assert_eq!(
            attribute_wildcard,
            &Some(AttributeWildcard::Namespaces(vec!["urn:x".into()]))
        );
        let ParticleTerm::ModelGroup(group) = &particle.term else {
            panic!("model group erwartet");
        };
        assert_eq!(group.particles[0].max_occurs, MaxOccurs::Unbounded);
        assert_eq!(group.particles[1].max_occurs, MaxOccurs::Bounded(3));
        assert!(matches!(
            &group.particles[0].term,
            ParticleTerm::Wildcard(w) if w.constraint == WildcardConstraint::Not(Some("urn:y".into()))
        ));
    }

    #[test]
    fn errors_are_model_parse() {
        for json in [
            "not json",
            "[]",
            r#"{"types": [{"name": "T", "kind": "weird"}]}"#,
            r#"{"elements": [{"name": "e", "type": "{urn:a}Missing"}]}"#,
            r#"{"types": [{"name": "T", "kind": "simple"}]}"#,
            r#"{"types": [{"name": "T", "kind": "complex", "content": {"kind": "elementOnly", "particle": {}}}]}"#,
        ] {
            assert!(
                matches!(parse_schema(json), Err(Error::ModelParse(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn invalid_occurs_rejected() {
        let json = r#"{"types": [{"name": "T", "kind": "complex", "content": {"kind": "elementOnly",
            "particle": {"minOccurs": 2, "maxOccurs": 1, "element": {"name": "e"}}}}]}"#;
        assert_eq!(
            parse_schema(json).unwrap_err(),
            Error::InvalidParticleOccurs { min: 2, max: 1 }
        );
    }

    #[test]
    fn list_variety_parsed() {
        let json = r#"{"types": [{"name": "L", "kind": "simple", "base": "int", "variety": "list",
            "itemType": "{http://www.w3.org/2001/XMLSchema}int"}]}"#;
        let schema = parse_schema(json).unwrap();
        assert!(matches!(
            &*schema.type_definitions()[0],
            TypeDefinition::Simple {
                variety: SimpleTypeVariety::List { item_type: Some(_) },
                ..
            }
        ));
    }
}
