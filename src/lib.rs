//! exigram – Schema-informed EXI grammar compiler.
//!
//! Kompiliert ein geparstes Typ-Modell in endliche Automaten (Grammars) je
//! Typ und Element und baut die kanonischen String-Tabellen, auf die sich
//! Encoder und Decoder ohne Austausch des Schema-Texts einigen.
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use exigram::{compile, QName};
//! use exigram::schema::{AttributeUse, ContentType, ElementDeclaration, SchemaInfo, TypeDefinition};
//!
//! let ty = Rc::new(
//!     TypeDefinition::complex(
//!         vec![AttributeUse::new(QName::new("", "id"), true, "int")],
//!         ContentType::Simple("string".into()),
//!     )
//!     .with_name(QName::new("urn:shop", "Note")),
//! );
//! let schema = SchemaInfo::builder()
//!     .type_definition(Rc::clone(&ty))
//!     .global_element(ElementDeclaration::new(QName::new("urn:shop", "note")).with_type(ty))
//!     .build();
//!
//! let compiled = compile(&schema).unwrap();
//! let id = compiled.element_grammar("urn:shop", "note").unwrap();
//! assert_eq!(compiled.grammar(id).unwrap().rule_count(), 4);
//! ```

pub mod canonical;
pub mod compiler;
pub mod error;
pub mod grammar;
pub mod hash;
pub mod model_json;
pub mod options;
pub mod proto_grammar;
pub mod qname;
pub mod schema;
pub mod string;
pub mod string_table;
pub mod value_type;

pub use error::{Error, Result};

/// HashMap mit ahash fuer interne Tabellen (Seed pro Prozess, kein reproduzierbarer Hash).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Compiler
pub use compiler::{CompiledSchema, SchemaCompiler, TypeGrammars, compile, compile_with_options};
pub use options::CompileOptions;

// Public API: Grammars
pub use grammar::{Event, Grammar, GrammarId, NonTermId, Production, QNameRef, Rule};
pub use value_type::ValueType;

// Public API: Tables
pub use canonical::{ElementEntry, GlobalElementIndex};
pub use string::SchemaString;
pub use string_table::UriTable;

// Public API: Types
pub use model_json::parse_schema;
pub use qname::QName;
pub use schema::SchemaInfo;
