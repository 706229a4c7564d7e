//! End-to-End: Typ-Modell → kompiliertes Schema, JSON-Front-End und CLI.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use exigram::grammar::{Event, Grammar, NonTermId, Production};
use exigram::schema::{AttributeUse, ContentType, ElementDeclaration, SchemaInfo, TypeDefinition};
use exigram::{CompileOptions, Error, QName, ValueType, compile, compile_with_options, parse_schema};

include!("common/automaton.rs");

fn two_attribute_schema() -> SchemaInfo {
    let ty = Rc::new(
        TypeDefinition::complex(
            vec![
                AttributeUse::new(QName::new("", "name"), true, "string"),
                AttributeUse::new(QName::new("", "active"), true, "boolean"),
            ],
            ContentType::Simple("integer".into()),
        )
        .with_name(QName::new("urn:e2e", "Counter")),
    );
    SchemaInfo::builder()
        .type_definition(Rc::clone(&ty))
        .global_element(ElementDeclaration::new(QName::new("urn:e2e", "counter")).with_type(ty))
        .build()
}

#[test]
fn two_attributes_and_simple_content_give_six_rules() {
    let compiled = compile(&two_attribute_schema()).unwrap();
    let tg = compiled.type_grammar("urn:e2e", "Counter").unwrap();
    let g: &Grammar = compiled.grammar(tg.grammar).unwrap();
    assert_eq!(g.rule_count(), 6);

    let at = |local: &str, vt| {
        let table = compiled.uri_table();
        let ln = table.ln_table(0).unwrap().lookup_ln(local).unwrap();
        Event::Attribute(exigram::QNameRef::new(0, ln), vt)
    };
    let at_name = at("name", ValueType::String);
    let at_active = at("active", ValueType::Boolean);
    let ch = Event::Characters(ValueType::Integer);

    // Durch ε gelesen: rule0 → AT1, dessen Ziel → AT2, dessen Ziel → CH, dann nur EE
    assert_eq!(offered(g, 0), vec![at_name]);
    let [after_name] = step(g, 0, at_name)[..] else {
        panic!("genau ein Ziel erwartet");
    };
    assert_eq!(offered(g, after_name), vec![at_active]);
    let [after_active] = step(g, after_name, at_active)[..] else {
        panic!("genau ein Ziel erwartet");
    };
    assert_eq!(offered(g, after_active), vec![ch]);
    let [after_ch] = step(g, after_active, ch)[..] else {
        panic!("genau ein Ziel erwartet");
    };
    assert_eq!(offered(g, after_ch), vec![Event::EndElement]);
    assert_eq!(g.rule(5).unwrap().productions(), &[Production::end_element()]);

    // Konkrete Form
    assert_eq!(g.production(0, 0).unwrap().target, NonTermId::Rule(1));
    assert_eq!(g.production(1, 0), Some(&Production::epsilon(2)));
    assert_eq!(g.production(3, 0), Some(&Production::epsilon(4)));

    let elem = compiled.element_grammar("urn:e2e", "counter").unwrap();
    assert!(accepts(compiled.grammar(elem).unwrap(), &[at_name, at_active, ch]));
}

#[test]
fn empty_type_grammar_rejects_content() {
    let compiled = compile(&two_attribute_schema()).unwrap();
    let tg = compiled.type_grammar("urn:e2e", "Counter").unwrap();
    let empty = compiled.grammar(tg.empty).unwrap();
    assert_eq!(empty.rule_count(), 5);
    let first = offered(empty, 0);
    let [after_name] = step(empty, 0, first[0])[..] else {
        panic!("genau ein Ziel erwartet");
    };
    let second = offered(empty, after_name);
    assert!(accepts(empty, &[first[0], second[0]]));
    assert!(!accepts(empty, &[first[0], second[0], Event::Characters(ValueType::Integer)]));
}

const SHOP_MODEL: &str = r#"{
  "types": [
    {"name": "Price", "ns": "urn:shop", "kind": "simple", "base": "decimal"},
    {"name": "Item", "ns": "urn:shop", "kind": "complex",
     "attributes": [{"name": "sku", "type": "string", "required": true},
                    {"name": "note", "type": "string"}],
     "content": {"kind": "elementOnly", "particle": {"sequence": [
        {"element": {"name": "price", "ns": "urn:shop", "type": "{urn:shop}Price"}},
        {"minOccurs": 0, "maxOccurs": "unbounded",
         "element": {"name": "tag", "ns": "urn:shop",
                     "type": "{http://www.w3.org/2001/XMLSchema}string"}},
        {"minOccurs": 0, "choice": [
          {"element": {"name": "gift", "ns": "urn:shop"}},
          {"wildcard": {"namespaces": ["urn:ext"]}}
        ]}
     ]}}}
  ],
  "elements": [
    {"name": "item", "ns": "urn:shop", "type": "{urn:shop}Item"},
    {"name": "price", "ns": "urn:shop", "type": "{urn:shop}Price"}
  ]
}"#;

#[test]
fn json_model_compiles() {
    let schema = parse_schema(SHOP_MODEL).unwrap();
    let compiled = compile(&schema).unwrap();

    let table = compiled.uri_table();
    let shop = table.lookup_uri("urn:shop").unwrap();
    let ext = table.lookup_uri("urn:ext").unwrap();
    let ln = |l: &str| table.ln_table(shop).unwrap().lookup_ln(l).unwrap();
    let se = |l: &str| Event::StartElement(exigram::QNameRef::new(shop, ln(l)));
    let sku = Event::Attribute(
        exigram::QNameRef::new(0, table.ln_table(0).unwrap().lookup_ln("sku").unwrap()),
        ValueType::String,
    );

    let item = compiled.element_grammar("urn:shop", "item").unwrap();
    let g = compiled.grammar(item).unwrap();
    assert!(accepts(g, &[sku, se("price")]));
    assert!(accepts(g, &[sku, se("price"), se("tag"), se("tag"), se("gift")]));
    assert!(accepts(g, &[sku, se("price"), Event::StartElementNs(ext)]));
    assert!(!accepts(g, &[sku, se("price"), se("gift"), se("tag")]));
    assert!(!accepts(g, &[se("price")]));

    let price = compiled.element_grammar("urn:shop", "price").unwrap();
    assert!(accepts(
        compiled.grammar(price).unwrap(),
        &[Event::Characters(ValueType::Decimal)]
    ));
    assert_eq!(compiled.type_grammars().count(), 2);

    // Lokale Elemente: eingebauter Typ, Ur-Type und benannter Typ
    let [tag] = compiled.local_element_grammars("urn:shop", "tag").collect::<Vec<_>>()[..] else {
        panic!("genau eine Grammar fuer tag erwartet");
    };
    assert!(accepts(
        compiled.grammar(tag).unwrap(),
        &[Event::Characters(ValueType::String)]
    ));
    let [gift] = compiled.local_element_grammars("urn:shop", "gift").collect::<Vec<_>>()[..] else {
        panic!("genau eine Grammar fuer gift erwartet");
    };
    assert!(accepts(
        compiled.grammar(gift).unwrap(),
        &[Event::AttributeAny, Event::StartElementAny, Event::CharactersUntyped]
    ));
    let [local_price] = compiled.local_element_grammars("urn:shop", "price").collect::<Vec<_>>()[..] else {
        panic!("genau eine Grammar fuer das lokale price erwartet");
    };
    assert_eq!(compiled.grammar(local_price), compiled.grammar(price));
}

const INLINE_MODEL: &str = r#"{
  "types": [
    {"name": "Order", "ns": "urn:o", "kind": "complex",
     "content": {"kind": "elementOnly", "particle": {"sequence": [
        {"maxOccurs": "unbounded",
         "element": {"name": "line", "ns": "urn:o",
                     "type": {"kind": "complex",
                              "attributes": [{"name": "qty", "type": "int", "required": true}],
                              "content": {"kind": "simple", "type": "string"}}}},
        {"minOccurs": 0,
         "element": {"name": "note", "ns": "urn:o", "type": {"kind": "simple", "base": "date"}}}
     ]}}}
  ],
  "elements": [{"name": "order", "ns": "urn:o", "type": "{urn:o}Order"}]
}"#;

#[test]
fn inline_local_types_compiled() {
    let compiled = compile(&parse_schema(INLINE_MODEL).unwrap()).unwrap();
    let table = compiled.uri_table();
    let qty = Event::Attribute(
        exigram::QNameRef::new(0, table.ln_table(0).unwrap().lookup_ln("qty").unwrap()),
        ValueType::Integer,
    );

    let lines: Vec<_> = compiled.local_element_grammars("urn:o", "line").collect();
    assert_eq!(lines.len(), 1);
    let line = compiled.grammar(lines[0]).unwrap();
    assert!(accepts(line, &[qty, Event::Characters(ValueType::String)]));
    assert!(!accepts(line, &[Event::Characters(ValueType::String)]));

    let notes: Vec<_> = compiled.local_element_grammars("urn:o", "note").collect();
    assert_eq!(notes.len(), 1);
    assert!(accepts(
        compiled.grammar(notes[0]).unwrap(),
        &[Event::Characters(ValueType::DateTime)]
    ));

    let names: Vec<&str> = compiled
        .local_elements()
        .iter()
        .map(|e| e.local_name.as_str())
        .collect();
    assert_eq!(names, ["line", "note"]);
    assert!(compiled.local_element_grammars("urn:o", "order").next().is_none());
}

#[test]
fn inline_local_type_errors_propagate() {
    let with_base = |base: &str, variety: &str| {
        INLINE_MODEL.replace(
            r#"{"kind": "simple", "base": "date"}"#,
            &format!(r#"{{"kind": "simple", "base": "{base}", "variety": "{variety}"}}"#),
        )
    };

    let unknown = parse_schema(&with_base("foobar", "atomic")).unwrap();
    assert!(matches!(
        compile_with_options(&unknown, CompileOptions::default().with_skip_unsupported()),
        Err(Error::InconsistentProcState(_))
    ));

    let list = parse_schema(&with_base("int", "list")).unwrap();
    assert!(matches!(compile(&list), Err(Error::NotImplementedYet(_))));
    let skipped =
        compile_with_options(&list, CompileOptions::default().with_skip_unsupported()).unwrap();
    assert!(skipped.type_grammar("urn:o", "Order").is_none());
}

#[test]
fn huge_max_occurs_rejected_before_unrolling() {
    let json = INLINE_MODEL.replace(r#""maxOccurs": "unbounded""#, r#""maxOccurs": 4000000000"#);
    let schema = parse_schema(&json).unwrap();
    assert!(matches!(compile(&schema), Err(Error::OutOfBoundBuffer { .. })));
}

#[test]
fn unsupported_list_type_can_be_skipped() {
    let json = r#"{"types": [
        {"name": "Ints", "kind": "simple", "base": "int", "variety": "list"},
        {"name": "One", "kind": "simple", "base": "int"}
    ]}"#;
    let schema = parse_schema(json).unwrap();
    assert!(matches!(compile(&schema), Err(Error::NotImplementedYet(_))));

    let compiled =
        compile_with_options(&schema, CompileOptions::default().with_skip_unsupported()).unwrap();
    assert!(compiled.type_grammar("", "Ints").is_none());
    assert!(compiled.type_grammar("", "One").is_some());
}

#[test]
fn unknown_builtin_type_is_fatal() {
    let json = r#"{"types": [{"name": "X", "kind": "simple", "base": "foobar"}]}"#;
    let schema = parse_schema(json).unwrap();
    assert!(matches!(
        compile_with_options(&schema, CompileOptions::default().with_skip_unsupported()),
        Err(Error::InconsistentProcState(_))
    ));
}

// ============================================================================
// CLI
// ============================================================================

fn exigram_bin() -> &'static str {
    env!("CARGO_BIN_EXE_exigram")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("exigram-e2e-{tag}-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_exigram(args: &[&str]) -> Output {
    Command::new(exigram_bin())
        .args(args)
        .output()
        .expect("run exigram")
}

#[test]
fn cli_compile_prints_type_grammar() {
    let dir = test_temp_dir("compile");
    let input = dir.join("model.json");
    fs::write(&input, SHOP_MODEL).expect("write model");

    let out = run_exigram(&["compile", "-i", input.to_str().unwrap(), "--type", "urn:shop:Price"]);
    assert!(out.status.success(), "compile failed: {}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.starts_with("type {urn:shop}Price"));
    assert!(text.contains("CH [decimal] -> 1"));
    assert!(text.contains("rule 1:"));
}

#[test]
fn cli_compile_lists_local_elements() {
    let dir = test_temp_dir("locals");
    let input = dir.join("model.json");
    fs::write(&input, SHOP_MODEL).expect("write model");

    let out = run_exigram(&["compile", "-i", input.to_str().unwrap()]);
    assert!(out.status.success(), "compile failed: {}", String::from_utf8_lossy(&out.stderr));
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.contains("element {urn:shop}item ["));
    assert!(text.contains("local element {urn:shop}tag ["));
    assert!(text.contains("local element {urn:shop}gift ["));
}

#[test]
fn cli_tables_writes_output_file() {
    let dir = test_temp_dir("tables");
    let input = dir.join("model.json");
    let output = dir.join("tables.txt");
    fs::write(&input, SHOP_MODEL).expect("write model");

    let out = run_exigram(&[
        "tables",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "tables failed: {}", String::from_utf8_lossy(&out.stderr));
    let text = fs::read_to_string(&output).expect("read output");
    assert!(text.contains("uri 3: \"http://www.w3.org/2001/XMLSchema\""));
    assert!(text.contains("uri 4: \"urn:ext\""));
    assert!(text.contains("uri 5: \"urn:shop\""));
    assert!(text.contains("  prefix 0: \"xml\""));
}

#[test]
fn cli_reports_errors() {
    let dir = test_temp_dir("errors");
    let input = dir.join("bad.json");
    fs::write(&input, "{\"types\": 3}").expect("write model");

    let out = run_exigram(&["tables", "-i", input.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("types must be an array"), "{err}");

    let missing = run_exigram(&["compile", "-i", dir.join("missing.json").to_str().unwrap()]);
    assert_eq!(missing.status.code(), Some(1));
}
