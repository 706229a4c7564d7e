#![no_main]
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

/// Obergrenze fuer Occurrence-Werte; groessere Modelle expandieren nur.
const MAX_OCCURS: u64 = 32;

fn small_occurs(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.iter().all(|(k, v)| match (k.as_str(), v) {
            ("minOccurs" | "maxOccurs", Value::Number(n)) => n.as_u64().is_some_and(|n| n <= MAX_OCCURS),
            _ => small_occurs(v),
        }),
        Value::Array(items) => items.iter().all(small_occurs),
        _ => true,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    if !small_occurs(&value) {
        return;
    }
    if let Ok(schema) = exigram::model_json::schema_from_value(&value) {
        let _ = exigram::compile(&schema);
    }
});
