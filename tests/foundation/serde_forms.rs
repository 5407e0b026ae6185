//! Integration tests for the serialized form of values
//!
//! Values serialize untagged, so fact documents read naturally as JSON.

use kindle_foundation::{Type, Value};

#[test]
fn json_scalars_map_to_value_variants() {
    let values: Vec<Value> = serde_json::from_str(r#"[null, true, 2, 2.5, "s"]"#).unwrap();
    assert_eq!(
        values,
        vec![
            Value::Nil,
            Value::Bool(true),
            Value::Int(2),
            Value::Float(2.5),
            Value::from("s"),
        ]
    );
}

#[test]
fn json_compounds() {
    let value: Value = serde_json::from_str(r#"{"xs": [1, 2], "name": "n"}"#).unwrap();
    let map = value.as_map().unwrap();
    assert_eq!(map.get("name"), Some(&Value::from("n")));
    assert_eq!(map.get("xs").map(Value::value_type), Some(Type::List));
}

#[test]
fn whole_floats_stay_floats() {
    let json = serde_json::to_string(&Value::Float(2.0)).unwrap();
    let back: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Value::Float(2.0));
}

#[test]
fn fact_documents_deserialize_as_maps() {
    let facts: std::collections::BTreeMap<String, Value> =
        serde_json::from_str(r#"{"a": 2, "b": 3}"#).unwrap();
    assert_eq!(facts.get("a"), Some(&Value::Int(2)));
    assert_eq!(facts.len(), 2);
}
