//! YAML to JSON value conversion.
//!
//! Documents are always parsed as YAML (JSON is a subset) and then turned into a
//! `serde_json::Value`, which is what the JSON-schema validator and the strict
//! unknown-field check operate on.

use crate::SchemeError;
use serde_json::{Map, Number, Value};
use serde_yaml::Value as Yaml;

pub fn parse_yaml(input: &[u8]) -> Result<Value, SchemeError> {
    let y: Yaml = serde_yaml::from_slice(input)?;
    yaml_to_json(&y)
}

pub fn yaml_to_json(v: &Yaml) -> Result<Value, SchemeError> {
    match v {
        Yaml::Null => Ok(Value::Null),
        Yaml::Bool(b) => Ok(Value::Bool(*b)),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| SchemeError::InvalidDocument(format!("number {n} has no JSON form")))
            }
        }
        Yaml::String(s) => Ok(Value::String(s.clone())),
        Yaml::Sequence(seq) => seq.iter().map(yaml_to_json).collect::<Result<_, _>>().map(Value::Array),
        Yaml::Mapping(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                obj.insert(key_string(k)?, yaml_to_json(v)?);
            }
            Ok(Value::Object(obj))
        }
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn key_string(k: &Yaml) -> Result<String, SchemeError> {
    match k {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(SchemeError::InvalidDocument(format!(
            "mapping key must be a scalar, got {other:?}"
        ))),
    }
}
