//! Unknown-field detection for strict decoding.
//!
//! Wire records embed the shared element shape with `#[serde(flatten)]`, which rules
//! out `deny_unknown_fields`. Instead the decoded record is serialized again and
//! compared against the input: any non-empty input field that did not survive is
//! unknown to the scheme.

use serde_json::Value;

/// Input keys accepted under another name.
const ALIASES: &[(&str, &str)] = &[("srcRef", "srcRefs")];

/// Paths (dotted, with `[i]` indexes) of fields present in `input` but not in `decoded`.
pub fn unknown_fields(input: &Value, decoded: &Value) -> Vec<String> {
    let mut out = Vec::new();
    walk(input, decoded, "", &mut out);
    out
}

fn walk(input: &Value, decoded: &Value, path: &str, out: &mut Vec<String>) {
    match (input, decoded) {
        (Value::Object(inp), Value::Object(dec)) => {
            for (key, value) in inp {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let counterpart = dec.get(key).or_else(|| {
                    ALIASES
                        .iter()
                        .find(|(alias, _)| *alias == key.as_str())
                        .and_then(|(_, canonical)| dec.get(*canonical))
                });
                match counterpart {
                    Some(d) => walk(value, d, &child, out),
                    None if is_empty(value) => {}
                    None => out.push(child),
                }
            }
        }
        (Value::Array(inp), Value::Array(dec)) => {
            for (i, (value, d)) in inp.iter().zip(dec).enumerate() {
                walk(value, d, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}
