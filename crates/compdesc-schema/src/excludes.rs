//! Declarative field exclusion over JSON values.
//!
//! A [`Rule`] tree mirrors the document shape and says, per field, whether it is
//! kept, dropped, or descended into. Rules are plain data plus function pointers, so
//! a normalisation algorithm is a value that can be inspected and shared.

use serde_json::{Map, Value};

pub enum Rule {
    /// Keep the value unchanged.
    Keep,
    /// Remove the field from its parent object.
    Drop,
    /// Keep all fields; the listed ones are processed with their own rule.
    Exclude(Vec<(&'static str, Rule)>),
    /// Keep only the listed fields, each processed with its rule.
    Include(Vec<(&'static str, Rule)>),
    /// Apply the rule to every array entry.
    Each(Box<Rule>),
    /// Drop array entries rejected by `keep`, apply `each` to the rest.
    Filter {
        keep: fn(&Value) -> bool,
        each: Box<Rule>,
    },
    /// Rule chosen by looking at the value itself.
    Select(fn(&Value) -> Rule),
    /// Like the inner rule, but the field is removed when the result is
    /// `null`, an empty array or an empty object.
    OmitEmpty(Box<Rule>),
}

impl Rule {
    pub fn exclude<const N: usize>(fields: [(&'static str, Rule); N]) -> Self {
        Self::Exclude(fields.into())
    }

    pub fn include<const N: usize>(fields: [(&'static str, Rule); N]) -> Self {
        Self::Include(fields.into())
    }

    pub fn each(rule: Rule) -> Self {
        Self::Each(Box::new(rule))
    }

    pub fn filter(keep: fn(&Value) -> bool, each: Rule) -> Self {
        Self::Filter {
            keep,
            each: Box::new(each),
        }
    }

    pub fn omit_empty(rule: Rule) -> Self {
        Self::OmitEmpty(Box::new(rule))
    }

    /// Process `value`. `None` means the value is removed from its parent.
    pub fn apply(&self, value: Value) -> Option<Value> {
        match self {
            Self::Keep => Some(value),
            Self::Drop => None,
            Self::Exclude(fields) => Some(match value {
                Value::Object(mut map) => {
                    for (name, rule) in fields {
                        if let Some(v) = map.remove(*name) {
                            if let Some(v) = rule.apply(v) {
                                map.insert((*name).to_owned(), v);
                            }
                        }
                    }
                    Value::Object(map)
                }
                other => other,
            }),
            Self::Include(fields) => Some(match value {
                Value::Object(mut map) => {
                    let mut out = Map::new();
                    for (name, rule) in fields {
                        if let Some(v) = map.remove(*name).and_then(|v| rule.apply(v)) {
                            out.insert((*name).to_owned(), v);
                        }
                    }
                    Value::Object(out)
                }
                other => other,
            }),
            Self::Each(rule) => Some(match value {
                Value::Array(items) => {
                    Value::Array(items.into_iter().filter_map(|v| rule.apply(v)).collect())
                }
                other => other,
            }),
            Self::Filter { keep, each } => Some(match value {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .filter(|v| keep(v))
                        .filter_map(|v| each.apply(v))
                        .collect(),
                ),
                other => other,
            }),
            Self::Select(choose) => choose(&value).apply(value),
            Self::OmitEmpty(rule) => rule.apply(value).filter(|v| !is_empty(v)),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
