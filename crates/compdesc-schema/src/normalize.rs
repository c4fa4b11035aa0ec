//! Canonical signing bytes.
//!
//! A normalisation algorithm turns a descriptor into deterministic bytes. The
//! algorithms differ in the document shape they start from and in how objects are
//! encoded; which fields enter the bytes is decided by the exclusion rules in
//! [`crate::excludes`].

use crate::access::{NONE_ACCESS, NONE_ACCESS_LEGACY};
use crate::defaults::default_legacy_element_identities;
use crate::descriptor::ComponentDescriptor;
use crate::excludes::Rule;
use crate::DescriptorError;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const JSON_NORMALISATION_V1: &str = "jsonNormalisation/v1";
pub const JSON_NORMALISATION_V2: &str = "jsonNormalisation/v2";
pub const JSON_NORMALISATION_V3: &str = "jsonNormalisation/v3";

pub trait Normalization: Send + Sync {
    fn normalize(&self, cd: &ComponentDescriptor) -> Result<Vec<u8>, DescriptorError>;
}

/// Named normalisation algorithms.
pub struct NormalizationRegistry {
    algorithms: RwLock<BTreeMap<String, Arc<dyn Normalization>>>,
}

impl NormalizationRegistry {
    pub fn new() -> Self {
        Self {
            algorithms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registry with the three JSON normalisations.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(JSON_NORMALISATION_V1, Arc::new(JsonNormalisationV1));
        registry.register(
            JSON_NORMALISATION_V2,
            Arc::new(JsonNormalisation {
                legacy_defaults: true,
            }),
        );
        registry.register(
            JSON_NORMALISATION_V3,
            Arc::new(JsonNormalisation {
                legacy_defaults: false,
            }),
        );
        registry
    }

    pub fn register(&self, name: &str, algorithm: Arc<dyn Normalization>) {
        debug!("registering normalisation algorithm {name}");
        self.algorithms.write().insert(name.to_owned(), algorithm);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Normalization>> {
        self.algorithms.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.algorithms.read().keys().cloned().collect()
    }

    pub fn normalize(
        &self,
        cd: &ComponentDescriptor,
        name: &str,
    ) -> Result<Vec<u8>, DescriptorError> {
        let algorithm = self.get(name).ok_or_else(|| DescriptorError::Unknown {
            what: "normalisation algorithm",
            name: name.to_owned(),
        })?;
        debug!("normalising {} with {name}", cd.name_version());
        algorithm.normalize(cd)
    }
}

impl Default for NormalizationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// `jsonNormalisation/v2` and `/v3`: the internal model as plain JSON objects with
/// sorted keys.
struct JsonNormalisation {
    legacy_defaults: bool,
}

impl Normalization for JsonNormalisation {
    fn normalize(&self, cd: &ComponentDescriptor) -> Result<Vec<u8>, DescriptorError> {
        let value = if self.legacy_defaults {
            let mut cd = cd.clone();
            default_legacy_element_identities(&mut cd);
            serde_json::to_value(&cd)?
        } else {
            serde_json::to_value(cd)?
        };
        let value = canonical_rules().apply(value).unwrap_or(Value::Null);
        let mut out = Vec::new();
        write_sorted(&value, &mut out)?;
        Ok(out)
    }
}

/// `jsonNormalisation/v1`: the legacy wire document, every object written as a
/// key-sorted list of single-entry objects and every list sorted by content.
struct JsonNormalisationV1;

impl Normalization for JsonNormalisationV1 {
    fn normalize(&self, cd: &ComponentDescriptor) -> Result<Vec<u8>, DescriptorError> {
        let mut cd = cd.clone();
        default_legacy_element_identities(&mut cd);
        let value = legacy_rules()
            .apply(legacy_document(&cd)?)
            .unwrap_or(Value::Null);
        let mut out = Vec::new();
        write_entries(&value, &mut out)?;
        Ok(out)
    }
}

fn is_signing_label(label: &Value) -> bool {
    label.get("signing").and_then(Value::as_bool).unwrap_or(false)
}

fn signing_labels() -> Rule {
    Rule::omit_empty(Rule::filter(
        is_signing_label,
        Rule::include([
            ("name", Rule::Keep),
            ("version", Rule::Keep),
            ("signing", Rule::Keep),
            ("value", Rule::Keep),
        ]),
    ))
}

fn has_none_access(element: &Value) -> bool {
    match element.get("access") {
        None | Some(Value::Null) => true,
        Some(access) => matches!(
            access.get("type").and_then(Value::as_str),
            Some(NONE_ACCESS | NONE_ACCESS_LEGACY)
        ),
    }
}

fn resource_rule(resource: &Value) -> Rule {
    let mut fields = vec![
        ("access", Rule::Drop),
        ("srcRefs", Rule::Drop),
        ("labels", signing_labels()),
    ];
    if has_none_access(resource) {
        fields.push(("digest", Rule::Drop));
    }
    Rule::Exclude(fields)
}

fn element_rule() -> Rule {
    Rule::each(Rule::exclude([
        ("access", Rule::Drop),
        ("labels", signing_labels()),
    ]))
}

fn canonical_rules() -> Rule {
    Rule::exclude([
        ("meta", Rule::Drop),
        ("signatures", Rule::Drop),
        ("nestedDigests", Rule::Drop),
        (
            "component",
            Rule::exclude([
                ("creationTime", Rule::Drop),
                ("repositoryContexts", Rule::Drop),
                ("labels", signing_labels()),
                ("provider", Rule::exclude([("labels", signing_labels())])),
                ("resources", Rule::each(Rule::Select(resource_rule))),
                ("sources", element_rule()),
                ("componentReferences", element_rule()),
            ]),
        ),
    ])
}

fn legacy_provider_rule(provider: &Value) -> Rule {
    if provider.is_object() {
        Rule::exclude([("labels", signing_labels())])
    } else {
        Rule::Keep
    }
}

fn legacy_rules() -> Rule {
    let meta = || {
        Rule::exclude([
            ("creationTime", Rule::Drop),
            ("labels", signing_labels()),
            ("provider", Rule::Select(legacy_provider_rule)),
        ])
    };
    Rule::exclude([
        ("signatures", Rule::Drop),
        ("nestedDigests", Rule::Drop),
        ("repositoryContexts", Rule::Drop),
        (
            "component",
            Rule::Exclude(vec![
                ("creationTime", Rule::Drop),
                ("repositoryContexts", Rule::Drop),
                ("sources", Rule::Drop),
                ("labels", signing_labels()),
                ("provider", Rule::Select(legacy_provider_rule)),
                ("resources", Rule::each(Rule::Select(resource_rule))),
                ("componentReferences", element_rule()),
            ]),
        ),
        ("metadata", meta()),
        (
            "spec",
            Rule::exclude([
                ("sources", Rule::Drop),
                ("resources", Rule::each(Rule::Select(resource_rule))),
                ("references", element_rule()),
            ]),
        ),
    ])
}

/// Serialized wire document of the descriptor's configured schema version.
///
/// Schema versions written as `group/version` use the `apiVersion`/`metadata`/`spec`
/// layout; everything else the `meta`/`component` layout.
fn legacy_document(cd: &ComponentDescriptor) -> Result<Value, DescriptorError> {
    let meta = cd.object_meta();
    let mut resources = Vec::with_capacity(cd.resources().len());
    for r in cd.resources() {
        let mut v = serde_json::to_value(r)?;
        if let Value::Object(map) = &mut v {
            map.entry("extraIdentity").or_insert(Value::Null);
        }
        resources.push(v);
    }
    let references = serde_json::to_value(cd.references())?;
    let sources = serde_json::to_value(cd.sources())?;
    let contexts = serde_json::to_value(&cd.component.repository_contexts)?;

    let mut obj = Map::new();
    obj.insert("name".to_owned(), Value::from(meta.name.as_str()));
    obj.insert("version".to_owned(), Value::from(meta.version.as_str()));
    if !meta.labels.is_empty() {
        obj.insert("labels".to_owned(), serde_json::to_value(&meta.labels)?);
    }
    if let Some(t) = &meta.creation_time {
        obj.insert("creationTime".to_owned(), serde_json::to_value(t)?);
    }

    let mut doc = Map::new();
    if cd.schema_version().contains('/') {
        obj.insert("provider".to_owned(), serde_json::to_value(&meta.provider)?);
        let mut spec = Map::new();
        spec.insert("resources".to_owned(), Value::Array(resources));
        spec.insert("sources".to_owned(), sources);
        spec.insert("references".to_owned(), references);
        doc.insert("apiVersion".to_owned(), Value::from(cd.schema_version()));
        doc.insert("kind".to_owned(), Value::from("ComponentVersion"));
        doc.insert("metadata".to_owned(), Value::Object(obj));
        doc.insert("repositoryContexts".to_owned(), contexts);
        doc.insert("spec".to_owned(), Value::Object(spec));
    } else {
        let provider = if meta.provider.labels.is_empty() {
            Value::from(meta.provider.name.as_str())
        } else {
            serde_json::to_value(&meta.provider)?
        };
        obj.insert("provider".to_owned(), provider);
        obj.insert("repositoryContexts".to_owned(), contexts);
        obj.insert("sources".to_owned(), sources);
        obj.insert("componentReferences".to_owned(), references);
        obj.insert("resources".to_owned(), Value::Array(resources));
        let mut m = Map::new();
        m.insert("schemaVersion".to_owned(), Value::from(cd.schema_version()));
        doc.insert("meta".to_owned(), Value::Object(m));
        doc.insert("component".to_owned(), Value::Object(obj));
    }
    if !cd.signatures.is_empty() {
        doc.insert("signatures".to_owned(), serde_json::to_value(&cd.signatures)?);
    }
    Ok(Value::Object(doc))
}

fn sorted_keys(map: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys
}

/// Compact JSON with object keys in byte order.
pub(crate) fn write_sorted(value: &Value, out: &mut Vec<u8>) -> Result<(), DescriptorError> {
    match value {
        Value::Object(map) => {
            out.push(b'{');
            for (i, key) in sorted_keys(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_sorted(&map[key.as_str()], out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_sorted(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

fn write_entries(value: &Value, out: &mut Vec<u8>) -> Result<(), DescriptorError> {
    match value {
        Value::Object(map) => {
            out.push(b'[');
            for (i, key) in sorted_keys(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.push(b'{');
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_entries(&map[key.as_str()], out)?;
                out.push(b'}');
            }
            out.push(b']');
        }
        Value::Array(items) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                let mut buf = Vec::new();
                write_entries(item, &mut buf)?;
                encoded.push(buf);
            }
            encoded.sort();
            out.push(b'[');
            for (i, item) in encoded.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(item);
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
