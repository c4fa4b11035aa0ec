//! Type-discriminated access specifications.
//!
//! An access value tells an external access-method implementation where the bytes of a
//! resource or source live. The descriptor layer only cares about the `type`
//! discriminator; known types get a typed view, unknown ones are kept opaque so they
//! round-trip unchanged.

use crate::DescriptorError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const NONE_ACCESS: &str = "none";
pub const NONE_ACCESS_LEGACY: &str = "None";
pub const LOCAL_BLOB: &str = "localBlob";
pub const OCI_ARTIFACT: &str = "ociArtifact";
pub const OCI_REGISTRY: &str = "ociRegistry";

/// A JSON object with a mandatory string `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct UnstructuredTypedObject {
    object: Map<String, Value>,
}

impl UnstructuredTypedObject {
    pub fn new(kind: impl Into<String>) -> Self {
        let mut object = Map::new();
        object.insert("type".to_owned(), Value::String(kind.into()));
        Self { object }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.object.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        self.object
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.object.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.object
    }

    pub fn from_value(value: Value) -> Result<Self, DescriptorError> {
        match value {
            Value::Object(object) => Self::try_from(object),
            other => Err(DescriptorError::Invalid(format!(
                "typed object must be a map, got {other}"
            ))),
        }
    }
}

impl TryFrom<Map<String, Value>> for UnstructuredTypedObject {
    type Error = DescriptorError;

    fn try_from(object: Map<String, Value>) -> Result<Self, Self::Error> {
        match object.get("type") {
            Some(Value::String(kind)) if !kind.is_empty() => Ok(Self { object }),
            Some(_) => Err(DescriptorError::Invalid(
                "typed object: 'type' must be a non-empty string".to_owned(),
            )),
            None => Err(DescriptorError::Invalid(
                "typed object: missing 'type'".to_owned(),
            )),
        }
    }
}

impl From<UnstructuredTypedObject> for Map<String, Value> {
    fn from(obj: UnstructuredTypedObject) -> Self {
        obj.object
    }
}

/// Access kind stating that the artifact has no retrievable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoneAccess {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Blob stored alongside the component version in its repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBlobAccess {
    #[serde(rename = "type")]
    pub kind: String,
    pub local_reference: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_access: Option<Value>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Artifact living in an OCI registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OciArtifactAccess {
    #[serde(rename = "type")]
    pub kind: String,
    pub image_reference: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccessSpec {
    None(NoneAccess),
    LocalBlob(LocalBlobAccess),
    OciArtifact(OciArtifactAccess),
    Opaque(UnstructuredTypedObject),
}

impl AccessSpec {
    pub fn none() -> Self {
        Self::None(NoneAccess {
            kind: NONE_ACCESS.to_owned(),
            other: BTreeMap::new(),
        })
    }

    pub fn local_blob(local_reference: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::LocalBlob(LocalBlobAccess {
            kind: LOCAL_BLOB.to_owned(),
            local_reference: local_reference.into(),
            media_type: media_type.into(),
            reference_name: None,
            global_access: None,
            other: BTreeMap::new(),
        })
    }

    pub fn oci_artifact(image_reference: impl Into<String>) -> Self {
        Self::OciArtifact(OciArtifactAccess {
            kind: OCI_ARTIFACT.to_owned(),
            image_reference: image_reference.into(),
            other: BTreeMap::new(),
        })
    }

    /// The type discriminator exactly as written in the document.
    pub fn kind(&self) -> &str {
        match self {
            Self::None(a) => &a.kind,
            Self::LocalBlob(a) => &a.kind,
            Self::OciArtifact(a) => &a.kind,
            Self::Opaque(o) => o.kind(),
        }
    }

    pub fn is_none(&self) -> bool {
        let kind = self.kind();
        kind == NONE_ACCESS || kind == NONE_ACCESS_LEGACY
    }

    pub fn to_unstructured(&self) -> Result<UnstructuredTypedObject, DescriptorError> {
        if let Self::Opaque(o) = self {
            return Ok(o.clone());
        }
        UnstructuredTypedObject::from_value(serde_json::to_value(self)?)
    }
}

/// A missing access counts as "none".
pub fn is_none_access(access: Option<&AccessSpec>) -> bool {
    access.map_or(true, AccessSpec::is_none)
}

pub type AccessDecoder = fn(UnstructuredTypedObject) -> Result<AccessSpec, DescriptorError>;

/// Maps access type names to decoders. Unregistered types decode to [`AccessSpec::Opaque`].
pub struct AccessTypeRegistry {
    decoders: RwLock<HashMap<String, AccessDecoder>>,
}

impl AccessTypeRegistry {
    /// An empty registry: every access stays opaque.
    pub fn new() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for kind in [NONE_ACCESS, NONE_ACCESS_LEGACY, "none/v1"] {
            registry.register(kind, decode_none);
        }
        for kind in [LOCAL_BLOB, "localBlob/v1"] {
            registry.register(kind, decode_local_blob);
        }
        for kind in [OCI_ARTIFACT, "ociArtifact/v1", OCI_REGISTRY, "ociRegistry/v1"] {
            registry.register(kind, decode_oci_artifact);
        }
        registry
    }

    pub fn register(&self, kind: &str, decoder: AccessDecoder) {
        self.decoders.write().insert(kind.to_owned(), decoder);
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.decoders.read().contains_key(kind)
    }

    pub fn decode(&self, obj: UnstructuredTypedObject) -> Result<AccessSpec, DescriptorError> {
        let decoder = self.decoders.read().get(obj.kind()).copied();
        match decoder {
            Some(decode) => decode(obj),
            None => {
                debug!("access type '{}' not registered, keeping it opaque", obj.kind());
                Ok(AccessSpec::Opaque(obj))
            }
        }
    }
}

impl Default for AccessTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn decode_typed<T: DeserializeOwned>(obj: UnstructuredTypedObject) -> Result<T, DescriptorError> {
    let kind = obj.kind().to_owned();
    serde_json::from_value(Value::Object(obj.into_map()))
        .map_err(|e| DescriptorError::Conversion(format!("access type '{kind}': {e}")))
}

fn decode_none(obj: UnstructuredTypedObject) -> Result<AccessSpec, DescriptorError> {
    decode_typed(obj).map(AccessSpec::None)
}

fn decode_local_blob(obj: UnstructuredTypedObject) -> Result<AccessSpec, DescriptorError> {
    decode_typed(obj).map(AccessSpec::LocalBlob)
}

fn decode_oci_artifact(obj: UnstructuredTypedObject) -> Result<AccessSpec, DescriptorError> {
    decode_typed(obj).map(AccessSpec::OciArtifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn obj(v: Value) -> UnstructuredTypedObject {
        UnstructuredTypedObject::from_value(v).unwrap()
    }

    #[test]
    fn typed_object_requires_type() {
        assert!(UnstructuredTypedObject::from_value(json!({"a": 1})).is_err());
        assert!(UnstructuredTypedObject::from_value(json!({"type": ""})).is_err());
        assert!(UnstructuredTypedObject::from_value(json!("x")).is_err());
        assert_eq!(obj(json!({"type": "t1", "a": 1})).kind(), "t1");
    }

    #[test]
    fn decodes_known_kinds() {
        let registry = AccessTypeRegistry::with_defaults();
        let a = registry
            .decode(obj(json!({"type": "localBlob/v1", "localReference": "sha256:abc", "mediaType": "text/plain"})))
            .unwrap();
        match &a {
            AccessSpec::LocalBlob(lb) => {
                assert_eq!(lb.local_reference, "sha256:abc");
                assert_eq!(lb.kind, "localBlob/v1");
            }
            other => panic!("unexpected {other:?}"),
        }
        let n = registry.decode(obj(json!({"type": "None"}))).unwrap();
        assert!(n.is_none());
        let oci = registry
            .decode(obj(json!({"type": "ociRegistry", "imageReference": "ghcr.io/a/b:1"})))
            .unwrap();
        assert!(matches!(oci, AccessSpec::OciArtifact(_)));
    }

    #[test]
    fn unknown_kind_stays_opaque_and_roundtrips() {
        let registry = AccessTypeRegistry::with_defaults();
        let raw = json!({"type": "s3", "bucket": "b", "key": "k"});
        let a = registry.decode(obj(raw.clone())).unwrap();
        assert!(matches!(a, AccessSpec::Opaque(_)));
        assert_eq!(serde_json::to_value(&a).unwrap(), raw);
    }

    #[test]
    fn typed_access_keeps_unknown_fields() {
        let registry = AccessTypeRegistry::with_defaults();
        let raw = json!({"type": "ociArtifact", "imageReference": "r", "extra": {"x": 1}});
        let a = registry.decode(obj(raw.clone())).unwrap();
        assert_eq!(a.to_unstructured().unwrap().as_map(), raw.as_object().unwrap());
    }

    #[test]
    fn malformed_known_kind_is_conversion_error() {
        let registry = AccessTypeRegistry::with_defaults();
        let err = registry
            .decode(obj(json!({"type": "localBlob", "mediaType": 5})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
    }

    #[test]
    fn missing_access_is_none() {
        assert!(is_none_access(None));
        assert!(is_none_access(Some(&AccessSpec::none())));
        assert!(!is_none_access(Some(&AccessSpec::oci_artifact("x"))));
    }

    #[test]
    fn empty_registry_keeps_everything_opaque() {
        let registry = AccessTypeRegistry::new();
        let a = registry.decode(obj(json!({"type": "none"}))).unwrap();
        assert!(matches!(a, AccessSpec::Opaque(_)));
        assert!(a.is_none());
        registry.register("none", decode_none);
        assert!(registry.is_registered("none"));
    }
}
