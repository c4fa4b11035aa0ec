//! The canonical, version-independent component descriptor model.
//!
//! Every wire dialect converts into this representation; canonicalization and
//! equivalence are defined on it. Serializing it with serde yields the internal JSON
//! shape that the normalisation exclusion rules operate on.

use crate::access::{AccessSpec, UnstructuredTypedObject};
use crate::digest::{Digest, NestedComponentDigests, Signature};
use crate::identity::{Element, ElementMeta, Identity};
use crate::labels::Labels;
use crate::types::{ComponentName, NameVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Schema version assigned to descriptors created in memory.
pub const DEFAULT_SCHEMA_VERSION: &str = "v2";
/// Provider assigned to descriptors created in memory.
pub const DEFAULT_PROVIDER: &str = "acme";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub meta: Metadata,
    pub component: ComponentSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nested_digests: Vec<NestedComponentDigests>,
}

/// Bookkeeping that is not part of the component itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Schema version used when the descriptor is encoded without an explicit target.
    #[serde(rename = "configuredSchemaVersion")]
    pub configured_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(flatten)]
    pub object_meta: ObjectMeta,
    pub repository_contexts: Vec<UnstructuredTypedObject>,
    pub sources: Vec<Source>,
    #[serde(rename = "componentReferences")]
    pub references: Vec<Reference>,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: ComponentName,
    pub version: String,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl Provider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Artifact produced together with the component.
    #[default]
    Local,
    /// Third-party artifact consumed by the component.
    External,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::External => f.write_str("external"),
        }
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "external" => Ok(Self::External),
            other => Err(format!("relation must be 'local' or 'external', got '{other}'")),
        }
    }
}

/// Links a resource to the sources it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub identity_selector: Identity,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

/// A delivery artifact of the component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(flatten)]
    pub element: ElementMeta,
    #[serde(rename = "type")]
    pub kind: String,
    pub relation: Relation,
    #[serde(rename = "srcRefs", skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessSpec>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        relation: Relation,
    ) -> Self {
        Self {
            element: ElementMeta::new(name, version),
            kind: kind.into(),
            relation,
            source_refs: Vec::new(),
            digest: None,
            access: None,
        }
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessSpec) -> Self {
        self.access = Some(access);
        self
    }

    #[must_use]
    pub fn with_digest(mut self, digest: Digest) -> Self {
        self.digest = Some(digest);
        self
    }
}

/// Material the component version was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(flatten)]
    pub element: ElementMeta,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessSpec>,
}

impl Source {
    pub fn new(name: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            element: ElementMeta::new(name, version),
            kind: kind.into(),
            access: None,
        }
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessSpec) -> Self {
        self.access = Some(access);
        self
    }
}

/// Edge to another component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(flatten)]
    pub element: ElementMeta,
    pub component_name: ComponentName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

impl Reference {
    pub fn new(
        name: impl Into<String>,
        component_name: impl Into<ComponentName>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            element: ElementMeta::new(name, version),
            component_name: component_name.into(),
            digest: None,
        }
    }

    /// The referenced component version.
    pub fn target(&self) -> NameVersion {
        NameVersion::new(self.component_name.clone(), self.element.version.as_str())
    }
}

impl Element for Resource {
    const KIND: &'static str = "resource";
    fn meta(&self) -> &ElementMeta {
        &self.element
    }
    fn meta_mut(&mut self) -> &mut ElementMeta {
        &mut self.element
    }
}

impl Element for Source {
    const KIND: &'static str = "source";
    fn meta(&self) -> &ElementMeta {
        &self.element
    }
    fn meta_mut(&mut self) -> &mut ElementMeta {
        &mut self.element
    }
}

impl Element for Reference {
    const KIND: &'static str = "component reference";
    fn meta(&self) -> &ElementMeta {
        &self.element
    }
    fn meta_mut(&mut self) -> &mut ElementMeta {
        &mut self.element
    }
}

impl ComponentDescriptor {
    /// An empty descriptor with the default schema version and provider.
    pub fn new(name: impl Into<ComponentName>, version: impl Into<String>) -> Self {
        Self {
            meta: Metadata {
                configured_version: DEFAULT_SCHEMA_VERSION.to_owned(),
            },
            component: ComponentSpec {
                object_meta: ObjectMeta {
                    name: name.into(),
                    version: version.into(),
                    labels: Labels::new(),
                    provider: Provider::new(DEFAULT_PROVIDER),
                    creation_time: None,
                },
                repository_contexts: Vec::new(),
                sources: Vec::new(),
                references: Vec::new(),
                resources: Vec::new(),
            },
            signatures: Vec::new(),
            nested_digests: Vec::new(),
        }
    }

    pub fn name(&self) -> &ComponentName {
        &self.component.object_meta.name
    }

    pub fn version(&self) -> &str {
        &self.component.object_meta.version
    }

    pub fn name_version(&self) -> NameVersion {
        NameVersion::new(self.name().clone(), self.version())
    }

    pub fn schema_version(&self) -> &str {
        &self.meta.configured_version
    }

    pub fn object_meta(&self) -> &ObjectMeta {
        &self.component.object_meta
    }

    pub fn resources(&self) -> &[Resource] {
        &self.component.resources
    }

    pub fn sources(&self) -> &[Source] {
        &self.component.sources
    }

    pub fn references(&self) -> &[Reference] {
        &self.component.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Label;
    use serde_json::json;

    #[test]
    fn new_descriptor_defaults() {
        let cd = ComponentDescriptor::new("acme.org/test", "1.0.0");
        assert_eq!(cd.schema_version(), "v2");
        assert_eq!(cd.object_meta().provider.name, "acme");
        assert_eq!(cd.name_version().to_string(), "acme.org/test:1.0.0");
        assert!(cd.resources().is_empty());
    }

    #[test]
    fn clone_is_deep() {
        let mut cd = ComponentDescriptor::new("acme.org/test", "1.0.0");
        let mut r = Resource::new("r", "1.0.0", "blob", Relation::Local);
        r.element.labels.set(Label::new("l", "a"));
        cd.component.resources.push(r);
        let copy = cd.clone();
        cd.component.resources[0].element.labels.set(Label::new("l", "b"));
        assert_eq!(
            copy.resources()[0].element.labels.get("l").unwrap().value,
            json!("a")
        );
        assert_ne!(copy, cd);
    }

    #[test]
    fn internal_json_shape() {
        let mut cd = ComponentDescriptor::new("acme.org/test", "1.0.0");
        cd.component.resources.push(
            Resource::new("r", "1.0.0", "blob", Relation::External)
                .with_access(AccessSpec::none()),
        );
        let v = serde_json::to_value(&cd).unwrap();
        assert_eq!(v["meta"]["configuredSchemaVersion"], json!("v2"));
        assert_eq!(v["component"]["name"], json!("acme.org/test"));
        assert_eq!(v["component"]["componentReferences"], json!([]));
        assert_eq!(
            v["component"]["resources"][0],
            json!({"name": "r", "version": "1.0.0", "type": "blob", "relation": "external", "access": {"type": "none"}})
        );
        assert!(v.get("signatures").is_none());
    }

    #[test]
    fn relation_parse() {
        assert_eq!("local".parse::<Relation>(), Ok(Relation::Local));
        assert_eq!("external".parse::<Relation>(), Ok(Relation::External));
        assert!("remote".parse::<Relation>().is_err());
        assert_eq!(Relation::External.to_string(), "external");
    }

    #[test]
    fn reference_target() {
        let r = Reference::new("ref", "acme.org/c1", "v1");
        assert_eq!(r.target(), NameVersion::new("acme.org/c1", "v1"));
    }
}
