//! The `v3alpha1` dialect: a Kubernetes-style object with `apiVersion`, `kind`,
//! `metadata` and `spec`. Registered under both API groups.

use crate::codec::DecodeOptions;
use crate::elements::{default_elements, ReferenceRecord, ResourceRecord, SourceRecord};
use crate::jsonscheme::JsonScheme;
use crate::scheme::{decode_record, downcast_record, Scheme, VersionedDescriptor};
use crate::validation::{
    required_str, validate_component_name, validate_labels, validate_references,
    validate_resources, validate_sources, FieldError,
};
use crate::SchemeError;
use chrono::{DateTime, Utc};
use compdesc_schema::{
    AccessTypeRegistry, ComponentDescriptor, ComponentName, ComponentSpec, Labels, Metadata,
    NestedComponentDigests, ObjectMeta, Provider, Signature, UnstructuredTypedObject,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

pub const API_VERSION_V3ALPHA1: &str = "ocm.software/v3alpha1";
pub const API_VERSION_GARDENER_V3ALPHA1: &str = "ocm.gardener.cloud/v3alpha1";
pub const KIND_COMPONENT_VERSION: &str = "ComponentVersion";

const JSON_SCHEMA: &str = include_str!("../schemas/component-descriptor-v3alpha1.json");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptorV3 {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMetaV3,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repository_contexts: Vec<UnstructuredTypedObject>,
    #[serde(default)]
    pub spec: ComponentVersionSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_digests: Vec<NestedComponentDigests>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetaV3 {
    #[serde(default)]
    pub name: ComponentName,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentVersionSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceRecord>,
}

impl VersionedDescriptor for ComponentDescriptorV3 {
    fn schema_version(&self) -> &str {
        &self.api_version
    }

    fn apply_defaults(&mut self) {
        let spec = &mut self.spec;
        default_elements(
            &self.metadata.version,
            &mut spec.resources,
            &mut spec.sources,
            &mut spec.references,
        );
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errs = Vec::new();
        let meta = &self.metadata;
        required_str(&mut errs, "apiVersion", &self.api_version);
        if self.kind != KIND_COMPONENT_VERSION {
            errs.push(FieldError::not_supported(
                "kind",
                format!("expected {KIND_COMPONENT_VERSION}, got '{}'", self.kind),
            ));
        }
        validate_component_name(&mut errs, "metadata.name", &meta.name);
        required_str(&mut errs, "metadata.version", &meta.version);
        required_str(&mut errs, "metadata.provider.name", &meta.provider.name);
        validate_labels(&mut errs, "metadata.provider.labels", &meta.provider.labels);
        validate_labels(&mut errs, "metadata.labels", &meta.labels);
        validate_sources(&mut errs, "spec.sources", &self.spec.sources);
        validate_references(&mut errs, "spec.references", &self.spec.references);
        validate_resources(&mut errs, "spec.resources", &self.spec.resources, &meta.version);
        errs
    }

    fn to_value(&self) -> Result<Value, SchemeError> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One `v3alpha1` API group. Both groups share the compiled JSON schema.
pub struct V3Alpha1Scheme {
    api_version: &'static str,
    json_scheme: Arc<JsonScheme>,
}

impl V3Alpha1Scheme {
    pub fn new(api_version: &'static str, json_scheme: Arc<JsonScheme>) -> Self {
        Self {
            api_version,
            json_scheme,
        }
    }

    pub fn json_scheme() -> Result<Arc<JsonScheme>, SchemeError> {
        Ok(Arc::new(JsonScheme::compile(API_VERSION_V3ALPHA1, JSON_SCHEMA)?))
    }
}

impl Scheme for V3Alpha1Scheme {
    fn version(&self) -> &str {
        self.api_version
    }

    fn decode(
        &self,
        document: &Value,
        opts: &DecodeOptions,
    ) -> Result<Box<dyn VersionedDescriptor>, SchemeError> {
        let record: ComponentDescriptorV3 = decode_record(&self.json_scheme, document, opts)?;
        Ok(Box::new(record))
    }

    fn convert_to(
        &self,
        record: &dyn VersionedDescriptor,
        access: &AccessTypeRegistry,
    ) -> Result<ComponentDescriptor, SchemeError> {
        let rec: &ComponentDescriptorV3 = downcast_record(record, self.api_version)?;
        if rec.api_version != self.api_version {
            return Err(SchemeError::Conversion(format!(
                "scheme {} cannot convert a {} record",
                self.api_version, rec.api_version
            )));
        }
        if rec.kind != KIND_COMPONENT_VERSION {
            return Err(SchemeError::InvalidDocument(format!(
                "kind '{}' is not {KIND_COMPONENT_VERSION}",
                rec.kind
            )));
        }
        let meta = &rec.metadata;
        Ok(ComponentDescriptor {
            meta: Metadata {
                configured_version: rec.api_version.clone(),
            },
            component: ComponentSpec {
                object_meta: ObjectMeta {
                    name: meta.name.clone(),
                    version: meta.version.clone(),
                    labels: meta.labels.clone(),
                    provider: meta.provider.clone(),
                    creation_time: meta.creation_time,
                },
                repository_contexts: rec.repository_contexts.clone(),
                sources: rec
                    .spec
                    .sources
                    .iter()
                    .map(|s| s.to_internal(access))
                    .collect::<Result<_, _>>()?,
                references: rec
                    .spec
                    .references
                    .iter()
                    .map(ReferenceRecord::to_internal)
                    .collect(),
                resources: rec
                    .spec
                    .resources
                    .iter()
                    .map(|r| r.to_internal(access))
                    .collect::<Result<_, _>>()?,
            },
            signatures: rec.signatures.clone(),
            nested_digests: rec.nested_digests.clone(),
        })
    }

    fn convert_from(
        &self,
        cd: &ComponentDescriptor,
    ) -> Result<Box<dyn VersionedDescriptor>, SchemeError> {
        let meta = cd.object_meta();
        let mut rec = ComponentDescriptorV3 {
            api_version: self.api_version.to_owned(),
            kind: KIND_COMPONENT_VERSION.to_owned(),
            metadata: ObjectMetaV3 {
                name: meta.name.clone(),
                version: meta.version.clone(),
                labels: meta.labels.clone(),
                provider: meta.provider.clone(),
                creation_time: meta.creation_time,
            },
            repository_contexts: cd.component.repository_contexts.clone(),
            spec: ComponentVersionSpec {
                resources: cd
                    .resources()
                    .iter()
                    .map(ResourceRecord::from_internal)
                    .collect::<Result<_, _>>()?,
                sources: cd
                    .sources()
                    .iter()
                    .map(SourceRecord::from_internal)
                    .collect::<Result<_, _>>()?,
                references: cd
                    .references()
                    .iter()
                    .map(ReferenceRecord::from_internal)
                    .collect(),
            },
            signatures: cd.signatures.clone(),
            nested_digests: cd.nested_digests.clone(),
        };
        rec.apply_defaults();
        Ok(Box::new(rec))
    }
}
