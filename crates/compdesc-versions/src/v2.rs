//! The `v2` dialect: `meta.schemaVersion` plus a `component` body.

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

pub const SCHEMA_VERSION_V2: &str = "v2";

const JSON_SCHEMA: &str = include_str!("../schemas/component-descriptor-v2.json");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptorV2 {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub component: ComponentV2,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_digests: Vec<NestedComponentDigests>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentV2 {
    #[serde(default)]
    pub name: ComponentName,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repository_contexts: Vec<UnstructuredTypedObject>,
    #[serde(default)]
    pub provider: ProviderV2,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub component_references: Vec<ReferenceRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

/// `v2` allows the provider as a bare name or as `{name, labels}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderV2 {
    Name(String),
    Full(Provider),
}

impl Default for ProviderV2 {
    fn default() -> Self {
        Self::Name(String::new())
    }
}

impl ProviderV2 {
    pub fn into_provider(self) -> Provider {
        match self {
            Self::Name(name) => Provider::new(name),
            Self::Full(p) => p,
        }
    }

    fn from_provider(p: &Provider) -> Self {
        if p.labels.is_empty() {
            Self::Name(p.name.clone())
        } else {
            Self::Full(p.clone())
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Full(p) => &p.name,
        }
    }
}

impl VersionedDescriptor for ComponentDescriptorV2 {
    fn schema_version(&self) -> &str {
        &self.meta.schema_version
    }

    fn apply_defaults(&mut self) {
        let c = &mut self.component;
        default_elements(
            &c.version,
            &mut c.resources,
            &mut c.sources,
            &mut c.component_references,
        );
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errs = Vec::new();
        let c = &self.component;
        required_str(&mut errs, "meta.schemaVersion", &self.meta.schema_version);
        validate_component_name(&mut errs, "component.name", &c.name);
        required_str(&mut errs, "component.version", &c.version);
        required_str(&mut errs, "component.provider", self.component.provider.name());
        if let ProviderV2::Full(p) = &c.provider {
            validate_labels(&mut errs, "component.provider.labels", &p.labels);
        }
        validate_labels(&mut errs, "component.labels", &c.labels);
        validate_sources(&mut errs, "component.sources", &c.sources);
        validate_references(&mut errs, "component.componentReferences", &c.component_references);
        validate_resources(&mut errs, "component.resources", &c.resources, &c.version);
        errs
    }

    fn to_value(&self) -> Result<Value, SchemeError> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct V2Scheme {
    json_scheme: JsonScheme,
}

impl V2Scheme {
    pub fn new() -> Result<Self, SchemeError> {
        Ok(Self {
            json_scheme: JsonScheme::compile(SCHEMA_VERSION_V2, JSON_SCHEMA)?,
        })
    }
}

impl Scheme for V2Scheme {
    fn version(&self) -> &str {
        SCHEMA_VERSION_V2
    }

    fn decode(
        &self,
        document: &Value,
        opts: &DecodeOptions,
    ) -> Result<Box<dyn VersionedDescriptor>, SchemeError> {
        let record: ComponentDescriptorV2 = decode_record(&self.json_scheme, document, opts)?;
        Ok(Box::new(record))
    }

    fn convert_to(
        &self,
        record: &dyn VersionedDescriptor,
        access: &AccessTypeRegistry,
    ) -> Result<ComponentDescriptor, SchemeError> {
        let rec: &ComponentDescriptorV2 = downcast_record(record, SCHEMA_VERSION_V2)?;
        let c = &rec.component;
        Ok(ComponentDescriptor {
            meta: Metadata {
                configured_version: SCHEMA_VERSION_V2.to_owned(),
            },
            component: ComponentSpec {
                object_meta: ObjectMeta {
                    name: c.name.clone(),
                    version: c.version.clone(),
                    labels: c.labels.clone(),
                    provider: c.provider.clone().into_provider(),
                    creation_time: c.creation_time,
                },
                repository_contexts: c.repository_contexts.clone(),
                sources: c
                    .sources
                    .iter()
                    .map(|s| s.to_internal(access))
                    .collect::<Result<_, _>>()?,
                references: c
                    .component_references
                    .iter()
                    .map(ReferenceRecord::to_internal)
                    .collect(),
                resources: c
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
        let mut rec = ComponentDescriptorV2 {
            meta: Meta {
                schema_version: SCHEMA_VERSION_V2.to_owned(),
            },
            component: ComponentV2 {
                name: meta.name.clone(),
                version: meta.version.clone(),
                labels: meta.labels.clone(),
                creation_time: meta.creation_time,
                repository_contexts: cd.component.repository_contexts.clone(),
                provider: ProviderV2::from_provider(&meta.provider),
                sources: cd
                    .sources()
                    .iter()
                    .map(SourceRecord::from_internal)
                    .collect::<Result<_, _>>()?,
                component_references: cd
                    .references()
                    .iter()
                    .map(ReferenceRecord::from_internal)
                    .collect(),
                resources: cd
                    .resources()
                    .iter()
                    .map(ResourceRecord::from_internal)
                    .collect::<Result<_, _>>()?,
            },
            signatures: cd.signatures.clone(),
            nested_digests: cd.nested_digests.clone(),
        };
        rec.apply_defaults();
        Ok(Box::new(rec))
    }
}
