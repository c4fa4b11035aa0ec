//! Wire shapes of resources, sources and references.
//!
//! The element lists look the same in every dialect; only their position in the
//! document differs. Access values stay unstructured on the wire and are decoded
//! through the access-type registry when converting to the canonical model.

use compdesc_schema::{
    default_element_identities, AccessSpec, AccessTypeRegistry, ComponentName, Digest, Element,
    ElementMeta, Reference, Relation, Resource, Source, SourceRef, UnstructuredTypedObject,
};
use serde::{Deserialize, Serialize};

use crate::SchemeError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    #[serde(flatten)]
    pub element: ElementMeta,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub relation: String,
    #[serde(
        rename = "srcRefs",
        alias = "srcRef",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub source_refs: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<UnstructuredTypedObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    #[serde(flatten)]
    pub element: ElementMeta,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<UnstructuredTypedObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    #[serde(flatten)]
    pub element: ElementMeta,
    #[serde(default)]
    pub component_name: ComponentName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

macro_rules! record_element {
    ($ty:ty, $kind:literal) => {
        impl Element for $ty {
            const KIND: &'static str = $kind;
            fn meta(&self) -> &ElementMeta {
                &self.element
            }
            fn meta_mut(&mut self) -> &mut ElementMeta {
                &mut self.element
            }
        }
    };
}

record_element!(ResourceRecord, "resource");
record_element!(SourceRecord, "source");
record_element!(ReferenceRecord, "component reference");

/// Defaulting shared by all dialects.
///
/// A missing relation means `local`; local resources without a version take the
/// component version; colliding identities get `version` materialized.
pub fn default_elements(
    component_version: &str,
    resources: &mut [ResourceRecord],
    sources: &mut [SourceRecord],
    references: &mut [ReferenceRecord],
) {
    for r in resources.iter_mut() {
        if r.relation.is_empty() {
            r.relation = Relation::Local.to_string();
        }
        if r.relation == "local" && r.element.version.is_empty() {
            r.element.version = component_version.to_owned();
        }
    }
    default_element_identities(resources);
    default_element_identities(sources);
    default_element_identities(references);
}

fn decode_access(
    access: Option<&UnstructuredTypedObject>,
    registry: &AccessTypeRegistry,
) -> Result<Option<AccessSpec>, SchemeError> {
    access
        .map(|a| registry.decode(a.clone()).map_err(SchemeError::from))
        .transpose()
}

fn encode_access(access: Option<&AccessSpec>) -> Result<Option<UnstructuredTypedObject>, SchemeError> {
    access
        .map(|a| a.to_unstructured().map_err(SchemeError::from))
        .transpose()
}

impl ResourceRecord {
    pub fn to_internal(&self, registry: &AccessTypeRegistry) -> Result<Resource, SchemeError> {
        let relation = if self.relation.is_empty() {
            Relation::Local
        } else {
            self.relation.parse().map_err(|e: String| {
                SchemeError::Conversion(format!("resource '{}': {e}", self.element.name))
            })?
        };
        Ok(Resource {
            element: self.element.clone(),
            kind: self.kind.clone(),
            relation,
            source_refs: self.source_refs.clone(),
            digest: self.digest.clone(),
            access: decode_access(self.access.as_ref(), registry)?,
        })
    }

    pub fn from_internal(r: &Resource) -> Result<Self, SchemeError> {
        Ok(Self {
            element: r.element.clone(),
            kind: r.kind.clone(),
            relation: r.relation.to_string(),
            source_refs: r.source_refs.clone(),
            digest: r.digest.clone(),
            access: encode_access(r.access.as_ref())?,
        })
    }
}

impl SourceRecord {
    pub fn to_internal(&self, registry: &AccessTypeRegistry) -> Result<Source, SchemeError> {
        Ok(Source {
            element: self.element.clone(),
            kind: self.kind.clone(),
            access: decode_access(self.access.as_ref(), registry)?,
        })
    }

    pub fn from_internal(s: &Source) -> Result<Self, SchemeError> {
        Ok(Self {
            element: s.element.clone(),
            kind: s.kind.clone(),
            access: encode_access(s.access.as_ref())?,
        })
    }
}

impl ReferenceRecord {
    pub fn to_internal(&self) -> Reference {
        Reference {
            element: self.element.clone(),
            component_name: self.component_name.clone(),
            digest: self.digest.clone(),
        }
    }

    pub fn from_internal(r: &Reference) -> Self {
        Self {
            element: r.element.clone(),
            component_name: r.component_name.clone(),
            digest: r.digest.clone(),
        }
    }
}
