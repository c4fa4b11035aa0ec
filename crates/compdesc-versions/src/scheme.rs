//! The scheme abstraction and the registry of known schema versions.

use crate::codec::DecodeOptions;
use crate::jsonscheme::JsonScheme;
use crate::strict::unknown_fields;
use crate::validation::FieldError;
use crate::{v2, v3alpha1, SchemeError};
use compdesc_schema::{AccessTypeRegistry, ComponentDescriptor};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A decoded, version-specific descriptor record.
pub trait VersionedDescriptor: Any + fmt::Debug + Send + Sync {
    fn schema_version(&self) -> &str;

    /// Pure defaulting; never fails and is idempotent.
    fn apply_defaults(&mut self);

    /// Every field error found; empty means valid.
    fn validate(&self) -> Vec<FieldError>;

    fn to_value(&self) -> Result<Value, SchemeError>;

    fn as_any(&self) -> &dyn Any;
}

/// One wire dialect of the component descriptor.
pub trait Scheme: Send + Sync {
    /// The version tag this scheme is registered under.
    fn version(&self) -> &str;

    /// Decode, default and validate a parsed document.
    fn decode(
        &self,
        document: &Value,
        opts: &DecodeOptions,
    ) -> Result<Box<dyn VersionedDescriptor>, SchemeError>;

    /// Version-specific record to the canonical model.
    fn convert_to(
        &self,
        record: &dyn VersionedDescriptor,
        access: &AccessTypeRegistry,
    ) -> Result<ComponentDescriptor, SchemeError>;

    /// Canonical model to a defaulted version-specific record.
    fn convert_from(
        &self,
        cd: &ComponentDescriptor,
    ) -> Result<Box<dyn VersionedDescriptor>, SchemeError>;
}

/// The pipeline every scheme runs on decode: structural validation, typed decoding,
/// the strict unknown-field check, defaulting, then field validation.
pub fn decode_record<T>(
    json_scheme: &JsonScheme,
    document: &Value,
    opts: &DecodeOptions,
) -> Result<T, SchemeError>
where
    T: VersionedDescriptor + DeserializeOwned,
{
    if !opts.disable_validation {
        let errors = json_scheme.validate(document);
        if !errors.is_empty() {
            return Err(SchemeError::Validation(errors));
        }
    }
    let mut record: T = serde_json::from_value(document.clone())?;
    if opts.strict {
        let unknown = unknown_fields(document, &record.to_value()?);
        if !unknown.is_empty() {
            return Err(SchemeError::UnknownFields(unknown));
        }
    }
    record.apply_defaults();
    if !opts.disable_validation {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(SchemeError::Validation(errors));
        }
    }
    Ok(record)
}

/// Downcast a record handed to `convert_to`, failing with a conversion error when it
/// belongs to another scheme.
pub fn downcast_record<'a, T: VersionedDescriptor>(
    record: &'a dyn VersionedDescriptor,
    scheme: &str,
) -> Result<&'a T, SchemeError> {
    record.as_any().downcast_ref::<T>().ok_or_else(|| {
        SchemeError::Conversion(format!(
            "scheme {scheme} cannot convert a {} record",
            record.schema_version()
        ))
    })
}

/// Schema versions by tag, plus the access-type registry used during conversion.
pub struct SchemeRegistry {
    schemes: RwLock<BTreeMap<String, Arc<dyn Scheme>>>,
    access: AccessTypeRegistry,
}

impl SchemeRegistry {
    /// A registry with no schemes.
    pub fn new(access: AccessTypeRegistry) -> Self {
        Self {
            schemes: RwLock::new(BTreeMap::new()),
            access,
        }
    }

    /// `v2`, `ocm.software/v3alpha1` and `ocm.gardener.cloud/v3alpha1`, with the
    /// default access types. Compiles the bundled JSON schemas.
    pub fn with_defaults() -> Result<Self, SchemeError> {
        let registry = Self::new(AccessTypeRegistry::with_defaults());
        registry.register(Arc::new(v2::V2Scheme::new()?));
        let v3 = v3alpha1::V3Alpha1Scheme::json_scheme()?;
        registry.register(Arc::new(v3alpha1::V3Alpha1Scheme::new(
            v3alpha1::API_VERSION_V3ALPHA1,
            Arc::clone(&v3),
        )));
        registry.register(Arc::new(v3alpha1::V3Alpha1Scheme::new(
            v3alpha1::API_VERSION_GARDENER_V3ALPHA1,
            v3,
        )));
        Ok(registry)
    }

    pub fn register(&self, scheme: Arc<dyn Scheme>) {
        let version = scheme.version().to_owned();
        debug!("registering schema version {version}");
        self.schemes.write().insert(version, scheme);
    }

    pub fn get(&self, version: &str) -> Option<Arc<dyn Scheme>> {
        self.schemes.read().get(version).cloned()
    }

    /// Like [`get`](Self::get), but an unregistered version is an error.
    pub fn scheme(&self, version: &str) -> Result<Arc<dyn Scheme>, SchemeError> {
        self.get(version)
            .ok_or_else(|| SchemeError::UnknownVersion(version.to_owned()))
    }

    pub fn versions(&self) -> Vec<String> {
        self.schemes.read().keys().cloned().collect()
    }

    pub fn access(&self) -> &AccessTypeRegistry {
        &self.access
    }
}
