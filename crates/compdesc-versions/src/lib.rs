//! Versioned wire dialects of the component descriptor.
//!
//! A [`Scheme`] owns one dialect: it decodes documents into a version-specific
//! record, defaults and validates that record, and converts it to and from the
//! canonical [`compdesc_schema::ComponentDescriptor`]. The [`SchemeRegistry`] picks the
//! scheme from the version tag of a document and drives the whole decode/encode
//! pipeline.

pub mod codec;
pub mod elements;
pub mod jsonscheme;
pub mod scheme;
pub mod strict;
pub mod v2;
pub mod v3alpha1;
pub mod validation;
pub mod yaml;

pub use codec::{detect_version, parse_document, DecodeOptions, EncodeOptions, Format};
pub use jsonscheme::JsonScheme;
pub use scheme::{Scheme, SchemeRegistry, VersionedDescriptor};
pub use v2::{SCHEMA_VERSION_V2, V2Scheme};
pub use v3alpha1::{V3Alpha1Scheme, API_VERSION_GARDENER_V3ALPHA1, API_VERSION_V3ALPHA1, KIND_COMPONENT_VERSION};
pub use validation::{FieldError, FieldErrorKind};

use compdesc_schema::{DescriptorError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("unknown schema version '{0}'")]
    UnknownVersion(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<FieldError>),
    #[error("unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),
    #[error("schema {version}: {message}")]
    Schema { version: String, message: String },
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SchemeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownVersion(_) => ErrorKind::Unknown,
            Self::Validation(errors)
                if !errors.is_empty()
                    && errors.iter().all(|e| e.kind == FieldErrorKind::Duplicate) =>
            {
                ErrorKind::AlreadyExists
            }
            Self::InvalidDocument(_)
            | Self::Validation(_)
            | Self::UnknownFields(_)
            | Self::Schema { .. }
            | Self::Yaml(_)
            | Self::Json(_) => ErrorKind::Invalid,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Descriptor(e) => e.kind(),
        }
    }

    /// Field errors carried by a validation failure, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}
