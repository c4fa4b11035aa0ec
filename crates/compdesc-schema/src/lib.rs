//! Component descriptor data model, canonical signing bytes, and equivalence for compdesc.
//!
//! This crate is the schema layer every other compdesc crate builds on: the in-memory
//! descriptor model (`ComponentDescriptor` with its resources, sources and references),
//! element identity rules (`Identity`, `ElementMeta`), labels and digests, the
//! canonicalization engine (`NormalizationRegistry`) that produces the bytes a signer
//! hashes, the equivalence algebra (`EqualState`) that decides whether an existing
//! signature survives a change, and digest helpers for signatures.

pub mod access;
pub mod defaults;
pub mod descriptor;
pub mod digest;
pub mod equivalent;
pub mod excludes;
pub mod identity;
pub mod labels;
pub mod normalize;
pub mod selectors;
pub mod signing;
pub mod types;

pub use access::{
    is_none_access, AccessSpec, AccessTypeRegistry, LocalBlobAccess, NoneAccess,
    OciArtifactAccess, UnstructuredTypedObject,
};
pub use defaults::{
    default_component, default_element_identities, default_legacy_element_identities,
};
pub use descriptor::{
    ComponentDescriptor, ComponentSpec, Metadata, ObjectMeta, Provider, Reference, Relation,
    Resource, Source, SourceRef, DEFAULT_PROVIDER, DEFAULT_SCHEMA_VERSION,
};
pub use digest::{
    Digest, NestedComponentDigests, NestedDigest, Signature, SignatureSpec, Timestamp,
    EXCLUDE_FROM_SIGNATURE, NO_DIGEST,
};
pub use equivalent::{
    digest_equivalent, equivalent_elements, EqualState, Equivalent, EquivalentElement, Severity,
};
pub use identity::{
    duplicate_identities, find_by_identity, is_identity_key, Element, ElementMeta, Identity,
    SYSTEM_IDENTITY_NAME, SYSTEM_IDENTITY_VERSION,
};
pub use labels::{Label, Labels, MergeAlgorithm};
pub use normalize::{
    Normalization, NormalizationRegistry, JSON_NORMALISATION_V1, JSON_NORMALISATION_V2,
    JSON_NORMALISATION_V3,
};
pub use selectors::{sort_references, ElementSelector};
pub use signing::{
    check_normalisable, descriptor_digest, hash_descriptor, select_signature_by_name,
    verify_digest, HasherRegistry, BLAKE3, SHA256, SHA512,
};
pub use types::{ComponentName, NameVersion};

use std::fmt;
use thiserror::Error;

/// Coarse classification of an error, stable across crate boundaries.
///
/// Resolvers use it to tell "try the next backend" (`NotFound`) from "abort".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Invalid,
    AlreadyExists,
    Unknown,
    Conversion,
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::Invalid => "invalid",
            Self::AlreadyExists => "already exists",
            Self::Unknown => "unknown",
            Self::Conversion => "conversion error",
            Self::Io => "I/O error",
            Self::Other => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("{element} {identity} not found")]
    NotFound {
        element: &'static str,
        identity: String,
    },
    #[error("invalid {0}")]
    Invalid(String),
    #[error("unknown {what} '{name}'")]
    Unknown { what: &'static str, name: String },
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DescriptorError {
    pub fn not_found(element: &'static str, identity: impl fmt::Display) -> Self {
        Self::NotFound {
            element,
            identity: identity.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::Unknown { .. } => ErrorKind::Unknown,
            Self::Conversion(_) | Self::Serialization(_) => ErrorKind::Conversion,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
