use crate::identity::Identity;
use crate::types::ComponentName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash algorithm and value of the exclusion sentinel.
pub const NO_DIGEST: &str = "NO-DIGEST";
/// Normalisation algorithm of the exclusion sentinel.
pub const EXCLUDE_FROM_SIGNATURE: &str = "EXCLUDE-FROM-SIGNATURE";

/// A (hash algorithm, normalisation algorithm, value) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub hash_algorithm: String,
    pub normalisation_algorithm: String,
    pub value: String,
}

impl Digest {
    pub fn new(
        hash_algorithm: impl Into<String>,
        normalisation_algorithm: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            hash_algorithm: hash_algorithm.into(),
            normalisation_algorithm: normalisation_algorithm.into(),
            value: value.into(),
        }
    }

    /// The sentinel marking an artifact as intentionally excluded from signing.
    pub fn excluded() -> Self {
        Self::new(NO_DIGEST, EXCLUDE_FROM_SIGNATURE, NO_DIGEST)
    }

    pub fn is_excluded(&self) -> bool {
        self.hash_algorithm == NO_DIGEST
            && self.normalisation_algorithm == EXCLUDE_FROM_SIGNATURE
            && self.value == NO_DIGEST
    }

    /// All three fields are set.
    pub fn is_complete(&self) -> bool {
        !self.hash_algorithm.is_empty()
            && !self.normalisation_algorithm.is_empty()
            && !self.value.is_empty()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{}]",
            self.hash_algorithm, self.value, self.normalisation_algorithm
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSpec {
    pub algorithm: String,
    pub value: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// A signature over the canonical bytes of a descriptor, stored in the descriptor itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub digest: Digest,
    pub signature: SignatureSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// Digest of one artifact inside a nested component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedDigest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub extra_identity: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
}

/// Digests recorded for a referenced component version while signing its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedComponentDigests {
    pub name: ComponentName,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Digest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_digests: Vec<NestedDigest>,
}
