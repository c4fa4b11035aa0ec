//! Descriptor digests for signatures.

use crate::access::is_none_access;
use crate::descriptor::ComponentDescriptor;
use crate::digest::{Digest, Signature};
use crate::normalize::NormalizationRegistry;
use crate::DescriptorError;
use parking_lot::RwLock;
use sha2::Digest as _;
use std::collections::BTreeMap;
use tracing::debug;

pub const SHA256: &str = "SHA-256";
pub const SHA512: &str = "SHA-512";
pub const BLAKE3: &str = "BLAKE3";

pub type HashFn = fn(&[u8]) -> Vec<u8>;

/// Hash algorithms by name.
pub struct HasherRegistry {
    hashers: RwLock<BTreeMap<String, HashFn>>,
}

impl HasherRegistry {
    pub fn new() -> Self {
        Self {
            hashers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(SHA256, |data| sha2::Sha256::digest(data).to_vec());
        registry.register(SHA512, |data| sha2::Sha512::digest(data).to_vec());
        registry.register(BLAKE3, |data| blake3::hash(data).as_bytes().to_vec());
        registry
    }

    pub fn register(&self, name: &str, hasher: HashFn) {
        self.hashers.write().insert(name.to_owned(), hasher);
    }

    pub fn names(&self) -> Vec<String> {
        self.hashers.read().keys().cloned().collect()
    }

    /// Lowercase hex digest of `data`.
    pub fn hash_hex(&self, name: &str, data: &[u8]) -> Result<String, DescriptorError> {
        let hasher = self
            .hashers
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| DescriptorError::Unknown {
                what: "hash algorithm",
                name: name.to_owned(),
            })?;
        Ok(hex::encode(hasher(data)))
    }
}

impl Default for HasherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Verify that every artifact digest needed for canonicalization is present.
pub fn check_normalisable(cd: &ComponentDescriptor) -> Result<(), DescriptorError> {
    for r in cd.references() {
        if !r.digest.as_ref().is_some_and(Digest::is_complete) {
            return Err(DescriptorError::Invalid(format!(
                "missing digest in component reference {}:{}",
                r.element.name, r.element.version
            )));
        }
    }
    for r in cd.resources() {
        let none = is_none_access(r.access.as_ref());
        match &r.digest {
            None if !none => {
                return Err(DescriptorError::Invalid(format!(
                    "missing digest in resource {}:{}",
                    r.element.name, r.element.version
                )));
            }
            Some(d) if none && !d.is_excluded() => {
                return Err(DescriptorError::Invalid(format!(
                    "digest for resource {}:{} with none access not allowed",
                    r.element.name, r.element.version
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Hex digest of the descriptor's canonical bytes.
pub fn hash_descriptor(
    cd: &ComponentDescriptor,
    normalisations: &NormalizationRegistry,
    hashers: &HasherRegistry,
    normalisation: &str,
    hash: &str,
) -> Result<String, DescriptorError> {
    let bytes = normalisations.normalize(cd, normalisation)?;
    hashers.hash_hex(hash, &bytes)
}

/// Digest triple of the descriptor, ready to be stored in a signature.
pub fn descriptor_digest(
    cd: &ComponentDescriptor,
    normalisations: &NormalizationRegistry,
    hashers: &HasherRegistry,
    normalisation: &str,
    hash: &str,
) -> Result<Digest, DescriptorError> {
    let value = hash_descriptor(cd, normalisations, hashers, normalisation, hash)?;
    Ok(Digest::new(hash, normalisation, value))
}

pub fn select_signature_by_name<'a>(
    cd: &'a ComponentDescriptor,
    name: &str,
) -> Result<&'a Signature, DescriptorError> {
    cd.signatures
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| DescriptorError::not_found("signature", name))
}

/// Recompute the digest recorded in signature `name` and compare.
pub fn verify_digest(
    cd: &ComponentDescriptor,
    normalisations: &NormalizationRegistry,
    hashers: &HasherRegistry,
    name: &str,
) -> Result<bool, DescriptorError> {
    let signature = select_signature_by_name(cd, name)?;
    let recorded = &signature.digest;
    let actual = hash_descriptor(
        cd,
        normalisations,
        hashers,
        &recorded.normalisation_algorithm,
        &recorded.hash_algorithm,
    )?;
    let ok = actual == recorded.value;
    if !ok {
        debug!(
            "signature {name} of {}: digest {} does not match {actual}",
            cd.name_version(),
            recorded.value
        );
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessSpec;
    use crate::descriptor::{Reference, Relation, Resource};
    use crate::digest::SignatureSpec;
    use crate::normalize::{JSON_NORMALISATION_V1, JSON_NORMALISATION_V3};
    use crate::ErrorKind;

    fn sig(name: &str, digest: Digest) -> Signature {
        Signature {
            name: name.to_owned(),
            digest,
            signature: SignatureSpec {
                algorithm: "RSASSA-PSS".to_owned(),
                value: "00".to_owned(),
                media_type: "application/vnd.ocm.signature.rsa".to_owned(),
                issuer: None,
            },
            timestamp: None,
        }
    }

    #[test]
    fn known_hash_vectors() {
        let h = HasherRegistry::with_defaults();
        assert_eq!(
            h.hash_hex(SHA256, b"abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(h.hash_hex(SHA512, b"").unwrap().len(), 128);
        assert_eq!(h.hash_hex(BLAKE3, b"").unwrap().len(), 64);
        assert_eq!(h.hash_hex("MD5", b"").unwrap_err().kind(), ErrorKind::Unknown);
    }

    #[test]
    fn normalisable_rules() {
        let mut cd = ComponentDescriptor::new("acme.org/c", "1");
        cd.component
            .resources
            .push(Resource::new("r", "1", "blob", Relation::Local).with_access(AccessSpec::oci_artifact("x")));
        assert!(check_normalisable(&cd).is_err());

        cd.component.resources[0].digest = Some(Digest::excluded());
        assert!(check_normalisable(&cd).is_ok());

        cd.component.resources[0].access = Some(AccessSpec::none());
        assert!(check_normalisable(&cd).is_ok());
        cd.component.resources[0].digest = Some(Digest::new(SHA256, "genericBlobDigest/v1", "aa"));
        assert_eq!(check_normalisable(&cd).unwrap_err().kind(), ErrorKind::Invalid);

        cd.component.resources[0].digest = None;
        cd.component.references.push(Reference::new("ref", "acme.org/d", "1"));
        assert!(check_normalisable(&cd).is_err());
        cd.component.references[0].digest = Some(Digest::new(SHA256, JSON_NORMALISATION_V3, "bb"));
        assert!(check_normalisable(&cd).is_ok());
    }

    #[test]
    fn digest_and_verify() {
        let norms = NormalizationRegistry::with_defaults();
        let hashers = HasherRegistry::with_defaults();
        let mut cd = ComponentDescriptor::new("acme.org/c", "1");
        let d = descriptor_digest(&cd, &norms, &hashers, JSON_NORMALISATION_V1, SHA256).unwrap();
        assert_eq!(d.hash_algorithm, SHA256);
        assert_eq!(d.normalisation_algorithm, JSON_NORMALISATION_V1);
        assert_eq!(d.value.len(), 64);

        cd.signatures.push(sig("good", d.clone()));
        cd.signatures
            .push(sig("bad", Digest::new(SHA256, JSON_NORMALISATION_V1, "00")));
        assert!(verify_digest(&cd, &norms, &hashers, "good").unwrap());
        assert!(!verify_digest(&cd, &norms, &hashers, "bad").unwrap());
        assert!(verify_digest(&cd, &norms, &hashers, "missing")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn signature_lookup() {
        let mut cd = ComponentDescriptor::new("acme.org/c", "1");
        cd.signatures.push(sig("a", Digest::excluded()));
        assert_eq!(select_signature_by_name(&cd, "a").unwrap().name, "a");
        assert!(select_signature_by_name(&cd, "b").unwrap_err().is_not_found());
    }
}
