//! Equivalence algebra over descriptor states.
//!
//! Two descriptors are compared along independent axes: whether the locally hashed
//! content is equal, whether artifact digests are equal, whether artifact equality can
//! be determined at all, and whether the states are fully equivalent (volatile content
//! included). States compose with [`EqualState::apply`]; every flag is sticky, so the
//! worst difference found anywhere in the tree dominates.

use crate::access::is_none_access;
use crate::descriptor::{ComponentDescriptor, ObjectMeta, Reference, Resource, Source};
use crate::digest::Digest;
use crate::identity::{find_by_identity, Element, ElementMeta};
use crate::labels::{Label, Labels};
use std::fmt;

/// Dominant axis of an [`EqualState`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Equivalent,
    /// Only volatile content differs; a signature stays valid.
    NotEquivalent,
    NotDetectable,
    NotArtifactEqual,
    NotLocalHashEqual,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equivalent => "equivalent",
            Self::NotEquivalent => "not equivalent",
            Self::NotDetectable => "not detectable",
            Self::NotArtifactEqual => "not artifact equal",
            Self::NotLocalHashEqual => "not local hash equal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EqualState {
    not_local_hash_equal: bool,
    not_artifact_equal: bool,
    not_detectable: bool,
    not_equivalent: bool,
}

impl EqualState {
    pub const fn equivalent() -> Self {
        Self {
            not_local_hash_equal: false,
            not_artifact_equal: false,
            not_detectable: false,
            not_equivalent: false,
        }
    }

    /// Volatile difference only.
    pub const fn not_equivalent() -> Self {
        Self {
            not_equivalent: true,
            ..Self::equivalent()
        }
    }

    pub const fn not_local_hash_equal() -> Self {
        Self {
            not_local_hash_equal: true,
            not_equivalent: true,
            ..Self::equivalent()
        }
    }

    pub const fn not_artifact_equal() -> Self {
        Self {
            not_artifact_equal: true,
            not_equivalent: true,
            ..Self::equivalent()
        }
    }

    pub const fn not_detectable() -> Self {
        Self {
            not_detectable: true,
            not_equivalent: true,
            ..Self::equivalent()
        }
    }

    /// [`not_local_hash_equal`](Self::not_local_hash_equal) unless `equal`.
    pub const fn local_hash_equal(equal: bool) -> Self {
        if equal {
            Self::equivalent()
        } else {
            Self::not_local_hash_equal()
        }
    }

    /// [`not_equivalent`](Self::not_equivalent) unless `equal`.
    pub const fn equivalent_if(equal: bool) -> Self {
        if equal {
            Self::equivalent()
        } else {
            Self::not_equivalent()
        }
    }

    /// An artifact that exists on one side only: a real mismatch if the present side
    /// has a digest, otherwise undeterminable.
    pub const fn artifact_mismatch(detectable: bool) -> Self {
        if detectable {
            Self::not_artifact_equal()
        } else {
            Self::not_detectable()
        }
    }

    #[must_use]
    pub const fn apply(self, other: Self) -> Self {
        Self {
            not_local_hash_equal: self.not_local_hash_equal || other.not_local_hash_equal,
            not_artifact_equal: self.not_artifact_equal || other.not_artifact_equal,
            not_detectable: self.not_detectable || other.not_detectable,
            not_equivalent: self.not_equivalent || other.not_equivalent,
        }
    }

    pub const fn is_equivalent(&self) -> bool {
        !self.not_equivalent
    }

    pub const fn is_local_hash_equal(&self) -> bool {
        !self.not_local_hash_equal
    }

    pub const fn is_artifact_equal(&self) -> bool {
        !self.not_artifact_equal
    }

    pub const fn is_artifact_detectable(&self) -> bool {
        !self.not_detectable
    }

    /// The signed hash is known to be unchanged.
    pub const fn is_hash_equal(&self) -> bool {
        self.is_local_hash_equal() && self.is_artifact_equal() && self.is_artifact_detectable()
    }

    pub const fn severity(&self) -> Severity {
        if self.not_local_hash_equal {
            Severity::NotLocalHashEqual
        } else if self.not_artifact_equal {
            Severity::NotArtifactEqual
        } else if self.not_detectable {
            Severity::NotDetectable
        } else if self.not_equivalent {
            Severity::NotEquivalent
        } else {
            Severity::Equivalent
        }
    }
}

impl fmt::Display for EqualState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.severity().fmt(f)
    }
}

pub trait Equivalent {
    fn equivalent(&self, other: &Self) -> EqualState;
}

/// List entries also know how they compare against a missing counterpart.
pub trait EquivalentElement: Element + Equivalent {
    fn equivalent_absent(&self) -> EqualState;
}

/// Digest comparison: absent on both sides is undeterminable, on one side a mismatch.
pub fn digest_equivalent(a: Option<&Digest>, b: Option<&Digest>) -> EqualState {
    match (a, b) {
        (None, None) => EqualState::not_detectable(),
        (Some(a), Some(b)) if a == b => EqualState::equivalent(),
        _ => EqualState::not_artifact_equal(),
    }
}

impl Equivalent for Label {
    fn equivalent(&self, other: &Self) -> EqualState {
        let volatile = EqualState::equivalent_if(self == other);
        if !self.signing && !other.signing {
            return volatile;
        }
        let hashed = self.name == other.name
            && self.version == other.version
            && self.signing == other.signing
            && self.value == other.value;
        EqualState::local_hash_equal(hashed).apply(volatile)
    }
}

fn label_absent(label: &Label) -> EqualState {
    if label.signing {
        EqualState::not_local_hash_equal()
    } else {
        EqualState::not_equivalent()
    }
}

impl Labels {
    /// State of these labels against no labels at all.
    pub fn equivalent_absent(&self) -> EqualState {
        self.iter()
            .map(label_absent)
            .fold(EqualState::equivalent(), EqualState::apply)
    }
}

impl Equivalent for Labels {
    fn equivalent(&self, other: &Self) -> EqualState {
        let mut state = EqualState::equivalent();
        for l in self.iter() {
            state = state.apply(match other.get(&l.name) {
                Some(o) => l.equivalent(o),
                None => label_absent(l),
            });
        }
        for o in other.iter().filter(|o| self.get(&o.name).is_none()) {
            state = state.apply(label_absent(o));
        }
        let order = |labels: &Labels| labels.signing().map(|l| l.name.clone()).collect::<Vec<_>>();
        state.apply(EqualState::local_hash_equal(order(self) == order(other)))
    }
}

impl Equivalent for ElementMeta {
    fn equivalent(&self, other: &Self) -> EqualState {
        EqualState::local_hash_equal(
            self.name == other.name
                && self.version == other.version
                && self.extra_identity == other.extra_identity,
        )
        .apply(self.labels.equivalent(&other.labels))
    }
}

fn effective_digest(r: &Resource) -> Option<&Digest> {
    if is_none_access(r.access.as_ref()) {
        None
    } else {
        r.digest.as_ref()
    }
}

impl Equivalent for Resource {
    fn equivalent(&self, other: &Self) -> EqualState {
        let mut state = EqualState::local_hash_equal(
            self.kind == other.kind
                && self.relation == other.relation
                && self.source_refs == other.source_refs,
        );
        if !is_none_access(self.access.as_ref()) || !is_none_access(other.access.as_ref()) {
            state = state.apply(digest_equivalent(
                effective_digest(self),
                effective_digest(other),
            ));
        }
        state.apply(self.element.equivalent(&other.element))
    }
}

impl EquivalentElement for Resource {
    fn equivalent_absent(&self) -> EqualState {
        let state = EqualState::not_local_hash_equal();
        if self.digest.as_ref().is_some_and(Digest::is_excluded)
            || is_none_access(self.access.as_ref())
        {
            return state;
        }
        state.apply(EqualState::artifact_mismatch(self.digest.is_some()))
    }
}

impl Equivalent for Source {
    fn equivalent(&self, other: &Self) -> EqualState {
        EqualState::local_hash_equal(self.kind == other.kind)
            .apply(self.element.equivalent(&other.element))
    }
}

impl EquivalentElement for Source {
    fn equivalent_absent(&self) -> EqualState {
        EqualState::not_local_hash_equal()
    }
}

impl Equivalent for Reference {
    fn equivalent(&self, other: &Self) -> EqualState {
        let mut state = EqualState::local_hash_equal(self.component_name == other.component_name);
        match (&self.digest, &other.digest) {
            (Some(a), Some(b)) => {
                state = state.apply(digest_equivalent(Some(a), Some(b)));
            }
            // A digest recorded on one side only is volatile for references.
            (Some(_), None) | (None, Some(_)) => {
                state = state.apply(EqualState::not_equivalent());
            }
            (None, None) => {}
        }
        state.apply(self.element.equivalent(&other.element))
    }
}

impl EquivalentElement for Reference {
    fn equivalent_absent(&self) -> EqualState {
        let state = EqualState::not_local_hash_equal();
        if self.digest.is_some() {
            return state.apply(EqualState::not_artifact_equal());
        }
        state
    }
}

/// Compare two element lists, matching entries by effective identity.
///
/// A matched pair at different positions is a local hash difference, since the
/// canonical form keeps list order.
pub fn equivalent_elements<E: EquivalentElement>(a: &[E], b: &[E]) -> EqualState {
    let mut state = EqualState::equivalent();
    for (i, ea) in a.iter().enumerate() {
        let id = ea.meta().identity_in(a);
        state = state.apply(match find_by_identity(b, &id) {
            Some((j, eb)) => ea
                .equivalent(eb)
                .apply(EqualState::local_hash_equal(i == j)),
            None => ea.equivalent_absent(),
        });
    }
    for eb in b {
        let id = eb.meta().identity_in(b);
        if find_by_identity(a, &id).is_none() {
            state = state.apply(eb.equivalent_absent());
        }
    }
    state
}

impl Equivalent for ObjectMeta {
    fn equivalent(&self, other: &Self) -> EqualState {
        EqualState::local_hash_equal(
            self.name == other.name
                && self.version == other.version
                && self.provider.name == other.provider.name,
        )
        .apply(self.labels.equivalent(&other.labels))
        .apply(self.provider.labels.equivalent(&other.provider.labels))
        .apply(EqualState::equivalent_if(self.creation_time == other.creation_time))
    }
}

impl Equivalent for ComponentDescriptor {
    fn equivalent(&self, other: &Self) -> EqualState {
        self.component
            .object_meta
            .equivalent(&other.component.object_meta)
            .apply(equivalent_elements(self.resources(), other.resources()))
            .apply(equivalent_elements(self.sources(), other.sources()))
            .apply(equivalent_elements(self.references(), other.references()))
            .apply(EqualState::equivalent_if(self.signatures == other.signatures))
            .apply(EqualState::equivalent_if(self.nested_digests == other.nested_digests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessSpec;
    use crate::descriptor::Relation;

    fn digest(v: &str) -> Digest {
        Digest::new("SHA-256", "genericBlobDigest/v1", v)
    }

    fn resource(name: &str) -> Resource {
        Resource::new(name, "1.0.0", "blob", Relation::Local)
            .with_access(AccessSpec::oci_artifact("ghcr.io/acme/x:1"))
            .with_digest(digest("aa"))
    }

    #[test]
    fn apply_is_sticky_and_associative() {
        let a = EqualState::not_equivalent();
        let b = EqualState::not_detectable();
        let c = EqualState::not_local_hash_equal();
        assert_eq!(a.apply(b).apply(c), a.apply(b.apply(c)));
        assert_eq!(a.apply(b).severity(), Severity::NotDetectable);
        assert_eq!(a.apply(b).apply(c).severity(), Severity::NotLocalHashEqual);
        assert!(EqualState::equivalent().apply(EqualState::equivalent()).is_equivalent());
    }

    #[test]
    fn severity_precedence() {
        let all = EqualState::not_detectable()
            .apply(EqualState::not_artifact_equal())
            .apply(EqualState::not_equivalent());
        assert_eq!(all.severity(), Severity::NotArtifactEqual);
        assert!(Severity::NotLocalHashEqual > Severity::NotArtifactEqual);
        assert!(Severity::NotArtifactEqual > Severity::NotDetectable);
        assert!(Severity::NotDetectable > Severity::NotEquivalent);
        assert!(Severity::NotEquivalent > Severity::Equivalent);
    }

    #[test]
    fn digest_axis() {
        assert_eq!(digest_equivalent(None, None), EqualState::not_detectable());
        assert_eq!(
            digest_equivalent(Some(&digest("a")), None),
            EqualState::not_artifact_equal()
        );
        assert_eq!(
            digest_equivalent(Some(&digest("a")), Some(&digest("b"))),
            EqualState::not_artifact_equal()
        );
        assert_eq!(
            digest_equivalent(Some(&Digest::excluded()), Some(&Digest::excluded())),
            EqualState::equivalent()
        );
        assert_eq!(
            digest_equivalent(Some(&Digest::excluded()), Some(&digest("a"))),
            EqualState::not_artifact_equal()
        );
    }

    #[test]
    fn signing_label_change_is_local_hash_relevant() {
        let mut a = resource("r");
        a.element.labels.set(Label::new("l", "x").signing());
        let mut b = a.clone();
        b.element.labels.set(Label::new("l", "y").signing());
        let state = a.equivalent(&b);
        assert!(!state.is_local_hash_equal());
        assert!(!state.is_equivalent());
    }

    #[test]
    fn volatile_label_change_is_not_equivalent_only() {
        let mut a = resource("r");
        a.element.labels.set(Label::new("l", "x"));
        let mut b = a.clone();
        b.element.labels.set(Label::new("l", "y"));
        let state = a.equivalent(&b);
        assert_eq!(state, EqualState::not_equivalent());
        assert!(state.is_hash_equal());
    }

    #[test]
    fn signing_label_order_matters() {
        let mut a = ElementMeta::new("e", "1");
        a.labels.set(Label::new("x", 1).signing());
        a.labels.set(Label::new("y", 2).signing());
        let mut b = ElementMeta::new("e", "1");
        b.labels.set(Label::new("y", 2).signing());
        b.labels.set(Label::new("x", 1).signing());
        assert!(!a.equivalent(&b).is_local_hash_equal());
    }

    #[test]
    fn volatile_label_added() {
        let a = resource("r");
        let mut b = a.clone();
        b.element.labels.set(Label::new("new", "v"));
        assert_eq!(a.equivalent(&b), EqualState::not_equivalent());
        assert_eq!(b.equivalent(&a), EqualState::not_equivalent());
    }

    #[test]
    fn resource_digest_cases() {
        let a = resource("r");
        let mut b = a.clone();
        b.digest = None;
        assert_eq!(a.equivalent(&b), EqualState::not_artifact_equal());
        assert_eq!(b.equivalent(&a), EqualState::not_artifact_equal());

        let mut c = a.clone();
        c.digest = None;
        assert_eq!(b.equivalent(&c), EqualState::not_detectable());

        let mut d = a.clone();
        d.digest = Some(digest("bb"));
        assert_eq!(a.equivalent(&d), EqualState::not_artifact_equal());
    }

    #[test]
    fn access_change_is_ignored() {
        let a = resource("r");
        let mut b = a.clone();
        b.access = Some(AccessSpec::local_blob("sha256:1", "application/octet-stream"));
        assert_eq!(a.equivalent(&b), EqualState::equivalent());
    }

    #[test]
    fn none_access_ignores_stale_digests() {
        let mut a = resource("r");
        a.access = Some(AccessSpec::none());
        let mut b = a.clone();
        b.digest = Some(digest("other"));
        assert_eq!(a.equivalent(&b), EqualState::equivalent());
        b.digest = None;
        assert_eq!(a.equivalent(&b), EqualState::equivalent());
    }

    #[test]
    fn extra_resource_with_and_without_digest() {
        let a = vec![resource("r1")];
        let mut b = a.clone();
        b.push(resource("r3"));
        assert_eq!(
            equivalent_elements(&a, &b),
            EqualState::not_local_hash_equal().apply(EqualState::not_artifact_equal())
        );
        b[1].digest = None;
        assert_eq!(
            equivalent_elements(&a, &b),
            EqualState::not_local_hash_equal().apply(EqualState::not_detectable())
        );
        b[1].digest = Some(Digest::excluded());
        assert_eq!(equivalent_elements(&a, &b), EqualState::not_local_hash_equal());
    }

    #[test]
    fn reordered_elements_are_not_local_hash_equal() {
        let a = vec![resource("r1"), resource("r2")];
        let b = vec![resource("r2"), resource("r1")];
        let state = equivalent_elements(&a, &b);
        assert!(!state.is_local_hash_equal());
        assert!(state.is_artifact_equal());
    }

    #[test]
    fn reference_digest_cases() {
        let a = Reference::new("ref", "acme.org/c1", "v1");
        let mut b = a.clone();
        assert_eq!(a.equivalent(&b), EqualState::equivalent());
        b.digest = Some(digest("x"));
        assert_eq!(a.equivalent(&b), EqualState::not_equivalent());
        assert_eq!(b.equivalent(&a), EqualState::not_equivalent());
        assert!(a.equivalent(&b).is_hash_equal());
        let mut d = b.clone();
        d.digest = Some(digest("y"));
        assert_eq!(b.equivalent(&d), EqualState::not_artifact_equal());
        assert_eq!(
            b.equivalent_absent(),
            EqualState::not_local_hash_equal().apply(EqualState::not_artifact_equal())
        );
        let mut c = a.clone();
        c.component_name = "acme.org/c2".into();
        assert!(!a.equivalent(&c).is_local_hash_equal());
    }

    #[test]
    fn source_type_change() {
        let a = Source::new("s", "1", "git");
        let b = Source::new("s", "1", "svn");
        assert_eq!(a.equivalent(&b), EqualState::not_local_hash_equal());
        assert_eq!(a.equivalent(&a.clone()), EqualState::equivalent());
    }

    #[test]
    fn descriptor_signatures_are_volatile() {
        use crate::digest::{Signature, SignatureSpec};
        let a = ComponentDescriptor::new("acme.org/c", "1");
        let mut b = a.clone();
        b.signatures.push(Signature {
            name: "s1".to_owned(),
            digest: digest("d"),
            signature: SignatureSpec {
                algorithm: "RSASSA-PSS".to_owned(),
                value: "00".to_owned(),
                media_type: "application/vnd.ocm.signature.rsa".to_owned(),
                issuer: None,
            },
            timestamp: None,
        });
        assert_eq!(a.equivalent(&b), EqualState::not_equivalent());
        assert_eq!(b.equivalent(&b.clone()), EqualState::equivalent());
    }

    #[test]
    fn descriptor_provider_and_labels() {
        let a = ComponentDescriptor::new("acme.org/c", "1");
        let mut b = a.clone();
        b.component.object_meta.provider.name = "other".to_owned();
        assert!(!a.equivalent(&b).is_local_hash_equal());

        let mut c = a.clone();
        c.component
            .object_meta
            .provider
            .labels
            .set(Label::new("p", "v"));
        assert_eq!(a.equivalent(&c), EqualState::not_equivalent());
    }
}
