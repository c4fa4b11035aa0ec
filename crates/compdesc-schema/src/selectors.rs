//! Element lookup on a descriptor.
//!
//! Two surfaces coexist. The `*_by_*` methods and `local_resources` and friends are
//! the historical API and fail with `NotFound` when nothing matches. The `select_*`
//! methods return a possibly empty vector.

use crate::access::UnstructuredTypedObject;
use crate::descriptor::{ComponentDescriptor, Reference, Relation, Resource, Source};
use crate::identity::{find_by_identity, Element, Identity};
use crate::DescriptorError;
use std::cmp::Ordering;

/// Conjunction of optional element criteria. An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSelector {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Resource or source type; ignored for references.
    pub kind: Option<String>,
    /// Resource relation; ignored for sources and references.
    pub relation: Option<Relation>,
    /// Subset of the effective identity.
    pub identity: Identity,
    /// Names of labels that must be present.
    pub labels: Vec<String>,
}

impl ElementSelector {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn label(mut self, name: impl Into<String>) -> Self {
        self.labels.push(name.into());
        self
    }

    fn matches<E: Element>(&self, e: &E, list: &[E], kind: Option<&str>, relation: Option<Relation>) -> bool {
        let meta = e.meta();
        self.name.as_ref().map_or(true, |n| *n == meta.name)
            && self.version.as_ref().map_or(true, |v| *v == meta.version)
            && self.kind.as_deref().map_or(true, |k| kind.map_or(true, |kind| k == kind))
            && self.relation.map_or(true, |r| relation.map_or(true, |rel| r == rel))
            && (self.identity.is_empty() || meta.identity_in(list).matches(&self.identity))
            && self.labels.iter().all(|l| meta.labels.get(l).is_some())
    }
}

fn non_empty<T>(found: Vec<T>, element: &'static str, what: impl std::fmt::Display) -> Result<Vec<T>, DescriptorError> {
    if found.is_empty() {
        Err(DescriptorError::not_found(element, what))
    } else {
        Ok(found)
    }
}

impl ComponentDescriptor {
    pub fn select_resources(&self, sel: &ElementSelector) -> Vec<&Resource> {
        let list = self.resources();
        list.iter()
            .filter(|r| sel.matches(*r, list, Some(r.kind.as_str()), Some(r.relation)))
            .collect()
    }

    pub fn select_sources(&self, sel: &ElementSelector) -> Vec<&Source> {
        let list = self.sources();
        list.iter()
            .filter(|s| sel.matches(*s, list, Some(s.kind.as_str()), None))
            .collect()
    }

    pub fn select_references(&self, sel: &ElementSelector) -> Vec<&Reference> {
        let list = self.references();
        list.iter()
            .filter(|r| sel.matches(*r, list, None, None))
            .collect()
    }

    /// Resources of type `kind` whose effective identity contains `identity`.
    pub fn select_resource_by_type_and_identity(&self, kind: &str, identity: &Identity) -> Vec<&Resource> {
        self.select_resources(&ElementSelector::new().kind(kind).identity(identity.clone()))
    }

    pub fn resources_by_name(&self, name: &str) -> Result<Vec<&Resource>, DescriptorError> {
        non_empty(
            self.select_resources(&ElementSelector::new().name(name)),
            "resource",
            Identity::named(name),
        )
    }

    pub fn resources_by_type(&self, kind: &str) -> Result<Vec<&Resource>, DescriptorError> {
        non_empty(
            self.select_resources(&ElementSelector::new().kind(kind)),
            "resource",
            format_args!("of type {kind}"),
        )
    }

    fn resources_by_relation(
        &self,
        relation: Relation,
        kind: &str,
        name: &str,
        version: &str,
    ) -> Result<Vec<&Resource>, DescriptorError> {
        let sel = ElementSelector::new()
            .name(name)
            .version(version)
            .kind(kind)
            .relation(relation);
        non_empty(
            self.select_resources(&sel),
            "resource",
            format_args!("{relation} {kind} {name}:{version}"),
        )
    }

    pub fn local_resources(&self, kind: &str, name: &str, version: &str) -> Result<Vec<&Resource>, DescriptorError> {
        self.resources_by_relation(Relation::Local, kind, name, version)
    }

    pub fn external_resources(&self, kind: &str, name: &str, version: &str) -> Result<Vec<&Resource>, DescriptorError> {
        self.resources_by_relation(Relation::External, kind, name, version)
    }

    pub fn sources_by_name(&self, name: &str) -> Result<Vec<&Source>, DescriptorError> {
        non_empty(
            self.select_sources(&ElementSelector::new().name(name)),
            "source",
            Identity::named(name),
        )
    }

    pub fn references_by_name(&self, name: &str) -> Result<Vec<&Reference>, DescriptorError> {
        non_empty(
            self.select_references(&ElementSelector::new().name(name)),
            "component reference",
            Identity::named(name),
        )
    }

    /// References whose effective identity contains every selector.
    pub fn component_references(&self, selectors: &[Identity]) -> Result<Vec<&Reference>, DescriptorError> {
        let list = self.references();
        let found: Vec<_> = list
            .iter()
            .filter(|r| {
                let id = r.element.identity_in(list);
                selectors.iter().all(|s| id.matches(s))
            })
            .collect();
        non_empty(found, "component reference", format_args!("{selectors:?}"))
    }

    pub fn resource_by_identity(&self, id: &Identity) -> Result<&Resource, DescriptorError> {
        by_identity(self.resources(), id)
    }

    pub fn source_by_identity(&self, id: &Identity) -> Result<&Source, DescriptorError> {
        by_identity(self.sources(), id)
    }

    pub fn reference_by_identity(&self, id: &Identity) -> Result<&Reference, DescriptorError> {
        by_identity(self.references(), id)
    }

    pub fn resource_index(&self, id: &Identity) -> Option<usize> {
        find_by_identity(self.resources(), id).map(|(i, _)| i)
    }

    pub fn source_index(&self, id: &Identity) -> Option<usize> {
        find_by_identity(self.sources(), id).map(|(i, _)| i)
    }

    pub fn reference_index(&self, id: &Identity) -> Option<usize> {
        find_by_identity(self.references(), id).map(|(i, _)| i)
    }

    pub fn signature_index(&self, name: &str) -> Option<usize> {
        self.signatures.iter().position(|s| s.name == name)
    }

    /// The repository context the descriptor was last transferred to.
    pub fn effective_repository_context(&self) -> Option<&UnstructuredTypedObject> {
        self.component.repository_contexts.last()
    }

    /// Append `ctx` unless it already is the effective context.
    pub fn add_repository_context(&mut self, ctx: UnstructuredTypedObject) {
        if self.effective_repository_context() != Some(&ctx) {
            self.component.repository_contexts.push(ctx);
        }
    }
}

fn by_identity<'a, E: Element>(list: &'a [E], id: &Identity) -> Result<&'a E, DescriptorError> {
    find_by_identity(list, id)
        .map(|(_, e)| e)
        .ok_or_else(|| DescriptorError::not_found(E::KIND, id))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

/// Sort by name, then by version; semantic versions compare numerically.
pub fn sort_references(refs: &mut [Reference]) {
    refs.sort_by(|a, b| {
        a.element
            .name
            .cmp(&b.element.name)
            .then_with(|| compare_versions(&a.element.version, &b.element.version))
    });
}
