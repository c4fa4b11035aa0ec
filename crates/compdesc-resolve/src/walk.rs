//! Following reference paths through the component graph.

use crate::compound::CompoundResolver;
use crate::set::ComponentVersionSet;
use crate::{ComponentVersionResolver, ResolveError};
use compdesc_schema::{ComponentDescriptor, Identity, Resource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Follow `path` from `root`, one reference per hop.
///
/// Each hop looks the target up in a copy of `root` first, then in `resolver`, so a
/// reference back to the root never reaches the external resolver. The first
/// failing hop aborts the walk; the error names the component version it started
/// from and the reference identity.
pub fn resolve_reference_path(
    root: &ComponentDescriptor,
    path: &[Identity],
    resolver: Arc<dyn ComponentVersionResolver>,
) -> Result<ComponentDescriptor, ResolveError> {
    let mut current = root.clone();
    if path.is_empty() {
        return Ok(current);
    }
    let lookup = CompoundResolver::compose(vec![
        Arc::new(ComponentVersionSet::from(root)),
        resolver,
    ]);
    for id in path {
        let origin = current.name_version();
        let reference = current
            .reference_by_identity(id)
            .map_err(|e| ResolveError::from(e).context(format!("component version {origin}")))?;
        let target = reference.target();
        debug!("following reference {id} from {origin} to {target}");
        let next = lookup
            .lookup(&target.name, &target.version)
            .map_err(|e| e.context(format!("component version {origin}: reference {id}")))?;
        current = next;
    }
    Ok(current)
}

/// A resource addressed by its identity in the component version reached via
/// `reference_path`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub resource: Identity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_path: Vec<Identity>,
}

impl ResourceReference {
    pub fn new(resource: Identity, reference_path: Vec<Identity>) -> Self {
        Self {
            resource,
            reference_path,
        }
    }

    pub fn resolve(
        &self,
        root: &ComponentDescriptor,
        resolver: Arc<dyn ComponentVersionResolver>,
    ) -> Result<(Resource, ComponentDescriptor), ResolveError> {
        resolve_resource_reference(root, self, resolver)
    }
}

/// Walk the reference path, then pick the resource by its full identity.
/// Returns the resource together with the component version owning it.
pub fn resolve_resource_reference(
    root: &ComponentDescriptor,
    rref: &ResourceReference,
    resolver: Arc<dyn ComponentVersionResolver>,
) -> Result<(Resource, ComponentDescriptor), ResolveError> {
    let owner = resolve_reference_path(root, &rref.reference_path, resolver)?;
    let resource = owner
        .resource_by_identity(&rref.resource)
        .map_err(|e| ResolveError::from(e).context(format!("component version {}", owner.name_version())))?
        .clone();
    Ok((resource, owner))
}

/// Walk the reference path, then select resources of type `kind` whose identity
/// contains every attribute of `selector` (`name`, `version` and extra identity
/// keys). Unmatched selectors give an empty list.
pub fn resolve_resources_by_type(
    root: &ComponentDescriptor,
    path: &[Identity],
    kind: &str,
    selector: &Identity,
    resolver: Arc<dyn ComponentVersionResolver>,
) -> Result<(Vec<Resource>, ComponentDescriptor), ResolveError> {
    let owner = resolve_reference_path(root, path, resolver)?;
    let resources = owner
        .select_resource_by_type_and_identity(kind, selector)
        .into_iter()
        .cloned()
        .collect();
    Ok((resources, owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_schema::{ComponentName, ErrorKind, Reference, Relation};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: ComponentVersionSet,
        calls: AtomicUsize,
    }

    impl ComponentVersionResolver for Counting {
        fn lookup(&self, name: &ComponentName, version: &str) -> Result<ComponentDescriptor, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(name, version)
        }
    }

    fn component(name: &str, refs: &[(&str, &str)]) -> ComponentDescriptor {
        let mut cd = ComponentDescriptor::new(name, "v1");
        for (ref_name, target) in refs {
            cd.component
                .references
                .push(Reference::new(*ref_name, *target, "v1"));
        }
        cd
    }

    #[test]
    fn empty_path_returns_root() {
        let root = component("acme.org/root", &[]);
        let cd = resolve_reference_path(&root, &[], Arc::new(ComponentVersionSet::new())).unwrap();
        assert_eq!(cd, root);
    }

    #[test]
    fn self_reference_skips_external_resolver() {
        let root = component("acme.org/root", &[("me", "acme.org/root")]);
        let counting = Arc::new(Counting {
            inner: ComponentVersionSet::new(),
            calls: AtomicUsize::new(0),
        });
        let cd = resolve_reference_path(&root, &[Identity::named("me")], counting.clone()).unwrap();
        assert_eq!(cd, root);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn each_hop_is_one_lookup() {
        let c1 = component("acme.org/c1", &[]);
        let c2 = component("acme.org/c2", &[("down", "acme.org/c1")]);
        let root = component("acme.org/c3", &[("down", "acme.org/c2")]);
        let counting = Arc::new(Counting {
            inner: ComponentVersionSet::from_descriptors([&c1, &c2]),
            calls: AtomicUsize::new(0),
        });
        let path = [Identity::named("down"), Identity::named("down")];
        let cd = resolve_reference_path(&root, &path, counting.clone()).unwrap();
        assert_eq!(cd, c1);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_reference_names_origin() {
        let root = component("acme.org/c3", &[]);
        let err = resolve_reference_path(&root, &[Identity::named("nested")], Arc::new(ComponentVersionSet::new()))
            .unwrap_err();
        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("acme.org/c3:v1"), "{msg}");
        assert!(msg.contains(r#"{"name":"nested"}"#), "{msg}");
    }

    #[test]
    fn unresolvable_hop_fails_fast() {
        let c2 = component("acme.org/c2", &[("ref", "acme.org/c1")]);
        let root = component("acme.org/c3", &[("nested", "acme.org/c2")]);
        let path = [Identity::named("nested"), Identity::named("ref"), Identity::named("more")];
        let err = resolve_reference_path(&root, &path, Arc::new(ComponentVersionSet::from(&c2))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let msg = err.to_string();
        assert!(msg.starts_with(r#"component version acme.org/c2:v1: reference {"name":"ref"}"#), "{msg}");
        assert!(msg.contains("acme.org/c1:v1 not found"), "{msg}");
    }

    #[test]
    fn resource_by_type_and_partial_identity() {
        let mut root = component("acme.org/root", &[]);
        for (name, version, kind) in [("img", "1", "ociImage"), ("img", "2", "ociImage"), ("chart", "1", "helmChart")] {
            root.component
                .resources
                .push(Resource::new(name, version, kind, Relation::External));
        }
        compdesc_schema::default_component(&mut root);
        let resolver: Arc<dyn ComponentVersionResolver> = Arc::new(ComponentVersionSet::new());

        let (found, owner) =
            resolve_resources_by_type(&root, &[], "ociImage", &Identity::named("img"), resolver.clone()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(owner.name(), "acme.org/root");

        let selector = Identity::named("img").with("version", "2");
        let (found, _) = resolve_resources_by_type(&root, &[], "ociImage", &selector, resolver.clone()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].element.version, "2");

        let (found, _) = resolve_resources_by_type(&root, &[], "helmChart", &Identity::named("img"), resolver).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn resource_reference_serde_shape() {
        let rref = ResourceReference::new(
            Identity::named("testdata"),
            vec![Identity::named("nested"), Identity::named("ref")],
        );
        let v = serde_json::to_value(&rref).unwrap();
        assert_eq!(
            v,
            json!({"resource": {"name": "testdata"}, "referencePath": [{"name": "nested"}, {"name": "ref"}]})
        );
        let back: ResourceReference = serde_json::from_value(json!({"resource": {"name": "x"}})).unwrap();
        assert!(back.reference_path.is_empty());
    }
}
