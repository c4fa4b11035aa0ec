use crate::descriptor::{ComponentDescriptor, Relation};
use crate::identity::{Element, SYSTEM_IDENTITY_VERSION};

/// Materialize defaults in place.
///
/// Local resources without a version take the component version, then every element
/// whose effective identity needs `version` gets it written into its extra identity.
/// Applying this twice changes nothing.
pub fn default_component(cd: &mut ComponentDescriptor) {
    let version = cd.component.object_meta.version.clone();
    for r in &mut cd.component.resources {
        if r.relation == Relation::Local && r.element.version.is_empty() {
            r.element.version.clone_from(&version);
        }
    }
    default_element_identities(&mut cd.component.resources);
    default_element_identities(&mut cd.component.sources);
    default_element_identities(&mut cd.component.references);
}

/// Write `version` into the extra identity of every element whose effective identity
/// within `list` needs it.
pub fn default_element_identities<E: Element>(list: &mut [E]) {
    let ids: Vec<_> = list.iter().map(|e| e.meta().identity_in(list)).collect();
    for (e, id) in list.iter_mut().zip(ids) {
        let meta = e.meta_mut();
        if let Some(v) = id.get(SYSTEM_IDENTITY_VERSION) {
            if !meta.extra_identity.contains_key(SYSTEM_IDENTITY_VERSION) {
                meta.extra_identity.insert(SYSTEM_IDENTITY_VERSION, v);
            }
        }
    }
}

/// Historical defaulting applied by the older normalisation algorithms.
///
/// Lists are walked in order; an element whose name and extra identity equal those of
/// another element *as they are at that point* gets its own version added to its
/// extra identity.
pub fn default_legacy_element_identities(cd: &mut ComponentDescriptor) {
    legacy_identities(&mut cd.component.resources);
    legacy_identities(&mut cd.component.sources);
    legacy_identities(&mut cd.component.references);
}

fn legacy_identities<E: Element>(list: &mut [E]) {
    for i in 0..list.len() {
        let id = list[i].meta().identity();
        let clash = list
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.meta().identity() == id);
        if clash {
            let meta = list[i].meta_mut();
            let version = meta.version.clone();
            meta.extra_identity.insert(SYSTEM_IDENTITY_VERSION, version);
        }
    }
}
