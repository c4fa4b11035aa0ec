use crate::{ComponentVersionResolver, ResolveError};
use compdesc_schema::{ComponentDescriptor, ComponentName, NameVersion};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A closed, in-memory set of component versions keyed by name and version.
///
/// Descriptors are copied in and copied out.
#[derive(Debug, Default)]
pub struct ComponentVersionSet {
    versions: RwLock<BTreeMap<NameVersion, ComponentDescriptor>>,
}

impl ComponentVersionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors<'a>(cds: impl IntoIterator<Item = &'a ComponentDescriptor>) -> Self {
        let set = Self::new();
        for cd in cds {
            set.add(cd);
        }
        set
    }

    /// Insert a copy, replacing an existing entry with the same name and version.
    pub fn add(&self, cd: &ComponentDescriptor) {
        self.versions.write().insert(cd.name_version(), cd.clone());
    }

    pub fn remove(&self, name: &ComponentName, version: &str) -> Option<ComponentDescriptor> {
        self.versions
            .write()
            .remove(&NameVersion::new(name.clone(), version))
    }

    pub fn contains(&self, name: &ComponentName, version: &str) -> bool {
        self.versions
            .read()
            .contains_key(&NameVersion::new(name.clone(), version))
    }

    pub fn list(&self) -> Vec<NameVersion> {
        self.versions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.versions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.read().is_empty()
    }
}

impl From<&ComponentDescriptor> for ComponentVersionSet {
    fn from(cd: &ComponentDescriptor) -> Self {
        Self::from_descriptors([cd])
    }
}

impl ComponentVersionResolver for ComponentVersionSet {
    fn lookup(
        &self,
        name: &ComponentName,
        version: &str,
    ) -> Result<ComponentDescriptor, ResolveError> {
        self.versions
            .read()
            .get(&NameVersion::new(name.clone(), version))
            .cloned()
            .ok_or_else(|| ResolveError::not_found(name, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_schema::Label;

    #[test]
    fn lookup_returns_independent_copies() {
        let cd = ComponentDescriptor::new("acme.org/c1", "v1");
        let set = ComponentVersionSet::from(&cd);
        let name = ComponentName::new("acme.org/c1");

        let mut first = set.lookup(&name, "v1").unwrap();
        first.component.object_meta.labels.set(Label::new("mutated", true));
        let second = set.lookup(&name, "v1").unwrap();
        assert_eq!(second, cd);
    }

    #[test]
    fn missing_version_is_not_found() {
        let set = ComponentVersionSet::from(&ComponentDescriptor::new("acme.org/c1", "v1"));
        let err = set.lookup(&ComponentName::new("acme.org/c1"), "v2").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "component version acme.org/c1:v2 not found");
    }

    #[test]
    fn add_replaces_and_remove_deletes() {
        let set = ComponentVersionSet::new();
        assert!(set.is_empty());
        let mut cd = ComponentDescriptor::new("acme.org/c1", "v1");
        set.add(&cd);
        cd.component.object_meta.provider.name = "other".to_owned();
        set.add(&cd);
        assert_eq!(set.len(), 1);

        let name = ComponentName::new("acme.org/c1");
        assert_eq!(set.lookup(&name, "v1").unwrap().object_meta().provider.name, "other");
        assert!(set.remove(&name, "v1").is_some());
        assert!(!set.contains(&name, "v1"));
    }

    #[test]
    fn list_is_sorted() {
        let set = ComponentVersionSet::from_descriptors(&[
            ComponentDescriptor::new("acme.org/b", "1"),
            ComponentDescriptor::new("acme.org/a", "2"),
            ComponentDescriptor::new("acme.org/a", "1"),
        ]);
        let names: Vec<_> = set.list().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["acme.org/a:1", "acme.org/a:2", "acme.org/b:1"]);
    }
}
