//! Element identity: the derived attribute map that distinguishes an element within its list.

use crate::labels::Labels;
use crate::DescriptorError;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Reserved identity key carrying the element name. Always present.
pub const SYSTEM_IDENTITY_NAME: &str = "name";
/// Reserved identity key carrying the element version. Only injected when needed.
pub const SYSTEM_IDENTITY_VERSION: &str = "version";

const IDENTITY_KEY_PATTERN: &str = r"^[a-z0-9]([-_+a-z0-9]*[a-z0-9])?$";

fn identity_key_regex() -> Option<&'static regex::Regex> {
    static RE: OnceLock<Option<regex::Regex>> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(IDENTITY_KEY_PATTERN).ok())
        .as_ref()
}

/// Whether `key` is usable as an identity attribute name (and as a resource name):
/// lower case alphanumerics, `-`, `_` or `+`, starting and ending alphanumeric.
pub fn is_identity_key(key: &str) -> bool {
    identity_key_regex().is_some_and(|re| re.is_match(key))
}

/// An ordered string map. Ordering makes the digest independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(BTreeMap<String, String>);

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity consisting of only the `name` key.
    pub fn named(name: impl Into<String>) -> Self {
        let mut id = Self::new();
        id.insert(SYSTEM_IDENTITY_NAME, name);
        id
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Canonical byte form: compact JSON with sorted keys.
    pub fn digest(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Whether every attribute of `selector` is present here with the same value.
    /// Attributes not mentioned by the selector are ignored.
    pub fn matches(&self, selector: &Identity) -> bool {
        selector.iter().all(|(k, v)| self.get(k) == Some(v.as_str()))
    }

    /// Parse `name[,key=value...]`; a bare first segment is taken as the name.
    pub fn parse(spec: &str) -> Result<Self, DescriptorError> {
        let mut id = Self::new();
        for (i, part) in spec.split(',').map(str::trim).enumerate() {
            if part.is_empty() {
                return Err(DescriptorError::Invalid(format!("identity '{spec}': empty attribute")));
            }
            match part.split_once('=') {
                Some((k, v)) if !k.is_empty() => {
                    id.insert(k, v);
                }
                None if i == 0 => {
                    id.insert(SYSTEM_IDENTITY_NAME, part);
                }
                _ => {
                    return Err(DescriptorError::Invalid(format!(
                        "identity '{spec}': expected key=value, got '{part}'"
                    )));
                }
            }
        }
        if !id.contains_key(SYSTEM_IDENTITY_NAME) {
            return Err(DescriptorError::Invalid(format!("identity '{spec}': missing name")));
        }
        Ok(id)
    }

    /// Keys that do not satisfy [`is_identity_key`].
    pub fn invalid_keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| !is_identity_key(k))
            .collect()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(
                f,
                "{}:{}",
                serde_json::Value::from(k.as_str()),
                serde_json::Value::from(v.as_str())
            )?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Identity {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Identity {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Attributes shared by resources, sources and references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementMeta {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Identity::is_empty")]
    pub extra_identity: Identity,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl ElementMeta {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Extra identity plus `name`, without looking at siblings.
    pub fn identity(&self) -> Identity {
        let mut id = self.extra_identity.clone();
        id.insert(SYSTEM_IDENTITY_NAME, self.name.as_str());
        id
    }

    /// Effective identity within `siblings`.
    ///
    /// `version` is added when at least two siblings (this element included) share the
    /// name and, with `version` removed, the same extra identity.
    pub fn identity_in<E: Element>(&self, siblings: &[E]) -> Identity {
        let mut id = self.identity();
        if id.contains_key(SYSTEM_IDENTITY_VERSION) {
            return id;
        }
        let clashes = siblings
            .iter()
            .map(Element::meta)
            .filter(|other| other.name == self.name)
            .filter(|other| {
                let mut extra = other.extra_identity.clone();
                extra.remove(SYSTEM_IDENTITY_VERSION);
                extra == self.extra_identity
            })
            .take(2)
            .count();
        if clashes > 1 {
            id.insert(SYSTEM_IDENTITY_VERSION, self.version.as_str());
        }
        id
    }

    /// Extra identity, `name`, and `version` when it is non-empty.
    pub fn raw_identity(&self) -> Identity {
        let mut id = self.identity();
        if !self.version.is_empty() {
            id.insert(SYSTEM_IDENTITY_VERSION, self.version.as_str());
        }
        id
    }

    /// Extra identity, `name` and `version`, unconditionally.
    pub fn match_base_identity(&self) -> Identity {
        let mut id = self.identity();
        id.insert(SYSTEM_IDENTITY_VERSION, self.version.as_str());
        id
    }
}

/// An entry of one of the descriptor's element lists.
pub trait Element {
    /// Element kind used in diagnostics, e.g. `resource`.
    const KIND: &'static str;

    fn meta(&self) -> &ElementMeta;
    fn meta_mut(&mut self) -> &mut ElementMeta;
}

/// Position and element whose effective identity within `list` equals `id`.
pub fn find_by_identity<'a, E: Element>(list: &'a [E], id: &Identity) -> Option<(usize, &'a E)> {
    let wanted = id.digest();
    list.iter()
        .enumerate()
        .find(|(_, e)| e.meta().identity_in(list).digest() == wanted)
}

/// Indexes (after the first occurrence) whose effective identity repeats an earlier one.
pub fn duplicate_identities<E: Element>(list: &[E]) -> Vec<(usize, Identity)> {
    let mut seen = std::collections::BTreeSet::new();
    let mut dups = Vec::new();
    for (i, e) in list.iter().enumerate() {
        let id = e.meta().identity_in(list);
        if !seen.insert(id.clone()) {
            dups.push((i, id));
        }
    }
    dups
}
