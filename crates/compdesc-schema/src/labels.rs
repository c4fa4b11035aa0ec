use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::{Deref, DerefMut};

/// Strategy hint used when labels of two descriptor states are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAlgorithm {
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// A named, arbitrarily structured annotation.
///
/// `signing = true` makes the label non-volatile: it enters the signed bytes and any
/// change to it invalidates a signature. Other labels are volatile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub signing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeAlgorithm>,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            version: None,
            signing: false,
            merge: None,
        }
    }

    #[must_use]
    pub fn signing(mut self) -> Self {
        self.signing = true;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Ordered label list with lookup by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Label> {
        self.0.iter().find(|l| l.name == name)
    }

    /// Replace the label with the same name, or append.
    pub fn set(&mut self, label: Label) {
        match self.0.iter_mut().find(|l| l.name == label.name) {
            Some(existing) => *existing = label,
            None => self.0.push(label),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|l| l.name != name);
        before != self.0.len()
    }

    /// Non-volatile labels only.
    pub fn signing(&self) -> impl Iterator<Item = &Label> {
        self.0.iter().filter(|l| l.signing)
    }

    /// Names that are empty or used more than once, in list order.
    pub fn invalid_names(&self) -> Vec<(usize, String)> {
        let mut seen = std::collections::HashSet::new();
        self.0
            .iter()
            .enumerate()
            .filter(|(_, l)| l.name.is_empty() || !seen.insert(l.name.as_str()))
            .map(|(i, l)| (i, l.name.clone()))
            .collect()
    }
}

impl Deref for Labels {
    type Target = Vec<Label>;
    fn deref(&self) -> &Vec<Label> {
        &self.0
    }
}

impl DerefMut for Labels {
    fn deref_mut(&mut self) -> &mut Vec<Label> {
        &mut self.0
    }
}

impl From<Vec<Label>> for Labels {
    fn from(v: Vec<Label>) -> Self {
        Self(v)
    }
}

impl FromIterator<Label> for Labels {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
