//! Resolvers composed of other resolvers.

use crate::{ComponentVersionResolver, ResolveError};
use compdesc_schema::{ComponentDescriptor, ComponentName};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Tries each resolver in order; moves on only when a resolver reports `NotFound`.
#[derive(Default)]
pub struct CompoundResolver {
    resolvers: RwLock<Vec<Arc<dyn ComponentVersionResolver>>>,
}

impl CompoundResolver {
    pub fn new(resolvers: Vec<Arc<dyn ComponentVersionResolver>>) -> Self {
        Self {
            resolvers: RwLock::new(resolvers),
        }
    }

    /// A resolver over `resolvers`; a single entry is returned as is.
    pub fn compose(
        mut resolvers: Vec<Arc<dyn ComponentVersionResolver>>,
    ) -> Arc<dyn ComponentVersionResolver> {
        if resolvers.len() == 1 {
            if let Some(only) = resolvers.pop() {
                return only;
            }
        }
        Arc::new(Self::new(resolvers))
    }

    pub fn add(&self, resolver: Arc<dyn ComponentVersionResolver>) {
        self.resolvers.write().push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.read().is_empty()
    }
}

impl ComponentVersionResolver for CompoundResolver {
    fn lookup(
        &self,
        name: &ComponentName,
        version: &str,
    ) -> Result<ComponentDescriptor, ResolveError> {
        let resolvers = self.resolvers.read().clone();
        for (i, resolver) in resolvers.iter().enumerate() {
            match resolver.lookup(name, version) {
                Err(e) if e.is_not_found() => {
                    debug!("resolver {i} has no {name}:{version}, trying next");
                }
                other => return other,
            }
        }
        Err(ResolveError::not_found(name, version))
    }
}

pub const DEFAULT_PRIORITY: i32 = 10;

/// Routes component names to a resolver by path prefix.
pub struct MatchingRule {
    pub prefix: String,
    pub priority: i32,
    pub resolver: Arc<dyn ComponentVersionResolver>,
}

impl MatchingRule {
    /// An empty prefix matches everything; otherwise the name must equal the prefix
    /// or continue it with a `/` path segment.
    pub fn matches(&self, name: &str) -> bool {
        let prefix = self.prefix.as_str();
        if prefix.is_empty() || name == prefix {
            return true;
        }
        match name.strip_prefix(prefix) {
            Some(rest) => prefix.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Tries matching rules from highest to lowest priority, falling through on
/// `NotFound`. Rules with equal priority keep their insertion order.
#[derive(Default)]
pub struct MatchingResolver {
    rules: RwLock<Vec<Arc<MatchingRule>>>,
}

impl MatchingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(
        &self,
        prefix: impl Into<String>,
        resolver: Arc<dyn ComponentVersionResolver>,
        priority: Option<i32>,
    ) {
        let rule = MatchingRule {
            prefix: prefix.into(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
            resolver,
        };
        debug!("adding resolver rule '{}' with priority {}", rule.prefix, rule.priority);
        let mut rules = self.rules.write();
        let at = rules
            .iter()
            .position(|r| r.priority < rule.priority)
            .unwrap_or(rules.len());
        rules.insert(at, Arc::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

impl ComponentVersionResolver for MatchingResolver {
    fn lookup(
        &self,
        name: &ComponentName,
        version: &str,
    ) -> Result<ComponentDescriptor, ResolveError> {
        let rules = self.rules.read().clone();
        for rule in rules.iter().filter(|r| r.matches(name)) {
            match rule.resolver.lookup(name, version) {
                Err(e) if e.is_not_found() => {
                    debug!("rule '{}' has no {name}:{version}", rule.prefix);
                }
                other => return other,
            }
        }
        Err(ResolveError::not_found(name, version))
    }
}
