//! Lookup of component versions and resolution of reference paths.
//!
//! A [`ComponentVersionResolver`] is the single capability the walk needs from a
//! repository layer. This crate provides in-memory, compound, prefix-routing and
//! directory-backed resolvers, plus the path walk that follows references from a
//! root descriptor to the component version owning a resource.

pub mod compound;
pub mod directory;
pub mod set;
pub mod walk;

pub use compound::{CompoundResolver, MatchingResolver, MatchingRule, DEFAULT_PRIORITY};
pub use directory::{DirectoryResolver, DESCRIPTOR_FILE};
pub use set::ComponentVersionSet;
pub use walk::{
    resolve_reference_path, resolve_resource_reference, resolve_resources_by_type,
    ResourceReference,
};

use compdesc_schema::{ComponentDescriptor, ComponentName, DescriptorError, ErrorKind, NameVersion};
use compdesc_versions::SchemeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("component version {0} not found")]
    NotFound(NameVersion),
    #[error("{path}: found {found}, expected {expected}")]
    Mismatch {
        path: String,
        expected: NameVersion,
        found: NameVersion,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scheme(#[from] SchemeError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ResolveError>,
    },
}

impl ResolveError {
    pub fn not_found(name: &ComponentName, version: &str) -> Self {
        Self::NotFound(NameVersion::new(name.clone(), version))
    }

    /// Wrap with a context message; the kind of `self` is kept.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Mismatch { .. } => ErrorKind::Invalid,
            Self::Io(_) => ErrorKind::Io,
            Self::Scheme(e) => e.kind(),
            Self::Descriptor(e) => e.kind(),
            Self::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Source of component versions.
///
/// Implementations return an owned copy; callers may mutate it freely.
pub trait ComponentVersionResolver: Send + Sync {
    fn lookup(
        &self,
        name: &ComponentName,
        version: &str,
    ) -> Result<ComponentDescriptor, ResolveError>;
}
