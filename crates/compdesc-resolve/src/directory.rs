use crate::{ComponentVersionResolver, ResolveError};
use compdesc_schema::{ComponentDescriptor, ComponentName, NameVersion};
use compdesc_versions::{DecodeOptions, EncodeOptions, SchemeRegistry};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// File name of a descriptor inside its version directory.
pub const DESCRIPTOR_FILE: &str = "component-descriptor.yaml";

/// Component versions stored as `<root>/<component name>/<version>/component-descriptor.yaml`.
pub struct DirectoryResolver {
    root: PathBuf,
    schemes: Arc<SchemeRegistry>,
    options: DecodeOptions,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>, schemes: Arc<SchemeRegistry>) -> Self {
        Self {
            root: root.into(),
            schemes,
            options: DecodeOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn descriptor_path(&self, name: &ComponentName, version: &str) -> PathBuf {
        self.root.join(name.as_str()).join(version).join(DESCRIPTOR_FILE)
    }

    /// Write `cd` in its configured schema version, atomically.
    pub fn store(&self, cd: &ComponentDescriptor) -> Result<PathBuf, ResolveError> {
        let path = self.descriptor_path(cd.name(), cd.version());
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::other(format!("no parent directory for {}", path.display())))?;
        fs::create_dir_all(dir)?;
        let bytes = self.schemes.encode(cd, &EncodeOptions::default())?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| ResolveError::Io(e.error))?;
        info!("stored {} at {}", cd.name_version(), path.display());
        Ok(path)
    }
}

impl ComponentVersionResolver for DirectoryResolver {
    fn lookup(
        &self,
        name: &ComponentName,
        version: &str,
    ) -> Result<ComponentDescriptor, ResolveError> {
        let path = self.descriptor_path(name, version);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no descriptor at {}", path.display());
                return Err(ResolveError::not_found(name, version));
            }
            Err(e) => return Err(ResolveError::from(e).context(path.display().to_string())),
        };
        let cd = self
            .schemes
            .decode(&bytes, &self.options)
            .map_err(|e| ResolveError::from(e).context(path.display().to_string()))?;
        if cd.name() != name || cd.version() != version {
            return Err(ResolveError::Mismatch {
                path: path.display().to_string(),
                expected: NameVersion::new(name.clone(), version),
                found: cd.name_version(),
            });
        }
        debug!("loaded {name}:{version} from {}", path.display());
        Ok(cd)
    }
}
