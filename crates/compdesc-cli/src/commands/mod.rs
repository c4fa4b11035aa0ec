pub mod completions;
pub mod convert;
pub mod equivalent;
pub mod hash;
pub mod init_config;
pub mod normalize;
pub mod resolve;
pub mod validate;

use crate::config::Config;
use compdesc_resolve::ResolveError;
use compdesc_schema::{ComponentDescriptor, DescriptorError, ErrorKind};
use compdesc_versions::{DecodeOptions, SchemeError, SchemeRegistry};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INVALID: u8 = 2;
pub const EXIT_NOT_FOUND: u8 = 3;
pub const EXIT_NOT_EQUIVALENT: u8 = 4;

/// A failed command: the message printed on stderr and the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    pub code: u8,
    pub message: String,
}

impl CommandError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(EXIT_FAILURE, message)
    }

    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(exit_code(kind), message)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self::failure(message)
    }
}

impl From<SchemeError> for CommandError {
    fn from(e: SchemeError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<DescriptorError> for CommandError {
    fn from(e: DescriptorError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<ResolveError> for CommandError {
    fn from(e: ResolveError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => EXIT_NOT_FOUND,
        ErrorKind::Invalid | ErrorKind::AlreadyExists => EXIT_INVALID,
        ErrorKind::Unknown | ErrorKind::Conversion | ErrorKind::Io | ErrorKind::Other => {
            EXIT_FAILURE
        }
    }
}

pub type CommandResult = Result<u8, CommandError>;

/// Shared state of one invocation.
pub struct Context {
    pub config: Config,
    pub schemes: Arc<SchemeRegistry>,
    pub json: bool,
}

impl Context {
    pub fn new(config: Config, json: bool) -> Result<Self, CommandError> {
        let schemes = SchemeRegistry::with_defaults()?;
        Ok(Self {
            config,
            schemes: Arc::new(schemes),
            json,
        })
    }

    /// Decode options from the config; `strict` on the command line only tightens.
    pub fn decode_options(&self, strict: bool) -> DecodeOptions {
        DecodeOptions::default()
            .strict(strict || self.config.strict)
            .disable_validation(self.config.disable_validation)
    }

    pub fn read_descriptor(
        &self,
        path: &Path,
        opts: &DecodeOptions,
    ) -> Result<ComponentDescriptor, CommandError> {
        let bytes = read_input(path)?;
        let cd = self
            .schemes
            .decode(&bytes, opts)
            .map_err(|e| CommandError::from_kind(e.kind(), format!("{}: {e}", path.display())))?;
        debug!("read {} from {}", cd.name_version(), path.display());
        Ok(cd)
    }
}

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<Vec<u8>, CommandError> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf)
            .map_err(|e| CommandError::failure(format!("failed to read stdin: {e}")))?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|e| {
        let code = if e.kind() == std::io::ErrorKind::NotFound {
            EXIT_NOT_FOUND
        } else {
            EXIT_FAILURE
        };
        CommandError::new(code, format!("failed to read {}: {e}", path.display()))
    })
}

pub fn write_stdout(bytes: &[u8]) -> Result<(), CommandError> {
    let mut out = std::io::stdout().lock();
    out.write_all(bytes)
        .and_then(|()| out.flush())
        .map_err(|e| CommandError::failure(format!("failed to write output: {e}")))
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, CommandError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CommandError::failure(format!("JSON serialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_schema::Identity;

    #[test]
    fn error_kinds_map_to_exit_codes() {
        assert_eq!(exit_code(ErrorKind::NotFound), EXIT_NOT_FOUND);
        assert_eq!(exit_code(ErrorKind::Invalid), EXIT_INVALID);
        assert_eq!(exit_code(ErrorKind::AlreadyExists), EXIT_INVALID);
        assert_eq!(exit_code(ErrorKind::Unknown), EXIT_FAILURE);
        assert_eq!(exit_code(ErrorKind::Io), EXIT_FAILURE);
    }

    #[test]
    fn scheme_errors_keep_their_kind() {
        let err = CommandError::from(SchemeError::UnknownVersion("v9".into()));
        assert_eq!(err.code, EXIT_FAILURE);
        let err = CommandError::from(SchemeError::InvalidDocument("bad".into()));
        assert_eq!(err.code, EXIT_INVALID);
        assert!(err.message.contains("bad"));
    }

    #[test]
    fn missing_reference_is_not_found() {
        let cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
        let err = cd.reference_by_identity(&Identity::named("nope")).unwrap_err();
        assert_eq!(CommandError::from(err).code, EXIT_NOT_FOUND);
    }

    #[test]
    fn missing_input_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(&dir.path().join("missing.yaml")).unwrap_err();
        assert_eq!(err.code, EXIT_NOT_FOUND);
        assert!(err.message.starts_with("failed to read"));
    }

    #[test]
    fn command_line_strict_overrides_config() {
        let ctx = Context::new(Config::default(), false).unwrap();
        assert!(!ctx.decode_options(false).strict);
        assert!(ctx.decode_options(true).strict);

        let config = Config {
            strict: true,
            disable_validation: true,
            ..Config::default()
        };
        let ctx = Context::new(config, false).unwrap();
        let opts = ctx.decode_options(false);
        assert!(opts.strict);
        assert!(opts.disable_validation);
    }

    #[test]
    fn json_pretty_serializes() {
        let out = json_pretty(&serde_json::json!({"key": "value"})).unwrap();
        assert!(out.contains("\"key\""));
    }
}
