use super::{read_input, write_stdout, CommandError, CommandResult, Context, EXIT_SUCCESS};
use compdesc_versions::{EncodeOptions, Format};
use std::io::Write;
use std::path::Path;
use tracing::info;

pub fn run(ctx: &Context, file: &Path, to: Option<&str>, output: Option<&Path>) -> CommandResult {
    let target = to
        .or(ctx.config.schema_version.as_deref())
        .ok_or_else(|| CommandError::failure("no target version: pass --to or set schema_version"))?;
    let bytes = read_input(file)?;
    let encode = EncodeOptions {
        schema_version: Some(target.to_owned()),
        format: if ctx.json { Format::Json } else { Format::Yaml },
    };
    let converted = ctx
        .schemes
        .convert(&bytes, &ctx.decode_options(false), &encode)
        .map_err(|e| CommandError::from_kind(e.kind(), format!("{}: {e}", file.display())))?;

    match output {
        Some(path) => {
            write_atomic(path, &converted)?;
            info!("wrote {target} descriptor to {}", path.display());
        }
        None => write_stdout(&converted)?,
    }
    Ok(EXIT_SUCCESS)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CommandError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let fail = |e: std::io::Error| CommandError::failure(format!("failed to write {}: {e}", path.display()));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}
