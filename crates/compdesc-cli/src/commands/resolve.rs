use super::{json_pretty, write_stdout, CommandError, CommandResult, Context, EXIT_SUCCESS};
use compdesc_resolve::{
    resolve_reference_path, resolve_resource_reference, ComponentVersionResolver,
    ComponentVersionSet, CompoundResolver, DirectoryResolver, ResourceReference,
};
use compdesc_schema::Identity;
use compdesc_versions::{EncodeOptions, Format};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Directory stores from `--lookup` first, then from the config.
fn build_resolver(ctx: &Context, extra: &[PathBuf]) -> Arc<dyn ComponentVersionResolver> {
    let opts = ctx.decode_options(false);
    let resolvers: Vec<Arc<dyn ComponentVersionResolver>> = extra
        .iter()
        .chain(&ctx.config.lookup_dirs)
        .map(|dir| {
            debug!("lookup directory {}", dir.display());
            Arc::new(DirectoryResolver::new(dir, ctx.schemes.clone()).with_options(opts))
                as Arc<dyn ComponentVersionResolver>
        })
        .collect();
    if resolvers.is_empty() {
        return Arc::new(ComponentVersionSet::new());
    }
    CompoundResolver::compose(resolvers)
}

pub fn parse_identities(specs: &[String]) -> Result<Vec<Identity>, CommandError> {
    specs
        .iter()
        .map(|s| Identity::parse(s).map_err(CommandError::from))
        .collect()
}

pub fn run(
    ctx: &Context,
    root: &Path,
    path: &[String],
    resource: Option<&str>,
    lookup: &[PathBuf],
) -> CommandResult {
    let cd = ctx.read_descriptor(root, &ctx.decode_options(false))?;
    let path = parse_identities(path)?;
    let resolver = build_resolver(ctx, lookup);

    let Some(resource) = resource else {
        let target = resolve_reference_path(&cd, &path, resolver)?;
        let encode = EncodeOptions {
            schema_version: None,
            format: if ctx.json { Format::Json } else { Format::Yaml },
        };
        write_stdout(&ctx.schemes.encode(&target, &encode)?)?;
        return Ok(EXIT_SUCCESS);
    };

    let rref = ResourceReference::new(Identity::parse(resource)?, path);
    let (found, owner) = resolve_resource_reference(&cd, &rref, resolver)?;
    if ctx.json {
        println!(
            "{}",
            json_pretty(&serde_json::json!({
                "component": owner.name_version(),
                "resource": found,
            }))?
        );
    } else {
        println!(
            "{}:{} ({}) in {}",
            found.element.name,
            found.element.version,
            found.kind,
            owner.name_version()
        );
    }
    Ok(EXIT_SUCCESS)
}
