use super::{json_pretty, CommandResult, Context, EXIT_SUCCESS};
use compdesc_schema::{check_normalisable, descriptor_digest, HasherRegistry, NormalizationRegistry};
use std::path::Path;

pub fn run(
    ctx: &Context,
    file: &Path,
    algorithm: Option<&str>,
    hash: Option<&str>,
) -> CommandResult {
    let cd = ctx.read_descriptor(file, &ctx.decode_options(false))?;
    check_normalisable(&cd)?;
    let digest = descriptor_digest(
        &cd,
        &NormalizationRegistry::with_defaults(),
        &HasherRegistry::with_defaults(),
        algorithm.unwrap_or(&ctx.config.normalisation),
        hash.unwrap_or(&ctx.config.hash_algorithm),
    )?;
    if ctx.json {
        println!("{}", json_pretty(&digest)?);
    } else {
        println!("{}", digest.value);
    }
    Ok(EXIT_SUCCESS)
}
