use super::{json_pretty, write_stdout, CommandError, CommandResult, Context, EXIT_SUCCESS};
use compdesc_schema::NormalizationRegistry;
use std::path::Path;

pub fn run(ctx: &Context, file: &Path, algorithm: Option<&str>) -> CommandResult {
    let cd = ctx.read_descriptor(file, &ctx.decode_options(false))?;
    let algorithm = algorithm.unwrap_or(&ctx.config.normalisation);
    let bytes = NormalizationRegistry::with_defaults().normalize(&cd, algorithm)?;
    if ctx.json {
        let normalized = String::from_utf8(bytes)
            .map_err(|e| CommandError::failure(format!("normalised form is not UTF-8: {e}")))?;
        println!(
            "{}",
            json_pretty(&serde_json::json!({
                "component": cd.name_version(),
                "algorithm": algorithm,
                "normalised": normalized,
            }))?
        );
    } else {
        write_stdout(&bytes)?;
        println!();
    }
    Ok(EXIT_SUCCESS)
}
