use super::{json_pretty, CommandResult, Context, EXIT_NOT_EQUIVALENT, EXIT_SUCCESS};
use compdesc_schema::{EqualState, Equivalent};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    state: String,
    equivalent: bool,
    local_hash_equal: bool,
    artifact_equal: bool,
    artifact_detectable: bool,
    /// Whether a signature over the first descriptor still holds for the second.
    hash_equal: bool,
}

impl From<EqualState> for Report {
    fn from(state: EqualState) -> Self {
        Self {
            state: state.to_string(),
            equivalent: state.is_equivalent(),
            local_hash_equal: state.is_local_hash_equal(),
            artifact_equal: state.is_artifact_equal(),
            artifact_detectable: state.is_artifact_detectable(),
            hash_equal: state.is_hash_equal(),
        }
    }
}

pub fn run(ctx: &Context, a: &Path, b: &Path) -> CommandResult {
    let opts = ctx.decode_options(false);
    let left = ctx.read_descriptor(a, &opts)?;
    let right = ctx.read_descriptor(b, &opts)?;
    let state = left.equivalent(&right);

    if ctx.json {
        println!("{}", json_pretty(&Report::from(state))?);
    } else {
        println!("{state}");
    }
    Ok(if state.is_equivalent() {
        EXIT_SUCCESS
    } else {
        EXIT_NOT_EQUIVALENT
    })
}
