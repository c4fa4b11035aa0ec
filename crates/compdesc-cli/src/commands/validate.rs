use super::{exit_code, json_pretty, read_input, CommandResult, Context, EXIT_SUCCESS};
use compdesc_versions::SchemeError;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

fn problems(e: &SchemeError) -> Vec<String> {
    match e {
        SchemeError::Validation(errs) => errs.iter().map(ToString::to_string).collect(),
        SchemeError::UnknownFields(fields) => {
            fields.iter().map(|f| format!("{f}: unknown field")).collect()
        }
        other => vec![other.to_string()],
    }
}

pub fn run(ctx: &Context, file: &Path, strict: bool) -> CommandResult {
    let bytes = read_input(file)?;
    let opts = ctx.decode_options(strict);
    let (report, code) = match ctx.schemes.decode(&bytes, &opts) {
        Ok(cd) => (
            Report {
                valid: true,
                component: Some(cd.name_version().to_string()),
                schema_version: Some(cd.schema_version().to_owned()),
                errors: Vec::new(),
            },
            EXIT_SUCCESS,
        ),
        Err(e) => (
            Report {
                valid: false,
                component: None,
                schema_version: None,
                errors: problems(&e),
            },
            exit_code(e.kind()),
        ),
    };

    if ctx.json {
        println!("{}", json_pretty(&report)?);
    } else if report.valid {
        println!(
            "{} is valid ({})",
            report.component.unwrap_or_default(),
            report.schema_version.unwrap_or_default()
        );
    } else {
        eprintln!("{} is invalid:", file.display());
        for problem in &report.errors {
            eprintln!("  {problem}");
        }
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_versions::FieldError;

    #[test]
    fn field_errors_are_listed_one_by_one() {
        let e = SchemeError::Validation(vec![
            FieldError::required("component.name"),
            FieldError::required("component.version"),
        ]);
        let listed = problems(&e);
        assert_eq!(listed.len(), 2);
        assert!(listed[0].starts_with("component.name"));
    }

    #[test]
    fn unknown_fields_are_named() {
        let e = SchemeError::UnknownFields(vec!["component.colour".into()]);
        assert_eq!(problems(&e), vec!["component.colour: unknown field"]);
    }
}
