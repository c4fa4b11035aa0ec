//! Compiled JSON-schema documents.

use crate::validation::FieldError;
use crate::SchemeError;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fmt;

/// A JSON-schema document compiled for one schema version.
pub struct JsonScheme {
    version: String,
    compiled: JSONSchema,
}

impl JsonScheme {
    pub fn compile(version: &str, source: &str) -> Result<Self, SchemeError> {
        let schema: Value = serde_json::from_str(source)?;
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| SchemeError::Schema {
                version: version.to_owned(),
                message: e.to_string(),
            })?;
        Ok(Self {
            version: version.to_owned(),
            compiled,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Structural violations, one field error per failed keyword.
    pub fn validate(&self, document: &Value) -> Vec<FieldError> {
        match self.compiled.validate(document) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| FieldError::invalid(pointer_to_path(&e.instance_path.to_string()), e.to_string()))
                .collect(),
        }
    }
}

impl fmt::Debug for JsonScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonScheme")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// `/component/resources/0/name` becomes `component.resources[0].name`.
pub fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::new();
    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            path.push('[');
            path.push_str(&token);
            path.push(']');
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&token);
        }
    }
    if path.is_empty() {
        path.push('.');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {"type": "string"},
            "items": {"type": "array", "items": {"type": "integer"}}
        }
    }"#;

    #[test]
    fn pointer_conversion() {
        assert_eq!(pointer_to_path("/component/resources/0/name"), "component.resources[0].name");
        assert_eq!(pointer_to_path("/a~1b/c~0d"), "a/b.c~d");
        assert_eq!(pointer_to_path(""), ".");
    }

    #[test]
    fn reports_instance_paths() {
        let scheme = JsonScheme::compile("test", SCHEMA).unwrap();
        assert!(scheme.validate(&json!({"name": "x", "items": [1, 2]})).is_empty());

        let errs = scheme.validate(&json!({"name": "x", "items": [1, "two"]}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "items[1]");

        let errs = scheme.validate(&json!({}));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, ".");
        assert!(errs[0].detail.contains("name"));
    }

    #[test]
    fn broken_schema_is_reported() {
        let err = JsonScheme::compile("broken", r#"{"type": 12}"#).unwrap_err();
        assert!(matches!(err, SchemeError::Schema { ref version, .. } if version == "broken"));
    }
}
