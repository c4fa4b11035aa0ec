//! Top-level decode and encode.

use crate::scheme::SchemeRegistry;
use crate::yaml::parse_yaml;
use crate::SchemeError;
use compdesc_schema::ComponentDescriptor;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Skip JSON-schema and field validation.
    pub disable_validation: bool,
    /// Reject fields the scheme does not know.
    pub strict: bool,
}

impl DecodeOptions {
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn disable_validation(mut self, disable: bool) -> Self {
        self.disable_validation = disable;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Target version; the descriptor's configured version when unset.
    pub schema_version: Option<String>,
    pub format: Format,
}

/// Parse YAML or JSON bytes into a JSON value.
pub fn parse_document(input: &[u8]) -> Result<Value, SchemeError> {
    let doc = parse_yaml(input)?;
    if !doc.is_object() {
        return Err(SchemeError::InvalidDocument(
            "component descriptor must be a map".to_owned(),
        ));
    }
    Ok(doc)
}

/// The version tag of a document: `apiVersion` wins over `meta.schemaVersion`.
pub fn detect_version(doc: &Value) -> Result<String, SchemeError> {
    let tag = doc
        .get("apiVersion")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            doc.get("meta")
                .and_then(|m| m.get("schemaVersion"))
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
        });
    tag.map(str::to_owned).ok_or_else(|| {
        SchemeError::InvalidDocument(
            "no schema version found: expected 'apiVersion' or 'meta.schemaVersion'".to_owned(),
        )
    })
}

impl SchemeRegistry {
    /// Decode a document into the canonical model.
    pub fn decode(
        &self,
        input: &[u8],
        opts: &DecodeOptions,
    ) -> Result<ComponentDescriptor, SchemeError> {
        let doc = parse_document(input)?;
        self.decode_value(&doc, opts)
    }

    pub fn decode_value(
        &self,
        doc: &Value,
        opts: &DecodeOptions,
    ) -> Result<ComponentDescriptor, SchemeError> {
        let version = detect_version(doc)?;
        let scheme = self.scheme(&version)?;
        debug!("decoding component descriptor with scheme {version}");
        let record = scheme.decode(doc, opts)?;
        scheme.convert_to(record.as_ref(), self.access())
    }

    /// Encode the canonical model in the requested (or configured) version.
    pub fn encode(
        &self,
        cd: &ComponentDescriptor,
        opts: &EncodeOptions,
    ) -> Result<Vec<u8>, SchemeError> {
        let value = self.encode_value(cd, opts.schema_version.as_deref())?;
        match opts.format {
            Format::Yaml => Ok(serde_yaml::to_string(&value)?.into_bytes()),
            Format::Json => {
                let mut out = serde_json::to_vec_pretty(&value)?;
                out.push(b'\n');
                Ok(out)
            }
        }
    }

    pub fn encode_value(
        &self,
        cd: &ComponentDescriptor,
        version: Option<&str>,
    ) -> Result<Value, SchemeError> {
        let version = version.unwrap_or_else(|| cd.schema_version());
        let scheme = self.scheme(version)?;
        debug!("encoding {} with scheme {version}", cd.name_version());
        let record = scheme.convert_from(cd)?;
        record.to_value()
    }

    /// Decode `input` and re-encode it in another version.
    pub fn convert(
        &self,
        input: &[u8],
        decode: &DecodeOptions,
        encode: &EncodeOptions,
    ) -> Result<Vec<u8>, SchemeError> {
        let cd = self.decode(input, decode)?;
        self.encode(&cd, encode)
    }
}
