//! Field-level validation shared by every scheme.
//!
//! Validators report every problem they find instead of stopping at the first one;
//! paths use the dotted/indexed form of the wire document, e.g.
//! `component.resources[0].version`.

use crate::elements::{ReferenceRecord, ResourceRecord, SourceRecord};
use compdesc_schema::{
    duplicate_identities, is_identity_key, ComponentName, Element, Identity, Labels, Relation,
    SourceRef, SYSTEM_IDENTITY_NAME,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    Invalid,
    Duplicate,
    NotSupported,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Required => "required",
            Self::Invalid => "invalid",
            Self::Duplicate => "duplicate",
            Self::NotSupported => "not supported",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub path: String,
    pub detail: String,
}

impl FieldError {
    pub fn required(path: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Required,
            path: path.into(),
            detail: String::new(),
        }
    }

    pub fn invalid(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Invalid,
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn duplicate(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Duplicate,
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn not_supported(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::NotSupported,
            path: path.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}: {}", self.path, self.kind)
        } else {
            write!(f, "{}: {}: {}", self.path, self.kind, self.detail)
        }
    }
}

pub fn required_str(errs: &mut Vec<FieldError>, path: &str, value: &str) {
    if value.is_empty() {
        errs.push(FieldError::required(path));
    }
}

pub fn validate_component_name(errs: &mut Vec<FieldError>, path: &str, name: &ComponentName) {
    if name.is_empty() {
        errs.push(FieldError::required(path));
    } else if !name.is_valid() {
        errs.push(FieldError::invalid(
            path,
            format!("'{name}' is not a valid component name"),
        ));
    }
}

pub fn validate_labels(errs: &mut Vec<FieldError>, path: &str, labels: &Labels) {
    for (i, name) in labels.invalid_names() {
        if name.is_empty() {
            errs.push(FieldError::required(format!("{path}[{i}].name")));
        } else {
            errs.push(FieldError::duplicate(format!("{path}[{i}].name"), name));
        }
    }
}

pub fn validate_identity(errs: &mut Vec<FieldError>, path: &str, identity: &Identity) {
    for key in identity.invalid_keys() {
        errs.push(FieldError::invalid(
            format!("{path}.{key}"),
            "identity attribute keys must be lower case alphanumerics with '-', '_' or '+'",
        ));
    }
    if identity.contains_key(SYSTEM_IDENTITY_NAME) {
        errs.push(FieldError::invalid(
            format!("{path}.{SYSTEM_IDENTITY_NAME}"),
            "'name' is reserved and cannot be an extra identity attribute",
        ));
    }
}

fn validate_element<E: Element>(errs: &mut Vec<FieldError>, path: &str, element: &E) {
    let meta = element.meta();
    if meta.name.is_empty() {
        errs.push(FieldError::required(format!("{path}.name")));
    } else if !is_identity_key(&meta.name) {
        errs.push(FieldError::invalid(
            format!("{path}.name"),
            format!("'{}' is not a valid element name", meta.name),
        ));
    }
    validate_identity(errs, &format!("{path}.extraIdentity"), &meta.extra_identity);
    validate_labels(errs, &format!("{path}.labels"), &meta.labels);
}

fn validate_duplicates<E: Element>(errs: &mut Vec<FieldError>, path: &str, list: &[E]) {
    for (i, id) in duplicate_identities(list) {
        errs.push(FieldError::duplicate(format!("{path}[{i}]"), id.to_string()));
    }
}

pub fn validate_sources(errs: &mut Vec<FieldError>, path: &str, sources: &[SourceRecord]) {
    for (i, src) in sources.iter().enumerate() {
        let p = format!("{path}[{i}]");
        validate_element(errs, &p, src);
        required_str(errs, &format!("{p}.type"), &src.kind);
    }
    validate_duplicates(errs, path, sources);
}

pub fn validate_references(
    errs: &mut Vec<FieldError>,
    path: &str,
    references: &[ReferenceRecord],
) {
    for (i, r) in references.iter().enumerate() {
        let p = format!("{path}[{i}]");
        validate_element(errs, &p, r);
        validate_component_name(errs, &format!("{p}.componentName"), &r.component_name);
        required_str(errs, &format!("{p}.version"), &r.element.version);
    }
    validate_duplicates(errs, path, references);
}

/// Key syntax of a selector; unlike extra identities it may name `name` and `version`.
pub fn validate_identity_selector(errs: &mut Vec<FieldError>, path: &str, selector: &Identity) {
    for key in selector.invalid_keys() {
        errs.push(FieldError::invalid(
            format!("{path}.{key}"),
            "identity attribute keys must be lower case alphanumerics with '-', '_' or '+'",
        ));
    }
}

fn validate_source_refs(errs: &mut Vec<FieldError>, path: &str, refs: &[SourceRef]) {
    for (i, r) in refs.iter().enumerate() {
        validate_identity_selector(
            errs,
            &format!("{path}[{i}].identitySelector"),
            &r.identity_selector,
        );
        validate_labels(errs, &format!("{path}[{i}].labels"), &r.labels);
    }
}

/// Resource checks; `component_version` is the version local resources must carry.
pub fn validate_resources(
    errs: &mut Vec<FieldError>,
    path: &str,
    resources: &[ResourceRecord],
    component_version: &str,
) {
    for (i, r) in resources.iter().enumerate() {
        let p = format!("{path}[{i}]");
        validate_element(errs, &p, r);
        required_str(errs, &format!("{p}.version"), &r.element.version);
        required_str(errs, &format!("{p}.type"), &r.kind);
        let relation = match r.relation.parse::<Relation>() {
            Ok(relation) => Some(relation),
            Err(e) => {
                errs.push(FieldError::not_supported(format!("{p}.relation"), e));
                None
            }
        };
        if relation == Some(Relation::Local)
            && !r.element.version.is_empty()
            && r.element.version != component_version
        {
            errs.push(FieldError::invalid(
                format!("{p}.version"),
                format!(
                    "version of local resource '{}' must match the component version '{component_version}'",
                    r.element.version
                ),
            ));
        }
        if r.access.is_none() {
            errs.push(FieldError::required(format!("{p}.access")));
        }
        validate_source_refs(errs, &format!("{p}.srcRefs"), &r.source_refs);
    }
    validate_duplicates(errs, path, resources);
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_schema::{ElementMeta, Label, UnstructuredTypedObject};

    fn resource(name: &str, version: &str, relation: &str) -> ResourceRecord {
        ResourceRecord {
            element: ElementMeta::new(name, version),
            kind: "blob".to_owned(),
            relation: relation.to_owned(),
            source_refs: Vec::new(),
            digest: None,
            access: Some(UnstructuredTypedObject::new("none")),
        }
    }

    #[test]
    fn field_error_display() {
        assert_eq!(
            FieldError::required("component.name").to_string(),
            "component.name: required"
        );
        assert_eq!(
            FieldError::duplicate("x[1]", "a").to_string(),
            "x[1]: duplicate: a"
        );
    }

    #[test]
    fn source_ref_selector_checks_key_syntax_only() {
        let mut r = resource("a", "1.0.0", "external");
        r.source_refs = vec![
            SourceRef {
                identity_selector: Identity::named("repo").with("version", "1.0.0"),
                labels: Labels::default(),
            },
            SourceRef {
                identity_selector: Identity::named("repo").with("Bad Key", "x"),
                labels: Labels::default(),
            },
        ];
        let mut errs = Vec::new();
        validate_resources(&mut errs, "component.resources", &[r], "2.0.0");
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert_eq!(
            errs[0].path,
            "component.resources[0].srcRefs[1].identitySelector.Bad Key"
        );
    }

    #[test]
    fn local_resource_version_must_match_component() {
        let mut errs = Vec::new();
        validate_resources(
            &mut errs,
            "component.resources",
            &[resource("a", "1.0.0", "local"), resource("b", "0.1.0", "external")],
            "2.0.0",
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "component.resources[0].version");
        assert_eq!(errs[0].kind, FieldErrorKind::Invalid);
    }

    #[test]
    fn resource_required_fields() {
        let mut r = resource("", "", "sideways");
        r.kind.clear();
        r.access = None;
        let mut errs = Vec::new();
        validate_resources(&mut errs, "spec.resources", &[r], "1");
        let paths: Vec<_> = errs.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "spec.resources[0].name",
                "spec.resources[0].version",
                "spec.resources[0].type",
                "spec.resources[0].relation",
                "spec.resources[0].access",
            ]
        );
        assert_eq!(errs[3].kind, FieldErrorKind::NotSupported);
    }

    #[test]
    fn duplicates_are_reported_with_identity() {
        let mut errs = Vec::new();
        validate_resources(
            &mut errs,
            "component.resources",
            &[resource("a", "1", "external"), resource("a", "1", "external")],
            "1",
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, FieldErrorKind::Duplicate);
        assert_eq!(errs[0].path, "component.resources[1]");
        assert!(errs[0].detail.contains(r#""name":"a""#));
    }

    #[test]
    fn same_name_different_version_is_not_duplicate() {
        let mut errs = Vec::new();
        validate_resources(
            &mut errs,
            "component.resources",
            &[resource("a", "1", "external"), resource("a", "2", "external")],
            "1",
        );
        assert!(errs.is_empty(), "{errs:?}");
    }

    #[test]
    fn identity_keys_are_checked() {
        let mut errs = Vec::new();
        let id = Identity::new().with("Bad Key", "x").with("name", "y").with("arch", "amd64");
        validate_identity(&mut errs, "r.extraIdentity", &id);
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().any(|e| e.path == "r.extraIdentity.Bad Key"));
        assert!(errs.iter().any(|e| e.path == "r.extraIdentity.name"));
    }

    #[test]
    fn label_names_empty_or_repeated() {
        let labels: Labels = vec![Label::new("a", 1), Label::new("", 2), Label::new("a", 3)].into();
        let mut errs = Vec::new();
        validate_labels(&mut errs, "component.labels", &labels);
        assert_eq!(
            errs,
            [
                FieldError::required("component.labels[1].name"),
                FieldError::duplicate("component.labels[2].name", "a"),
            ]
        );
    }

    #[test]
    fn reference_needs_component_name() {
        let mut errs = Vec::new();
        let r = ReferenceRecord {
            element: ElementMeta::new("ref", "1.0.0"),
            component_name: ComponentName::new("nodomain"),
            digest: None,
        };
        validate_references(&mut errs, "component.componentReferences", &[r]);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "component.componentReferences[0].componentName");
    }
}
