//! Subprocess tests for the `compdesc` binary: exit codes, stdout, and JSON shape.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const APP: &str = r"meta:
  schemaVersion: v2
component:
  name: acme.org/app
  version: 1.0.0
  provider: acme
  labels:
    - name: purpose
      value: demo
  componentReferences:
    - name: lib
      componentName: acme.org/lib
      version: 1.0.0
      digest:
        hashAlgorithm: SHA-256
        normalisationAlgorithm: jsonNormalisation/v3
        value: 0a1b2c
  resources:
    - name: notes
      type: plainText
      relation: local
      access:
        type: none
";

const LIB: &str = r"meta:
  schemaVersion: v2
component:
  name: acme.org/lib
  version: 1.0.0
  provider: acme
  resources:
    - name: image
      version: 1.0.0
      type: ociImage
      relation: external
      access:
        type: ociArtifact
        imageReference: ghcr.io/acme/lib:1.0.0
      digest:
        hashAlgorithm: SHA-256
        normalisationAlgorithm: ociArtifactDigest/v1
        value: 77aa
";

fn compdesc_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_compdesc"));
    // Keep the user's config out of the tests.
    cmd.env("HOME", home);
    cmd.env_remove("COMPDESC_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

fn run(home: &Path, args: &[&str]) -> Output {
    compdesc_bin(home).args(args).output().unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn s(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let out = run(home.path(), &["--version"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("compdesc"));
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let out = run(home.path(), &["--help"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for cmd in ["normalize", "hash", "validate", "convert", "equivalent", "resolve"] {
        assert!(text.contains(cmd), "help must list '{cmd}': {text}");
    }
}

#[test]
fn cli_validate_valid_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let out = run(dir.path(), &["validate", &s(&app)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("acme.org/app:1.0.0 is valid (v2)"));
}

#[test]
fn cli_validate_reports_field_errors() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write(
        dir.path(),
        "broken.yaml",
        "meta:\n  schemaVersion: v2\ncomponent:\n  name: acme.org/app\n  provider: acme\n",
    );
    let out = run(dir.path(), &["--json", "validate", &s(&broken)]);
    assert_eq!(out.status.code(), Some(2), "stdout: {}", stdout(&out));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["valid"], false);
    assert!(!report["errors"].as_array().unwrap().is_empty());
}

#[test]
fn cli_validate_strict_rejects_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let extra = APP.replace("  provider: acme\n", "  provider: acme\n  colour: blue\n");
    let path = write(dir.path(), "extra.yaml", &extra);

    let lax = run(dir.path(), &["validate", &s(&path)]);
    assert!(lax.status.success(), "stderr: {}", stderr(&lax));

    let strict = run(dir.path(), &["validate", "--strict", &s(&path)]);
    assert_eq!(strict.status.code(), Some(2));
    assert!(stderr(&strict).contains("colour"), "stderr: {}", stderr(&strict));
}

#[test]
fn cli_hash_is_stable_across_versions() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let v2 = run(dir.path(), &["hash", &s(&app)]);
    assert!(v2.status.success(), "stderr: {}", stderr(&v2));
    let digest = stdout(&v2).trim().to_owned();
    assert_eq!(digest.len(), 64);

    let converted = dir.path().join("app-v3.yaml");
    let out = run(
        dir.path(),
        &["convert", &s(&app), "--to", "ocm.software/v3alpha1", "-o", &s(&converted)],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v3 = run(dir.path(), &["hash", &s(&converted)]);
    assert_eq!(stdout(&v3).trim(), digest);

    let blake = run(dir.path(), &["--json", "hash", &s(&app), "--hash", "BLAKE3"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&blake)).unwrap();
    assert_eq!(parsed["hashAlgorithm"], "BLAKE3");
    assert_eq!(parsed["normalisationAlgorithm"], "jsonNormalisation/v3");
}

#[test]
fn cli_hash_requires_reference_digests() {
    let dir = tempfile::tempdir().unwrap();
    let undigested = APP.replace(
        "      digest:\n        hashAlgorithm: SHA-256\n        normalisationAlgorithm: jsonNormalisation/v3\n        value: 0a1b2c\n",
        "",
    );
    let path = write(dir.path(), "app.yaml", &undigested);
    let out = run(dir.path(), &["hash", &s(&path)]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("missing digest"), "stderr: {}", stderr(&out));
}

#[test]
fn cli_normalize_prints_sorted_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let out = run(dir.path(), &["normalize", &s(&app)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    let parsed: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(parsed["component"]["name"], "acme.org/app");

    let unknown = run(dir.path(), &["normalize", &s(&app), "--algorithm", "bogus/v0"]);
    assert_eq!(unknown.status.code(), Some(1));
}

#[test]
fn cli_convert_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let out = run(
        dir.path(),
        &["--json", "convert", &s(&app), "--to", "ocm.software/v3alpha1"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(parsed["apiVersion"], "ocm.software/v3alpha1");
    assert_eq!(parsed["kind"], "ComponentVersion");
    assert_eq!(parsed["metadata"]["name"], "acme.org/app");

    let unknown = run(dir.path(), &["convert", &s(&app), "--to", "v9"]);
    assert_eq!(unknown.status.code(), Some(1));
}

#[test]
fn cli_equivalent_states() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.yaml", APP);
    let same = run(dir.path(), &["equivalent", &s(&a), &s(&a)]);
    assert_eq!(same.status.code(), Some(0));
    assert_eq!(stdout(&same).trim(), "equivalent");

    let volatile = write(dir.path(), "b.yaml", &APP.replace("value: demo", "value: other"));
    let out = run(dir.path(), &["--json", "equivalent", &s(&a), &s(&volatile)]);
    assert_eq!(out.status.code(), Some(4));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["equivalent"], false);
    assert_eq!(report["localHashEqual"], true);
    assert_eq!(report["hashEqual"], true);
}

#[test]
fn cli_resolve_through_lookup_dir() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let store = dir.path().join("store");
    write(&store, "acme.org/lib/1.0.0/component-descriptor.yaml", LIB);

    let out = run(
        dir.path(),
        &[
            "resolve", &s(&app), "--path", "lib", "--resource", "image", "--lookup", &s(&store),
        ],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out).trim(),
        "image:1.0.0 (ociImage) in acme.org/lib:1.0.0"
    );
}

#[test]
fn cli_resolve_uses_config_lookup_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let store = dir.path().join("store");
    write(&store, "acme.org/lib/1.0.0/component-descriptor.yaml", LIB);
    let config = write(
        dir.path(),
        "config.toml",
        &format!("lookup_dirs = [{:?}]\n", s(&store)),
    );

    let out = run(
        dir.path(),
        &["--config", &s(&config), "--json", "resolve", &s(&app), "--path", "lib"],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(parsed["component"]["name"], "acme.org/lib");
}

#[test]
fn cli_resolve_missing_component_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let empty = dir.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();
    let out = run(
        dir.path(),
        &["resolve", &s(&app), "--path", "lib", "--lookup", &s(&empty)],
    );
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).contains("acme.org/lib:1.0.0 not found"), "stderr: {}", stderr(&out));
}

#[test]
fn cli_missing_input_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(dir.path(), &["hash", &s(&dir.path().join("nope.yaml"))]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn cli_config_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let app = write(dir.path(), "app.yaml", APP);
    let config = write(dir.path(), "config.toml", "colour = \"blue\"\n");
    let out = run(dir.path(), &["--config", &s(&config), "hash", &s(&app)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid config"), "stderr: {}", stderr(&out));
}

#[test]
fn cli_init_config_writes_defaults_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(dir.path(), &["init-config"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let path = dir.path().join(".config/compdesc/config.toml");
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("jsonNormalisation/v3"));

    let again = run(dir.path(), &["init-config"]);
    assert!(!again.status.success());
    let forced = run(dir.path(), &["init-config", "--force"]);
    assert!(forced.status.success());
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let out = run(home.path(), &["completions", "bash"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("compdesc"));
}
