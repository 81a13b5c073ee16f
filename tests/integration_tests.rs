//! Integration tests for the lcv CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VALID: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<LifecycleConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Rule>
    <ID>archive</ID>
    <Filter>
      <Prefix>logs/</Prefix>
    </Filter>
    <Status>Enabled</Status>
    <Transition>
      <Days>30</Days>
      <StorageClass>GLACIER</StorageClass>
    </Transition>
    <Expiration>
      <Days>365</Days>
    </Expiration>
  </Rule>
</LifecycleConfiguration>
"#;

const MISSING_STATUS: &str = r#"<LifecycleConfiguration>
  <Rule>
    <Filter/>
    <Expiration><Days>1</Days></Expiration>
  </Rule>
</LifecycleConfiguration>
"#;

const NO_ACTION: &str = r#"<LifecycleConfiguration>
  <Rule>
    <Filter/>
    <Status>Enabled</Status>
  </Rule>
</LifecycleConfiguration>
"#;

const DEEP_ARCHIVE: &str = r#"<LifecycleConfiguration>
  <Rule>
    <Filter/>
    <Status>Enabled</Status>
    <Transition><Days>10</Days><StorageClass>DEEP_ARCHIVE</StorageClass></Transition>
  </Rule>
</LifecycleConfiguration>
"#;

const UNORDERED: &str = "<LifecycleConfiguration><Rule><Status>Disabled</Status>\
<Expiration><Date>2030-01-01T00:00:00Z</Date></Expiration><Filter/><ID>b</ID></Rule>\
</LifecycleConfiguration>";

/// Helper to get an lcv command isolated from user configuration
fn lcv(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lcv").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("LCV_STRICT")
        .env_remove("LCV_STORAGE_CLASSES")
        .env_remove("LCV_FORMAT")
        .env_remove("LCV_LOG");
    cmd
}

/// Helper to write a document into the temp directory
fn write_doc(tmp: &TempDir, name: &str, content: &str) -> String {
    let path = tmp.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    name.to_string()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("LifecycleConfiguration"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lcv"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_valid_file() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "lifecycle.xml", VALID);

    lcv(tmp.path())
        .args(["validate", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ lifecycle.xml"))
        .stdout(predicate::str::contains("All files passed validation"));
}

#[test]
fn test_validate_members_in_any_order() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "unordered.xml", UNORDERED);

    lcv(tmp.path()).args(["validate", &file]).assert().success();
}

#[test]
fn test_validate_invalid_schema() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "bad.xml", MISSING_STATUS);

    lcv(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ bad.xml - 1 error(s)"))
        .stdout(predicate::str::contains("Missing required element <Status>"))
        .stderr(predicate::str::contains("Validation failed: 1 file has errors"));
}

#[test]
fn test_validate_invalid_xml_syntax() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(
        &tmp,
        "broken.xml",
        "<LifecycleConfiguration><Rule></LifecycleConfiguration>",
    );

    lcv(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stdout(predicate::str::contains("XML syntax error"));
}

#[test]
fn test_validate_missing_file() {
    let tmp = TempDir::new().unwrap();

    lcv(tmp.path())
        .args(["validate", "nope.xml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to read nope.xml"));
}

#[test]
fn test_validate_stdin() {
    let tmp = TempDir::new().unwrap();

    lcv(tmp.path())
        .args(["validate", "-"])
        .write_stdin(VALID)
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ <stdin>"));
}

#[test]
fn test_validate_walks_directories() {
    let tmp = TempDir::new().unwrap();
    write_doc(&tmp, "docs/a.xml", MISSING_STATUS);
    write_doc(&tmp, "docs/nested/b.xml", VALID);
    write_doc(&tmp, "docs/readme.txt", "not xml");

    lcv(tmp.path())
        .args(["validate", "docs", "--keep-going"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validating 2 file(s)"))
        .stdout(predicate::str::contains("Files checked:  2"))
        .stdout(predicate::str::contains("Files passed:   1"));
}

#[test]
fn test_validate_counts_enabled_rules() {
    let tmp = TempDir::new().unwrap();
    write_doc(&tmp, "one.xml", VALID);
    write_doc(&tmp, "two.xml", UNORDERED);

    lcv(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rules checked:  2"))
        .stdout(predicate::str::contains("Rules enabled:  1"));
}

#[test]
fn test_validate_stops_at_first_failure() {
    let tmp = TempDir::new().unwrap();
    write_doc(&tmp, "docs/a.xml", MISSING_STATUS);
    write_doc(&tmp, "docs/b.xml", VALID);

    lcv(tmp.path())
        .args(["validate", "docs"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Files checked:  1"));
}

#[test]
fn test_validate_defaults_to_current_directory() {
    let tmp = TempDir::new().unwrap();
    write_doc(&tmp, "one.xml", VALID);
    write_doc(&tmp, "two.xml", UNORDERED);

    lcv(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files checked:  2"));
}

#[test]
fn test_validate_summary_only() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "good.xml", VALID);

    lcv(tmp.path())
        .args(["validate", "--summary", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation Summary"))
        .stdout(predicate::str::contains("good.xml").not());
}

#[test]
fn test_validate_quiet() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "good.xml", VALID);

    lcv(tmp.path())
        .args(["--quiet", "validate", &file])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_validate_warnings_pass() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "idle.xml", NO_ACTION);

    lcv(tmp.path())
        .args(["validate", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("! idle.xml - 1 warning(s)"))
        .stdout(predicate::str::contains("rule has no lifecycle action"))
        .stdout(predicate::str::contains("Total warnings: 1"));
}

#[test]
fn test_validate_strict_fails_on_warnings() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "idle.xml", NO_ACTION);

    lcv(tmp.path())
        .args(["validate", "--strict", &file])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ idle.xml - 1 error(s)"));
}

#[test]
fn test_validate_strict_from_env() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "idle.xml", NO_ACTION);

    lcv(tmp.path())
        .env("LCV_STRICT", "true")
        .args(["validate", &file])
        .assert()
        .failure();
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_unknown_storage_class_fails_by_default() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "deep.xml", DEEP_ARCHIVE);

    lcv(tmp.path())
        .args(["validate", &file])
        .assert()
        .failure()
        .stdout(predicate::str::contains("DEEP_ARCHIVE"));
}

#[test]
fn test_project_config_storage_classes() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "deep.xml", DEEP_ARCHIVE);
    write_doc(
        &tmp,
        ".lcv.yaml",
        "storage_classes:\n  - STANDARD\n  - GLACIER\n  - DEEP_ARCHIVE\n",
    );

    lcv(tmp.path()).args(["validate", &file]).assert().success();
}

#[test]
fn test_explicit_config_file() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "deep.xml", DEEP_ARCHIVE);
    let config = write_doc(&tmp, "conf/lcv.yaml", "storage_classes: [DEEP_ARCHIVE]\n");

    lcv(tmp.path())
        .args(["--config", &config, "validate", &file])
        .assert()
        .success();
}

#[test]
fn test_explicit_config_must_exist() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "lifecycle.xml", VALID);

    lcv(tmp.path())
        .args(["--config", "missing.yaml", "validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn test_storage_classes_from_env() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "deep.xml", DEEP_ARCHIVE);

    lcv(tmp.path())
        .env("LCV_STORAGE_CLASSES", "STANDARD,DEEP_ARCHIVE")
        .args(["validate", &file])
        .assert()
        .success();
}

// ============================================================================
// Show Command Tests
// ============================================================================

#[test]
fn test_show_yaml() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "lifecycle.xml", VALID);

    lcv(tmp.path())
        .args(["show", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("ID: archive"))
        .stdout(predicate::str::contains("StorageClass: GLACIER"));
}

#[test]
fn test_show_json() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "lifecycle.xml", VALID);

    let output = lcv(tmp.path())
        .args(["show", "--format", "json", &file])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["Rule"][0]["ID"], "archive");
    assert_eq!(value["Rule"][0]["Filter"]["Prefix"], "logs/");
    assert_eq!(value["Rule"][0]["Transition"]["Days"], 30);
    assert_eq!(value["Rule"][0]["Expiration"]["Days"], 365);
}

#[test]
fn test_show_default_format_from_config() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "lifecycle.xml", VALID);

    lcv(tmp.path())
        .env("LCV_FORMAT", "json")
        .args(["show", &file])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_show_invalid_document_fails() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "bad.xml", MISSING_STATUS);

    lcv(tmp.path())
        .args(["show", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required element <Status>"));
}

// ============================================================================
// Fmt Command Tests
// ============================================================================

#[test]
fn test_fmt_prints_canonical_xml() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "unordered.xml", UNORDERED);

    let output = lcv(tmp.path()).args(["fmt", &file]).output().unwrap();
    assert!(output.status.success());

    let xml = String::from_utf8(output.stdout).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\""));
    let id = xml.find("<ID>b</ID>").unwrap();
    let status = xml.find("<Status>Disabled</Status>").unwrap();
    let expiration = xml.find("<Expiration>").unwrap();
    assert!(id < status && status < expiration);
}

#[test]
fn test_fmt_write_rewrites_file() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "unordered.xml", UNORDERED);

    lcv(tmp.path())
        .args(["fmt", "--write", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Formatted unordered.xml"));

    let rewritten = fs::read_to_string(tmp.path().join(&file)).unwrap();
    assert!(rewritten.starts_with("<?xml"));

    lcv(tmp.path())
        .args(["fmt", "--write", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("(unchanged)"));

    lcv(tmp.path()).args(["validate", &file]).assert().success();
}

#[test]
fn test_fmt_url_encoding() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(
        &tmp,
        "spaces.xml",
        "<LifecycleConfiguration><Rule><ID>old logs</ID><Filter><Prefix>old logs/</Prefix></Filter>\
<Status>Enabled</Status><Expiration><Days>7</Days></Expiration></Rule></LifecycleConfiguration>",
    );

    lcv(tmp.path())
        .args(["fmt", "--encoding-type", "url", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("<ID>old logs</ID>"))
        .stdout(predicate::str::contains("<Prefix>old%20logs/</Prefix>"));
}

#[test]
fn test_fmt_without_s3_namespace() {
    let tmp = TempDir::new().unwrap();
    let file = write_doc(&tmp, "lifecycle.xml", VALID);

    lcv(tmp.path())
        .args(["fmt", "--no-s3-namespace", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("<LifecycleConfiguration>\n"))
        .stdout(predicate::str::contains("xmlns").not());
}

#[test]
fn test_fmt_write_rejects_stdin() {
    let tmp = TempDir::new().unwrap();

    lcv(tmp.path())
        .args(["fmt", "--write", "-"])
        .write_stdin(VALID)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot use --write"));
}

#[test]
fn test_fmt_reads_stdin() {
    let tmp = TempDir::new().unwrap();

    lcv(tmp.path())
        .args(["fmt", "-"])
        .write_stdin(UNORDERED)
        .assert()
        .success()
        .stdout(predicate::str::contains("<Filter/>"));
}

// ============================================================================
// Schema Command Tests
// ============================================================================

#[test]
fn test_schema_list() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .args(["schema", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lifecycle_configuration"))
        .stdout(predicate::str::contains("LifecycleConfiguration"));
}

#[test]
fn test_schema_show_outline() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .args(["schema", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NoncurrentVersionTransition"))
        .stdout(predicate::str::contains("| Days"))
        .stdout(predicate::str::contains("positiveInteger"))
        .stdout(predicate::str::contains(
            "Storage classes: STANDARD, REDUCED_REDUNDANCY, GLACIER, UNKNOWN",
        ));
}

#[test]
fn test_schema_show_raw() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .args(["schema", "show", "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("element LifecycleConfiguration"))
        .stdout(predicate::str::contains("xsd:nonNegativeInteger"));
}

#[test]
fn test_schema_show_unknown_fails() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .args(["schema", "show", "bucket_policy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown schema: bucket_policy"));
}

// ============================================================================
// Completions Command Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    lcv(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lcv"));
}
