//! CLI integration tests for mssql-pg-dump.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for configuration errors. None of them need a database:
//! every failure here is detected before a connection is attempted.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mssql-pg-dump binary.
fn cmd() -> Command {
    Command::cargo_bin("mssql-pg-dump").unwrap()
}

/// Write a config file with the given YAML.
fn config_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", yaml).unwrap();
    file
}

const NO_SCHEMA: &str = "source:\n  host: localhost\n  database: app\n  user: sa\n  password: pw\n";

const WITH_SCHEMA: &str =
    "source:\n  host: localhost\n  database: app\n  user: sa\n  password: pw\n  schema: dbo\n";

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--max-rows"))
        .stdout(predicate::str::contains("--no-truncate"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mssql-pg-dump"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// Exit Code Tests - Config Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_2() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_empty_config_exits_with_code_2() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_required_fields_exits_with_code_2() {
    let file = config_file("source:\n  type: mssql\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_schema_exits_with_code_2() {
    let file = config_file(NO_SCHEMA);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("source.schema is required"));
}

#[test]
fn test_zero_max_rows_override_exits_with_code_2() {
    let file = config_file(WITH_SCHEMA);

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "run",
            "--max-rows",
            "0",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_rows_per_insert"));
}

#[test]
fn test_empty_exclude_pattern_exits_with_code_2() {
    let yaml = format!("{}export:\n  exclude_tables: [\"\"]\n", WITH_SCHEMA);
    let file = config_file(&yaml);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "inspect"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("empty table pattern"));
}

#[test]
fn test_bad_policy_value_exits_with_code_2() {
    let yaml = format!("{}export:\n  on_table_error: retry\n", WITH_SCHEMA);
    let file = config_file(&yaml);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(2);
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
