use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

/// Runs the binary against `config_path` with extra arguments
fn run_with_config(config_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vibe-corpus"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Without a manifest the built-in corpus is used
#[test]
fn test_list_kinds_with_builtin_corpus() {
    let temp_dir = tempdir().unwrap();
    let output = run_with_config(&temp_dir.path().join("missing.toml"), &["--list-kinds", "--json"]);
    assert!(output.status.success());

    let kinds = stdout_json(&output);
    let ids: Vec<&str> = kinds
        .as_array()
        .unwrap()
        .iter()
        .map(|kind| kind["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 35);
    assert_eq!(ids[0], "command-injection");
    assert!(ids.contains(&"duplicate-key"));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Using the built-in corpus"));
}

#[test]
fn test_list_security_fixtures_in_declaration_order() {
    let temp_dir = tempdir().unwrap();
    let output = run_with_config(
        &temp_dir.path().join("missing.toml"),
        &["--list-fixtures", "--category", "security", "--json"],
    );
    assert!(output.status.success());

    let fixtures = stdout_json(&output);
    let fixtures = fixtures.as_array().unwrap();
    let first: Vec<(&str, &str)> = fixtures
        .iter()
        .take(3)
        .map(|entry| (entry["file"].as_str().unwrap(), entry["name"].as_str().unwrap()))
        .collect();
    assert_eq!(
        first,
        vec![
            ("go/main.go", "credentials"),
            ("go/main.go", "CommandInjection"),
            ("go/main.go", "SQLInjection"),
        ]
    );

    // Quality-only units are filtered out
    assert!(fixtures.iter().all(|entry| entry["name"] != "unusedFunction"));
}

#[test]
fn test_diff_group_reports_declared_reduction() {
    let temp_dir = tempdir().unwrap();
    let output = run_with_config(&temp_dir.path().join("missing.toml"), &["--diff-group", "go-main", "--json"]);
    assert!(output.status.success());

    let report = stdout_json(&output);
    let drift: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry["coverage"] != "present-in-both")
        .map(|entry| entry["kind"].as_str().unwrap())
        .collect();
    assert_eq!(drift, vec!["duplicate-key", "insecure-http-server", "xss"]);
}

#[test]
fn test_diff_unknown_group_fails() {
    let temp_dir = tempdir().unwrap();
    let output = run_with_config(&temp_dir.path().join("missing.toml"), &["--diff-group", "nope"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("nope"));
}

#[test]
fn test_export_writes_fixtures_and_expectations() {
    let temp_dir = tempdir().unwrap();
    let out_dir = temp_dir.path().join("corpus");
    let output = run_with_config(
        &temp_dir.path().join("missing.toml"),
        &["--export", out_dir.to_str().unwrap()],
    );
    assert!(output.status.success());

    assert!(out_dir.join("go/main.go").exists());
    assert!(out_dir.join("go/main_reduced.go").exists());
    assert!(out_dir.join("python/utils.py").exists());

    let expectations: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("expectations.json")).unwrap()).unwrap();
    let first = &expectations["expectations"][0];
    assert_eq!(first["file"], "go/main.go");
    assert_eq!(first["unit"], "credentials");
    assert_eq!(first["kinds"][0], "hardcoded-secret");
}

#[test]
fn test_undeclared_drift_manifest_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join(".vibe-corpus.toml");
    let manifest = r#"
[[files]]
name = "main.go"

[[files.records]]
name = "WeakHash"
kinds = ["weak-hash"]
source = "md5.Sum(data)"

[[files.records]]
name = "InsecureHTTPServer"
kinds = ["insecure-http-server"]
source = "http.ListenAndServe(\":8080\", nil)"

[[files]]
name = "main_v2.go"

[[files.records]]
name = "WeakHash"
kinds = ["weak-hash"]
source = "md5.Sum(data)"

[[groups]]
id = "go-main"
files = ["main.go", "main_v2.go"]
"#;
    fs::write(&config_path, manifest).unwrap();

    let output = run_with_config(&config_path, &["--check"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Undeclared drift in group 'go-main'"));
    assert!(stderr.contains("insecure-http-server"));
}

#[test]
fn test_declared_reduction_manifest_passes_check() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join(".vibe-corpus.toml");
    let manifest = r#"
[[files]]
name = "main.go"

[[files.records]]
name = "WeakHash"
kinds = ["weak-hash"]
source = "md5.Sum(data)"

[[files.records]]
name = "InsecureHTTPServer"
kinds = ["insecure-http-server"]
source = "http.ListenAndServe(\":8080\", nil)"

[[files]]
name = "main_v2.go"

[[files.records]]
name = "WeakHash"
kinds = ["weak-hash"]
source = "md5.Sum(data)"

[[groups]]
id = "go-main"
files = ["main.go", "main_v2.go"]
reduced = ["insecure-http-server"]
"#;
    fs::write(&config_path, manifest).unwrap();

    let output = run_with_config(&config_path, &["--check"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("2 files"));
}

#[test]
fn test_verify_incomplete_findings_fails() {
    let temp_dir = tempdir().unwrap();
    let findings_path = temp_dir.path().join("findings.json");
    fs::write(
        &findings_path,
        r#"[
            {"file": "go/main.go", "unit": "SQLInjection", "kind": "sql-injection", "line": 42},
            {"file": "go/main.go", "kind": "made-up-rule"}
        ]"#,
    )
    .unwrap();

    let output = run_with_config(
        &temp_dir.path().join("missing.toml"),
        &["--verify", findings_path.to_str().unwrap(), "--json"],
    );
    assert!(!output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["matched"], 1);
    assert_eq!(report["unknown_kinds"][0]["kind"], "made-up-rule");
    assert!(!report["missed"].as_array().unwrap().is_empty());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Scanner findings do not match the corpus"));
}

#[test]
fn test_init_then_check_round_trip() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join(".vibe-corpus.toml");

    let output = run_with_config(&config_path, &["--init"]);
    assert!(output.status.success());
    assert!(config_path.exists());

    let output = run_with_config(&config_path, &["--check"]);
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(!stderr.contains("built-in corpus"));
}

#[test]
fn test_no_action_prints_usage() {
    let temp_dir = tempdir().unwrap();
    let output = run_with_config(&temp_dir.path().join("missing.toml"), &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--list-fixtures"));
    assert!(stdout.contains("--diff-group"));
}
