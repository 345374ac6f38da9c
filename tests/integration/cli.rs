#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn closure_program() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("closure.myl")
}

/// Command isolated from the caller's config file and log settings.
fn myrial(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("myrial");
    cmd.env_remove("MYRIAL_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", home)
        .env("HOME", home);
    cmd
}

#[test]
fn missing_file_argument_fails() {
    let home = TempDir::new().unwrap();
    let output = myrial(home.path()).assert().failure().get_output().clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No input file provided"), "{stderr}");
}

#[test]
fn runs_closure_program_as_text() {
    let home = TempDir::new().unwrap();
    let output = myrial(home.path())
        .arg(closure_program())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "Reach : (src:int,dst:int)");
    assert!(lines[1].starts_with('[') && lines[1].ends_with(']'));
    assert!(lines[1].contains("(1, 5)"));
}

#[test]
fn eager_json_output_matches_lazy() {
    let home = TempDir::new().unwrap();
    let run = |extra: &[&str]| -> Vec<Value> {
        let output = myrial(home.path())
            .args(["--format", "json"])
            .args(extra)
            .arg(closure_program())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8_lossy(&output)
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid json"))
            .collect()
    };
    let lazy = run(&[]);
    let eager = run(&["--eager", "--owner", "bill", "--max-iterations", "20"]);

    assert_eq!(lazy[0]["kind"], "describe");
    assert_eq!(lazy[0]["ident"], "Reach");
    assert_eq!(lazy[1]["kind"], "dump");
    let count = |v: &Value| v["tuples"].as_array().map(Vec::len);
    assert_eq!(count(&lazy[1]), Some(14));
    assert_eq!(count(&eager[1]), Some(14));
}

#[test]
fn data_dir_and_config_resolve_loads() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(work.path().join("nums.txt"), "3\n1\n2\n").unwrap();
    let program = home.path().join("limit.myl");
    fs::write(
        &program,
        "N = LOAD \"nums.txt\" AS (n:int);\nDUMP LIMIT N, 2;\n",
    )
    .unwrap();

    let output = myrial(home.path())
        .arg("--data-dir")
        .arg(work.path())
        .arg(&program)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8_lossy(&output).trim(), "[(3),(1)]");

    let config = home.path().join("myrial.toml");
    fs::write(
        &config,
        format!(
            "[engine]\nmode = \"eager\"\ndata_dir = {:?}\n\n[logging]\nlevel = \"error\"\n",
            work.path().display().to_string()
        ),
    )
    .unwrap();
    myrial(home.path())
        .arg("--config")
        .arg(&config)
        .arg(&program)
        .assert()
        .success();
}

#[test]
fn program_errors_exit_nonzero() {
    let home = TempDir::new().unwrap();
    let program = home.path().join("bad.myl");
    fs::write(&program, "A = TABLE [(1)] AS (x:int);\nDUMP B;\n").unwrap();
    let output = myrial(home.path())
        .arg(&program)
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error:"), "{stderr}");
    assert!(stderr.contains('B'), "{stderr}");
}

#[test]
fn explicit_config_must_exist() {
    let home = TempDir::new().unwrap();
    let output = myrial(home.path())
        .arg("--config")
        .arg(home.path().join("absent.toml"))
        .arg(closure_program())
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error:"), "{stderr}");
}
