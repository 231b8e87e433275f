use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const GADGET_PHP: &str = "<?php
class A
{
    public function __destruct()
    {
        eval($this->code);
    }
}
";

const ANALYZER_CONFIG: &str = r#"
max_concurrent_analyses = 2

[analyzers.php]
program = "sh"
args = [
    "-c",
    '''printf '%s\n' '{"funcStack":["A#__destruct","B#__toString","C#eval"],"callStack":[["A.php",6],["B.php",3]]}' > "$2"''',
    "analyzer",
    "{input}",
    "{output}",
]
"#;

#[allow(deprecated)]
fn cli(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gadget-audit").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("GADGET_AUDIT_CONFIG")
        .env_remove("GADGET_AUDIT_STORAGE_ROOT")
        .env_remove("GADGET_AUDIT_STATE_DIR")
        .env_remove("GADGET_AUDIT_RUNTIME_JAR")
        .env_remove("GADGET_AUDIT_DECOMPILER")
        .env_remove("GADGET_AUDIT_CONCURRENCY")
        .arg("--config")
        .arg(workdir.join("gadget-audit.toml"))
        .arg("--storage-root")
        .arg(workdir.join("storage"))
        .arg("--state-dir")
        .arg(workdir.join("state"));
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = cli(workdir).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn normalize_offline_file() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("gadget-audit.toml"), "").unwrap();
    fs::write(
        temp.path().join("raw.ndjson"),
        concat!(
            r#"{"funcStack":["A#__destruct","B#__wakeup","C#eval"],"callStack":[["/root/proj/a.php",10]]}"#,
            "\n",
            "not json\n",
        ),
    )
    .unwrap();

    let chains = run_json(temp.path(), &["normalize", "raw.ndjson", "--lang", "PHP"]);
    let chains = chains.as_array().expect("array");
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0]["id"], "chain-0");
    assert_eq!(chains[0]["entry"], "A#__destruct");
    let types: Vec<&str> = chains[0]["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["entry", "gadget", "sink"]);
    assert_eq!(chains[0]["edges"][0]["label"], "#1@L10");
}

#[test]
fn register_analyze_and_audit() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("gadget-audit.toml"), ANALYZER_CONFIG).unwrap();
    fs::write(root.join("A.php"), GADGET_PHP).unwrap();

    let registered = run_json(root, &["register", "A.php", "--lang", "php"]);
    assert_eq!(registered["status"], "pending");
    let hash = registered["hash"].as_str().unwrap().to_string();
    assert_eq!(hash.len(), 64);

    let report = run_json(root, &["analyze"]);
    assert_eq!(report["finished"], 1);
    assert_eq!(report["failed"], 0);

    let chains = run_json(root, &["chains", &hash]);
    assert_eq!(chains.as_array().unwrap().len(), 1);

    let merged = run_json(root, &["graph", &hash, "--all"]);
    assert_eq!(merged["nodes"][0]["id"], "m0");
    assert_eq!(merged["edges"].as_array().unwrap().len(), 2);

    let audit = run_json(root, &["audit", &hash, "--json"]);
    assert_eq!(audit["meta"]["chain_index"], 1);
    assert_eq!(audit["meta"]["sink"], "C#eval");
    let steps = audit["steps"].as_array().unwrap();
    assert_eq!(steps[0]["found"], true);
    assert_eq!(steps[0]["resolved_display_path"], "A.php");
    assert_eq!(steps[0]["function_name"], "__destruct");
    assert_eq!(steps[0]["start_line"], 4);
    assert_eq!(steps[0]["end_line"], 7);
    assert_eq!(steps[1]["found"], false);
    assert_eq!(steps[2]["found"], false);

    cli(root)
        .args(["prompt", &hash])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Project: A.php | Language: php | Chain 1/1"))
        .stdout(predicate::str::contains("eval($this->code);"));

    let stats = run_json(root, &["stats"]);
    assert_eq!(stats["total_submissions"], 1);
    assert_eq!(stats["finished"], 1);
    assert_eq!(stats["total_chains"], 1);
    assert_eq!(stats["by_language"]["php"], 1);
}

#[test]
fn pending_and_unknown_submissions_fail() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("gadget-audit.toml"), "").unwrap();
    fs::write(root.join("app.jar"), b"PK\x03\x04").unwrap();

    let registered = run_json(root, &["register", "app.jar", "--lang", "java"]);
    let hash = registered["hash"].as_str().unwrap().to_string();

    cli(root)
        .args(["audit", &hash])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not finished"));

    cli(root)
        .args(["chains", "0000000000000000000000000000000000000000000000000000000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown submission"));

    cli(root)
        .args(["normalize", "x.json", "--lang", "cobol"])
        .assert()
        .failure();
}
