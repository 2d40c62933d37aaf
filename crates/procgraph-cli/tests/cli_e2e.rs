use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn procgraph_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_procgraph"))
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/bakery.trig")
}

fn run(args: &[&str]) -> Output {
    Command::new(procgraph_bin())
        .arg("--data")
        .arg(fixture())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run procgraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn ask_answers_against_virtual_graphs() {
    let out = run(&[
        "ask",
        "ASK { GRAPH ?v { <http://example.org/bakery/Mix> vg:processSubtype vg:NotDetailedChild } }",
    ]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("true"));
}

#[test]
fn query_json_reports_fallback_when_engine_is_unavailable() {
    let out = run(&[
        "--engine",
        "unavailable",
        "--json",
        "query",
        "SELECT ?i WHERE { ?i vg:processSubtype vg:DetailedExternal }",
    ]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json output");
    assert_eq!(json["source"], serde_json::json!("Local"));
    assert!(json["fallback_reason"].is_string());
    assert_eq!(
        json["value"][0]["values"]["i"]["value"],
        serde_json::json!("http://example.org/bakery/Proof")
    );
}

#[test]
fn dump_virtual_only_prints_derived_quads() {
    let out = run(&["dump", "--virtual-only"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert_eq!(text.lines().count(), 7);
    assert!(text
        .lines()
        .all(|l| l.ends_with("<http://example.org/bakery/BakeDiagram_virtual> .")));
}

#[test]
fn invalid_hierarchy_exits_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let orphan = dir.path().join("orphan.nq");
    fs::write(
        &orphan,
        "<http://x/s> <http://x/p> <http://x/o> <http://x/orphan> .\n",
    )
    .expect("write orphan");
    let out = run(&["--data", orphan.to_str().expect("utf-8 path"), "subtypes"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("http://x/orphan"));
}

#[test]
fn config_prints_effective_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = dir.path().join("cfg.json");
    fs::write(&cfg, r#"{ "fallback_on_engine_error": false }"#).expect("write cfg");
    let out = Command::new(procgraph_bin())
        .arg("--config")
        .arg(&cfg)
        .arg("config")
        .output()
        .expect("run procgraph");
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json");
    assert_eq!(json["fallback_on_engine_error"], serde_json::json!(false));
    assert_eq!(json["vocabulary"]["virtual_suffix"], serde_json::json!("_virtual"));
}
