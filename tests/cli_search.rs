use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::tempdir;

fn seed_store(dir: &Path) {
    for (id, text) in [
        ("a", "Test@123 coffee"),
        ("b", "coffee beans"),
        ("c", "espresso coffee"),
    ] {
        let mut cmd = cargo_bin_cmd!("zksearch");
        cmd.current_dir(dir);
        cmd.args(["index", id, text, "--max-items-per-bucket", "2", "--no-server"]);
        cmd.assert().success();
    }
}

#[test]
fn cli_search_text_output_lists_one_id_per_line() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["search", "coffee", "--no-server"]);
    cmd.assert().success().stdout("c\na\nb\n");
}

#[test]
fn cli_search_limit_truncates_printed_ids() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args([
        "search",
        "coffee",
        "--direction",
        "oldest",
        "--limit",
        "2",
        "--format",
        "json",
        "--no-server",
    ]);

    let assert = cmd.assert().success();
    let value: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json output");

    assert_eq!(value["version"], "1.0.0");
    assert_eq!(value["direction"], "oldest");
    assert_eq!(value["fuzzy"], true);
    assert_eq!(value["item_ids"], serde_json::json!(["a", "b"]));
    assert_eq!(value["summary"]["total_items"], 3);
    assert_eq!(value["summary"]["buckets_visited"], 2);
}

#[test]
fn cli_search_matches_any_term() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args([
        "search",
        "123 espresso",
        "--exact",
        "--direction",
        "oldest",
        "--no-server",
    ]);
    cmd.assert().success().stdout("a\nc\n");
}

#[test]
fn cli_search_with_no_tokens_prints_nothing() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["search", "  @@  ", "--no-server"]);
    cmd.assert().success().stdout("");
}

#[test]
fn cli_search_table_output_has_header() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["search", "beans", "--format", "table", "--no-server"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ITEM").and(predicate::str::contains("1 b")));
}

#[test]
fn cli_keywords_lists_glossary_with_bucket_counts() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["keywords", "--format", "json", "--no-server"]);
    let assert = cmd.assert().success();
    let value: Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json output");

    let keywords = value["keywords"].as_array().expect("keywords array");
    let values: Vec<_> = keywords
        .iter()
        .map(|k| k["value"].as_str().expect("value"))
        .collect();
    assert_eq!(values, vec!["123", "beans", "coffee", "espresso", "test"]);

    let coffee = keywords
        .iter()
        .find(|k| k["value"] == "coffee")
        .expect("coffee keyword");
    assert_eq!(coffee["num_buckets"], 2);
}

#[test]
fn cli_keywords_filter_and_text_output() {
    let tmp = tempdir().expect("tempdir");
    seed_store(tmp.path());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["keywords", "--filter", "ES", "--no-server"]);
    cmd.assert().success().stdout("espresso\t1\ntest\t1\n");
}

#[test]
fn cli_search_fails_for_missing_store() {
    let tmp = tempdir().expect("tempdir");

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["search", "coffee", "--store-path", "typo-store", "--no-server"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("store not found at typo-store"));
    assert!(!tmp.path().join("typo-store").exists());

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["keywords", "--store-path", "typo-store", "--no-server"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("store not found at typo-store"));
    assert!(!tmp.path().join("typo-store").exists());
}

#[test]
fn cli_search_finds_very_long_tokens() {
    let tmp = tempdir().expect("tempdir");
    let long = "b".repeat(300);

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["index", "long", &long, "--no-server"]);
    cmd.assert().success();

    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.current_dir(tmp.path());
    cmd.args(["search", &long, "--exact", "--no-server"]);
    cmd.assert().success().stdout("long\n");
}

#[test]
fn cli_schema_version_flag_prints_version() {
    let mut cmd = cargo_bin_cmd!("zksearch");
    cmd.arg("--schema-version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"));
}
