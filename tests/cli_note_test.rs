//! Integration tests for `wp note`.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_note_set_and_show() {
    let env = TestEnv::init();

    env.wp()
        .args(["note", "set", "2", "boundary", "values", "first"])
        .assert()
        .success();

    let output = env.wp().args(["note", "show", "2"]).assert().success();
    let json = TestEnv::json(&output.get_output().stdout);
    assert_eq!(json["note"], "boundary values first");
}

#[test]
fn test_note_show_without_note_is_empty() {
    let env = TestEnv::init();

    let output = env.wp().args(["note", "show", "5"]).assert().success();
    let json = TestEnv::json(&output.get_output().stdout);
    assert_eq!(json["note"], "");
}

#[test]
fn test_note_overwrites_previous() {
    let env = TestEnv::init();

    env.wp().args(["note", "set", "1", "draft"]).assert().success();
    env.wp().args(["note", "set", "1", "final"]).assert().success();

    let output = env.wp().args(["note", "show", "1"]).assert().success();
    assert_eq!(TestEnv::json(&output.get_output().stdout)["note"], "final");
}

#[test]
fn test_note_truncated_to_5000_chars() {
    let env = TestEnv::init();

    let long = "n".repeat(6000);
    env.wp().args(["note", "set", "3", &long]).assert().success();

    let output = env.wp().args(["note", "show", "3"]).assert().success();
    let json = TestEnv::json(&output.get_output().stdout);
    assert_eq!(json["note"].as_str().unwrap().chars().count(), 5000);
}

#[test]
fn test_note_trimmed_before_storage() {
    let env = TestEnv::init();

    env.wp()
        .args(["note", "set", "4", "  spaced out  "])
        .assert()
        .success();

    let output = env.wp().args(["note", "show", "4"]).assert().success();
    assert_eq!(
        TestEnv::json(&output.get_output().stdout)["note"],
        "spaced out"
    );
}

#[test]
fn test_note_rejects_invalid_module() {
    let env = TestEnv::init();

    env.wp()
        .args(["note", "set", "21", "too far"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("module ID"));
}
