//! Integration tests for `wp badge`.

mod common;

use common::TestEnv;
use serde_json::json;

#[test]
fn test_badge_add_and_list() {
    let env = TestEnv::init();

    env.wp().args(["badge", "add", "core"]).assert().success();

    let output = env.wp().args(["badge", "list"]).assert().success();
    let parsed = TestEnv::json(&output.get_output().stdout);
    assert_eq!(parsed["badges"], json!(["core"]));
}

#[test]
fn test_badge_add_twice_stores_once() {
    let env = TestEnv::init();

    env.wp().args(["badge", "add", "core"]).assert().success();
    env.wp().args(["badge", "add", "core"]).assert().success();

    let output = env.wp().args(["badge", "list"]).assert().success();
    let parsed = TestEnv::json(&output.get_output().stdout);
    assert_eq!(parsed["badges"], json!(["core"]));
}

#[test]
fn test_badges_keep_unlock_order() {
    let env = TestEnv::init();

    for badge in ["core", "technical", "automation"] {
        env.wp().args(["badge", "add", badge]).assert().success();
    }

    let output = env.wp().args(["badge", "list"]).assert().success();
    let parsed = TestEnv::json(&output.get_output().stdout);
    assert_eq!(parsed["badges"], json!(["core", "technical", "automation"]));
}

#[test]
fn test_badge_add_rejects_empty_name() {
    let env = TestEnv::init();

    env.wp().args(["badge", "add", "  "]).assert().failure();
}
