//! Integration tests for transaction commands via CLI.
//!
//! - Lifecycle transitions, including rejected ones
//! - Milestones, notes, financials and commission
//! - Analytics and upcoming deadlines

mod common;

use chrono::{Duration, Utc};
use common::TestEnv;
use predicates::prelude::*;

fn setup() -> (TestEnv, String) {
    let env = TestEnv::init();
    let property = env.create_property("Loft", "500000", "Austin");
    let client = env.create_client("Ana", "Ruiz");
    let id = env.create_transaction(&property, &client, "500000");
    (env, id)
}

fn advance(env: &TestEnv, id: &str, statuses: &[&str]) {
    for status in statuses {
        env.bk()
            .args(["transaction", "status", id, status])
            .assert()
            .success();
    }
}

#[test]
fn test_transaction_create_derives_commission() {
    let (env, id) = setup();

    let tx = env.json(&["transaction", "show", &id]);
    assert_eq!(tx["status"], "pending");
    assert_eq!(tx["financials"]["commission"]["rate"], 3.0);
    assert_eq!(tx["financials"]["commission"]["amount"], 15000.0);
    assert_eq!(tx["progress"]["total"], 0);
}

#[test]
fn test_transaction_links_client() {
    let env = TestEnv::init();
    let client = env.create_client("Ana", "Ruiz");
    let id = env.create_transaction("prop-1", &client, "100000");

    let shown = env.json(&["client", "show", &client]);
    assert_eq!(shown["transactions"], serde_json::json!([id]));
}

#[test]
fn test_transaction_commission_rate_from_config() {
    let env = TestEnv::init();
    env.bk()
        .args(["config", "set", "default-commission-rate", "2.5"])
        .assert()
        .success();
    let id = env.create_transaction("prop-1", "cli-1", "400000");

    let tx = env.json(&["transaction", "show", &id]);
    assert_eq!(tx["financials"]["commission"]["amount"], 10000.0);
}

#[test]
fn test_transaction_lifecycle_to_closed() {
    let (env, id) = setup();
    advance(
        &env,
        &id,
        &[
            "under-contract",
            "inspection",
            "appraisal",
            "financing",
            "final-walkthrough",
            "closing",
            "closed",
        ],
    );

    env.bk()
        .args(["transaction", "status", &id, "cancelled"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Illegal transaction transition"));
}

#[test]
fn test_transaction_rejects_skipped_stage() {
    let (env, id) = setup();

    env.bk()
        .args(["transaction", "status", &id, "closing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pending -> closing"));

    let tx = env.json(&["transaction", "show", &id]);
    assert_eq!(tx["status"], "pending");
}

#[test]
fn test_milestones_progress_and_double_complete() {
    let (env, id) = setup();
    let due = (Utc::now() + Duration::days(3)).format("%Y-%m-%d").to_string();

    env.bk()
        .args(["transaction", "milestone", "add", &id, "Inspection", "--due", &due])
        .assert()
        .success();
    let tx = env.json(&[
        "transaction", "milestone", "add", &id, "Appraisal", "--due", &due, "--responsible",
        "bank",
    ]);
    let milestone = tx["milestones"][0]["id"].as_str().unwrap().to_string();

    let done = env.json(&["transaction", "milestone", "complete", &id, &milestone]);
    assert_eq!(done["progress"]["completed"], 1);
    assert_eq!(done["progress"]["ratio"], 0.5);
    assert_eq!(done["milestones"][0]["status"], "completed");

    env.bk()
        .args(["transaction", "milestone", "complete", &id, &milestone])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already completed"));
}

#[test]
fn test_overdue_milestone_is_derived() {
    let (env, id) = setup();

    env.bk()
        .args(["transaction", "milestone", "add", &id, "Inspection", "--due", "2020-01-01"])
        .assert()
        .success();

    let tx = env.json(&["transaction", "show", &id]);
    assert_eq!(tx["milestones"][0]["status"], "pending");
    assert_eq!(tx["milestone_status"][0]["status"], "overdue");
}

#[test]
fn test_financials_and_commission_paid() {
    let (env, id) = setup();

    let tx = env.json(&["transaction", "financials", &id, "--commission-rate", "4"]);
    assert_eq!(tx["financials"]["commission"]["amount"], 20000.0);

    let tx = env.json(&[
        "transaction",
        "financials",
        &id,
        "--sale-price",
        "520000",
        "--commission-amount",
        "12345",
    ]);
    assert_eq!(tx["financials"]["commission"]["amount"], 12345.0);

    let tx = env.json(&["transaction", "commission-paid", &id]);
    assert_eq!(tx["financials"]["commission"]["paid"], true);
}

#[test]
fn test_transaction_notes() {
    let (env, id) = setup();

    let tx = env.json(&[
        "transaction", "note", &id, "Buyer asked for repairs", "--author", "agent-1",
    ]);
    assert_eq!(tx["notes"][0]["content"], "Buyer asked for repairs");
    assert_eq!(tx["notes"][0]["type"], "general");
}

#[test]
fn test_analytics_for_agent() {
    let (env, closed) = setup();
    let cancelled = env.create_transaction("prop-2", "cli-2", "300000");
    advance(
        &env,
        &closed,
        &[
            "under-contract",
            "inspection",
            "appraisal",
            "financing",
            "final-walkthrough",
            "closing",
            "closed",
        ],
    );
    advance(&env, &cancelled, &["cancelled"]);

    let analytics = env.json(&["transaction", "analytics", "--agent", "agent-1"]);
    assert_eq!(analytics["total"], 2);
    assert_eq!(analytics["closed"], 1);
    assert_eq!(analytics["cancelled"], 1);
    assert_eq!(analytics["closed_volume"], 500000.0);
    assert_eq!(analytics["close_rate"], 0.5);

    let other = env.json(&["transaction", "analytics", "--agent", "agent-2"]);
    assert_eq!(other["total"], 0);
    assert_eq!(other["close_rate"], 0.0);
}

#[test]
fn test_upcoming_deadlines() {
    let (env, id) = setup();
    let soon = (Utc::now() + Duration::days(2)).format("%Y-%m-%d").to_string();
    let later = (Utc::now() + Duration::days(40)).format("%Y-%m-%d").to_string();

    env.bk()
        .args(["transaction", "milestone", "add", &id, "Inspection", "--due", &soon])
        .assert()
        .success();
    env.bk()
        .args(["transaction", "milestone", "add", &id, "Appraisal", "--due", &later])
        .assert()
        .success();
    env.bk()
        .args(["transaction", "milestone", "add", &id, "Deposit", "--due", "2020-01-01"])
        .assert()
        .success();

    let result = env.json(&["transaction", "deadlines", "--agent", "agent-1"]);
    assert_eq!(result["days"], 7);
    assert_eq!(result["count"], 2);
    assert_eq!(result["deadlines"][0]["name"], "Deposit");
    assert_eq!(result["deadlines"][0]["overdue"], true);
    assert_eq!(result["deadlines"][1]["name"], "Inspection");

    let wide = env.json(&["transaction", "deadlines", "--agent", "agent-1", "--days", "60"]);
    assert_eq!(wide["count"], 3);
}

#[test]
fn test_transaction_list_and_stats() {
    let (env, id) = setup();
    env.create_transaction("prop-2", "cli-2", "300000");
    advance(&env, &id, &["cancelled"]);

    let pending = env.json(&["transaction", "list", "--status", "pending"]);
    assert_eq!(pending["count"], 1);

    let stats = env.json(&["transaction", "stats"]);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["by_status"]["cancelled"], 1);

    env.bk()
        .args(["-H", "transaction", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 transaction(s)"));
}
