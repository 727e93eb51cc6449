//! End-to-end tests for the `alertsync` binary.
//!
//! The binary runs against temporary rule directories and a mockito server
//! standing in for the alerting backend. Every invocation points `--config`
//! at a missing file and clears the `GRAFANA_*` variables so the developer's
//! own settings never leak in.

use std::path::Path;

use alertsync_test_utils::{RuleBuilder, RulesDir};
use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::Value;

const RULES_PATH: &str = "/api/v1/provisioning/alert-rules";

fn alertsync(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("alertsync"));
    cmd.env_remove("GRAFANA_URL")
        .env_remove("GRAFANA_TOKEN")
        .env_remove("GRAFANA_ORG_ID")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("no-user-config.toml"));
    cmd
}

/// `alertsync` wired to `server` with fast retries
fn against(dir: &Path, server: &Server) -> Command {
    let mut cmd = alertsync(dir);
    cmd.env("GRAFANA_TOKEN", "glsa_e2e_secret")
        .arg("--url")
        .arg(server.url())
        .arg("--retry-base-ms")
        .arg("1");
    cmd
}

fn wire(rules: &[alertsync_model::AlertRule]) -> String {
    serde_json::to_string(rules).unwrap()
}

// ============================================================================
// Help and completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = RulesDir::new();
    alertsync(dir.root())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("apply"));
}

#[test]
fn test_completions_bash() {
    let dir = RulesDir::new();
    alertsync(dir.root())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alertsync"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_clean_rules_exits_zero() {
    let dir = RulesDir::with_rules(&[
        RuleBuilder::new("rulealpha01").build(),
        RuleBuilder::new("rulebravo01").build(),
    ]);

    alertsync(dir.root())
        .arg("validate")
        .arg(dir.root())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("2 rule(s) checked: 0 error(s)"));
}

#[test]
fn test_validate_violation_exits_one() {
    let dir = RulesDir::with_rules(&[
        RuleBuilder::new("rulealpha01").build(),
        RuleBuilder::new("rulebravo01").condition("C2").build(),
    ]);

    alertsync(dir.root())
        .arg("validate")
        .arg(dir.root())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("rulebravo01"))
        .stdout(predicate::str::contains("missing_condition"));
}

#[test]
fn test_validate_json_output() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").for_duration(90).build()]);

    let output = alertsync(dir.root())
        .arg("validate")
        .arg(dir.root())
        .args(["--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["valid"], true);
    assert_eq!(doc["warnings"], 1);
}

#[test]
fn test_malformed_rule_file_exits_one() {
    let dir = RulesDir::new();
    dir.write("validators/broken.json", "{ not json");

    alertsync(dir.root())
        .arg("validate")
        .arg(dir.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken.json"));
}

// ============================================================================
// plan
// ============================================================================

#[test]
fn test_plan_shows_create_update_delete() {
    let dir = RulesDir::with_rules(&[
        RuleBuilder::new("rulealpha01").title("changed").build(),
        RuleBuilder::new("rulebravo01").build(),
    ]);
    let mut server = Server::new();
    let list = server
        .mock("GET", RULES_PATH)
        .match_header("authorization", "Bearer glsa_e2e_secret")
        .with_status(200)
        .with_body(wire(&[
            RuleBuilder::new("rulealpha01").build(),
            RuleBuilder::new("rulecharlie1").build(),
        ]))
        .create();

    against(dir.root(), &server)
        .arg("plan")
        .arg(dir.root())
        .arg("--diff")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("1 to create, 1 to update, 1 to delete"))
        .stdout(predicate::str::contains("+ rulebravo01"))
        .stdout(predicate::str::contains("~ rulealpha01"))
        .stdout(predicate::str::contains("- rulecharlie1"))
        .stdout(predicate::str::contains("@@"));

    list.assert();
}

#[test]
fn test_plan_aborts_after_three_failed_list_attempts() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").build()]);
    let mut server = Server::new();
    let list = server
        .mock("GET", RULES_PATH)
        .with_status(503)
        .with_body("service unavailable")
        .expect(3)
        .create();

    against(dir.root(), &server)
        .arg("plan")
        .arg(dir.root())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("to create").not())
        .stderr(predicate::str::contains("server error 503"))
        .stderr(predicate::str::contains("glsa_e2e_secret").not());

    list.assert();
}

#[test]
fn test_plan_with_invalid_rules_never_contacts_backend() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").condition("Z").build()]);
    let mut server = Server::new();
    let list = server.mock("GET", RULES_PATH).expect(0).create();

    against(dir.root(), &server)
        .arg("plan")
        .arg(dir.root())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("missing_condition"));

    list.assert();
}

#[test]
fn test_plan_without_url_fails() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").build()]);

    alertsync(dir.root())
        .arg("plan")
        .arg(dir.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GRAFANA_URL"));
}

#[test]
fn test_plan_reads_directory_config() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").build()]);
    let mut server = Server::new();
    dir.write_config(&format!(
        "[backend]\nurl = \"{}\"\norg_id = 3\n",
        server.url()
    ));
    let list = server
        .mock("GET", RULES_PATH)
        .match_header("x-grafana-org-id", "3")
        .with_status(200)
        .with_body("[]")
        .create();

    alertsync(dir.root())
        .arg("plan")
        .arg(dir.root())
        .args(["--format", "json"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"rulealpha01\""));

    list.assert();
}

// ============================================================================
// apply
// ============================================================================

#[test]
fn test_apply_partial_failure_exits_two() {
    let dir = RulesDir::with_rules(&[
        RuleBuilder::new("rulexray01").build(),
        RuleBuilder::new("ruleyank01").build(),
    ]);
    let mut server = Server::new();
    let _list = server
        .mock("GET", RULES_PATH)
        .with_status(200)
        .with_body("[]")
        .create();
    let failing = server
        .mock("PUT", format!("{RULES_PATH}/rulexray01").as_str())
        .with_status(503)
        .expect(3)
        .create();
    let succeeding = server
        .mock("PUT", format!("{RULES_PATH}/ruleyank01").as_str())
        .match_header("if-none-match", "*")
        .match_body(Matcher::PartialJson(serde_json::json!({ "uid": "ruleyank01" })))
        .with_status(200)
        .expect(1)
        .create();

    against(dir.root(), &server)
        .arg("apply")
        .arg(dir.root())
        .arg("--yes")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("ruleyank01: applied"))
        .stdout(predicate::str::contains("rulexray01: failed:"))
        .stdout(predicate::str::contains("Unfinished: rulexray01"));

    failing.assert();
    succeeding.assert();
}

#[test]
fn test_apply_json_report() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").build()]);
    let mut server = Server::new();
    let _list = server
        .mock("GET", RULES_PATH)
        .with_status(200)
        .with_body(wire(&[RuleBuilder::new("ruleghost01").build()]))
        .create();
    let _create = server
        .mock("PUT", format!("{RULES_PATH}/rulealpha01").as_str())
        .with_status(201)
        .create();
    let delete = server
        .mock("DELETE", format!("{RULES_PATH}/ruleghost01").as_str())
        .with_status(204)
        .expect(1)
        .create();

    let output = against(dir.root(), &server)
        .arg("apply")
        .arg(dir.root())
        .args(["--yes", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["success"], true);
    assert_eq!(doc["operations"][0]["uid"], "rulealpha01");
    assert_eq!(doc["operations"][0]["action"], "create");
    assert_eq!(doc["operations"][1]["action"], "delete");
    delete.assert();
}

#[test]
fn test_apply_refuses_without_yes_when_not_interactive() {
    let dir = RulesDir::with_rules(&[RuleBuilder::new("rulealpha01").build()]);
    let mut server = Server::new();
    let _list = server
        .mock("GET", RULES_PATH)
        .with_status(200)
        .with_body("[]")
        .create();
    let write = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create();

    against(dir.root(), &server)
        .arg("apply")
        .arg(dir.root())
        .write_stdin("y\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--yes"));

    write.assert();
}

#[test]
fn test_apply_with_nothing_to_do() {
    let rule = RuleBuilder::new("rulealpha01").build();
    let dir = RulesDir::with_rules(&[rule.clone()]);
    let mut server = Server::new();
    let _list = server
        .mock("GET", RULES_PATH)
        .with_status(200)
        .with_body(wire(&[rule]))
        .create();

    against(dir.root(), &server)
        .arg("apply")
        .arg(dir.root())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("No changes"));
}

// ============================================================================
// export
// ============================================================================

#[test]
fn test_export_writes_rule_files() {
    let dest = RulesDir::new();
    let mut server = Server::new();
    let _list = server
        .mock("GET", RULES_PATH)
        .with_status(200)
        .with_body(wire(&[
            RuleBuilder::new("rulealpha01").build(),
            RuleBuilder::new("rulebravo01").folder("infra").build(),
        ]))
        .create();

    against(dest.root(), &server)
        .arg("export")
        .arg(dest.root())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Exported 2 rule(s)"));

    dest.assert_file_exists("validators/rulealpha01.json");
    dest.assert_file_exists("infra/rulebravo01.json");

    alertsync(dest.root())
        .arg("validate")
        .arg(dest.root())
        .assert()
        .code(0);
}
