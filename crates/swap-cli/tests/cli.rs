//! End-to-end tests driving the `skillswap` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn skillswap(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("skillswap").expect("binary");
    cmd.arg("--state-dir").arg(dir.path()).env_remove("SKILLSWAP_TOKEN");
    cmd
}

fn json(dir: &TempDir, token: Option<&str>, args: &[&str]) -> Value {
    let mut cmd = skillswap(dir);
    cmd.args(["--format", "json"]);
    if let Some(token) = token {
        cmd.args(["--token", token]);
    }
    let output = cmd.args(args).output().expect("run");
    assert!(output.status.success(), "{args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
    let value: Value = serde_json::from_slice(&output.stdout).expect("json");
    value["data"].clone()
}

fn register(dir: &TempDir, email: &str, name: &str) -> String {
    let data = json(dir, None, &["auth", "register", email, name, "--password", "password123"]);
    data["token"].as_str().expect("token").to_string()
}

#[test]
fn register_grants_signup_bonus() {
    let dir = TempDir::new().expect("tempdir");
    skillswap(&dir)
        .args(["auth", "register", "ada@example.com", "Ada", "--password", "password123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Ada"));

    skillswap(&dir)
        .args(["credits", "balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100"));
}

#[test]
fn env_overrides_initial_credits() {
    let dir = TempDir::new().expect("tempdir");
    let output = skillswap(&dir)
        .env("SKILLSWAP_INITIAL_CREDITS", "50")
        .args(["--format", "json", "auth", "register", "ada@example.com", "Ada", "--password", "password123"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let token = serde_json::from_slice::<Value>(&output.stdout).expect("json")["data"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    let balance = json(&dir, Some(token.as_str()), &["credits", "balance"]);
    assert_eq!(balance["credits"], 50);
}

#[test]
fn out_of_range_ttl_override_fails_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    let output = skillswap(&dir)
        .env("SKILLSWAP_SESSION_TTL_HOURS", "9223372036854775807")
        .args(["--format", "json", "auth", "register", "ada@example.com", "Ada", "--password", "password123"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["error"]["code"], "config");
}

#[test]
fn wrong_password_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    register(&dir, "ada@example.com", "Ada");
    skillswap(&dir)
        .args(["auth", "login", "ada@example.com", "--password", "wrong-password"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn failures_use_the_json_envelope() {
    let dir = TempDir::new().expect("tempdir");
    let output = skillswap(&dir)
        .args(["--format", "json", "credits", "balance"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["success"], false);
    assert_eq!(value["error"]["code"], "unauthenticated");
}

#[test]
fn credit_exchange_settles_on_both_confirmations() {
    let dir = TempDir::new().expect("tempdir");
    let ada = register(&dir, "ada@example.com", "Ada");
    let bob = register(&dir, "bob@example.com", "Bob");

    json(&dir, Some(bob.as_str()), &["skill", "add", "Guitar lessons", "-c", "music", "-l", "expert", "-r", "15"]);
    let request = json(
        &dir,
        Some(ada.as_str()),
        &["request", "create", "Learn guitar", "-c", "Music", "--credits", "30", "--hours", "2"],
    );
    let request_id = request["id"].as_str().expect("request id");

    let matches = json(&dir, Some(ada.as_str()), &["match", "suggest", request_id]);
    let match_id = matches[0]["id"].as_str().expect("match id").to_string();
    json(&dir, Some(ada.as_str()), &["match", "accept", &match_id]);

    let tx = json(&dir, Some(ada.as_str()), &["tx", "create", &match_id]);
    let tx_id = tx["id"].as_str().expect("tx id").to_string();
    json(&dir, Some(bob.as_str()), &["tx", "start", &tx_id]);

    let partial = json(&dir, Some(ada.as_str()), &["tx", "confirm", &tx_id]);
    assert_eq!(partial["status"], "in_progress");
    let done = json(&dir, Some(bob.as_str()), &["tx", "confirm", &tx_id]);
    assert_eq!(done["status"], "completed");

    assert_eq!(json(&dir, Some(ada.as_str()), &["credits", "balance"])["credits"], 70);
    assert_eq!(json(&dir, Some(bob.as_str()), &["credits", "balance"])["credits"], 130);

    skillswap(&dir)
        .args(["--token", ada.as_str(), "rate", tx_id.as_str(), "6"])
        .assert()
        .failure();
    json(&dir, Some(ada.as_str()), &["rate", &tx_id, "5", "-c", "patient and clear"]);
    let reputation = json(&dir, Some(ada.as_str()), &["reputation", done["provider"].as_str().expect("provider")]);
    assert_eq!(reputation["ratings"].as_array().map(Vec::len), Some(1));
}
