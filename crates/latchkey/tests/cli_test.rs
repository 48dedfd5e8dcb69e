//! Integration tests for the `latchkey` CLI binary.
//!
//! Every test runs against a fleet snapshot in a temp directory, so nothing
//! touches real controllers or the user's configuration.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

const ALPHA: &str = "405419896";
const BRAVO: &str = "303986753";

fn fleet_json() -> Value {
    json!({
        "devices": [
            {
                "id": 405_419_896,
                "name": "Main building",
                "doors": ["Front Door", "Side Door", "", "Garage"],
                "cards": [
                    {
                        "card_number": 8_165_538,
                        "from": "2023-01-01",
                        "to": "2023-12-31",
                        "doors": [1, 0, 0, 1],
                        "pin": 0
                    },
                    null,
                    {
                        "card_number": 8_165_539,
                        "from": "2023-01-01",
                        "to": "2023-12-31",
                        "doors": [1, 1, 0, 0],
                        "pin": 7531
                    }
                ],
                "profiles": [{ "id": 29 }]
            },
            {
                "id": 303_986_753,
                "doors": ["Workshop", "Store Room", "", ""],
                "cards": []
            }
        ]
    })
}

/// Temp directory holding `fleet.json`. Dropped with the test.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(fleet: &Value) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fleet.json"), serde_json::to_string_pretty(fleet).unwrap())
            .unwrap();
        Self { dir }
    }

    fn fleet(&self) -> PathBuf {
        self.dir.path().join("fleet.json")
    }

    fn fleet_contents(&self) -> String {
        std::fs::read_to_string(self.fleet()).unwrap()
    }

    fn write(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    /// `latchkey --fleet <fleet.json>` with env isolation.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = latchkey_cmd(self.dir.path());
        cmd.arg("--fleet").arg(self.fleet());
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(["-o", "json"]).args(args).output().unwrap();
        assert!(output.status.success(), "{}", combined_output(&output));
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

/// Build a [`Command`] for the `latchkey` binary with env isolation.
///
/// Clears all `LATCHKEY_*` env vars and points the config file at a path
/// that does not exist.
fn latchkey_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("latchkey");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("LATCHKEY_CONFIG", home.join("missing.toml"))
        .env_remove("LATCHKEY_FLEET")
        .env_remove("LATCHKEY_OUTPUT")
        .env_remove("LATCHKEY_DEFAULTS__OUTPUT")
        .env_remove("LATCHKEY_DEFAULTS__INDEX_SCAN_LIMIT")
        .env_remove("LATCHKEY_DEFAULTS__WITH_PIN")
        .env("NO_COLOR", "1");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    latchkey_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("card permissions")
            .and(predicate::str::contains("acl"))
            .and(predicate::str::contains("card"))
            .and(predicate::str::contains("devices")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    latchkey_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("latchkey"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    latchkey_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Fleet resolution ────────────────────────────────────────────────

#[test]
fn test_no_fleet_configured() {
    let home = TempDir::new().unwrap();
    latchkey_cmd(home.path())
        .arg("devices")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No fleet snapshot configured"));
}

#[test]
fn test_missing_fleet_file() {
    let home = TempDir::new().unwrap();
    latchkey_cmd(home.path())
        .args(["--fleet", "/nonexistent/fleet.json", "devices"])
        .assert()
        .code(4);
}

#[test]
fn test_fleet_from_env() {
    let ws = Workspace::new(&fleet_json());
    latchkey_cmd(ws.dir.path())
        .env("LATCHKEY_FLEET", ws.fleet())
        .args(["-o", "plain", "devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains(ALPHA).and(predicate::str::contains(BRAVO)));
}

// ── Devices ─────────────────────────────────────────────────────────

#[test]
fn test_devices_table() {
    let ws = Workspace::new(&fleet_json());
    ws.cmd()
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("Front Door").and(predicate::str::contains("Workshop")));
}

#[test]
fn test_devices_json_sorted_by_id() {
    let ws = Workspace::new(&fleet_json());
    let devices = ws.json(&["devices"]);
    let ids: Vec<u64> = devices
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![303_986_753, 405_419_896]);
}

// ── ACL ─────────────────────────────────────────────────────────────

#[test]
fn test_acl_get_skips_empty_slots() {
    let ws = Workspace::new(&fleet_json());
    let acl = ws.json(&["acl", "get"]);

    let alpha = acl[ALPHA].as_object().unwrap();
    assert_eq!(alpha.len(), 2);
    assert_eq!(alpha["8165539"]["pin"], 7531);
    assert!(acl[BRAVO].as_object().unwrap().is_empty());
}

#[test]
fn test_acl_compare_plain() {
    let ws = Workspace::new(&fleet_json());
    let mut acl = ws.json(&["acl", "get"]);
    acl[ALPHA]["8165538"]["to"] = json!("2024-12-31");
    acl[ALPHA].as_object_mut().unwrap().remove("8165539");
    let desired = ws.write("desired.json", &acl);

    ws.cmd()
        .args(["-o", "plain", "acl", "compare", "-d"])
        .arg(&desired)
        .assert()
        .success()
        .stdout(predicate::str::contains("updated 8165538").and(predicate::str::contains("deleted 8165539")));
}

#[test]
fn test_acl_compare_unknown_controller_is_partial() {
    let ws = Workspace::new(&fleet_json());
    let desired = ws.write("desired.json", &json!({ "999": {} }));

    ws.cmd()
        .args(["acl", "compare", "-d"])
        .arg(&desired)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("warning:"));
}

#[test]
fn test_acl_put_dry_run_leaves_fleet_alone() {
    let ws = Workspace::new(&fleet_json());
    let before = ws.fleet_contents();
    let desired = ws.write("desired.json", &json!({ ALPHA: {}, BRAVO: {} }));

    let result = ws.json(&["acl", "put", "--dry-run", "-d", desired.to_str().unwrap()]);
    assert_eq!(result["dry_run"], true);
    assert_eq!(result["consolidated"]["deleted"], json!([8_165_538, 8_165_539]));
    assert_eq!(ws.fleet_contents(), before);
}

#[test]
fn test_acl_put_writes_and_converges() {
    let ws = Workspace::new(&fleet_json());
    let desired = ws.write(
        "desired.json",
        &json!({
            BRAVO: {
                "8165540": {
                    "card_number": 8_165_540,
                    "from": "2024-01-01",
                    "to": "2024-12-31",
                    "doors": [1, 0, 0, 0],
                    "pin": 0
                }
            }
        }),
    );

    let first = ws.json(&["acl", "put", "-d", desired.to_str().unwrap()]);
    assert_eq!(first["reports"][BRAVO]["added"], json!([8_165_540]));

    let second = ws.json(&["acl", "put", "-d", desired.to_str().unwrap()]);
    assert_eq!(second["reports"][BRAVO]["unchanged"], json!([8_165_540]));
    assert_eq!(second["reports"][BRAVO]["added"], json!([]));

    // ALPHA was not named in the desired file, so it keeps its cards
    let acl = ws.json(&["acl", "get"]);
    assert_eq!(acl[ALPHA].as_object().unwrap().len(), 2);
}

#[test]
fn test_acl_clear_requires_yes_when_not_interactive() {
    let ws = Workspace::new(&fleet_json());
    let before = ws.fleet_contents();

    ws.cmd()
        .args(["acl", "clear"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
    assert_eq!(ws.fleet_contents(), before);
}

#[test]
fn test_acl_clear_with_yes() {
    let ws = Workspace::new(&fleet_json());
    ws.cmd().args(["-y", "acl", "clear"]).assert().success();

    let acl = ws.json(&["acl", "get"]);
    assert!(acl[ALPHA].as_object().unwrap().is_empty());
}

// ── Cards ───────────────────────────────────────────────────────────

#[test]
fn test_card_grant_then_get() {
    let ws = Workspace::new(&fleet_json());
    ws.cmd()
        .args(["card", "grant", "8165540", "--from", "2024-01-01", "--to", "2024-12-31", "workshop"])
        .assert()
        .success();

    let card = ws.json(&["card", "get", "8165540"]);
    assert_eq!(card["doors"]["Workshop"]["access"], 1);
    assert_eq!(card["doors"]["Store Room"]["access"], 0);
    assert!(card["doors"].get("Front Door").is_none());
}

#[test]
fn test_card_grant_undefined_profile() {
    let ws = Workspace::new(&fleet_json());
    let before = ws.fleet_contents();

    ws.cmd()
        .args(["card", "grant", "8165540", "--from", "2024-01-01", "--to", "2024-12-31", "-p", "30", "Garage"])
        .assert()
        .code(4);
    assert_eq!(ws.fleet_contents(), before);
}

#[test]
fn test_card_revoke_named_door() {
    let ws = Workspace::new(&fleet_json());
    ws.cmd().args(["card", "revoke", "8165538", "Garage"]).assert().success();

    let card = ws.json(&["card", "get", "8165538"]);
    assert_eq!(card["doors"]["Garage"]["access"], 0);
    assert_eq!(card["doors"]["Front Door"]["access"], 1);
}

#[test]
fn test_card_get_unknown() {
    let ws = Workspace::new(&fleet_json());
    ws.cmd()
        .args(["card", "get", "1"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("acl get"));
}

#[test]
fn test_card_grant_ambiguous_door() {
    let mut fleet = fleet_json();
    fleet["devices"][1]["doors"][2] = json!("GARAGE");
    let ws = Workspace::new(&fleet);
    let before = ws.fleet_contents();

    ws.cmd()
        .args(["card", "grant", "8165540", "--from", "2024-01-01", "--to", "2024-12-31", "Front Door"])
        .assert()
        .code(6);
    assert_eq!(ws.fleet_contents(), before);
}

#[test]
fn test_card_grant_invalid_date() {
    let ws = Workspace::new(&fleet_json());
    ws.cmd()
        .args(["card", "grant", "8165540", "--from", "01/01/2024", "--to", "2024-12-31", "Garage"])
        .assert()
        .code(2);
}
