//! Integration tests for the `nutlink` CLI binary.
//!
//! Argument parsing, help, completions and config handling run without a
//! server; everything else runs the binary against the scripted upsd from
//! `nutlink_api::testing`.
#![allow(clippy::unwrap_used)]

use std::net::TcpListener;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

use nutlink_api::testing::{self, MockServer};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nutlink` binary with env isolation.
///
/// Clears all `NUTLINK_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn nutlink_in(home: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nutlink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("NUTLINK_PROFILE")
        .env_remove("NUTLINK_HOST")
        .env_remove("NUTLINK_PORT")
        .env_remove("NUTLINK_USERNAME")
        .env_remove("NUTLINK_PASSWORD")
        .env_remove("NUTLINK_OUTPUT")
        .env_remove("NUTLINK_TIMEOUT");
    cmd
}

fn nutlink_cmd() -> assert_cmd::Command {
    nutlink_in("/tmp/nutlink-cli-test-nonexistent")
}

/// A command already pointed at `server`.
fn against(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = nutlink_cmd();
    cmd.args(["--host", "127.0.0.1", "--port", &server.port().to_string()]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Where the binary looks for its config file under `home`.
fn config_file(home: &str) -> PathBuf {
    let output = nutlink_in(home).args(["config", "path"]).output().unwrap();
    PathBuf::from(String::from_utf8(output.stdout).unwrap().trim())
}

fn write_config(home: &str, body: &str) {
    let path = config_file(home);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nutlink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    nutlink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Network UPS Tools upsd line protocol")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("vars"))
            .and(predicate::str::contains("run")),
    );
}

#[test]
fn test_short_help_flag() {
    nutlink_cmd().arg("-h").assert().success().stdout(
        predicate::str::contains("Query and control Network UPS Tools servers")
            .and(predicate::str::contains("upsd line protocol").not()),
    );
}

#[test]
fn test_version_flag() {
    nutlink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nutlink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nutlink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    nutlink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = nutlink_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_get_requires_variable() {
    nutlink_cmd().args(["get", "ups1"]).assert().code(2);
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.local_addr().unwrap().port()
    };
    nutlink_cmd()
        .args(["--host", "127.0.0.1", "--port", &port.to_string(), "devices"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("upsd"));
}

#[test]
fn test_unknown_profile() {
    nutlink_cmd()
        .args(["--profile", "nope", "devices"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

// ── Listings ────────────────────────────────────────────────────────

#[test]
fn test_devices_plain() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["devices", "-o", "plain"])
        .assert()
        .success()
        .stdout("ups1\nups2\n");
}

#[test]
fn test_devices_table() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .arg("devices")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Description")
                .and(predicate::str::contains("Backup UPS")),
        );
}

#[test]
fn test_vars_plain_matches_upsc() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["vars", "ups1", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("battery.charge: 100")
                .and(predicate::str::contains("ups.status: OL CHRG")),
        );
}

#[test]
fn test_rw_json() {
    let server = MockServer::standard().unwrap();
    let output = against(&server)
        .args(["rw", "ups1", "-o", "json-compact"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[1]["name"], "ups.id");
    assert_eq!(rows[1]["value"], "rack one");
}

#[test]
fn test_cmds_with_descriptions() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["cmds", "ups1", "--describe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run test.battery.start"));
}

#[test]
fn test_enum_and_range() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["enum", "ups1", "input.transfer.low", "-o", "plain"])
        .assert()
        .success()
        .stdout("97\n100\n103\n");

    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["range", "ups1", "input.transfer.low", "-o", "plain"])
        .assert()
        .success()
        .stdout("90 105\n");
}

#[test]
fn test_clients_and_logins() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["clients", "-o", "plain"])
        .assert()
        .success()
        .stdout("ups1 127.0.0.1\nups1 10.0.0.9\n");

    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["logins", "ups1", "-o", "plain"])
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_server_version() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["version", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("upsd 2.8.1")
                .and(predicate::str::contains("\"protocol\": \"1.3\"")),
        );
}

// ── Single values ───────────────────────────────────────────────────

#[test]
fn test_get_plain() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["get", "ups1", "ups.status", "-o", "plain"])
        .assert()
        .success()
        .stdout("OL CHRG\n");
}

#[test]
fn test_get_long() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["get", "ups1", "ups.id", "--long"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Description of ups.id")
                .and(predicate::str::contains("Value:       rack one")),
        );
}

#[test]
fn test_get_unknown_device() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["get", "badups", "battery.charge"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("badups"));
}

#[test]
fn test_get_unknown_variable() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["get", "ups1", "no.such.var"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("vars ups1"));
}

// ── Writes ──────────────────────────────────────────────────────────

#[test]
fn test_set_variable() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["set", "ups1", "ups.id", "rack two"])
        .assert()
        .success()
        .stderr(predicate::str::contains("ups.id set on ups1"));
    assert!(
        server
            .requests()
            .contains(&"SET VAR ups1 ups.id \"rack two\"".to_owned())
    );
}

#[test]
fn test_set_readonly_variable() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["set", "ups1", "battery.charge", "50"])
        .assert()
        .code(9)
        .stderr(predicate::str::contains("READONLY"));
}

#[test]
fn test_run_command() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["-q", "run", "ups1", "beeper.off"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
    assert!(
        server
            .requests()
            .contains(&"INSTCMD ups1 beeper.off".to_owned())
    );
}

// ── Authentication ──────────────────────────────────────────────────

#[test]
fn test_authenticated_run() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["--username", testing::USERNAME])
        .env("NUTLINK_PASSWORD", testing::PASSWORD)
        .args(["run", "ups1", "test.battery.start"])
        .assert()
        .success();
}

#[test]
fn test_wrong_password() {
    let server = MockServer::standard().unwrap();
    against(&server)
        .args(["--username", testing::USERNAME, "--password", "nope", "devices"])
        .assert()
        .code(3);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    nutlink_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_profile_from_config() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path().to_str().unwrap().to_owned();
    let server = MockServer::standard().unwrap();
    write_config(
        &home,
        &format!(
            "default_profile = \"rack\"\n\n[profiles.rack]\nhost = \"127.0.0.1\"\nport = {}\n",
            server.port()
        ),
    );

    nutlink_in(&home)
        .args(["devices", "-o", "plain"])
        .assert()
        .success()
        .stdout("ups1\nups2\n");
}

#[test]
fn test_config_show_masks_passwords() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path().to_str().unwrap().to_owned();
    write_config(
        &home,
        "[profiles.rack]\nhost = \"ups.lan\"\nusername = \"admin\"\npassword = \"hunter2\"\n",
    );

    nutlink_in(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ups.lan")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("hunter2").not()),
        );
}
