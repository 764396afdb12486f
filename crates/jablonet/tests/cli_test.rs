//! Integration tests for the `jablonet` CLI binary.
//!
//! Argument parsing, help output, config handling and exit codes run
//! without any network. The end-to-end cases drive the binary against a
//! wiremock JabloNET.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `jablonet` binary with env isolation.
///
/// Clears all `JABLONET_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn jablonet_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("jablonet");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("JABLONET_PROFILE")
        .env_remove("JABLONET_USERNAME")
        .env_remove("JABLONET_PASSWORD")
        .env_remove("JABLONET_CONTROL_CODE")
        .env_remove("JABLONET_SERVICE_ID")
        .env_remove("JABLONET_BASE_URL")
        .env_remove("JABLONET_OUTPUT")
        .env_remove("JABLONET_TIMEOUT")
        .env_remove("JABLONET_RETRY_COOLDOWN")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join("jablonet");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = jablonet_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    jablonet_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Jablotron")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("pgm"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    jablonet_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jablonet"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    jablonet_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    jablonet_cmd(home.path())
        .arg("arm-everything")
        .assert()
        .code(2);
}

#[test]
fn test_watch_rejects_zero_interval() {
    let home = tempfile::tempdir().unwrap();
    jablonet_cmd(home.path())
        .args(["watch", "--interval", "0"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_status_without_credentials_is_auth_error() {
    let home = tempfile::tempdir().unwrap();
    let output = jablonet_cmd(home.path()).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("No credentials"), "unexpected output:\n{text}");
}

#[test]
fn test_unknown_profile_lists_available() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "default_profile = \"home\"\n\n[profiles.home]\nusername = \"me@example.com\"\n",
    );
    let output = jablonet_cmd(home.path())
        .args(["--profile", "cottage", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("cottage") && text.contains("home"), "unexpected output:\n{text}");
}

#[test]
fn test_config_show_masks_secrets() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "default_profile = \"home\"\n\n\
         [profiles.home]\n\
         username = \"me@example.com\"\n\
         password = \"hunter2\"\n\
         control_code = \"9876\"\n",
    );
    jablonet_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("me@example.com")
                .and(predicate::str::contains("hunter2").not())
                .and(predicate::str::contains("9876").not()),
        );
}

#[test]
fn test_config_profiles_marks_default() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "default_profile = \"home\"\n\n[profiles.home]\n\n[profiles.cottage]\n",
    );
    jablonet_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home *").and(predicate::str::contains("cottage")));
}

// ── Against a mock service ──────────────────────────────────────────

async fn mount_login(server: &MockServer, login_status: i64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "PHPSESSID=initial; path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ajax/login.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=authed; path=/")
                .set_body_json(json!({ "status": login_status })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "lastMode=cloud; path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/ja100"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/app/ja100/ajax/stav.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "teplomery": { "1": { "value": 21.5, "nazev": "Hall", "stateName": "TEPLOMER_1" } },
            "pgm": {
                "1": {
                    "stav": 0,
                    "nazev": "Gate",
                    "stateName": "PGM_1",
                    "reaction": "pgorSwitchOnOff"
                }
            },
            "permissions": { "PGM_1": 1 }
        })))
        .mount(server)
        .await;
}

/// Run the binary off the runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

fn mock_cmd(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = jablonet_cmd(home);
    cmd.env("JABLONET_USERNAME", "me@example.com")
        .env("JABLONET_PASSWORD", "secret")
        .args(["--base-url", &server.uri(), "--color", "never"]);
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_against_mock_service() {
    let server = MockServer::start().await;
    mount_login(&server, 200).await;
    mount_status(&server).await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = mock_cmd(home.path(), &server);
    cmd.args(["-o", "json", "status"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let points: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().any(|p| p["name"] == "Gate" && p["controllable"] == true));
    assert!(points.iter().any(|p| p["category"] == "thermometers" && p["value"] == 21.5));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_failure_exits_with_auth_code() {
    let server = MockServer::start().await;
    mount_login(&server, 401).await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = mock_cmd(home.path(), &server);
    cmd.arg("login");
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pgm_wrong_code_exits_with_authorization_code() {
    let server = MockServer::start().await;
    mount_login(&server, 200).await;
    mount_status(&server).await;
    Mock::given(method("POST"))
        .and(path("/app/ja100/ajax/ovladani2.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "authorization": 400,
            "responseCode": 200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = mock_cmd(home.path(), &server);
    cmd.args(["pgm", "on", "1", "--code", "0000"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Control code rejected"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pgm_on_reports_resulting_state() {
    let server = MockServer::start().await;
    mount_login(&server, 200).await;
    mount_status(&server).await;
    Mock::given(method("POST"))
        .and(path("/app/ja100/ajax/ovladani2.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "authorization": 200,
            "responseCode": 200,
            "stateName": "PGM_1",
            "stav": 1
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let mut cmd = mock_cmd(home.path(), &server);
    cmd.args(["-o", "plain", "pgm", "on", "1", "--code", "1234"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "on");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_uses_profile_point_names() {
    let server = MockServer::start().await;
    mount_login(&server, 200).await;
    mount_status(&server).await;

    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "default_profile = \"home\"\n\n\
         [profiles.home]\n\
         [profiles.home.names]\n\
         \"pgm/1\" = \"Garage gate\"\n",
    );
    let mut cmd = mock_cmd(home.path(), &server);
    cmd.args(["-o", "json", "status"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let points: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let points = points.as_array().unwrap();
    assert!(points.iter().any(|p| p["id"] == "1" && p["name"] == "Garage gate"));
    assert!(points.iter().any(|p| p["category"] == "thermometers" && p["name"] == "Hall"));
}
