//! CLI integration tests
//!
//! Runs the `chatlink` binary in mock mode, so no upstream is contacted.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 12] = [
    "CHATLINK_BASE_URL",
    "CHATLINK_USER_AGENT",
    "CHATLINK_MODE",
    "CHATLINK_TIMEOUT_MS",
    "CHATLINK_MAX_RETRIES",
    "CHATLINK_BASE_DELAY_MS",
    "CHATLINK_LOG_LEVEL",
    "CHATLINK_PROFILE_ID",
    "CHATLINK_COOKIE",
    "CHATLINK_WRITE_MAX_RETRIES",
    "CHATLINK_STICKER_TTL_SECS",
    "CHATLINK_VERBOSE",
];

/// Command with a clean environment and an empty config file
fn chatlink(config: &NamedTempFile) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("chatlink");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(config.path());
    cmd
}

fn empty_config() -> NamedTempFile {
    NamedTempFile::new().unwrap()
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("chatlink");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    let mut cmd = cargo_bin_cmd!("chatlink");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("profile-id"))
        .stdout(predicate::str::contains("dialogs"))
        .stdout(predicate::str::contains("restrictions"));
}

#[test]
fn test_mock_dialogs() {
    let config = empty_config();
    chatlink(&config)
        .args(["--mock", "dialogs", "--online-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dialogs\""))
        .stdout(predicate::str::contains("Mock user 1"))
        .stdout(predicate::str::contains("Mock user 2").not());
}

#[test]
fn test_mock_restrictions() {
    let config = empty_config();
    chatlink(&config)
        .args(["--mock", "restrictions", "1002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"hasExclusivePosts\":true"))
        .stdout(predicate::str::contains("\"tier\":\"specialplus\""));
}

#[test]
fn test_mock_send_outputs_outcome() {
    let config = empty_config();
    chatlink(&config)
        .args(["--mock", "send", "7", "Hello!"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\":true"))
        .stdout(predicate::str::contains("\"messageId\":799"));
}

#[test]
fn test_mode_from_config_file() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[upstream]\nmode = \"mock\"").unwrap();

    chatlink(&config)
        .args(["--profile-id", "42", "account"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":42"));
}

#[test]
fn test_missing_session_fails_with_json_error() {
    let config = empty_config();
    chatlink(&config)
        .args(["--profile-id", "1001", "account"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("\"success\":false"))
        .stderr(predicate::str::contains("1001"));
}

#[test]
fn test_live_mode_requires_profile() {
    let config = empty_config();
    chatlink(&config)
        .arg("stickers")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("profile-id"));
}

#[test]
fn test_invalid_config_file() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[retry]\ntimeout_ms = \"soon\"").unwrap();

    chatlink(&config)
        .args(["--mock", "account"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_mock_messages_with_huge_dialog_id() {
    let config = empty_config();
    chatlink(&config)
        .args(["--mock", "messages", "1844674407370955161", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dialogId\":1844674407370955161"));
}
