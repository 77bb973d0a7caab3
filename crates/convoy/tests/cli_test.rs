#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("validate"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("convoy"));
}

/// deployコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_deploy_help() {
    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("deploy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("<REVISION>"))
        .stdout(predicate::str::contains("--config"));
}

/// serveコマンドのヘルプが正しく表示されることを確認
#[test]
fn test_serve_help() {
    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--secret"));
}

/// serveコマンドはシークレットなしでは起動しないことを確認
#[test]
fn test_serve_requires_secret() {
    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("serve")
        .env_remove("CONVOY_WEBHOOK_SECRET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--secret"));
}

/// validateコマンドが有効な設定ファイルを受理することを確認
#[test]
fn test_validate_accepts_valid_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("convoy.kdl");
    std::fs::write(
        &config_path,
        r#"
deployment "vantage" {
    service "db" {
        image "postgres" version="16"
    }
    service "api" {
        image "vantage/api" version="latest"
        depends_on "db"
    }
}
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("有効です"))
        .stdout(predicate::str::contains("vantage"));
}

/// validateコマンドが不正な設定ファイルを拒否することを確認
#[test]
fn test_validate_rejects_unknown_dependency() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("convoy.kdl");
    std::fs::write(
        &config_path,
        r#"
deployment "vantage" {
    service "api" {
        image "vantage/api"
        depends_on "db"
    }
}
"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("db"));
}

/// 設定ファイルが見つからない場合のエラーを確認
#[test]
fn test_deploy_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("convoy").unwrap();
    cmd.arg("deploy")
        .arg("v1.0.0")
        .current_dir(temp_dir.path())
        .env_remove("CONVOY_CONFIG_PATH")
        .assert()
        .failure()
        .stderr(predicate::str::contains("convoy.kdl"));
}
