use assert_cmd::Command;
use predicates::prelude::*;

fn azlin() -> Command {
    Command::cargo_bin("azlin").expect("azlin binary builds")
}

fn isolated_home() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[test]
fn help_lists_the_normative_command_set() {
    azlin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("orphans"))
        .stdout(predicate::str::contains("quota"));
}

#[test]
fn completions_emits_a_script_without_touching_the_network() {
    azlin()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("azlin"));
}

#[test]
fn quota_get_on_a_never_configured_name_is_resource_not_found() {
    let home = isolated_home();
    azlin()
        .env("HOME", home.path())
        .env("AZLIN_NONINTERACTIVE", "1")
        .args(["quota", "get", "team", "never-configured"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("resource not found"));
}

#[test]
fn exec_without_a_target_selector_is_a_usage_error() {
    let home = isolated_home();
    azlin()
        .env("HOME", home.path())
        .args(["exec", "--", "uptime"])
        .assert()
        .failure();
}

#[test]
fn cp_rejects_mixed_local_and_remote_sources() {
    let home = isolated_home();
    azlin()
        .env("HOME", home.path())
        .args(["cp", "local.txt", "vm1:/remote.txt", "dest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mix"));
}
