use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_version() {
    Command::cargo_bin("feedscroll")
        .expect("feedscroll binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("feedscroll")
        .expect("feedscroll binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("feedscroll").and(predicate::str::contains("--sort")));
}

#[test]
fn rejects_unknown_sort() {
    Command::cargo_bin("feedscroll")
        .expect("feedscroll binary")
        .args(["--sort", "best"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown sort 'best'"));
}
