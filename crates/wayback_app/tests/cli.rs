use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn wayback_dl() -> Command {
    Command::cargo_bin("wayback_dl").unwrap()
}

/// Address on localhost where nothing is listening.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/wayback/available")
}

#[test]
fn missing_input_is_a_usage_error() {
    wayback_dl()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--url").and(predicate::str::contains("--list")));
}

#[test]
fn url_and_list_are_mutually_exclusive() {
    wayback_dl()
        .args(["-u", "https://example.com/a.pdf", "-l", "urls.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn zero_threads_is_a_usage_error() {
    wayback_dl()
        .args(["-u", "https://example.com/a.pdf", "-t", "0"])
        .assert()
        .code(2);
}

#[test]
fn unreadable_list_file_exits_with_one() {
    let temp = TempDir::new().unwrap();
    wayback_dl()
        .arg("-l")
        .arg(temp.path().join("does-not-exist.txt"))
        .arg("-o")
        .arg(temp.path().join("out"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not read URL list"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn broken_config_file_exits_with_one() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("wayback.ron");
    fs::write(&config, "(threads: Some(\"many\"))").unwrap();

    wayback_dl()
        .args(["-u", "https://example.com/a.pdf", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not parse config file"));
}

#[test]
fn empty_list_completes_with_empty_summary() {
    let temp = TempDir::new().unwrap();
    let list = temp.path().join("urls.txt");
    fs::write(&list, "\n   \n").unwrap();
    let out = temp.path().join("out");

    wayback_dl()
        .arg("-l")
        .arg(&list)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Download Summary"));
    assert!(out.is_dir());
    assert!(!out.join("failed_urls.txt").exists());
}

#[test]
fn unreachable_archive_is_reported_but_not_fatal() {
    let temp = TempDir::new().unwrap();
    let list = temp.path().join("urls.txt");
    fs::write(&list, "https://example.com/a.pdf\n\nhttps://example.com/b.pdf\n").unwrap();
    let config = temp.path().join("wayback.ron");
    fs::write(
        &config,
        format!("(availability_url: Some(\"{}\"), retries: Some(0))", closed_port_url()),
    )
    .unwrap();
    let out = temp.path().join("out");

    wayback_dl()
        .arg("-l")
        .arg(&list)
        .arg("-o")
        .arg(&out)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed URLs saved to"));

    assert_eq!(
        fs::read_to_string(out.join("failed_urls.txt")).unwrap(),
        "https://example.com/a.pdf\nhttps://example.com/b.pdf\n"
    );
    assert!(!out.join("a.pdf").exists());
}
