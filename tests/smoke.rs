//! Smoke tests -- verify the binary runs and advertises its configuration.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("postman-exporter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "Prometheus exporter for scheduled Postman collection runs",
        ));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("postman-exporter")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("postman-exporter"));
}

#[test]
fn test_help_documents_env_vars() {
    Command::cargo_bin("postman-exporter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("COLLECTION_FILE"))
        .stdout(predicates::str::contains("RUN_INTERVAL"))
        .stdout(predicates::str::contains("ENABLE_REQUEST_METRICS"));
}

#[test]
fn test_zero_interval_is_rejected_at_parse() {
    Command::cargo_bin("postman-exporter")
        .unwrap()
        .args(["--run-interval", "0"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("--run-interval"));
}

#[test]
fn test_bool_flags_reject_garbage_values() {
    Command::cargo_bin("postman-exporter")
        .unwrap()
        .args(["--enable-bail", "not-a-bool"])
        .assert()
        .failure();
}
