#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

const REQUEST: &str = r#"{"operation":"quoteRequest","headers":{"FSPIOP-Source":"payerfsp","FSPIOP-Destination":"payeefsp"},"body":{"quoteId":"Q1","transactionId":"T1","payee":{"partyIdInfo":{"partyIdType":"MSISDN","partyIdentifier":"2771","fspId":"payeefsp"}},"payer":{"partyIdInfo":{"partyIdType":"MSISDN","partyIdentifier":"2772","fspId":"payerfsp"}},"amountType":"SEND","amount":{"currency":"USD","amount":"100"},"transactionType":{"scenario":"TRANSFER","initiator":"PAYER","initiatorType":"CONSUMER"}}}"#;

fn run(db_path: &std::path::Path) -> String {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    writeln!(input, "{REQUEST}").unwrap();

    let mut cmd = Command::new(cargo_bin!("quoting-engine"));
    cmd.arg(input.path())
        .arg("--endpoints")
        .arg("tests/fixtures/endpoints.csv")
        .arg("--outbound-timeout-ms")
        .arg("500")
        .arg("--db-path")
        .arg(db_path);

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run persists the quote request
    let stdout1 = run(&db_path);
    assert!(stdout1.contains(r#""status":"persisted""#));

    // 2. Second run sees the stored duplicate check and treats it as a resend
    let stdout2 = run(&db_path);
    assert!(stdout2.contains(r#""status":"resent""#));
}
