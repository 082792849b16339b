use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn quote_get_input() -> tempfile::NamedTempFile {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        input,
        r#"{{"operation":"quoteGet","headers":{{"FSPIOP-Source":"payerfsp","FSPIOP-Destination":"payeefsp"}},"quoteId":"Q1"}}"#
    )
    .unwrap();
    input
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let input = quote_get_input();

    let mut cmd = Command::new(cargo_bin!("quoting-engine"));
    cmd.arg(input.path()).arg("--db-path").arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let input = quote_get_input();

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("quoting-engine"));
    cmd.arg(input.path()).arg("--db-path").arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage").not());
}
