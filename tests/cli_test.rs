use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/quotes.jsonl")
        .arg("--endpoints")
        .arg("tests/fixtures/endpoints.csv")
        .arg("--outbound-timeout-ms")
        .arg("500");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""operation":"quoteRequest""#))
        .stdout(predicate::str::contains(r#""status":"persisted""#))
        // Quote response for Q1
        .stdout(predicate::str::contains(r#""quoteResponseId":"#))
        .stdout(predicate::str::contains(r#""status":"forwarding""#))
        .stdout(predicate::str::contains(r#""status":"recorded""#))
        // Payee-initiated Q2 is rejected and reported, processing continues
        .stdout(predicate::str::contains(r#""quoteId":"Q2""#).not())
        .stderr(predicate::str::contains(
            "Error processing quoteRequest for quote Q2",
        ));

    Ok(())
}

#[test]
fn test_cli_malformed_line_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;

    let mut input = tempfile::NamedTempFile::new()?;
    writeln!(input, "{{not json")?;
    writeln!(
        input,
        r#"{{"operation":"quoteGet","headers":{{"FSPIOP-Source":"payerfsp","FSPIOP-Destination":"payeefsp"}},"quoteId":"Q9"}}"#
    )?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(input.path()).arg("--outbound-timeout-ms").arg("500");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""quoteId":"Q9""#))
        .stderr(predicate::str::contains("Error reading operation"));

    Ok(())
}
