mod common;

use common::*;
use quoting_engine::domain::headers::{FSPIOP_DESTINATION, FSPIOP_SOURCE, FspiopHeaders};
use quoting_engine::domain::ports::HttpMethod;
use quoting_engine::error::ApiErrorCode;

fn get_headers() -> FspiopHeaders {
    payer_headers("GET", "/quotes/Q1")
}

fn error_code(body: Option<&str>) -> String {
    let body: serde_json::Value = serde_json::from_str(body.unwrap()).unwrap();
    body["errorInformation"]["errorCode"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_get_is_forwarded_to_destination() {
    let h = harness().await;

    h.service
        .handle_quote_get(&get_headers(), "Q1")
        .await
        .unwrap();
    h.settle().await;

    let requests = h.client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, format!("{PAYEE_URL}/quotes/Q1"));
    assert!(requests[0].body.is_none());
    assert_eq!(h.store.total_rows().await, 0);
}

#[tokio::test]
async fn test_get_needs_no_stored_quote() {
    let h = harness().await;
    let headers = FspiopHeaders::new()
        .with(FSPIOP_SOURCE, PAYEE)
        .with(FSPIOP_DESTINATION, PAYER);

    h.service.handle_quote_get(&headers, "Q7").await.unwrap();
    h.settle().await;

    assert_eq!(h.client.forwards()[0].url, format!("{PAYER_URL}/quotes/Q7"));
}

#[tokio::test]
async fn test_get_without_source_is_rejected() {
    let h = harness().await;
    let headers = FspiopHeaders::new().with(FSPIOP_DESTINATION, PAYEE);

    let err = h
        .service
        .handle_quote_get(&headers, "Q1")
        .await
        .unwrap_err();

    assert!(err.as_fspiop().unwrap().is(ApiErrorCode::MissingElement));
    assert_eq!(h.service.scheduler().submitted(), 0);
}

#[tokio::test]
async fn test_get_to_participant_without_endpoint_reports_destination_error() {
    let h = harness_without_payee_endpoint().await;

    h.service
        .handle_quote_get(&get_headers(), "Q1")
        .await
        .unwrap();
    h.settle().await;

    assert!(h.client.forwards().is_empty());
    let callbacks = h.client.error_callbacks();
    assert_eq!(callbacks.len(), 1);
    assert_eq!(callbacks[0].url, format!("{PAYER_URL}/quotes/Q1/error"));
    assert_eq!(error_code(callbacks[0].body.as_deref()), "3201");
}

#[tokio::test]
async fn test_unreachable_destination_reports_communication_error() {
    let h = harness().await;
    h.client.fail(PAYEE_URL);

    h.service
        .handle_quote_get(&get_headers(), "Q1")
        .await
        .unwrap();
    h.settle().await;

    let callbacks = h.client.error_callbacks();
    assert_eq!(callbacks.len(), 1);
    assert_eq!(error_code(callbacks[0].body.as_deref()), "1001");
}
