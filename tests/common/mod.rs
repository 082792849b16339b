#![allow(dead_code)]

use async_trait::async_trait;
use quoting_engine::application::service::QuotingService;
use quoting_engine::config::QuotingConfig;
use quoting_engine::domain::headers::{
    FSPIOP_DESTINATION, FSPIOP_HTTP_METHOD, FSPIOP_SOURCE, FSPIOP_URI, FspiopHeaders,
};
use quoting_engine::domain::ports::{
    CallbackClient, OutboundRequest, OutboundResponse, QuoteRules, QuoteRulesRef, RuleFailure,
};
use quoting_engine::domain::quote::{QuoteRequest, QuoteUpdate};
use quoting_engine::domain::records::QUOTES_CALLBACK_ENDPOINT;
use quoting_engine::error::{QuotingError, Result};
use quoting_engine::infrastructure::in_memory::InMemoryQuoteStore;
use quoting_engine::infrastructure::reference::ReferenceCatalog;
use quoting_engine::infrastructure::rules::PermitAllRules;
use serde_json::json;
use std::sync::{Arc, Mutex};

pub const PAYER: &str = "payerfsp";
pub const PAYEE: &str = "payeefsp";
pub const PAYER_URL: &str = "http://payer.local";
pub const PAYEE_URL: &str = "http://payee.local";

/// Callback client that records every request instead of sending it.
///
/// Responds 200 unless a URL prefix was configured with another status or
/// marked unreachable.
#[derive(Default)]
pub struct RecordingClient {
    requests: Mutex<Vec<OutboundRequest>>,
    statuses: Mutex<Vec<(String, u16)>>,
    unreachable: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url_prefix: &str, status: u16) {
        self.statuses
            .lock()
            .unwrap()
            .push((url_prefix.to_string(), status));
    }

    pub fn fail(&self, url_prefix: &str) {
        self.unreachable.lock().unwrap().push(url_prefix.to_string());
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn forwards(&self) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.url.ends_with("/error"))
            .collect()
    }

    pub fn error_callbacks(&self) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with("/error"))
            .collect()
    }
}

#[async_trait]
impl CallbackClient for RecordingClient {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        if self
            .unreachable
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
        {
            return Err(QuotingError::Transport(format!("connection refused: {url}")));
        }

        let status = self
            .statuses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map_or(200, |(_, status)| *status);
        Ok(OutboundResponse {
            status,
            reason: String::new(),
        })
    }
}

fn broken_rule() -> RuleFailure {
    RuleFailure {
        rule: "max-amount".to_string(),
        message: "amount above the configured limit".to_string(),
    }
}

/// Rules engine that reports a broken rule for every request and response.
pub struct FailingRules;

#[async_trait]
impl QuoteRules for FailingRules {
    async fn request_failures(&self, _request: &QuoteRequest) -> Result<Vec<RuleFailure>> {
        Ok(vec![broken_rule()])
    }

    async fn response_failures(
        &self,
        _quote_id: &str,
        _update: &QuoteUpdate,
    ) -> Result<Vec<RuleFailure>> {
        Ok(vec![broken_rule()])
    }
}

/// Rules engine whose evaluation always fails.
pub struct ErroringRules;

#[async_trait]
impl QuoteRules for ErroringRules {
    async fn request_failures(&self, _request: &QuoteRequest) -> Result<Vec<RuleFailure>> {
        Err(QuotingError::Internal("rules engine unavailable".to_string()))
    }

    async fn response_failures(
        &self,
        _quote_id: &str,
        _update: &QuoteUpdate,
    ) -> Result<Vec<RuleFailure>> {
        Err(QuotingError::Internal("rules engine unavailable".to_string()))
    }
}

pub struct Harness {
    pub service: QuotingService,
    pub store: InMemoryQuoteStore,
    pub catalog: ReferenceCatalog,
    pub client: Arc<RecordingClient>,
}

impl Harness {
    pub async fn settle(&self) {
        self.service.scheduler().wait_idle().await;
    }
}

pub async fn harness() -> Harness {
    harness_with(QuotingConfig::default(), true).await
}

/// A harness where the payee FSP is a known participant without a
/// registered callback endpoint.
pub async fn harness_without_payee_endpoint() -> Harness {
    harness_with(QuotingConfig::default(), false).await
}

pub async fn harness_with_rules(rules: QuoteRulesRef) -> Harness {
    build(QuotingConfig::default(), true, rules).await
}

pub async fn harness_with(config: QuotingConfig, payee_endpoint: bool) -> Harness {
    build(config, payee_endpoint, Arc::new(PermitAllRules)).await
}

async fn build(config: QuotingConfig, payee_endpoint: bool, rules: QuoteRulesRef) -> Harness {
    let store = InMemoryQuoteStore::new();
    let catalog = ReferenceCatalog::with_defaults();
    catalog
        .add_endpoint(PAYER, QUOTES_CALLBACK_ENDPOINT, PAYER_URL)
        .await;
    if payee_endpoint {
        catalog
            .add_endpoint(PAYEE, QUOTES_CALLBACK_ENDPOINT, PAYEE_URL)
            .await;
    } else {
        catalog.add_participant(PAYEE).await;
    }

    let client = RecordingClient::new();
    let service = QuotingService::new(
        Arc::new(store.clone()),
        Arc::new(catalog.clone()),
        client.clone(),
        rules,
        &config,
    );

    Harness {
        service,
        store,
        catalog,
        client,
    }
}

pub fn payer_headers(method: &str, uri: &str) -> FspiopHeaders {
    FspiopHeaders::new()
        .with(FSPIOP_SOURCE, PAYER)
        .with(FSPIOP_DESTINATION, PAYEE)
        .with(FSPIOP_HTTP_METHOD, method)
        .with(FSPIOP_URI, uri)
}

pub fn payee_headers(method: &str, uri: &str) -> FspiopHeaders {
    FspiopHeaders::new()
        .with(FSPIOP_SOURCE, PAYEE)
        .with(FSPIOP_DESTINATION, PAYER)
        .with(FSPIOP_HTTP_METHOD, method)
        .with(FSPIOP_URI, uri)
}

pub fn request_headers() -> FspiopHeaders {
    payer_headers("POST", "/quotes")
}

pub fn sample_request(quote_id: &str) -> QuoteRequest {
    serde_json::from_value(json!({
        "quoteId": quote_id,
        "transactionId": format!("tx-{quote_id}"),
        "payee": {
            "partyIdInfo": {"partyIdType": "MSISDN", "partyIdentifier": "27713803912", "fspId": PAYEE}
        },
        "payer": {
            "partyIdInfo": {"partyIdType": "MSISDN", "partyIdentifier": "27713803905", "fspId": PAYER},
            "name": "Ada Lovelace",
            "personalInfo": {
                "complexName": {"firstName": "Ada", "lastName": "Lovelace"},
                "dateOfBirth": "1815-12-10"
            }
        },
        "amountType": "SEND",
        "amount": {"currency": "USD", "amount": "100.25"},
        "transactionType": {"scenario": "TRANSFER", "initiator": "PAYER", "initiatorType": "CONSUMER"},
        "note": "lunch",
        "expiration": "2030-01-01T12:00:00.000Z"
    }))
    .unwrap()
}

pub fn sample_update() -> QuoteUpdate {
    serde_json::from_value(json!({
        "transferAmount": {"currency": "USD", "amount": "101.25"},
        "payeeReceiveAmount": {"currency": "USD", "amount": "100.25"},
        "payeeFspFee": {"currency": "USD", "amount": "1"},
        "expiration": "2030-01-01T12:05:00.000Z",
        "ilpPacket": "AYIBgQAAAAAAAASwNGxldmVsb25lLmRmc3AxLm1lci45T2RTOF81MDdqUUZERmZlakgyOVc4bXFmNEpLMHlGTFGCAUBQU0svMS4wCk5vbmNlOiB1SXlweUYzY3pYSXBFdzVVc05TYWh3CkVuY3J5cHRpb246IG5vbmUKUGF5bWVudC1JZDogMTMyMzZhM2ItOGZhOC00MTYzLTg0NDctNGMzZWQzZGE5OGE3",
        "condition": "f5sqb7tBTWPd5Y8BDFdMm9BJR_MNI4isf8p8n4D5pHA"
    }))
    .unwrap()
}

/// Persists `sample_request(quote_id)` and drains its forward.
pub async fn accept_request(harness: &Harness, quote_id: &str) {
    harness
        .service
        .handle_quote_request(&request_headers(), sample_request(quote_id))
        .await
        .unwrap();
    harness.settle().await;
}
