//! Outbound delivery to participant callback endpoints.

use crate::config::QuotingConfig;
use crate::domain::headers::{
    FSPIOP_DESTINATION, FSPIOP_HTTP_METHOD, FSPIOP_SIGNATURE, FSPIOP_SOURCE, FSPIOP_URI,
    FspiopHeaders,
};
use crate::domain::ports::{
    CallbackClientRef, HttpMethod, OutboundRequest, QuoteStoreRef, ReferenceDataRef,
};
use crate::domain::quote::PartyRole;
use crate::domain::records::QUOTES_CALLBACK_ENDPOINT;
use crate::error::{ApiErrorCode, FspiopError, QuotingError, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

pub const QUOTES_CONTENT_TYPE: &str = "application/vnd.interoperability.quotes+json;version=1.0";

/// Whose callback endpoint a forward is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardTarget {
    /// The FSP recorded for this role on the quote.
    Party(PartyRole),
    /// The participant named in the inbound `FSPIOP-Destination` header.
    Destination,
}

/// Builds outbound protocol headers from inbound ones.
///
/// Absent inbound values are omitted. `Accept` is only set when `accept` is
/// true; `User-Agent` is never sent.
pub fn outbound_headers(headers: &FspiopHeaders, accept: bool) -> Vec<(String, String)> {
    let mut out = vec![
        ("Content-Type".to_string(), QUOTES_CONTENT_TYPE.to_string()),
        (
            "Date".to_string(),
            Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        ),
    ];
    for (name, key) in [
        ("FSPIOP-Source", FSPIOP_SOURCE),
        ("FSPIOP-Destination", FSPIOP_DESTINATION),
        ("FSPIOP-HTTP-Method", FSPIOP_HTTP_METHOD),
        ("FSPIOP-Signature", FSPIOP_SIGNATURE),
        ("FSPIOP-URI", FSPIOP_URI),
    ] {
        if let Some(value) = headers.get(key) {
            out.push((name.to_string(), value.to_string()));
        }
    }
    if accept {
        out.push(("Accept".to_string(), QUOTES_CONTENT_TYPE.to_string()));
    }
    out
}

#[derive(Clone)]
pub struct CallbackDispatcher {
    store: QuoteStoreRef,
    reference: ReferenceDataRef,
    client: CallbackClientRef,
    switch_id: String,
    error_callback_attempts: u32,
}

impl CallbackDispatcher {
    pub fn new(
        store: QuoteStoreRef,
        reference: ReferenceDataRef,
        client: CallbackClientRef,
        config: &QuotingConfig,
    ) -> Self {
        Self {
            store,
            reference,
            client,
            switch_id: config.switch_id.clone(),
            error_callback_attempts: config.error_callback_attempts.max(1),
        }
    }

    async fn endpoint_for(
        &self,
        quote_id: &str,
        target: ForwardTarget,
        headers: &FspiopHeaders,
    ) -> Result<Option<String>> {
        let participant = match target {
            ForwardTarget::Party(role) => self
                .store
                .get_quote_party(quote_id, role)
                .await?
                .map(|party| party.party.fsp_id),
            ForwardTarget::Destination => headers.destination().map(str::to_string),
        };
        match participant {
            Some(participant) => {
                self.reference
                    .get_participant_endpoint(&participant, QUOTES_CALLBACK_ENDPOINT)
                    .await
            }
            None => Ok(None),
        }
    }

    /// Delivers a request, response or lookup to a counterparty.
    ///
    /// Failures are protocol errors addressed to the inbound source: a missing
    /// endpoint is a destination FSP error, while transport failures and
    /// non-2xx answers are destination communication errors.
    pub async fn forward(
        &self,
        method: HttpMethod,
        headers: &FspiopHeaders,
        quote_id: &str,
        body: Option<String>,
        target: ForwardTarget,
    ) -> Result<()> {
        let source = headers.source().unwrap_or_default();
        let endpoint = self
            .endpoint_for(quote_id, target, headers)
            .await?
            .ok_or_else(|| {
                FspiopError::new(
                    ApiErrorCode::DestinationFspError,
                    format!("No {QUOTES_CALLBACK_ENDPOINT} found for {method} of quote {quote_id}"),
                    source,
                )
            })?;

        let url = match method {
            HttpMethod::Post => format!("{endpoint}/quotes"),
            HttpMethod::Get | HttpMethod::Put => format!("{endpoint}/quotes/{quote_id}"),
        };
        debug!(%method, %url, quote_id, "forwarding");

        let request = OutboundRequest {
            method,
            url: url.clone(),
            headers: outbound_headers(headers, true),
            body,
        };
        let response = self.client.send(request).await.map_err(|e| {
            FspiopError::new(
                ApiErrorCode::DestinationCommunicationError,
                format!("Network error forwarding {method} to {url}"),
                source,
            )
            .with_cause(e)
        })?;

        info!(
            %method,
            %url,
            quote_id,
            status = response.status,
            "forward delivered"
        );
        if !response.is_success() {
            return Err(FspiopError::new(
                ApiErrorCode::DestinationCommunicationError,
                format!(
                    "Got non-success response {} {} forwarding {method} to {url}",
                    response.status, response.reason
                ),
                source,
            )
            .into());
        }
        Ok(())
    }

    /// Sends `error` to its reply-to participant's `/error` callback.
    ///
    /// Failures are returned to the caller for logging only and must never
    /// produce another error callback.
    pub async fn send_error_callback(&self, error: &FspiopError, quote_id: &str) -> Result<()> {
        if !error.has_recipient() {
            return Err(QuotingError::Internal(format!(
                "error {} for quote {quote_id} has no recipient",
                error.code()
            )));
        }
        let recipient = error.reply_to();
        let endpoint = self
            .reference
            .get_participant_endpoint(recipient, QUOTES_CALLBACK_ENDPOINT)
            .await?
            .ok_or_else(|| {
                FspiopError::new(
                    ApiErrorCode::DestinationFspError,
                    format!("No {QUOTES_CALLBACK_ENDPOINT} found for {recipient}, unable to make error callback"),
                    recipient,
                )
            })?;

        let defaults;
        let headers = match error.headers() {
            Some(headers) => headers,
            None => {
                defaults = FspiopHeaders::new()
                    .with(FSPIOP_SOURCE, self.switch_id.as_str())
                    .with(FSPIOP_DESTINATION, recipient)
                    .with(FSPIOP_HTTP_METHOD, HttpMethod::Put.as_str());
                &defaults
            }
        };

        let request = OutboundRequest {
            method: HttpMethod::Put,
            url: format!("{endpoint}/quotes/{quote_id}/error"),
            headers: outbound_headers(headers, false),
            body: Some(serde_json::to_string(&error.to_api_error_object())?),
        };

        let mut attempt = 1;
        loop {
            match self.deliver_error(request.clone()).await {
                Ok(()) => {
                    info!(recipient, quote_id, code = error.code(), "error callback delivered");
                    return Ok(());
                }
                Err(e) if attempt < self.error_callback_attempts => {
                    warn!(recipient, quote_id, attempt, error = %e, "error callback failed; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn deliver_error(&self, request: OutboundRequest) -> Result<()> {
        let url = request.url.clone();
        let response = self.client.send(request).await?;
        if !response.is_success() {
            return Err(FspiopError::new(
                ApiErrorCode::DestinationCommunicationError,
                format!(
                    "Got non-success response {} {} sending error callback to {url}",
                    response.status, response.reason
                ),
                self.switch_id.as_str(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::QuoteStore;
    use crate::domain::records::{NewQuoteParty, QuoteRecord};
    use crate::infrastructure::http::ReqwestCallbackClient;
    use crate::infrastructure::in_memory::InMemoryQuoteStore;
    use crate::infrastructure::reference::ReferenceCatalog;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inbound() -> FspiopHeaders {
        FspiopHeaders::new()
            .with(FSPIOP_SOURCE, "payerfsp")
            .with(FSPIOP_DESTINATION, "payeefsp")
            .with("user-agent", "curl")
    }

    fn party(quote_id: &str, role: PartyRole, fsp_id: &str) -> NewQuoteParty {
        NewQuoteParty {
            quote_id: quote_id.to_string(),
            role,
            party_type_id: 1,
            party_identifier_type_id: 1,
            party_identifier_value: "123".to_string(),
            party_sub_id_or_type: None,
            fsp_id: fsp_id.to_string(),
            participant_id: 1,
            transfer_participant_role_type_id: 1,
            ledger_entry_type_id: 1,
            amount: dec!(10),
            currency_id: "USD".to_string(),
            merchant_classification_code: None,
            party_name: None,
            first_name: None,
            middle_name: None,
            last_name: None,
            date_of_birth: None,
        }
    }

    async fn seed_quote(store: &InMemoryQuoteStore, quote_id: &str) {
        let mut txn = store.begin().await.unwrap();
        txn.create_quote(QuoteRecord {
            quote_id: quote_id.to_string(),
            transaction_reference_id: 1,
            transaction_request_id: None,
            note: None,
            expiration_date: None,
            transaction_initiator_id: 1,
            transaction_initiator_type_id: 1,
            transaction_scenario_id: 1,
            balance_of_payments_id: None,
            transaction_sub_scenario_id: None,
            amount_type_id: 1,
            amount: dec!(10),
            currency_id: "USD".to_string(),
        })
        .await
        .unwrap();
        txn.create_quote_party(party(quote_id, PartyRole::Payer, "payerfsp"))
            .await
            .unwrap();
        txn.create_quote_party(party(quote_id, PartyRole::Payee, "payeefsp"))
            .await
            .unwrap();
        txn.commit().await.unwrap();
    }

    async fn dispatcher(server: &MockServer, attempts: u32) -> CallbackDispatcher {
        let store = InMemoryQuoteStore::new();
        seed_quote(&store, "Q1").await;
        let catalog = ReferenceCatalog::with_defaults();
        catalog
            .add_endpoint("payeefsp", QUOTES_CALLBACK_ENDPOINT, &format!("{}/payee", server.uri()))
            .await;
        catalog
            .add_endpoint("payerfsp", QUOTES_CALLBACK_ENDPOINT, &format!("{}/payer", server.uri()))
            .await;
        let config = QuotingConfig {
            error_callback_attempts: attempts,
            ..QuotingConfig::default()
        };
        CallbackDispatcher::new(
            Arc::new(store),
            Arc::new(catalog),
            Arc::new(ReqwestCallbackClient::new(Duration::from_secs(5)).unwrap()),
            &config,
        )
    }

    #[test]
    fn test_outbound_headers_omit_absent_values() {
        let headers = outbound_headers(&inbound(), false);
        let names: Vec<&str> = headers.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(names, ["Content-Type", "Date", "FSPIOP-Source", "FSPIOP-Destination"]);
        assert!(headers[1].1.ends_with(" GMT"));
    }

    #[tokio::test]
    async fn test_forward_post_to_payee_party() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payee/quotes"))
            .and(header("accept", QUOTES_CONTENT_TYPE))
            .and(header("fspiop-source", "payerfsp"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        dispatcher(&server, 1)
            .await
            .forward(
                HttpMethod::Post,
                &inbound(),
                "Q1",
                Some("{}".to_string()),
                ForwardTarget::Party(PartyRole::Payee),
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("user-agent").is_none());
    }

    #[tokio::test]
    async fn test_forward_get_to_destination_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payee/quotes/Q7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        dispatcher(&server, 1)
            .await
            .forward(HttpMethod::Get, &inbound(), "Q7", None, ForwardTarget::Destination)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_endpoint_makes_no_call() {
        let server = MockServer::start().await;
        let err = dispatcher(&server, 1)
            .await
            .forward(
                HttpMethod::Put,
                &inbound(),
                "unknown",
                Some("{}".to_string()),
                ForwardTarget::Party(PartyRole::Payer),
            )
            .await
            .unwrap_err();

        let err = err.as_fspiop().unwrap();
        assert!(err.is(ApiErrorCode::DestinationFspError));
        assert_eq!(err.reply_to(), "payerfsp");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_is_destination_communication_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = dispatcher(&server, 1)
            .await
            .forward(
                HttpMethod::Put,
                &inbound(),
                "Q1",
                Some("{}".to_string()),
                ForwardTarget::Party(PartyRole::Payer),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QuotingError::Protocol(ref e) if e.is(ApiErrorCode::DestinationCommunicationError)
        ));
    }

    #[tokio::test]
    async fn test_error_callback_uses_switch_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/payer/quotes/Q1/error"))
            .and(header("fspiop-source", "switch"))
            .and(header("fspiop-destination", "payerfsp"))
            .and(header("fspiop-http-method", "PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let error = FspiopError::new(ApiErrorCode::ModifiedRequest, "hash mismatch", "payerfsp");
        dispatcher(&server, 1)
            .await
            .send_error_callback(&error, "Q1")
            .await
            .unwrap();

        let request = &server.received_requests().await.unwrap()[0];
        assert!(request.headers.get("accept").is_none());
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["errorInformation"]["errorCode"], "3106");
    }

    #[tokio::test]
    async fn test_error_callback_keeps_error_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/payer/quotes/Q1/error"))
            .and(header("fspiop-source", "payeefsp"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let headers = FspiopHeaders::new()
            .with(FSPIOP_SOURCE, "payeefsp")
            .with(FSPIOP_DESTINATION, "payerfsp");
        let error = FspiopError::reported("5100", "Payee rejected", "payerfsp").with_headers(headers);
        dispatcher(&server, 1)
            .await
            .send_error_callback(&error, "Q1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_callback_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let error = FspiopError::new(ApiErrorCode::ServerError, "boom", "payerfsp");
        let result = dispatcher(&server, 3)
            .await
            .send_error_callback(&error, "Q1")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_error_without_recipient_is_never_routed() {
        let server = MockServer::start().await;
        let catalog = ReferenceCatalog::with_defaults();
        catalog
            .add_endpoint("", QUOTES_CALLBACK_ENDPOINT, &server.uri())
            .await;
        let dispatcher = CallbackDispatcher::new(
            Arc::new(InMemoryQuoteStore::new()),
            Arc::new(catalog),
            Arc::new(ReqwestCallbackClient::new(Duration::from_secs(5)).unwrap()),
            &QuotingConfig::default(),
        );

        let error = FspiopHeaders::new().require_source().unwrap_err();
        let result = dispatcher.send_error_callback(&error, "Q1").await;

        assert!(matches!(result, Err(QuotingError::Internal(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_callback_without_endpoint_fails() {
        let server = MockServer::start().await;
        let error = FspiopError::new(ApiErrorCode::ServerError, "boom", "nobody");
        let result = dispatcher(&server, 1)
            .await
            .send_error_callback(&error, "Q1")
            .await;

        assert!(result.is_err());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
