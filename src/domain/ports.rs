use super::quote::{PartyRole, QuoteRequest, QuoteUpdate};
use super::records::{
    DuplicateCheck, DuplicateSide, NewGeoCode, NewQuoteError, NewQuoteParty, NewQuoteResponse, QuoteErrorRecord,
    QuoteParty, QuoteRecord,
};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Committed quote state plus the entry point for transactional writes.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
    async fn get_duplicate_check(
        &self,
        quote_id: &str,
        side: DuplicateSide,
    ) -> Result<Option<DuplicateCheck>>;
    async fn get_quote_party(&self, quote_id: &str, role: PartyRole) -> Result<Option<QuoteParty>>;
}

/// A unit of writes that becomes visible all at once on `commit`.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn create_duplicate_check(&mut self, check: DuplicateCheck) -> Result<()>;
    async fn create_transaction_reference(&mut self, quote_id: &str, transaction_id: &str)
    -> Result<i64>;
    async fn create_quote(&mut self, quote: QuoteRecord) -> Result<String>;
    async fn create_quote_party(&mut self, party: NewQuoteParty) -> Result<i64>;
    async fn create_geo_code(&mut self, geo_code: NewGeoCode) -> Result<i64>;
    async fn create_quote_response(&mut self, response: NewQuoteResponse) -> Result<i64>;
    async fn create_quote_response_ilp_packet(
        &mut self,
        quote_response_id: i64,
        ilp_packet: &str,
    ) -> Result<()>;
    async fn create_quote_error(&mut self, error: NewQuoteError) -> Result<QuoteErrorRecord>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Read-only reference tables. Enumeration lookups resolve a name to its id.
#[async_trait]
pub trait ReferenceData: Send + Sync {
    async fn get_initiator_type(&self, initiator_type: &str) -> Result<Option<i64>>;
    async fn get_initiator(&self, initiator: &str) -> Result<Option<i64>>;
    async fn get_scenario(&self, scenario: &str) -> Result<Option<i64>>;
    async fn get_sub_scenario(&self, sub_scenario: &str) -> Result<Option<i64>>;
    async fn get_amount_type(&self, amount_type: &str) -> Result<Option<i64>>;
    async fn get_party_type(&self, party_type: &str) -> Result<Option<i64>>;
    async fn get_party_identifier_type(&self, party_identifier_type: &str) -> Result<Option<i64>>;
    async fn get_participant(&self, participant_name: &str) -> Result<Option<i64>>;
    async fn get_transfer_participant_role_type(&self, name: &str) -> Result<Option<i64>>;
    async fn get_ledger_entry_type(&self, name: &str) -> Result<Option<i64>>;
    async fn get_participant_endpoint(
        &self,
        participant_name: &str,
        endpoint_type: &str,
    ) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    pub status: u16,
    pub reason: String,
}

impl OutboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP transport to participant callback endpoints.
///
/// Implementations return `Err` only for transport failures; any HTTP status,
/// including errors, is an `Ok` response.
#[async_trait]
pub trait CallbackClient: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub rule: String,
    pub message: String,
}

/// Business-rule evaluation applied to accepted quotes.
#[async_trait]
pub trait QuoteRules: Send + Sync {
    async fn request_failures(&self, request: &QuoteRequest) -> Result<Vec<RuleFailure>>;
    async fn response_failures(
        &self,
        quote_id: &str,
        update: &QuoteUpdate,
    ) -> Result<Vec<RuleFailure>>;
}

pub type QuoteStoreRef = Arc<dyn QuoteStore>;
pub type ReferenceDataRef = Arc<dyn ReferenceData>;
pub type CallbackClientRef = Arc<dyn CallbackClient>;
pub type QuoteRulesRef = Arc<dyn QuoteRules>;
