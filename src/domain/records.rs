//! Rows written by the quoting workflows.

use super::quote::PartyRole;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Endpoint type under which participants register their quotes callback URL.
pub const QUOTES_CALLBACK_ENDPOINT: &str = "FSPIOP_CALLBACK_URL_QUOTES";

/// Ledger entry type recorded for the principal amount of each party.
pub const PRINCIPLE_VALUE: &str = "PRINCIPLE_VALUE";

/// Which half of the protocol a duplicate check record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateSide {
    Request,
    Response,
}

impl DuplicateSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub quote_id: String,
    pub side: DuplicateSide,
    pub quote_response_id: Option<i64>,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReference {
    pub transaction_reference_id: i64,
    pub quote_id: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub quote_id: String,
    pub transaction_reference_id: i64,
    pub transaction_request_id: Option<String>,
    pub note: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub transaction_initiator_id: i64,
    pub transaction_initiator_type_id: i64,
    pub transaction_scenario_id: i64,
    pub balance_of_payments_id: Option<i64>,
    pub transaction_sub_scenario_id: Option<i64>,
    pub amount_type_id: i64,
    pub amount: Decimal,
    pub currency_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuoteParty {
    pub quote_id: String,
    pub role: PartyRole,
    pub party_type_id: i64,
    pub party_identifier_type_id: i64,
    pub party_identifier_value: String,
    pub party_sub_id_or_type: Option<String>,
    pub fsp_id: String,
    pub participant_id: i64,
    pub transfer_participant_role_type_id: i64,
    pub ledger_entry_type_id: i64,
    pub amount: Decimal,
    pub currency_id: String,
    pub merchant_classification_code: Option<String>,
    pub party_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteParty {
    pub quote_party_id: i64,
    #[serde(flatten)]
    pub party: NewQuoteParty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGeoCode {
    pub quote_party_id: i64,
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoCodeRecord {
    pub geo_code_id: i64,
    #[serde(flatten)]
    pub geo_code: NewGeoCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuoteResponse {
    pub quote_id: String,
    pub transfer_amount: Decimal,
    pub transfer_currency_id: String,
    pub payee_receive_amount: Option<Decimal>,
    pub payee_receive_currency_id: Option<String>,
    pub payee_fsp_fee: Option<Decimal>,
    pub payee_fsp_fee_currency_id: Option<String>,
    pub payee_fsp_commission: Option<Decimal>,
    pub payee_fsp_commission_currency_id: Option<String>,
    pub ilp_condition: String,
    pub response_expiration_date: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponseRecord {
    pub quote_response_id: i64,
    #[serde(flatten)]
    pub response: NewQuoteResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlpPacketRecord {
    pub quote_response_id: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuoteError {
    pub quote_id: String,
    pub error_code: u16,
    pub error_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteErrorRecord {
    pub quote_error_id: i64,
    pub quote_id: String,
    pub error_code: u16,
    pub error_description: String,
    pub created_date: DateTime<Utc>,
}

/// Identifiers of the entities created for an accepted quote request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRefs {
    pub quote_id: String,
    pub transaction_reference_id: i64,
    pub transaction_initiator_type_id: i64,
    pub transaction_initiator_id: i64,
    pub transaction_scenario_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_sub_scenario_id: Option<i64>,
    pub amount_type_id: i64,
    pub payer_id: i64,
    pub payee_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_code_id: Option<i64>,
}

/// Identifiers of the entities created for an accepted quote response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRefs {
    pub quote_response_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_code_id: Option<i64>,
}

/// Synchronous result of a request or response workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "refs", rename_all = "lowercase")]
pub enum Acceptance<R> {
    /// New entities were persisted and a forward was scheduled.
    Persisted(R),
    /// An identical resubmission; only the forward was scheduled.
    Resent,
}

impl<R> Acceptance<R> {
    pub fn persisted(self) -> Option<R> {
        match self {
            Self::Persisted(refs) => Some(refs),
            Self::Resent => None,
        }
    }

    pub fn is_resend(&self) -> bool {
        matches!(self, Self::Resent)
    }
}
