use crate::domain::headers::FspiopHeaders;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Protocol error codes used by the quoting engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    CommunicationError,
    DestinationCommunicationError,
    ServerError,
    InternalServerError,
    ValidationError,
    MissingElement,
    ModifiedRequest,
    IdNotFound,
    DestinationFspError,
    PayerFspIdNotFound,
    PayeeFspIdNotFound,
    QuoteIdNotFound,
}

impl ApiErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CommunicationError => "1000",
            Self::DestinationCommunicationError => "1001",
            Self::ServerError => "2000",
            Self::InternalServerError => "2001",
            Self::ValidationError => "3100",
            Self::MissingElement => "3102",
            Self::ModifiedRequest => "3106",
            Self::IdNotFound => "3200",
            Self::DestinationFspError => "3201",
            Self::PayerFspIdNotFound => "3202",
            Self::PayeeFspIdNotFound => "3203",
            Self::QuoteIdNotFound => "3205",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::CommunicationError => "Communication error",
            Self::DestinationCommunicationError => "Destination communication error",
            Self::ServerError => "Generic server error",
            Self::InternalServerError => "Internal server error",
            Self::ValidationError => "Generic validation error",
            Self::MissingElement => "Missing mandatory element",
            Self::ModifiedRequest => "Modified request",
            Self::IdNotFound => "Generic ID not found",
            Self::DestinationFspError => "Destination FSP Error",
            Self::PayerFspIdNotFound => "Payer FSP ID not found",
            Self::PayeeFspIdNotFound => "Payee FSP ID not found",
            Self::QuoteIdNotFound => "Quote ID not found",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// A protocol-level error addressed to a specific participant.
///
/// `reply_to` names the participant whose callback endpoint receives the error
/// when it is routed asynchronously. When `headers` is set, those headers are
/// used for the error callback instead of the switch defaults.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code} {message}: {description}")]
pub struct FspiopError {
    code: String,
    message: String,
    description: String,
    reply_to: String,
    headers: Option<FspiopHeaders>,
    cause: Option<String>,
}

impl FspiopError {
    pub fn new(
        code: ApiErrorCode,
        description: impl Into<String>,
        reply_to: impl Into<String>,
    ) -> Self {
        Self {
            code: code.code().to_string(),
            message: code.message().to_string(),
            description: description.into(),
            reply_to: reply_to.into(),
            headers: None,
            cause: None,
        }
    }

    /// Builds an error carrying a code reported by a counterparty rather than
    /// one raised by the switch.
    pub fn reported(
        code: impl Into<String>,
        description: impl Into<String>,
        reply_to: impl Into<String>,
    ) -> Self {
        let description = description.into();
        Self {
            code: code.into(),
            message: description.clone(),
            description,
            reply_to: reply_to.into(),
            headers: None,
            cause: None,
        }
    }

    pub fn with_headers(mut self, headers: FspiopHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reply_to(&self) -> &str {
        &self.reply_to
    }

    /// Whether the error names a participant it can be routed to.
    pub fn has_recipient(&self) -> bool {
        !self.reply_to.is_empty()
    }

    pub fn headers(&self) -> Option<&FspiopHeaders> {
        self.headers.as_ref()
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn is(&self, code: ApiErrorCode) -> bool {
        self.code == code.code()
    }

    /// Renders the body sent to a participant's `/error` callback.
    pub fn to_api_error_object(&self) -> ApiErrorObject {
        ApiErrorObject {
            error_information: ApiErrorInformation {
                error_code: self.code.clone(),
                error_description: self.message.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorObject {
    pub error_information: ApiErrorInformation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorInformation {
    pub error_code: String,
    pub error_description: String,
}

#[derive(Error, Debug)]
pub enum QuotingError {
    #[error(transparent)]
    Protocol(#[from] FspiopError),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuotingError {
    /// Converts any error into a protocol error addressed to `reply_to`.
    ///
    /// Errors that are already protocol errors keep their code and recipient;
    /// everything else becomes a generic server error.
    pub fn into_fspiop(self, reply_to: &str) -> FspiopError {
        match self {
            Self::Protocol(err) => err,
            other => FspiopError::new(ApiErrorCode::ServerError, other.to_string(), reply_to)
                .with_cause(&other),
        }
    }

    pub fn as_fspiop(&self) -> Option<&FspiopError> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuotingError>;
