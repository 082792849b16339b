use crate::error::{ApiErrorCode, FspiopError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FSPIOP_SOURCE: &str = "fspiop-source";
pub const FSPIOP_DESTINATION: &str = "fspiop-destination";
pub const FSPIOP_HTTP_METHOD: &str = "fspiop-http-method";
pub const FSPIOP_SIGNATURE: &str = "fspiop-signature";
pub const FSPIOP_URI: &str = "fspiop-uri";

/// Inbound protocol headers, keyed by lower-cased header name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct FspiopHeaders(BTreeMap<String, String>);

impl FspiopHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn source(&self) -> Option<&str> {
        self.get(FSPIOP_SOURCE)
    }

    pub fn destination(&self) -> Option<&str> {
        self.get(FSPIOP_DESTINATION)
    }

    /// Returns the source participant, failing with a missing-element error.
    ///
    /// The error has no recipient (an empty reply-to), so it can only be
    /// returned to the caller; the dispatcher refuses to route it.
    pub fn require_source(&self) -> Result<&str, FspiopError> {
        self.source().ok_or_else(|| {
            FspiopError::new(
                ApiErrorCode::MissingElement,
                "Missing FSPIOP-Source header",
                "",
            )
        })
    }

    pub fn require_destination(&self) -> Result<&str, FspiopError> {
        self.destination().ok_or_else(|| {
            FspiopError::new(
                ApiErrorCode::MissingElement,
                "Missing FSPIOP-Destination header",
                self.source().unwrap_or_default(),
            )
        })
    }
}

impl From<BTreeMap<String, String>> for FspiopHeaders {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<FspiopHeaders> for BTreeMap<String, String> {
    fn from(headers: FspiopHeaders) -> Self {
        headers.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for FspiopHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}
