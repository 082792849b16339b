use crate::domain::ports::QuoteStoreRef;
use crate::domain::records::DuplicateSide;
use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Outcome of comparing a payload against the stored duplicate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateStatus {
    pub is_resend: bool,
    pub is_duplicate_id: bool,
    /// Hash of the incoming payload, stored when it is accepted as new.
    pub hash: String,
}

impl DuplicateStatus {
    /// The id was already accepted with different content.
    pub fn is_conflict(&self) -> bool {
        self.is_duplicate_id && !self.is_resend
    }
}

/// Hex-encoded SHA-256 of the payload's JSON serialization.
pub fn hash_payload<T: Serialize>(payload: &T) -> Result<String> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Clone)]
pub struct DuplicateDetector {
    store: QuoteStoreRef,
}

impl DuplicateDetector {
    pub fn new(store: QuoteStoreRef) -> Self {
        Self { store }
    }

    pub async fn classify<T: Serialize>(
        &self,
        quote_id: &str,
        payload: &T,
        side: DuplicateSide,
    ) -> Result<DuplicateStatus> {
        let hash = hash_payload(payload)?;
        let existing = self.store.get_duplicate_check(quote_id, side).await?;

        let status = match existing {
            None => DuplicateStatus {
                is_resend: false,
                is_duplicate_id: false,
                hash,
            },
            Some(check) => DuplicateStatus {
                is_resend: check.hash == hash,
                is_duplicate_id: true,
                hash,
            },
        };

        debug!(
            quote_id,
            side = side.as_str(),
            is_resend = status.is_resend,
            is_duplicate_id = status.is_duplicate_id,
            "duplicate check"
        );
        Ok(status)
    }
}
