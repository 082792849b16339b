use crate::domain::ports::{QuoteRules, RuleFailure};
use crate::domain::quote::{QuoteRequest, QuoteUpdate};
use crate::error::Result;
use async_trait::async_trait;

/// Rules engine that accepts every quote.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermitAllRules;

#[async_trait]
impl QuoteRules for PermitAllRules {
    async fn request_failures(&self, _request: &QuoteRequest) -> Result<Vec<RuleFailure>> {
        Ok(Vec::new())
    }

    async fn response_failures(
        &self,
        _quote_id: &str,
        _update: &QuoteUpdate,
    ) -> Result<Vec<RuleFailure>> {
        Ok(Vec::new())
    }
}
