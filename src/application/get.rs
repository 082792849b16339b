use crate::application::dispatcher::ForwardTarget;
use crate::application::service::QuotingService;
use crate::domain::headers::FspiopHeaders;
use crate::domain::ports::HttpMethod;
use crate::error::Result;
use tracing::debug;

impl QuotingService {
    /// Forwards a quote lookup to the participant named in `FSPIOP-Destination`.
    ///
    /// Nothing is read or written locally; the counterparty answers with a
    /// resend of its quote response.
    pub async fn handle_quote_get(&self, headers: &FspiopHeaders, quote_id: &str) -> Result<()> {
        let source = headers.require_source()?;
        debug!(quote_id, source, destination = headers.destination(), "quote get");
        self.schedule_forward(
            HttpMethod::Get,
            headers.clone(),
            quote_id.to_string(),
            None,
            ForwardTarget::Destination,
        );
        Ok(())
    }
}
