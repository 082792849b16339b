use crate::application::service::{QuotingService, abort};
use crate::domain::headers::FspiopHeaders;
use crate::domain::quote::ErrorInformation;
use crate::domain::records::{NewQuoteError, QuoteErrorRecord};
use crate::error::{ApiErrorCode, FspiopError, Result};
use tracing::{info, warn};

impl QuotingService {
    /// Records an error reported by a participant for a quote and relays it
    /// to the participant that sent the original request.
    ///
    /// The relay is addressed to the report's `FSPIOP-Destination` and reuses
    /// the report's own headers.
    pub async fn handle_quote_error(
        &self,
        headers: &FspiopHeaders,
        quote_id: &str,
        error: ErrorInformation,
    ) -> Result<QuoteErrorRecord> {
        let source = headers.source().unwrap_or_default().to_string();
        let recipient = headers.require_destination()?.to_string();
        let error_code = error.error_code.parse::<u16>().map_err(|_| {
            FspiopError::new(
                ApiErrorCode::ValidationError,
                format!("Invalid error code '{}'", error.error_code),
                source.as_str(),
            )
        })?;

        let mut txn = self.store.begin().await?;
        let created = txn
            .create_quote_error(NewQuoteError {
                quote_id: quote_id.to_string(),
                error_code,
                error_description: error.error_description.clone(),
            })
            .await;
        let record = match created {
            Ok(record) => record,
            Err(err) => return Err(abort(txn, err).await),
        };
        if let Err(err) = txn.commit().await {
            warn!(quote_id, error = %err, "quote error not recorded");
            return Err(err);
        }
        info!(
            quote_id,
            %source,
            %recipient,
            error_code,
            "quote error recorded"
        );

        let relay = FspiopError::reported(error.error_code, error.error_description, recipient)
            .with_headers(headers.clone());
        self.schedule_error_callback(relay, quote_id.to_string());
        Ok(record)
    }
}
