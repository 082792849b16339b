use crate::application::dispatcher::{CallbackDispatcher, ForwardTarget};
use crate::application::duplicate::DuplicateDetector;
use crate::application::scheduler::TaskScheduler;
use crate::config::QuotingConfig;
use crate::domain::headers::FspiopHeaders;
use crate::domain::ports::{
    CallbackClientRef, HttpMethod, QuoteRulesRef, QuoteStoreRef, ReferenceDataRef,
    StoreTransaction,
};
use crate::error::{ApiErrorCode, FspiopError, QuotingError, Result};
use crate::infrastructure::cache::CachedReferenceData;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, warn};

/// Orchestrates the quote workflows.
///
/// Each workflow persists synchronously inside one store transaction and
/// hands all outbound traffic to the [`TaskScheduler`], so a slow or failing
/// counterparty never affects the caller. Failures inside scheduled work are
/// turned into error callbacks to the participant that sent the original
/// message.
#[derive(Clone)]
pub struct QuotingService {
    pub(crate) store: QuoteStoreRef,
    pub(crate) reference: ReferenceDataRef,
    pub(crate) rules: QuoteRulesRef,
    pub(crate) duplicates: DuplicateDetector,
    pub(crate) dispatcher: CallbackDispatcher,
    pub(crate) scheduler: TaskScheduler,
}

/// What a workflow staged inside its transaction.
pub(crate) enum Staged<R> {
    New(R),
    Resend,
}

impl QuotingService {
    /// Wires the service. Reference lookups from every component go through a
    /// shared cache with the configured TTL.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        store: QuoteStoreRef,
        reference: ReferenceDataRef,
        client: CallbackClientRef,
        rules: QuoteRulesRef,
        config: &QuotingConfig,
    ) -> Self {
        let reference: ReferenceDataRef =
            Arc::new(CachedReferenceData::new(reference, config.cache_ttl()));
        let dispatcher =
            CallbackDispatcher::new(store.clone(), reference.clone(), client, config);

        Self {
            duplicates: DuplicateDetector::new(store.clone()),
            scheduler: TaskScheduler::new(config.max_in_flight),
            store,
            reference,
            rules,
            dispatcher,
        }
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Schedules delivery of a message to a counterparty; a failure is routed
    /// back to the inbound source as an error callback.
    pub(crate) fn schedule_forward(
        &self,
        method: HttpMethod,
        headers: FspiopHeaders,
        quote_id: String,
        body: Option<String>,
        target: ForwardTarget,
    ) {
        let this = self.clone();
        self.scheduler.submit("forward", async move {
            let result = this
                .dispatcher
                .forward(method, &headers, &quote_id, body, target)
                .await;
            if let Err(err) = result {
                let source = headers.source().unwrap_or_default();
                warn!(
                    %quote_id,
                    %method,
                    reply_to = source,
                    error = %err,
                    "forward failed; sending error callback"
                );
                this.handle_exception(source, &quote_id, err);
            }
        });
    }

    /// Routes an asynchronous failure to a participant.
    ///
    /// Errors that are not protocol errors become generic server errors
    /// addressed to `source`. Delivery failures of the callback itself are
    /// logged and go no further.
    pub(crate) fn handle_exception(&self, source: &str, quote_id: &str, err: QuotingError) {
        self.schedule_error_callback(err.into_fspiop(source), quote_id.to_string());
    }

    pub(crate) fn schedule_error_callback(&self, error: FspiopError, quote_id: String) {
        let dispatcher = self.dispatcher.clone();
        self.scheduler.submit("error-callback", async move {
            if let Err(e) = dispatcher.send_error_callback(&error, &quote_id).await {
                error!(
                    %quote_id,
                    recipient = error.reply_to(),
                    code = error.code(),
                    error = %e,
                    "error callback failed; the error was not delivered to any participant"
                );
            }
        });
    }
}

/// Rolls back after a failed workflow step and returns the original error.
pub(crate) async fn abort(txn: Box<dyn StoreTransaction>, err: QuotingError) -> QuotingError {
    if let Err(rollback) = txn.rollback().await {
        error!(error = %rollback, "rollback failed");
    }
    err
}

/// Unwraps a reference lookup, failing with a validation error when the name
/// is unknown.
pub(crate) fn known(id: Option<i64>, kind: &str, name: &str, reply_to: &str) -> Result<i64> {
    id.ok_or_else(|| {
        FspiopError::new(
            ApiErrorCode::ValidationError,
            format!("Unknown {kind} '{name}'"),
            reply_to,
        )
        .into()
    })
}

pub(crate) fn parse_expiration(value: &str, reply_to: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| {
            FspiopError::new(
                ApiErrorCode::ValidationError,
                format!("Invalid expiration '{value}': {e}"),
                reply_to,
            )
            .into()
        })
}
