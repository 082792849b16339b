use crate::application::dispatcher::ForwardTarget;
use crate::application::service::{QuotingService, Staged, abort, parse_expiration};
use crate::domain::headers::FspiopHeaders;
use crate::domain::ports::{HttpMethod, StoreTransaction};
use crate::domain::quote::{Money, PartyRole, QuoteUpdate};
use crate::domain::records::{
    Acceptance, DuplicateCheck, DuplicateSide, NewGeoCode, NewQuoteResponse, ResponseRefs,
};
use crate::error::{ApiErrorCode, FspiopError, Result};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

fn split(money: Option<&Money>) -> (Option<Decimal>, Option<String>) {
    match money {
        Some(m) => (Some(m.amount), Some(m.currency.clone())),
        None => (None, None),
    }
}

impl QuotingService {
    /// Accepts the payee FSP's response to a quote and forwards it to the payer FSP.
    pub async fn handle_quote_update(
        &self,
        headers: &FspiopHeaders,
        quote_id: &str,
        update: QuoteUpdate,
    ) -> Result<Acceptance<ResponseRefs>> {
        let source = headers.require_source()?.to_string();
        let body = serde_json::to_string(&update)?;

        let mut txn = self.store.begin().await?;
        let staged = self
            .stage_quote_update(txn.as_mut(), quote_id, &update, &source)
            .await;

        let refs = match staged {
            Ok(Staged::New(refs)) => refs,
            Err(err) => {
                warn!(quote_id, error = %err, "quote update rejected");
                return Err(abort(txn, err).await);
            }
            Ok(Staged::Resend) => {
                txn.rollback().await?;
                self.handle_quote_update_resend(headers, quote_id, body);
                return Ok(Acceptance::Resent);
            }
        };
        txn.commit().await?;
        info!(quote_id, quote_response_id = refs.quote_response_id, "quote update persisted");

        match self.rules.response_failures(quote_id, &update).await {
            Ok(failures) if !failures.is_empty() => {
                warn!(quote_id, ?failures, "quote update broke business rules");
            }
            Ok(_) => {}
            Err(e) => warn!(quote_id, error = %e, "business rules evaluation failed"),
        }

        self.schedule_forward(
            HttpMethod::Put,
            headers.clone(),
            quote_id.to_string(),
            Some(body),
            ForwardTarget::Party(PartyRole::Payer),
        );
        Ok(Acceptance::Persisted(refs))
    }

    fn handle_quote_update_resend(&self, headers: &FspiopHeaders, quote_id: &str, body: String) {
        info!(quote_id, source = headers.source(), "resending quote update");
        self.schedule_forward(
            HttpMethod::Put,
            headers.clone(),
            quote_id.to_string(),
            Some(body),
            ForwardTarget::Party(PartyRole::Payer),
        );
    }

    async fn stage_quote_update(
        &self,
        txn: &mut dyn StoreTransaction,
        quote_id: &str,
        update: &QuoteUpdate,
        source: &str,
    ) -> Result<Staged<ResponseRefs>> {
        let status = self
            .duplicates
            .classify(quote_id, update, DuplicateSide::Response)
            .await?;
        if status.is_conflict() {
            return Err(FspiopError::new(
                ApiErrorCode::ModifiedRequest,
                format!("Update for quote {quote_id} is a duplicate but hashes dont match"),
                source,
            )
            .into());
        }
        if status.is_resend {
            return Ok(Staged::Resend);
        }

        let (payee_receive_amount, payee_receive_currency_id) =
            split(update.payee_receive_amount.as_ref());
        let (payee_fsp_fee, payee_fsp_fee_currency_id) = split(update.payee_fsp_fee.as_ref());
        let (payee_fsp_commission, payee_fsp_commission_currency_id) =
            split(update.payee_fsp_commission.as_ref());

        let quote_response_id = txn
            .create_quote_response(NewQuoteResponse {
                quote_id: quote_id.to_string(),
                transfer_amount: update.transfer_amount.amount,
                transfer_currency_id: update.transfer_amount.currency.clone(),
                payee_receive_amount,
                payee_receive_currency_id,
                payee_fsp_fee,
                payee_fsp_fee_currency_id,
                payee_fsp_commission,
                payee_fsp_commission_currency_id,
                ilp_condition: update.condition.clone(),
                response_expiration_date: Some(parse_expiration(&update.expiration, source)?),
                is_valid: true,
            })
            .await?;

        txn.create_duplicate_check(DuplicateCheck {
            quote_id: quote_id.to_string(),
            side: DuplicateSide::Response,
            quote_response_id: Some(quote_response_id),
            hash: status.hash,
        })
        .await?;

        txn.create_quote_response_ilp_packet(quote_response_id, &update.ilp_packet)
            .await?;

        let geo_code_id = match &update.geo_code {
            Some(geo) => {
                let payee = self
                    .store
                    .get_quote_party(quote_id, PartyRole::Payee)
                    .await?
                    .ok_or_else(|| {
                        FspiopError::new(
                            ApiErrorCode::QuoteIdNotFound,
                            format!("Unable to find payee party for quote {quote_id}"),
                            source,
                        )
                    })?;
                Some(
                    txn.create_geo_code(NewGeoCode {
                        quote_party_id: payee.quote_party_id,
                        latitude: geo.latitude.clone(),
                        longitude: geo.longitude.clone(),
                    })
                    .await?,
                )
            }
            None => None,
        };

        let refs = ResponseRefs {
            quote_response_id,
            geo_code_id,
        };
        debug!(quote_id, ?refs, "quote update staged");
        Ok(Staged::New(refs))
    }
}
