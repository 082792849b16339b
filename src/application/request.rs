use crate::application::dispatcher::ForwardTarget;
use crate::application::service::{QuotingService, Staged, abort, known, parse_expiration};
use crate::domain::headers::FspiopHeaders;
use crate::domain::ports::{HttpMethod, StoreTransaction};
use crate::domain::quote::{PAYER_INITIATOR, PartyRole, QuoteRequest};
use crate::domain::records::{
    Acceptance, DuplicateCheck, DuplicateSide, NewGeoCode, NewQuoteParty, PRINCIPLE_VALUE,
    QuoteRecord, QuoteRefs,
};
use crate::error::{ApiErrorCode, FspiopError, Result};
use tracing::{debug, info, warn};

impl QuotingService {
    /// Accepts a quote request from the payer FSP.
    ///
    /// A new request is persisted and forwarded to the payee FSP. An identical
    /// resubmission is forwarded again without touching storage, while a
    /// different payload under a known quote id is rejected.
    pub async fn handle_quote_request(
        &self,
        headers: &FspiopHeaders,
        request: QuoteRequest,
    ) -> Result<Acceptance<QuoteRefs>> {
        let source = headers.require_source()?.to_string();
        if request.transaction_type.initiator != PAYER_INITIATOR {
            return Err(FspiopError::new(
                ApiErrorCode::ValidationError,
                format!(
                    "Only {PAYER_INITIATOR} initiated transactions are supported, got '{}'",
                    request.transaction_type.initiator
                ),
                source,
            )
            .into());
        }
        let body = serde_json::to_string(&request)?;

        let mut txn = self.store.begin().await?;
        let staged = self
            .stage_quote_request(txn.as_mut(), headers, &request, &source)
            .await;

        let refs = match staged {
            Ok(Staged::New(refs)) => refs,
            Err(err) => {
                warn!(quote_id = %request.quote_id, error = %err, "quote request rejected");
                return Err(abort(txn, err).await);
            }
            Ok(Staged::Resend) => {
                txn.rollback().await?;
                self.handle_quote_request_resend(headers, &request.quote_id, body);
                return Ok(Acceptance::Resent);
            }
        };
        txn.commit().await?;
        info!(quote_id = %refs.quote_id, source = %source, "quote request persisted");

        match self.rules.request_failures(&request).await {
            Ok(failures) if !failures.is_empty() => {
                warn!(quote_id = %refs.quote_id, ?failures, "quote request broke business rules");
            }
            Ok(_) => {}
            Err(e) => warn!(quote_id = %refs.quote_id, error = %e, "business rules evaluation failed"),
        }

        self.schedule_forward(
            HttpMethod::Post,
            headers.clone(),
            refs.quote_id.clone(),
            Some(body),
            ForwardTarget::Party(PartyRole::Payee),
        );
        Ok(Acceptance::Persisted(refs))
    }

    fn handle_quote_request_resend(&self, headers: &FspiopHeaders, quote_id: &str, body: String) {
        info!(quote_id, source = headers.source(), "resending quote request");
        self.schedule_forward(
            HttpMethod::Post,
            headers.clone(),
            quote_id.to_string(),
            Some(body),
            ForwardTarget::Party(PartyRole::Payee),
        );
    }

    async fn stage_quote_request(
        &self,
        txn: &mut dyn StoreTransaction,
        headers: &FspiopHeaders,
        request: &QuoteRequest,
        source: &str,
    ) -> Result<Staged<QuoteRefs>> {
        let quote_id = request.quote_id.as_str();
        let status = self
            .duplicates
            .classify(quote_id, request, DuplicateSide::Request)
            .await?;
        if status.is_conflict() {
            return Err(FspiopError::new(
                ApiErrorCode::ModifiedRequest,
                format!("Quote {quote_id} is a duplicate but hashes dont match"),
                source,
            )
            .into());
        }
        if status.is_resend {
            return Ok(Staged::Resend);
        }

        txn.create_duplicate_check(DuplicateCheck {
            quote_id: quote_id.to_string(),
            side: DuplicateSide::Request,
            quote_response_id: None,
            hash: status.hash,
        })
        .await?;

        let transaction_reference_id = txn
            .create_transaction_reference(quote_id, &request.transaction_id)
            .await?;

        let transaction_type = &request.transaction_type;
        let reference = &self.reference;
        let transaction_initiator_type_id = known(
            reference.get_initiator_type(&transaction_type.initiator_type).await?,
            "initiator type",
            &transaction_type.initiator_type,
            source,
        )?;
        let transaction_initiator_id = known(
            reference.get_initiator(&transaction_type.initiator).await?,
            "initiator",
            &transaction_type.initiator,
            source,
        )?;
        let transaction_scenario_id = known(
            reference.get_scenario(&transaction_type.scenario).await?,
            "scenario",
            &transaction_type.scenario,
            source,
        )?;
        let transaction_sub_scenario_id = match &transaction_type.sub_scenario {
            Some(name) => Some(known(
                reference.get_sub_scenario(name).await?,
                "sub-scenario",
                name,
                source,
            )?),
            None => None,
        };
        let amount_type_id = known(
            reference.get_amount_type(&request.amount_type).await?,
            "amount type",
            &request.amount_type,
            source,
        )?;
        let balance_of_payments_id = transaction_type
            .balance_of_payments
            .as_deref()
            .map(|code| {
                code.parse::<i64>().map_err(|_| {
                    FspiopError::new(
                        ApiErrorCode::ValidationError,
                        format!("Invalid balance of payments code '{code}'"),
                        source,
                    )
                })
            })
            .transpose()?;
        let expiration_date = request
            .expiration
            .as_deref()
            .map(|value| parse_expiration(value, source))
            .transpose()?;

        let quote_id = txn
            .create_quote(QuoteRecord {
                quote_id: quote_id.to_string(),
                transaction_reference_id,
                transaction_request_id: request.transaction_request_id.clone(),
                note: request.note.clone(),
                expiration_date,
                transaction_initiator_id,
                transaction_initiator_type_id,
                transaction_scenario_id,
                balance_of_payments_id,
                transaction_sub_scenario_id,
                amount_type_id,
                amount: request.amount.amount,
                currency_id: request.amount.currency.clone(),
            })
            .await?;

        let payer_id = self
            .stage_quote_party(txn, headers, request, PartyRole::Payer, source)
            .await?;
        let payee_id = self
            .stage_quote_party(txn, headers, request, PartyRole::Payee, source)
            .await?;

        // Only payer-initiated requests get this far, so the payer is the initiator.
        let geo_code_id = match &request.geo_code {
            Some(geo) => Some(
                txn.create_geo_code(NewGeoCode {
                    quote_party_id: payer_id,
                    latitude: geo.latitude.clone(),
                    longitude: geo.longitude.clone(),
                })
                .await?,
            ),
            None => None,
        };

        let refs = QuoteRefs {
            quote_id,
            transaction_reference_id,
            transaction_initiator_type_id,
            transaction_initiator_id,
            transaction_scenario_id,
            transaction_sub_scenario_id,
            amount_type_id,
            payer_id,
            payee_id,
            geo_code_id,
        };
        debug!(?refs, "quote request staged");
        Ok(Staged::New(refs))
    }

    async fn stage_quote_party(
        &self,
        txn: &mut dyn StoreTransaction,
        headers: &FspiopHeaders,
        request: &QuoteRequest,
        role: PartyRole,
        source: &str,
    ) -> Result<i64> {
        let party = request.party(role);
        let info = &party.party_id_info;
        let not_found = match role {
            PartyRole::Payer => ApiErrorCode::PayerFspIdNotFound,
            PartyRole::Payee => ApiErrorCode::PayeeFspIdNotFound,
        };

        let fallback = match role {
            PartyRole::Payer => headers.source(),
            PartyRole::Payee => headers.destination(),
        };
        let fsp_id = info
            .fsp_id
            .as_deref()
            .or(fallback)
            .ok_or_else(|| {
                FspiopError::new(
                    not_found,
                    format!("No FSP id given for the {} party", role.as_str()),
                    source,
                )
            })?
            .to_string();
        let participant_id = self
            .reference
            .get_participant(&fsp_id)
            .await?
            .ok_or_else(|| {
                FspiopError::new(not_found, format!("Participant '{fsp_id}' not found"), source)
            })?;

        let reference = &self.reference;
        let party_type_id = known(
            reference.get_party_type(role.as_str()).await?,
            "party type",
            role.as_str(),
            source,
        )?;
        let party_identifier_type_id = known(
            reference
                .get_party_identifier_type(&info.party_id_type)
                .await?,
            "party identifier type",
            &info.party_id_type,
            source,
        )?;
        let transfer_participant_role_type_id = known(
            reference
                .get_transfer_participant_role_type(role.dfsp_role_type())
                .await?,
            "transfer participant role type",
            role.dfsp_role_type(),
            source,
        )?;
        let ledger_entry_type_id = known(
            reference.get_ledger_entry_type(PRINCIPLE_VALUE).await?,
            "ledger entry type",
            PRINCIPLE_VALUE,
            source,
        )?;

        let personal = party.personal_info.as_ref();
        let name = personal.and_then(|p| p.complex_name.as_ref());
        txn.create_quote_party(NewQuoteParty {
            quote_id: request.quote_id.clone(),
            role,
            party_type_id,
            party_identifier_type_id,
            party_identifier_value: info.party_identifier.clone(),
            party_sub_id_or_type: info.party_sub_id_or_type.clone(),
            fsp_id,
            participant_id,
            transfer_participant_role_type_id,
            ledger_entry_type_id,
            amount: request.amount.amount,
            currency_id: request.amount.currency.clone(),
            merchant_classification_code: party.merchant_classification_code.clone(),
            party_name: party.name.clone(),
            first_name: name.and_then(|n| n.first_name.clone()),
            middle_name: name.and_then(|n| n.middle_name.clone()),
            last_name: name.and_then(|n| n.last_name.clone()),
            date_of_birth: personal.and_then(|p| p.date_of_birth.clone()),
        })
        .await
    }
}
