//! Write staging shared by the storage backends.
//!
//! A [`StagedTransaction`] buffers rows in memory and hands them to its
//! [`CommitTarget`] on commit. The target checks constraints and applies the
//! whole batch or nothing.

use crate::domain::ports::StoreTransaction;
use crate::domain::quote::PartyRole;
use crate::domain::records::{
    DuplicateCheck, DuplicateSide, GeoCodeRecord, IlpPacketRecord, NewGeoCode, NewQuoteError, NewQuoteParty,
    NewQuoteResponse, QuoteErrorRecord, QuoteParty, QuoteRecord, QuoteResponseRecord,
    TransactionReference,
};
use crate::error::{QuotingError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    DuplicateChecks,
    TransactionReferences,
    Quotes,
    QuoteParties,
    GeoCodes,
    QuoteResponses,
    IlpPackets,
    QuoteErrors,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::DuplicateChecks,
        Table::TransactionReferences,
        Table::Quotes,
        Table::QuoteParties,
        Table::GeoCodes,
        Table::QuoteResponses,
        Table::IlpPackets,
        Table::QuoteErrors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DuplicateChecks => "duplicate_checks",
            Self::TransactionReferences => "transaction_references",
            Self::Quotes => "quotes",
            Self::QuoteParties => "quote_parties",
            Self::GeoCodes => "geo_codes",
            Self::QuoteResponses => "quote_responses",
            Self::IlpPackets => "ilp_packets",
            Self::QuoteErrors => "quote_errors",
        }
    }
}

/// A single persisted row, tagged by the table it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Row {
    DuplicateCheck(DuplicateCheck),
    TransactionReference(TransactionReference),
    Quote(QuoteRecord),
    QuoteParty(QuoteParty),
    GeoCode(GeoCodeRecord),
    QuoteResponse(QuoteResponseRecord),
    IlpPacket(IlpPacketRecord),
    QuoteError(QuoteErrorRecord),
}

impl Row {
    pub fn table(&self) -> Table {
        match self {
            Self::DuplicateCheck(_) => Table::DuplicateChecks,
            Self::TransactionReference(_) => Table::TransactionReferences,
            Self::Quote(_) => Table::Quotes,
            Self::QuoteParty(_) => Table::QuoteParties,
            Self::GeoCode(_) => Table::GeoCodes,
            Self::QuoteResponse(_) => Table::QuoteResponses,
            Self::IlpPacket(_) => Table::IlpPackets,
            Self::QuoteError(_) => Table::QuoteErrors,
        }
    }

    /// Primary key within the row's table.
    pub fn key(&self) -> String {
        match self {
            Self::DuplicateCheck(c) => duplicate_check_key(&c.quote_id, c.side),
            Self::TransactionReference(r) => id_key(r.transaction_reference_id),
            Self::Quote(q) => q.quote_id.clone(),
            Self::QuoteParty(p) => quote_party_key(&p.party.quote_id, p.party.role),
            Self::GeoCode(g) => id_key(g.geo_code_id),
            Self::QuoteResponse(r) => r.response.quote_id.clone(),
            Self::IlpPacket(p) => id_key(p.quote_response_id),
            Self::QuoteError(e) => format!("{}/{}", e.quote_id, id_key(e.quote_error_id)),
        }
    }

    /// The quote a row must be attached to, if any.
    pub fn references(&self) -> Option<(Table, String)> {
        match self {
            Self::QuoteParty(p) => Some((Table::Quotes, p.party.quote_id.clone())),
            Self::QuoteResponse(r) => Some((Table::Quotes, r.response.quote_id.clone())),
            Self::QuoteError(e) => Some((Table::Quotes, e.quote_id.clone())),
            _ => None,
        }
    }
}

pub fn duplicate_check_key(quote_id: &str, side: DuplicateSide) -> String {
    format!("{}/{}", side.as_str(), quote_id)
}

pub fn quote_party_key(quote_id: &str, role: PartyRole) -> String {
    format!("{}/{}", quote_id, role.as_str())
}

fn id_key(id: i64) -> String {
    format!("{id:020}")
}

/// Verifies a batch against committed state.
///
/// Every row's primary key must be new, and every referenced quote must be
/// committed or created earlier in the same batch.
pub fn check_constraints(
    rows: &[Row],
    exists: impl Fn(Table, &str) -> Result<bool>,
) -> Result<()> {
    let mut batch: HashSet<(Table, String)> = HashSet::new();

    for row in rows {
        if let Some((table, key)) = row.references()
            && !batch.contains(&(table, key.clone()))
            && !exists(table, &key)?
        {
            return Err(QuotingError::Storage(format!(
                "foreign key violation: {} '{}' does not exist",
                table.name(),
                key
            )));
        }

        let key = (row.table(), row.key());
        if batch.contains(&key) || exists(key.0, &key.1)? {
            return Err(QuotingError::Storage(format!(
                "duplicate key '{}' in {}",
                key.1,
                key.0.name()
            )));
        }
        batch.insert(key);
    }

    Ok(())
}

/// Backend half of a [`StagedTransaction`].
#[async_trait]
pub trait CommitTarget: Send + Sync {
    fn next_id(&self) -> i64;
    async fn apply(&self, rows: Vec<Row>) -> Result<()>;
}

pub struct StagedTransaction<T: CommitTarget> {
    target: Arc<T>,
    rows: Vec<Row>,
}

impl<T: CommitTarget> StagedTransaction<T> {
    pub fn new(target: Arc<T>) -> Self {
        Self {
            target,
            rows: Vec::new(),
        }
    }

    fn stage(&mut self, row: Row) {
        self.rows.push(row);
    }
}

#[async_trait]
impl<T: CommitTarget + 'static> StoreTransaction for StagedTransaction<T> {
    async fn create_duplicate_check(&mut self, check: DuplicateCheck) -> Result<()> {
        self.stage(Row::DuplicateCheck(check));
        Ok(())
    }

    async fn create_transaction_reference(
        &mut self,
        quote_id: &str,
        transaction_id: &str,
    ) -> Result<i64> {
        let id = self.target.next_id();
        self.stage(Row::TransactionReference(TransactionReference {
            transaction_reference_id: id,
            quote_id: quote_id.to_string(),
            transaction_id: transaction_id.to_string(),
        }));
        Ok(id)
    }

    async fn create_quote(&mut self, quote: QuoteRecord) -> Result<String> {
        let quote_id = quote.quote_id.clone();
        self.stage(Row::Quote(quote));
        Ok(quote_id)
    }

    async fn create_quote_party(&mut self, party: NewQuoteParty) -> Result<i64> {
        let id = self.target.next_id();
        self.stage(Row::QuoteParty(QuoteParty {
            quote_party_id: id,
            party,
        }));
        Ok(id)
    }

    async fn create_geo_code(&mut self, geo_code: NewGeoCode) -> Result<i64> {
        let id = self.target.next_id();
        self.stage(Row::GeoCode(GeoCodeRecord {
            geo_code_id: id,
            geo_code,
        }));
        Ok(id)
    }

    async fn create_quote_response(&mut self, response: NewQuoteResponse) -> Result<i64> {
        let id = self.target.next_id();
        self.stage(Row::QuoteResponse(QuoteResponseRecord {
            quote_response_id: id,
            response,
        }));
        Ok(id)
    }

    async fn create_quote_response_ilp_packet(
        &mut self,
        quote_response_id: i64,
        ilp_packet: &str,
    ) -> Result<()> {
        self.stage(Row::IlpPacket(IlpPacketRecord {
            quote_response_id,
            value: ilp_packet.to_string(),
        }));
        Ok(())
    }

    async fn create_quote_error(&mut self, error: NewQuoteError) -> Result<QuoteErrorRecord> {
        let record = QuoteErrorRecord {
            quote_error_id: self.target.next_id(),
            quote_id: error.quote_id,
            error_code: error.error_code,
            error_description: error.error_description,
            created_date: Utc::now(),
        };
        self.stage(Row::QuoteError(record.clone()));
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        debug!(rows = this.rows.len(), "committing transaction");
        this.target.apply(this.rows).await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        debug!(rows = self.rows.len(), "rolling back transaction");
        Ok(())
    }
}
