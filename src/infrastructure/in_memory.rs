use crate::domain::ports::{QuoteStore, StoreTransaction};
use crate::domain::quote::PartyRole;
use crate::domain::records::{
    DuplicateCheck, DuplicateSide, GeoCodeRecord, QuoteErrorRecord, QuoteParty, QuoteRecord,
    QuoteResponseRecord,
};
use crate::error::Result;
use crate::infrastructure::staging::{
    CommitTarget, Row, StagedTransaction, Table, check_constraints, duplicate_check_key,
    quote_party_key,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

type Tables = HashMap<Table, BTreeMap<String, Row>>;

#[derive(Default)]
struct MemoryTables {
    tables: RwLock<Tables>,
    sequence: AtomicI64,
}

#[async_trait]
impl CommitTarget for MemoryTables {
    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn apply(&self, rows: Vec<Row>) -> Result<()> {
        let mut tables = self.tables.write().await;
        check_constraints(&rows, |table, key| {
            Ok(tables.get(&table).is_some_and(|t| t.contains_key(key)))
        })?;
        for row in rows {
            tables.entry(row.table()).or_default().insert(row.key(), row);
        }
        Ok(())
    }
}

/// A thread-safe in-memory quote store.
///
/// Writes are staged per transaction and applied under a single write lock on
/// commit, so readers never observe a partially written quote.
#[derive(Default, Clone)]
pub struct InMemoryQuoteStore {
    inner: Arc<MemoryTables>,
}

impl InMemoryQuoteStore {
    /// Creates a new, empty in-memory quote store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn find<T>(&self, table: Table, key: &str, pick: impl Fn(&Row) -> Option<T>) -> Option<T> {
        let tables = self.inner.tables.read().await;
        tables.get(&table)?.get(key).and_then(pick)
    }

    async fn scan<T>(&self, table: Table, pick: impl Fn(&Row) -> Option<T>) -> Vec<T> {
        let tables = self.inner.tables.read().await;
        tables
            .get(&table)
            .map(|t| t.values().filter_map(&pick).collect())
            .unwrap_or_default()
    }

    /// Number of committed rows in a table.
    pub async fn count(&self, table: Table) -> usize {
        let tables = self.inner.tables.read().await;
        tables.get(&table).map_or(0, BTreeMap::len)
    }

    /// Total number of committed rows across all tables.
    pub async fn total_rows(&self) -> usize {
        let tables = self.inner.tables.read().await;
        tables.values().map(BTreeMap::len).sum()
    }

    pub async fn quote(&self, quote_id: &str) -> Option<QuoteRecord> {
        self.find(Table::Quotes, quote_id, |row| match row {
            Row::Quote(q) => Some(q.clone()),
            _ => None,
        })
        .await
    }

    pub async fn quote_response(&self, quote_id: &str) -> Option<QuoteResponseRecord> {
        self.find(Table::QuoteResponses, quote_id, |row| match row {
            Row::QuoteResponse(r) => Some(r.clone()),
            _ => None,
        })
        .await
    }

    pub async fn geo_codes(&self) -> Vec<GeoCodeRecord> {
        self.scan(Table::GeoCodes, |row| match row {
            Row::GeoCode(g) => Some(g.clone()),
            _ => None,
        })
        .await
    }

    pub async fn quote_errors(&self, quote_id: &str) -> Vec<QuoteErrorRecord> {
        self.scan(Table::QuoteErrors, |row| match row {
            Row::QuoteError(e) if e.quote_id == quote_id => Some(e.clone()),
            _ => None,
        })
        .await
    }
}

#[async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(StagedTransaction::new(self.inner.clone())))
    }

    async fn get_duplicate_check(
        &self,
        quote_id: &str,
        side: DuplicateSide,
    ) -> Result<Option<DuplicateCheck>> {
        let key = duplicate_check_key(quote_id, side);
        Ok(self
            .find(Table::DuplicateChecks, &key, |row| match row {
                Row::DuplicateCheck(c) => Some(c.clone()),
                _ => None,
            })
            .await)
    }

    async fn get_quote_party(&self, quote_id: &str, role: PartyRole) -> Result<Option<QuoteParty>> {
        let key = quote_party_key(quote_id, role);
        Ok(self
            .find(Table::QuoteParties, &key, |row| match row {
                Row::QuoteParty(p) => Some(p.clone()),
                _ => None,
            })
            .await)
    }
}
