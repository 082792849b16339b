use crate::domain::ports::{QuoteStore, StoreTransaction};
use crate::domain::quote::PartyRole;
use crate::domain::records::{DuplicateCheck, DuplicateSide, QuoteParty, QuoteRecord};
use crate::error::{QuotingError, Result};
use crate::infrastructure::staging::{
    CommitTarget, Row, StagedTransaction, Table, check_constraints, duplicate_check_key,
    quote_party_key,
};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Column family holding store metadata such as the id sequence.
pub const CF_META: &str = "meta";
const SEQUENCE_KEY: &[u8] = b"sequence";

struct RocksTables {
    db: DB,
    sequence: AtomicI64,
    // Serializes constraint checks with the batch write that follows them.
    commit_lock: Mutex<()>,
}

impl RocksTables {
    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| QuotingError::Storage(format!("column family '{name}' not found")))
    }

    fn get_row(&self, table: Table, key: &str) -> Result<Option<Row>> {
        let cf = self.cf(table.name())?;
        match self.db.get_pinned_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, table: Table, key: &str) -> Result<bool> {
        let cf = self.cf(table.name())?;
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }
}

#[async_trait]
impl CommitTarget for RocksTables {
    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn apply(&self, rows: Vec<Row>) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        check_constraints(&rows, |table, key| self.exists(table, key))?;

        let mut batch = WriteBatch::default();
        for row in &rows {
            let cf = self.cf(row.table().name())?;
            batch.put_cf(cf, row.key().as_bytes(), serde_json::to_vec(row)?);
        }
        let sequence = self.sequence.load(Ordering::SeqCst);
        batch.put_cf(self.cf(CF_META)?, SEQUENCE_KEY, sequence.to_be_bytes());

        self.db.write(batch)?;
        Ok(())
    }
}

/// A persistent quote store backed by RocksDB.
///
/// Each table lives in its own column family and rows are stored as JSON.
/// A transaction commits as one `WriteBatch`, together with the id sequence,
/// so restarts never reuse an id.
#[derive(Clone)]
pub struct RocksDbQuoteStore {
    inner: Arc<RocksTables>,
}

impl RocksDbQuoteStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = Table::ALL
            .iter()
            .map(|table| table.name())
            .chain([CF_META])
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let meta = db
            .cf_handle(CF_META)
            .ok_or_else(|| QuotingError::Storage("column family 'meta' not found".to_string()))?;
        let sequence = match db.get_cf(meta, SEQUENCE_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    QuotingError::Storage("corrupt id sequence".to_string())
                })?;
                i64::from_be_bytes(raw)
            }
            None => 0,
        };

        Ok(Self {
            inner: Arc::new(RocksTables {
                db,
                sequence: AtomicI64::new(sequence),
                commit_lock: Mutex::new(()),
            }),
        })
    }

    pub fn quote(&self, quote_id: &str) -> Result<Option<QuoteRecord>> {
        Ok(match self.inner.get_row(Table::Quotes, quote_id)? {
            Some(Row::Quote(quote)) => Some(quote),
            _ => None,
        })
    }

    /// Number of committed rows in a table.
    pub fn count(&self, table: Table) -> Result<usize> {
        let cf = self.inner.cf(table.name())?;
        let mut count = 0;
        for item in self.inner.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl QuoteStore for RocksDbQuoteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(StagedTransaction::new(self.inner.clone())))
    }

    async fn get_duplicate_check(
        &self,
        quote_id: &str,
        side: DuplicateSide,
    ) -> Result<Option<DuplicateCheck>> {
        let key = duplicate_check_key(quote_id, side);
        Ok(match self.inner.get_row(Table::DuplicateChecks, &key)? {
            Some(Row::DuplicateCheck(check)) => Some(check),
            _ => None,
        })
    }

    async fn get_quote_party(&self, quote_id: &str, role: PartyRole) -> Result<Option<QuoteParty>> {
        let key = quote_party_key(quote_id, role);
        Ok(match self.inner.get_row(Table::QuoteParties, &key)? {
            Some(Row::QuoteParty(party)) => Some(party),
            _ => None,
        })
    }
}
