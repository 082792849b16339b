//! Time-bounded memoization in front of [`ReferenceData`].
//!
//! Each lookup has its own cache entry keyed by the lookup name and its
//! arguments. Entries store the query result with explicit presence, so an
//! id of `0`, an empty endpoint, or a "not found" answer is served from the
//! cache until it expires just like any other value.

use crate::domain::ports::{ReferenceData, ReferenceDataRef};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Entry count at which an insert first sweeps out expired entries.
pub const SWEEP_THRESHOLD: usize = 1024;

/// The reference-data queries that can be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    InitiatorType,
    Initiator,
    Scenario,
    SubScenario,
    AmountType,
    PartyType,
    PartyIdentifierType,
    Participant,
    TransferParticipantRoleType,
    LedgerEntryType,
    ParticipantEndpoint,
}

impl Lookup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitiatorType => "getInitiatorType",
            Self::Initiator => "getInitiator",
            Self::Scenario => "getScenario",
            Self::SubScenario => "getSubScenario",
            Self::AmountType => "getAmountType",
            Self::PartyType => "getPartyType",
            Self::PartyIdentifierType => "getPartyIdentifierType",
            Self::Participant => "getParticipant",
            Self::TransferParticipantRoleType => "getTransferParticipantRoleType",
            Self::LedgerEntryType => "getLedgerEntryType",
            Self::ParticipantEndpoint => "getParticipantEndpoint",
        }
    }

    pub fn key(&self, args: &[&str]) -> String {
        format!("{}_{}", self.name(), args.join("__"))
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A string-keyed map whose entries expire after a fixed time-to-live.
///
/// Expired entries are skipped on read and swept on insert once the map
/// reaches the sweep threshold. After a sweep the threshold moves to twice
/// the surviving entry count, so sweeps stay amortized O(1) per insert.
pub struct TtlCache<V> {
    entries: RwLock<Entries<V>>,
    ttl: Duration,
    min_sweep: usize,
}

struct Entries<V> {
    map: HashMap<String, Entry<V>>,
    sweep_at: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep_threshold(ttl, SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(ttl: Duration, threshold: usize) -> Self {
        let min_sweep = threshold.max(1);
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                sweep_at: min_sweep,
            }),
            ttl,
            min_sweep,
        }
    }

    /// Returns the live value for `key`, or `None` on a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .map
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: String, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.map.len() >= entries.sweep_at {
            entries.map.retain(|_, entry| entry.expires_at > now);
            entries.sweep_at = (entries.map.len() * 2).max(self.min_sweep);
            debug!(live = entries.map.len(), "reference cache swept");
        }
        entries.map.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Number of stored entries, including any that expired but were not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// A [`ReferenceData`] decorator that memoizes every lookup for a TTL.
///
/// Concurrent misses on the same key are not coalesced; each one queries the
/// underlying source and the last write wins. Query errors are never cached.
pub struct CachedReferenceData {
    inner: ReferenceDataRef,
    ids: TtlCache<Option<i64>>,
    endpoints: TtlCache<Option<String>>,
}

impl CachedReferenceData {
    pub fn new(inner: ReferenceDataRef, ttl: Duration) -> Self {
        Self {
            inner,
            ids: TtlCache::new(ttl),
            endpoints: TtlCache::new(ttl),
        }
    }

    async fn resolve<V: Clone>(
        cache: &TtlCache<V>,
        lookup: Lookup,
        args: &[&str],
        query: impl Future<Output = Result<V>>,
    ) -> Result<V> {
        let key = lookup.key(args);
        if let Some(value) = cache.get(&key).await {
            debug!(%key, "reference cache hit");
            return Ok(value);
        }

        debug!(%key, "reference cache miss");
        let value = query.await?;
        cache.insert(key, value.clone()).await;
        Ok(value)
    }

    async fn resolve_id(
        &self,
        lookup: Lookup,
        arg: &str,
        query: impl Future<Output = Result<Option<i64>>>,
    ) -> Result<Option<i64>> {
        Self::resolve(&self.ids, lookup, &[arg], query).await
    }
}

#[async_trait]
impl ReferenceData for CachedReferenceData {
    async fn get_initiator_type(&self, initiator_type: &str) -> Result<Option<i64>> {
        self.resolve_id(
            Lookup::InitiatorType,
            initiator_type,
            self.inner.get_initiator_type(initiator_type),
        )
        .await
    }

    async fn get_initiator(&self, initiator: &str) -> Result<Option<i64>> {
        self.resolve_id(Lookup::Initiator, initiator, self.inner.get_initiator(initiator))
            .await
    }

    async fn get_scenario(&self, scenario: &str) -> Result<Option<i64>> {
        self.resolve_id(Lookup::Scenario, scenario, self.inner.get_scenario(scenario))
            .await
    }

    async fn get_sub_scenario(&self, sub_scenario: &str) -> Result<Option<i64>> {
        self.resolve_id(
            Lookup::SubScenario,
            sub_scenario,
            self.inner.get_sub_scenario(sub_scenario),
        )
        .await
    }

    async fn get_amount_type(&self, amount_type: &str) -> Result<Option<i64>> {
        self.resolve_id(
            Lookup::AmountType,
            amount_type,
            self.inner.get_amount_type(amount_type),
        )
        .await
    }

    async fn get_party_type(&self, party_type: &str) -> Result<Option<i64>> {
        self.resolve_id(Lookup::PartyType, party_type, self.inner.get_party_type(party_type))
            .await
    }

    async fn get_party_identifier_type(&self, party_identifier_type: &str) -> Result<Option<i64>> {
        self.resolve_id(
            Lookup::PartyIdentifierType,
            party_identifier_type,
            self.inner.get_party_identifier_type(party_identifier_type),
        )
        .await
    }

    async fn get_participant(&self, participant_name: &str) -> Result<Option<i64>> {
        self.resolve_id(
            Lookup::Participant,
            participant_name,
            self.inner.get_participant(participant_name),
        )
        .await
    }

    async fn get_transfer_participant_role_type(&self, name: &str) -> Result<Option<i64>> {
        self.resolve_id(
            Lookup::TransferParticipantRoleType,
            name,
            self.inner.get_transfer_participant_role_type(name),
        )
        .await
    }

    async fn get_ledger_entry_type(&self, name: &str) -> Result<Option<i64>> {
        self.resolve_id(Lookup::LedgerEntryType, name, self.inner.get_ledger_entry_type(name))
            .await
    }

    async fn get_participant_endpoint(
        &self,
        participant_name: &str,
        endpoint_type: &str,
    ) -> Result<Option<String>> {
        Self::resolve(
            &self.endpoints,
            Lookup::ParticipantEndpoint,
            &[participant_name, endpoint_type],
            self.inner
                .get_participant_endpoint(participant_name, endpoint_type),
        )
        .await
    }
}
