use crate::domain::ports::ReferenceData;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const INITIATOR_TYPES: &[&str] = &["CONSUMER", "AGENT", "BUSINESS", "DEVICE"];
const INITIATORS: &[&str] = &["PAYER", "PAYEE"];
const SCENARIOS: &[&str] = &["DEPOSIT", "WITHDRAWAL", "TRANSFER", "PAYMENT", "REFUND"];
const AMOUNT_TYPES: &[&str] = &["SEND", "RECEIVE"];
const PARTY_TYPES: &[&str] = &["PAYER", "PAYEE"];
const PARTY_IDENTIFIER_TYPES: &[&str] = &[
    "MSISDN",
    "EMAIL",
    "PERSONAL_ID",
    "BUSINESS",
    "DEVICE",
    "ACCOUNT_ID",
    "IBAN",
    "ALIAS",
];
const TRANSFER_PARTICIPANT_ROLE_TYPES: &[&str] = &[
    "PAYER_DFSP",
    "PAYEE_DFSP",
    "HUB",
    "DFSP_SETTLEMENT",
    "DFSP_POSITION",
];
const LEDGER_ENTRY_TYPES: &[&str] = &[
    "PRINCIPLE_VALUE",
    "INTERCHANGE_FEE",
    "HUB_FEE",
    "POSITION_DEPOSIT",
    "POSITION_WITHDRAWAL",
    "SETTLEMENT_NET_RECIPIENT",
    "SETTLEMENT_NET_SENDER",
    "SETTLEMENT_NET_ZERO",
    "RECORD_FUNDS_IN",
    "RECORD_FUNDS_OUT",
];

fn table(names: &[&str]) -> HashMap<String, i64> {
    names
        .iter()
        .zip(1..)
        .map(|(name, id)| (name.to_string(), id))
        .collect()
}

#[derive(Default)]
struct Catalog {
    initiator_types: HashMap<String, i64>,
    initiators: HashMap<String, i64>,
    scenarios: HashMap<String, i64>,
    sub_scenarios: HashMap<String, i64>,
    amount_types: HashMap<String, i64>,
    party_types: HashMap<String, i64>,
    party_identifier_types: HashMap<String, i64>,
    participants: HashMap<String, i64>,
    transfer_participant_role_types: HashMap<String, i64>,
    ledger_entry_types: HashMap<String, i64>,
    endpoints: HashMap<(String, String), String>,
}

/// In-memory reference tables and participant endpoint registry.
#[derive(Default, Clone)]
pub struct ReferenceCatalog {
    catalog: Arc<RwLock<Catalog>>,
}

impl ReferenceCatalog {
    /// Creates a catalog with empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog seeded with the standard enumeration values.
    pub fn with_defaults() -> Self {
        let catalog = Catalog {
            initiator_types: table(INITIATOR_TYPES),
            initiators: table(INITIATORS),
            scenarios: table(SCENARIOS),
            amount_types: table(AMOUNT_TYPES),
            party_types: table(PARTY_TYPES),
            party_identifier_types: table(PARTY_IDENTIFIER_TYPES),
            transfer_participant_role_types: table(TRANSFER_PARTICIPANT_ROLE_TYPES),
            ledger_entry_types: table(LEDGER_ENTRY_TYPES),
            ..Catalog::default()
        };
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    /// Registers a sub-scenario name, returning its id.
    pub async fn add_sub_scenario(&self, name: &str) -> i64 {
        let mut catalog = self.catalog.write().await;
        let next = catalog.sub_scenarios.len() as i64 + 1;
        *catalog.sub_scenarios.entry(name.to_string()).or_insert(next)
    }

    /// Registers a participant, returning its id.
    pub async fn add_participant(&self, name: &str) -> i64 {
        let mut catalog = self.catalog.write().await;
        let next = catalog.participants.len() as i64 + 1;
        *catalog.participants.entry(name.to_string()).or_insert(next)
    }

    /// Registers (or replaces) a participant endpoint, adding the participant
    /// if it is not yet known.
    pub async fn add_endpoint(&self, participant: &str, endpoint_type: &str, value: &str) {
        self.add_participant(participant).await;
        let mut catalog = self.catalog.write().await;
        catalog.endpoints.insert(
            (participant.to_string(), endpoint_type.to_string()),
            value.trim_end_matches('/').to_string(),
        );
    }

    async fn lookup(&self, pick: impl Fn(&Catalog) -> &HashMap<String, i64>, name: &str) -> Option<i64> {
        let catalog = self.catalog.read().await;
        pick(&catalog).get(name).copied()
    }
}

#[async_trait]
impl ReferenceData for ReferenceCatalog {
    async fn get_initiator_type(&self, initiator_type: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.initiator_types, initiator_type).await)
    }

    async fn get_initiator(&self, initiator: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.initiators, initiator).await)
    }

    async fn get_scenario(&self, scenario: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.scenarios, scenario).await)
    }

    async fn get_sub_scenario(&self, sub_scenario: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.sub_scenarios, sub_scenario).await)
    }

    async fn get_amount_type(&self, amount_type: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.amount_types, amount_type).await)
    }

    async fn get_party_type(&self, party_type: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.party_types, party_type).await)
    }

    async fn get_party_identifier_type(&self, party_identifier_type: &str) -> Result<Option<i64>> {
        Ok(self
            .lookup(|c| &c.party_identifier_types, party_identifier_type)
            .await)
    }

    async fn get_participant(&self, participant_name: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.participants, participant_name).await)
    }

    async fn get_transfer_participant_role_type(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .lookup(|c| &c.transfer_participant_role_types, name)
            .await)
    }

    async fn get_ledger_entry_type(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.lookup(|c| &c.ledger_entry_types, name).await)
    }

    async fn get_participant_endpoint(
        &self,
        participant_name: &str,
        endpoint_type: &str,
    ) -> Result<Option<String>> {
        let catalog = self.catalog.read().await;
        Ok(catalog
            .endpoints
            .get(&(participant_name.to_string(), endpoint_type.to_string()))
            .cloned())
    }
}
