use crate::error::{QuotingError, Result};
use crate::infrastructure::reference::ReferenceCatalog;
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

/// One row of the participant endpoint file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointRegistration {
    pub participant: String,
    pub endpoint_type: String,
    pub value: String,
}

/// Reads participant endpoint registrations from a CSV source with the
/// header `participant,endpoint_type,value`.
pub struct EndpointReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EndpointReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn registrations(self) -> impl Iterator<Item = Result<EndpointRegistration>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(QuotingError::from))
    }

    /// Registers every row with `catalog`, stopping at the first malformed row.
    pub async fn register_all(self, catalog: &ReferenceCatalog) -> Result<usize> {
        let mut count = 0;
        for registration in self.registrations() {
            let registration = registration?;
            debug!(
                participant = %registration.participant,
                endpoint_type = %registration.endpoint_type,
                "registering endpoint"
            );
            catalog
                .add_endpoint(
                    &registration.participant,
                    &registration.endpoint_type,
                    &registration.value,
                )
                .await;
            count += 1;
        }
        Ok(count)
    }
}
