use crate::application::service::QuotingService;
use crate::domain::headers::FspiopHeaders;
use crate::domain::quote::{ErrorInformation, QuoteRequest, QuoteUpdate};
use crate::error::{QuotingError, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::BufRead;

/// An already-decoded inbound call, one per input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum InboundOperation {
    QuoteRequest {
        #[serde(default)]
        headers: FspiopHeaders,
        body: QuoteRequest,
    },
    QuoteUpdate {
        #[serde(default)]
        headers: FspiopHeaders,
        #[serde(rename = "quoteId")]
        quote_id: String,
        body: QuoteUpdate,
    },
    QuoteError {
        #[serde(default)]
        headers: FspiopHeaders,
        #[serde(rename = "quoteId")]
        quote_id: String,
        body: ErrorInformation,
    },
    QuoteGet {
        #[serde(default)]
        headers: FspiopHeaders,
        #[serde(rename = "quoteId")]
        quote_id: String,
    },
}

impl InboundOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuoteRequest { .. } => "quoteRequest",
            Self::QuoteUpdate { .. } => "quoteUpdate",
            Self::QuoteError { .. } => "quoteError",
            Self::QuoteGet { .. } => "quoteGet",
        }
    }

    pub fn quote_id(&self) -> &str {
        match self {
            Self::QuoteRequest { body, .. } => &body.quote_id,
            Self::QuoteUpdate { quote_id, .. }
            | Self::QuoteError { quote_id, .. }
            | Self::QuoteGet { quote_id, .. } => quote_id,
        }
    }

    /// Runs the operation and returns the synchronous acknowledgement.
    pub async fn apply(self, service: &QuotingService) -> Result<Value> {
        let operation = self.name();
        let quote_id = self.quote_id().to_string();
        let outcome = match self {
            Self::QuoteRequest { headers, body } => {
                serde_json::to_value(service.handle_quote_request(&headers, body).await?)?
            }
            Self::QuoteUpdate {
                headers,
                quote_id,
                body,
            } => serde_json::to_value(service.handle_quote_update(&headers, &quote_id, body).await?)?,
            Self::QuoteError {
                headers,
                quote_id,
                body,
            } => {
                let record = service.handle_quote_error(&headers, &quote_id, body).await?;
                json!({ "status": "recorded", "error": serde_json::to_value(record)? })
            }
            Self::QuoteGet { headers, quote_id } => {
                service.handle_quote_get(&headers, &quote_id).await?;
                json!({ "status": "forwarding" })
            }
        };

        let mut ack = json!({ "operation": operation, "quoteId": quote_id });
        if let (Some(ack), Value::Object(outcome)) = (ack.as_object_mut(), outcome) {
            ack.extend(outcome);
        }
        Ok(ack)
    }
}

/// Reads one JSON-encoded [`InboundOperation`] per line, skipping blank lines.
pub struct OperationReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> OperationReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<InboundOperation>> {
        self.source
            .lines()
            .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
            .map(|line| {
                let line = line.map_err(QuotingError::from)?;
                Ok(serde_json::from_str(&line)?)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_each_operation_kind() {
        let data = r#"
{"operation":"quoteGet","headers":{"FSPIOP-Source":"payerfsp","FSPIOP-Destination":"payeefsp"},"quoteId":"Q1"}

{"operation":"quoteError","headers":{"FSPIOP-Source":"payeefsp"},"quoteId":"Q1","body":{"errorCode":"5100","errorDescription":"nope"}}
{"operation":"quoteUpdate","quoteId":"Q1","body":{"transferAmount":{"currency":"USD","amount":"10"},"expiration":"2030-01-01T00:00:00Z","ilpPacket":"AYIB","condition":"c"}}
"#;
        let operations: Vec<InboundOperation> = OperationReader::new(data.as_bytes())
            .operations()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(operations.len(), 3);
        assert_eq!(operations[0].name(), "quoteGet");
        assert_eq!(operations[1].quote_id(), "Q1");
        match &operations[2] {
            InboundOperation::QuoteUpdate { headers, body, .. } => {
                assert!(headers.source().is_none());
                assert_eq!(body.ilp_packet, "AYIB");
            }
            other => panic!("unexpected operation {other:?}"),
        }
    }

    #[test]
    fn test_unknown_operation_is_an_error() {
        let data = r#"{"operation":"quoteDelete","quoteId":"Q1"}"#;
        let results: Vec<Result<InboundOperation>> =
            OperationReader::new(data.as_bytes()).operations().collect();

        assert!(matches!(results[0], Err(QuotingError::Serialization(_))));
    }
}
