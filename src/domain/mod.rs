//! Domain layer: protocol payloads, persisted records and the ports the
//! quoting workflows depend on.

pub mod headers;
pub mod ports;
pub mod quote;
pub mod records;
