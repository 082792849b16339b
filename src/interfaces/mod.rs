//! Input adapters used by the binary.

pub mod csv;
pub mod json;
