//! Adapters behind the domain ports: storage backends, reference data and its
//! cache, the outbound HTTP client and the rules engine.

pub mod cache;
pub mod http;
pub mod in_memory;
pub mod reference;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod rules;
pub mod staging;
