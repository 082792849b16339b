//! Quoting engine for a financial-switch interoperability hub.
//!
//! The engine accepts quote requests, responses, error reports and lookups
//! from participant FSPs, persists them transactionally, and forwards them to
//! the counterparty in the background. Failures after acceptance are routed
//! back to the originating participant as error callbacks.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
