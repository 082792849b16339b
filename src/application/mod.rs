//! Quote lifecycle orchestration.
//!
//! [`service::QuotingService`] implements the request, update, error and get
//! workflows on top of the duplicate detector, the callback dispatcher and the
//! background task scheduler.

pub mod dispatcher;
pub mod duplicate;
mod error_report;
mod get;
mod request;
pub mod scheduler;
pub mod service;
mod update;
