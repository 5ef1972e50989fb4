//! Portfolio ledger service: per-user cash balance and position lots
//! behind an authenticated HTTP API.
//!
//! The ledger owns validation and arithmetic; durable storage and
//! market pricing sit behind the traits in [`persistence`] and
//! [`pricing`].

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod persistence;
pub mod pricing;
pub mod types;
