//! Core types and services for the Waybill shipment tracker.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::ShipmentStore`]; transports drive the
//! [`lifecycle::LifecycleEngine`], [`query::QueryService`] and
//! [`stream::UpdateStream`] defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod lifecycle;
pub mod query;
pub mod shipment;
pub mod store;
pub mod stream;
pub mod tracking;
pub mod transition;

pub use error::{Error, Result};

#[cfg(test)]
mod memory;
