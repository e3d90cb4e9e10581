//! Process bootstrap for the Waybill shipment service.
//!
//! The binary in `main.rs` loads a [`ServerConfig`], opens the SQLite store
//! and serves [`waybill_api`] under `/api`.

pub mod settings;

pub use settings::ServerConfig;
