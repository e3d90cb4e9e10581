//! The `ShipmentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `waybill-store-sqlite`).
//! The engine, query service and update stream depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::{
  shipment::{
    NewHistoryEntry, NewShipment, Shipment, ShipmentHistory, ShipmentStatus,
    StatusSnapshot,
  },
  transition::{Transition, TransitionOutcome, TransitionPolicy},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ShipmentStore::list`]. Results are ordered by creation
/// time, newest first.
#[derive(Debug, Clone, Default)]
pub struct ShipmentQuery {
  pub status: Option<ShipmentStatus>,
  pub offset: u64,
  pub limit:  u64,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Classification hooks the engine and stream rely on.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The write collided with the unique tracking-number constraint.
  fn is_unique_violation(&self) -> bool;

  /// The failure is likely to clear on retry (busy database, timeout).
  fn is_transient(&self) -> bool { false }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a shipment storage backend.
///
/// Every write that changes a shipment's status also appends the matching
/// history entry inside the same transaction. History is never updated or
/// deleted individually; deleting a shipment deletes its history.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ShipmentStore: Send + Sync {
  type Error: StoreError;

  /// Insert `shipment` together with its first history entry. The shipment
  /// takes its status from `initial`. Returns the stored record with that
  /// entry attached.
  fn create(
    &self,
    shipment: NewShipment,
    initial: NewHistoryEntry,
  ) -> impl Future<Output = Result<Shipment, Self::Error>> + Send + '_;

  fn get_by_id(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + '_;

  /// The most recently created shipment for `order_id`.
  fn get_by_order_id(
    &self,
    order_id: i64,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + '_;

  fn get_by_tracking_number<'a>(
    &'a self,
    tracking_number: &'a str,
  ) -> impl Future<Output = Result<Option<Shipment>, Self::Error>> + Send + 'a;

  fn list<'a>(
    &'a self,
    query: &'a ShipmentQuery,
  ) -> impl Future<Output = Result<Vec<Shipment>, Self::Error>> + Send + 'a;

  fn count(
    &self,
    status: Option<ShipmentStatus>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Read the current status, check it against `policy`, then write the new
  /// status and its history entry. All three steps share one transaction.
  fn apply_transition(
    &self,
    id: i64,
    transition: Transition,
    policy: TransitionPolicy,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  /// History newest first, or `None` if the shipment does not exist.
  fn history(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Vec<ShipmentHistory>>, Self::Error>>
  + Send
  + '_;

  /// A lightweight read of the fields the update stream reports.
  fn current_status(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<StatusSnapshot>, Self::Error>> + Send + '_;

  /// Delete a shipment and its history. Returns `false` if it did not exist.
  fn delete(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
