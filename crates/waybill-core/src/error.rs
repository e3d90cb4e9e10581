//! Error types for `waybill-core`.

use thiserror::Error;

use crate::transition::Rejection;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Shipment with ID {0} not found")]
  ShipmentNotFound(i64),

  #[error("Shipment for order {0} not found")]
  OrderNotFound(i64),

  #[error("Shipment with tracking number {0} not found")]
  TrackingNumberNotFound(String),

  #[error(transparent)]
  Rejected(#[from] Rejection),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("could not allocate a unique tracking number after {0} attempts")]
  TrackingNumberExhausted(u32),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::ShipmentNotFound(_)
        | Self::OrderNotFound(_)
        | Self::TrackingNumberNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
