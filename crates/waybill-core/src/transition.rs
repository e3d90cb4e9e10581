//! Status transition rules.
//!
//! Both policies refuse to move a shipment out of a terminal status. The
//! strict policy additionally restricts each status to the edges in
//! [`allowed_next`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shipment::{Shipment, ShipmentStatus};

/// How strictly status edges are validated.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
  /// Any target is accepted from a non-terminal status.
  #[default]
  Permissive,
  /// Only edges from the progression table are accepted.
  Strict,
}

/// Which operation requested the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
  Update,
  Cancel,
}

/// A requested status change, applied atomically by the store together with
/// its history entry.
#[derive(Debug, Clone)]
pub struct Transition {
  pub kind:     TransitionKind,
  pub status:   ShipmentStatus,
  /// Replaces the current location when present.
  pub location: Option<String>,
  /// Stored on the history entry.
  pub notes:    Option<String>,
}

/// Why a transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("cannot cancel a delivered shipment")]
  CancelDelivered,

  #[error("shipment is already cancelled")]
  AlreadyCancelled,

  #[error("shipment is {0} and can no longer change status")]
  Terminal(ShipmentStatus),

  #[error("cannot move a shipment from {from} to {to}")]
  InvalidTransition {
    from: ShipmentStatus,
    to:   ShipmentStatus,
  },
}

/// Result of [`crate::store::ShipmentStore::apply_transition`].
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
  /// The change was written; the shipment is re-read with its history.
  Applied(Shipment),
  NotFound,
  /// Nothing was written.
  Rejected(Rejection),
}

/// Statuses reachable from `from` under [`TransitionPolicy::Strict`].
pub fn allowed_next(from: ShipmentStatus) -> &'static [ShipmentStatus] {
  use ShipmentStatus::*;
  match from {
    Pending => &[Processing, Cancelled],
    Processing => &[Shipped, Cancelled],
    Shipped => &[InTransit, OutForDelivery, Delivered, Returned, Cancelled],
    InTransit => &[InTransit, OutForDelivery, Delivered, Returned, Cancelled],
    OutForDelivery => &[InTransit, Delivered, Returned, Cancelled],
    Returned => &[Processing, Cancelled],
    Delivered | Cancelled => &[],
  }
}

impl TransitionPolicy {
  /// Decide whether `transition` may be applied to a shipment currently at
  /// `current`.
  pub fn check(
    self,
    current: ShipmentStatus,
    transition: &Transition,
  ) -> Result<(), Rejection> {
    match (transition.kind, current) {
      (TransitionKind::Cancel, ShipmentStatus::Delivered) => {
        Err(Rejection::CancelDelivered)
      }
      (TransitionKind::Cancel, ShipmentStatus::Cancelled) => {
        Err(Rejection::AlreadyCancelled)
      }
      (_, s) if s.is_terminal() => Err(Rejection::Terminal(s)),
      (TransitionKind::Cancel, _) => Ok(()),
      (TransitionKind::Update, from) => match self {
        Self::Permissive => Ok(()),
        Self::Strict if allowed_next(from).contains(&transition.status) => {
          Ok(())
        }
        Self::Strict => Err(Rejection::InvalidTransition {
          from,
          to: transition.status,
        }),
      },
    }
  }
}
