//! Shipment records and their append-only history.
//!
//! A shipment owns an ordered ledger of history entries. Every status change
//! that reaches the shipment row is paired with exactly one history entry
//! carrying the same status, so the newest entry always agrees with
//! [`Shipment::status`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a shipment is in its lifecycle.
///
/// Variants are listed in typical progression order. `Delivered` and
/// `Cancelled` are absorbing; `Returned` is a side exit that may re-enter
/// processing.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentStatus {
  Pending,
  Processing,
  Shipped,
  InTransit,
  OutForDelivery,
  Delivered,
  Cancelled,
  Returned,
}

impl ShipmentStatus {
  /// The name stored in the database and used on the wire.
  pub fn as_str(self) -> &'static str { self.into() }

  /// `true` once no further status change is accepted.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Delivered | Self::Cancelled)
  }
}

// ─── Recipient ───────────────────────────────────────────────────────────────

/// Delivery address and contact for a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
  pub name:        String,
  pub address:     String,
  pub city:        String,
  pub postal_code: String,
  pub country:     String,
  pub phone:       Option<String>,
}

impl Recipient {
  /// Names of required fields that are empty or whitespace-only.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("name", &self.name),
      ("address", &self.address),
      ("city", &self.city),
      ("postal_code", &self.postal_code),
      ("country", &self.country),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(k, _)| k)
    .collect()
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// An immutable snapshot of a shipment's status at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentHistory {
  pub id:          i64,
  pub shipment_id: i64,
  pub status:      ShipmentStatus,
  pub location:    Option<String>,
  pub notes:       Option<String>,
  /// Store-assigned; non-decreasing in insertion order.
  pub timestamp:   DateTime<Utc>,
}

/// Input for a history entry; id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub status:   ShipmentStatus,
  pub location: Option<String>,
  pub notes:    Option<String>,
}

// ─── Shipment ────────────────────────────────────────────────────────────────

/// A shipment with its full history attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
  pub id:                 i64,
  pub order_id:           i64,
  /// Assigned once at creation and never changed.
  pub tracking_number:    String,
  pub status:             ShipmentStatus,
  pub recipient:          Recipient,
  pub weight_kg:          f64,
  pub current_location:   Option<String>,
  pub estimated_delivery: Option<DateTime<Utc>>,
  pub notes:              Option<String>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
  /// Newest first.
  pub history:            Vec<ShipmentHistory>,
}

impl Shipment {
  /// The most recent history entry.
  pub fn latest_entry(&self) -> Option<&ShipmentHistory> { self.history.first() }

  /// History in the order the transitions happened.
  pub fn timeline(&self) -> impl Iterator<Item = &ShipmentHistory> {
    self.history.iter().rev()
  }
}

/// Input to [`crate::store::ShipmentStore::create`]. The status comes from the
/// initial history entry; `id`, `created_at` and `updated_at` are set by the
/// store.
#[derive(Debug, Clone)]
pub struct NewShipment {
  pub order_id:           i64,
  pub tracking_number:    String,
  pub recipient:          Recipient,
  pub weight_kg:          f64,
  pub current_location:   Option<String>,
  pub estimated_delivery: Option<DateTime<Utc>>,
  pub notes:              Option<String>,
}

/// The slice of a shipment the update stream watches.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
  pub shipment_id: i64,
  pub status:      ShipmentStatus,
  pub location:    Option<String>,
  pub updated_at:  DateTime<Utc>,
  /// The shipment's own notes, as given at creation.
  pub notes:       Option<String>,
}

/// Treat blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}
