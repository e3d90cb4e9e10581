//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision, so text order equals chronological order. Statuses are stored
//! under their snake_case names.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use waybill_core::shipment::{
  Recipient, Shipment, ShipmentHistory, ShipmentStatus, StatusSnapshot,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ShipmentStatus ──────────────────────────────────────────────────────────

pub fn encode_status(s: ShipmentStatus) -> &'static str { s.as_str() }

pub fn decode_status(s: &str) -> Result<ShipmentStatus> {
  ShipmentStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawShipment::from_row`].
pub const SHIPMENT_COLUMNS: &str = "id, order_id, tracking_number, status,
  recipient_name, recipient_address, recipient_city, recipient_postal_code,
  recipient_country, recipient_phone, weight_kg, current_location,
  estimated_delivery, notes, created_at, updated_at";

/// Column list matching [`RawHistory::from_row`].
pub const HISTORY_COLUMNS: &str =
  "id, shipment_id, status, location, notes, timestamp";

/// Raw values read directly from a `shipments` row plus its history rows.
pub struct RawShipment {
  pub id:                    i64,
  pub order_id:              i64,
  pub tracking_number:       String,
  pub status:                String,
  pub recipient_name:        String,
  pub recipient_address:     String,
  pub recipient_city:        String,
  pub recipient_postal_code: String,
  pub recipient_country:     String,
  pub recipient_phone:       Option<String>,
  pub weight_kg:             f64,
  pub current_location:      Option<String>,
  pub estimated_delivery:    Option<String>,
  pub notes:                 Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
  pub history:               Vec<RawHistory>,
}

impl RawShipment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      order_id:              row.get(1)?,
      tracking_number:       row.get(2)?,
      status:                row.get(3)?,
      recipient_name:        row.get(4)?,
      recipient_address:     row.get(5)?,
      recipient_city:        row.get(6)?,
      recipient_postal_code: row.get(7)?,
      recipient_country:     row.get(8)?,
      recipient_phone:       row.get(9)?,
      weight_kg:             row.get(10)?,
      current_location:      row.get(11)?,
      estimated_delivery:    row.get(12)?,
      notes:                 row.get(13)?,
      created_at:            row.get(14)?,
      updated_at:            row.get(15)?,
      history:               Vec::new(),
    })
  }

  pub fn into_shipment(self) -> Result<Shipment> {
    Ok(Shipment {
      id:                 self.id,
      order_id:           self.order_id,
      tracking_number:    self.tracking_number,
      status:             decode_status(&self.status)?,
      recipient:          Recipient {
        name:        self.recipient_name,
        address:     self.recipient_address,
        city:        self.recipient_city,
        postal_code: self.recipient_postal_code,
        country:     self.recipient_country,
        phone:       self.recipient_phone,
      },
      weight_kg:          self.weight_kg,
      current_location:   self.current_location,
      estimated_delivery: self
        .estimated_delivery
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      notes:              self.notes,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
      history:            self
        .history
        .into_iter()
        .map(RawHistory::into_history)
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw values read directly from a `shipment_history` row.
pub struct RawHistory {
  pub id:          i64,
  pub shipment_id: i64,
  pub status:      String,
  pub location:    Option<String>,
  pub notes:       Option<String>,
  pub timestamp:   String,
}

impl RawHistory {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      shipment_id: row.get(1)?,
      status:      row.get(2)?,
      location:    row.get(3)?,
      notes:       row.get(4)?,
      timestamp:   row.get(5)?,
    })
  }

  pub fn into_history(self) -> Result<ShipmentHistory> {
    Ok(ShipmentHistory {
      id:          self.id,
      shipment_id: self.shipment_id,
      status:      decode_status(&self.status)?,
      location:    self.location,
      notes:       self.notes,
      timestamp:   decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw values for a [`StatusSnapshot`].
pub struct RawSnapshot {
  pub id:         i64,
  pub status:     String,
  pub location:   Option<String>,
  pub updated_at: String,
  pub notes:      Option<String>,
}

impl RawSnapshot {
  pub fn into_snapshot(self) -> Result<StatusSnapshot> {
    Ok(StatusSnapshot {
      shipment_id: self.id,
      status:      decode_status(&self.status)?,
      location:    self.location,
      updated_at:  decode_dt(&self.updated_at)?,
      notes:       self.notes,
    })
  }
}
