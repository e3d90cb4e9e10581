//! SQL schema for the Waybill SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS shipments (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id              INTEGER NOT NULL,
    tracking_number       TEXT    NOT NULL UNIQUE CHECK (tracking_number != ''),
    status                TEXT    NOT NULL,   -- snake_case ShipmentStatus
    recipient_name        TEXT    NOT NULL,
    recipient_address     TEXT    NOT NULL,
    recipient_city        TEXT    NOT NULL,
    recipient_postal_code TEXT    NOT NULL,
    recipient_country     TEXT    NOT NULL,
    recipient_phone       TEXT,
    weight_kg             REAL    NOT NULL CHECK (weight_kg >= 0),
    current_location      TEXT,
    estimated_delivery    TEXT,               -- RFC 3339 UTC
    notes                 TEXT,
    created_at            TEXT    NOT NULL,   -- RFC 3339 UTC; store-assigned
    updated_at            TEXT    NOT NULL CHECK (updated_at >= created_at)
);

-- History is append-only; rows leave only with their shipment.
CREATE TABLE IF NOT EXISTS shipment_history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    shipment_id INTEGER NOT NULL REFERENCES shipments(id) ON DELETE CASCADE,
    status      TEXT    NOT NULL,
    location    TEXT,
    notes       TEXT,
    timestamp   TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS shipments_order_idx   ON shipments(order_id);
CREATE INDEX IF NOT EXISTS shipments_status_idx  ON shipments(status);
CREATE INDEX IF NOT EXISTS shipments_created_idx ON shipments(created_at);
CREATE INDEX IF NOT EXISTS history_shipment_idx  ON shipment_history(shipment_id, timestamp);

PRAGMA user_version = 1;
";
