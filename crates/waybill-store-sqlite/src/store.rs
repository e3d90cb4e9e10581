//! [`SqliteStore`]: the SQLite implementation of [`ShipmentStore`].

use std::path::Path;

use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, ToSql};
use tracing::debug;

use waybill_core::{
  shipment::{
    NewHistoryEntry, NewShipment, Shipment, ShipmentHistory, ShipmentStatus,
    StatusSnapshot,
  },
  store::{ShipmentQuery, ShipmentStore},
  transition::{
    Rejection, Transition, TransitionKind, TransitionOutcome, TransitionPolicy,
  },
};

use crate::{
  Error, Result,
  encode::{
    HISTORY_COLUMNS, RawHistory, RawShipment, RawSnapshot, SHIPMENT_COLUMNS,
    decode_status, encode_dt, encode_status, now,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A shipment store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a single-row lookup and attach the shipment's history.
  async fn load_one<P>(&self, clause: &'static str, key: P) -> Result<Option<Shipment>>
  where
    P: ToSql + Send + 'static,
  {
    let raw = self
      .conn
      .call(move |conn| Ok(load_shipment(conn, clause, key)?))
      .await?;
    raw.map(RawShipment::into_shipment).transpose()
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

/// Newest matching shipment for `clause`, with history newest first.
fn load_shipment(
  conn: &Connection,
  clause: &str,
  key: impl ToSql,
) -> rusqlite::Result<Option<RawShipment>> {
  let sql = format!(
    "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE {clause}
     ORDER BY created_at DESC, id DESC LIMIT 1"
  );
  let Some(mut raw) = conn
    .query_row(&sql, [key], RawShipment::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  raw.history = load_history(conn, raw.id)?;
  Ok(Some(raw))
}

fn load_history(conn: &Connection, shipment_id: i64) -> rusqlite::Result<Vec<RawHistory>> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT {HISTORY_COLUMNS} FROM shipment_history WHERE shipment_id = ?1
     ORDER BY timestamp DESC, id DESC"
  ))?;
  stmt
    .query_map([shipment_id], RawHistory::from_row)?
    .collect()
}

fn insert_history(
  conn: &Connection,
  shipment_id: i64,
  status: &str,
  location: Option<&str>,
  notes: Option<&str>,
  timestamp: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO shipment_history (shipment_id, status, location, notes, timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![shipment_id, status, location, notes, timestamp],
  )?;
  Ok(())
}

/// [`TransitionOutcome`] before row decoding.
enum RawOutcome {
  Applied(RawShipment),
  NotFound,
  Rejected(Rejection),
}

// ─── ShipmentStore impl ──────────────────────────────────────────────────────

impl ShipmentStore for SqliteStore {
  type Error = Error;

  async fn create(
    &self,
    new: NewShipment,
    initial: NewHistoryEntry,
  ) -> Result<Shipment> {
    let at     = encode_dt(now());
    let eta    = new.estimated_delivery.map(encode_dt);
    let status = encode_status(initial.status);
    let r      = new.recipient;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO shipments (
             order_id, tracking_number, status,
             recipient_name, recipient_address, recipient_city,
             recipient_postal_code, recipient_country, recipient_phone,
             weight_kg, current_location, estimated_delivery, notes,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
          rusqlite::params![
            new.order_id,
            new.tracking_number,
            status,
            r.name,
            r.address,
            r.city,
            r.postal_code,
            r.country,
            r.phone,
            new.weight_kg,
            new.current_location,
            eta,
            new.notes,
            at,
          ],
        )?;
        let id = tx.last_insert_rowid();
        insert_history(
          &tx,
          id,
          status,
          initial.location.as_deref(),
          initial.notes.as_deref(),
          &at,
        )?;
        let raw = load_shipment(&tx, "id = ?1", id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    debug!(shipment_id = raw.id, "inserted shipment");
    raw.into_shipment()
  }

  async fn get_by_id(&self, id: i64) -> Result<Option<Shipment>> {
    self.load_one("id = ?1", id).await
  }

  async fn get_by_order_id(&self, order_id: i64) -> Result<Option<Shipment>> {
    self.load_one("order_id = ?1", order_id).await
  }

  async fn get_by_tracking_number(
    &self,
    tracking_number: &str,
  ) -> Result<Option<Shipment>> {
    self
      .load_one("tracking_number = ?1", tracking_number.to_owned())
      .await
  }

  async fn list(&self, query: &ShipmentQuery) -> Result<Vec<Shipment>> {
    let status = query.status.map(encode_status);
    let limit  = i64::try_from(query.limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

    let raws: Vec<RawShipment> = self
      .conn
      .call(move |conn| {
        let mut rows = {
          let mut stmt = conn.prepare(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
          ))?;
          stmt
            .query_map(
              rusqlite::params![status, limit, offset],
              RawShipment::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        for raw in &mut rows {
          raw.history = load_history(conn, raw.id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawShipment::into_shipment).collect()
  }

  async fn count(&self, status: Option<ShipmentStatus>) -> Result<u64> {
    let status = status.map(encode_status);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM shipments WHERE (?1 IS NULL OR status = ?1)",
          [status],
          |row| row.get(0),
        )?)
      })
      .await?;
    u64::try_from(n).map_err(|_| Error::CountOutOfRange(n))
  }

  async fn apply_transition(
    &self,
    id: i64,
    transition: Transition,
    policy: TransitionPolicy,
  ) -> Result<TransitionOutcome> {
    let at = encode_dt(now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<(String, Option<String>, String)> = tx
          .query_row(
            "SELECT status, current_location, updated_at FROM shipments WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )
          .optional()?;
        let Some((status, location, updated_at)) = current else {
          return Ok(RawOutcome::NotFound);
        };

        let current = decode_status(&status)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        if let Err(rejection) = policy.check(current, &transition) {
          return Ok(RawOutcome::Rejected(rejection));
        }

        // Fixed-width timestamps compare correctly as text.
        let stamp = if at < updated_at { updated_at } else { at };
        let location = transition.location.or(location);
        let status = encode_status(transition.status);
        // A cancel entry records no location; the shipment keeps its own.
        let entry_location = match transition.kind {
          TransitionKind::Update => location.as_deref(),
          TransitionKind::Cancel => None,
        };

        tx.execute(
          "UPDATE shipments SET status = ?1, current_location = ?2, updated_at = ?3
           WHERE id = ?4",
          rusqlite::params![status, location, stamp, id],
        )?;
        insert_history(
          &tx,
          id,
          status,
          entry_location,
          transition.notes.as_deref(),
          &stamp,
        )?;
        let raw = load_shipment(&tx, "id = ?1", id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(RawOutcome::Applied(raw))
      })
      .await?;

    Ok(match outcome {
      RawOutcome::Applied(raw) => {
        debug!(shipment_id = id, "applied transition");
        TransitionOutcome::Applied(raw.into_shipment()?)
      }
      RawOutcome::NotFound => TransitionOutcome::NotFound,
      RawOutcome::Rejected(r) => TransitionOutcome::Rejected(r),
    })
  }

  async fn history(&self, id: i64) -> Result<Option<Vec<ShipmentHistory>>> {
    let raws: Option<Vec<RawHistory>> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row("SELECT 1 FROM shipments WHERE id = ?1", [id], |_| Ok(()))
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }
        Ok(Some(load_history(conn, id)?))
      })
      .await?;

    raws
      .map(|rows| rows.into_iter().map(RawHistory::into_history).collect())
      .transpose()
  }

  async fn current_status(&self, id: i64) -> Result<Option<StatusSnapshot>> {
    let raw: Option<RawSnapshot> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, status, current_location, updated_at, notes
             FROM shipments WHERE id = ?1",
            [id],
            |row| {
              Ok(RawSnapshot {
                id:         row.get(0)?,
                status:     row.get(1)?,
                location:   row.get(2)?,
                updated_at: row.get(3)?,
                notes:      row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSnapshot::into_snapshot).transpose()
  }

  async fn delete(&self, id: i64) -> Result<bool> {
    let affected = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM shipments WHERE id = ?1", [id])?))
      .await?;
    debug!(shipment_id = id, deleted = affected > 0, "delete shipment");
    Ok(affected > 0)
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Raw history row count for `shipment_id`, whether or not the shipment
  /// row still exists.
  pub(crate) async fn history_row_count(&self, shipment_id: i64) -> i64 {
    self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM shipment_history WHERE shipment_id = ?1",
          [shipment_id],
          |row| row.get(0),
        )?)
      })
      .await
      .unwrap()
  }
}
