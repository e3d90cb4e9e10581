//! In-memory [`ShipmentStore`] used by this crate's tests.

use std::sync::{
  Mutex,
  atomic::{AtomicU32, Ordering},
};

use chrono::Utc;
use thiserror::Error;

use crate::{
  shipment::{
    NewHistoryEntry, NewShipment, Shipment, ShipmentHistory, ShipmentStatus,
    StatusSnapshot,
  },
  store::{ShipmentQuery, ShipmentStore, StoreError},
  transition::{Transition, TransitionKind, TransitionOutcome, TransitionPolicy},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("duplicate tracking number {0}")]
  Duplicate(String),
  #[error("store temporarily unavailable")]
  Unavailable,
}

impl StoreError for MemoryError {
  fn is_unique_violation(&self) -> bool { matches!(self, Self::Duplicate(_)) }

  fn is_transient(&self) -> bool { matches!(self, Self::Unavailable) }
}

#[derive(Default)]
struct Inner {
  shipments:  Vec<Shipment>,
  next_id:    i64,
  next_entry: i64,
}

impl Inner {
  fn entry(&mut self, shipment_id: i64, new: NewHistoryEntry) -> ShipmentHistory {
    self.next_entry += 1;
    ShipmentHistory {
      id: self.next_entry,
      shipment_id,
      status: new.status,
      location: new.location,
      notes: new.notes,
      timestamp: Utc::now(),
    }
  }

  fn find(&self, pred: impl Fn(&Shipment) -> bool) -> Option<Shipment> {
    self.shipments.iter().rev().find(|s| pred(s)).cloned()
  }
}

#[derive(Default)]
pub struct MemoryStore {
  inner:         Mutex<Inner>,
  failing_reads: AtomicU32,
}

impl MemoryStore {
  /// Make the next `n` calls to `current_status` fail transiently.
  pub fn fail_next_reads(&self, n: u32) {
    self.failing_reads.store(n, Ordering::SeqCst);
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap()
  }
}

impl ShipmentStore for MemoryStore {
  type Error = MemoryError;

  async fn create(
    &self,
    new: NewShipment,
    initial: NewHistoryEntry,
  ) -> Result<Shipment, MemoryError> {
    let mut inner = self.lock();
    if inner
      .shipments
      .iter()
      .any(|s| s.tracking_number == new.tracking_number)
    {
      return Err(MemoryError::Duplicate(new.tracking_number));
    }

    inner.next_id += 1;
    let id = inner.next_id;
    let now = Utc::now();
    let status = initial.status;
    let entry = inner.entry(id, initial);
    let shipment = Shipment {
      id,
      order_id: new.order_id,
      tracking_number: new.tracking_number,
      status,
      recipient: new.recipient,
      weight_kg: new.weight_kg,
      current_location: new.current_location,
      estimated_delivery: new.estimated_delivery,
      notes: new.notes,
      created_at: now,
      updated_at: now,
      history: vec![entry],
    };
    inner.shipments.push(shipment.clone());
    Ok(shipment)
  }

  async fn get_by_id(&self, id: i64) -> Result<Option<Shipment>, MemoryError> {
    Ok(self.lock().find(|s| s.id == id))
  }

  async fn get_by_order_id(
    &self,
    order_id: i64,
  ) -> Result<Option<Shipment>, MemoryError> {
    Ok(self.lock().find(|s| s.order_id == order_id))
  }

  async fn get_by_tracking_number(
    &self,
    tracking_number: &str,
  ) -> Result<Option<Shipment>, MemoryError> {
    Ok(self.lock().find(|s| s.tracking_number == tracking_number))
  }

  async fn list(&self, query: &ShipmentQuery) -> Result<Vec<Shipment>, MemoryError> {
    let mut rows: Vec<Shipment> = self
      .lock()
      .shipments
      .iter()
      .filter(|s| query.status.is_none_or(|st| s.status == st))
      .cloned()
      .collect();
    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    Ok(
      rows
        .into_iter()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .collect(),
    )
  }

  async fn count(&self, status: Option<ShipmentStatus>) -> Result<u64, MemoryError> {
    Ok(
      self
        .lock()
        .shipments
        .iter()
        .filter(|s| status.is_none_or(|st| s.status == st))
        .count() as u64,
    )
  }

  async fn apply_transition(
    &self,
    id: i64,
    transition: Transition,
    policy: TransitionPolicy,
  ) -> Result<TransitionOutcome, MemoryError> {
    let mut inner = self.lock();
    let Some(idx) = inner.shipments.iter().position(|s| s.id == id) else {
      return Ok(TransitionOutcome::NotFound);
    };
    if let Err(rejection) = policy.check(inner.shipments[idx].status, &transition) {
      return Ok(TransitionOutcome::Rejected(rejection));
    }

    let location = transition
      .location
      .or_else(|| inner.shipments[idx].current_location.clone());
    let entry = inner.entry(id, NewHistoryEntry {
      status:   transition.status,
      location: match transition.kind {
        TransitionKind::Update => location.clone(),
        TransitionKind::Cancel => None,
      },
      notes:    transition.notes,
    });

    let shipment = &mut inner.shipments[idx];
    shipment.status = transition.status;
    shipment.current_location = location;
    shipment.updated_at = entry.timestamp.max(shipment.updated_at);
    shipment.history.insert(0, entry);
    Ok(TransitionOutcome::Applied(shipment.clone()))
  }

  async fn history(
    &self,
    id: i64,
  ) -> Result<Option<Vec<ShipmentHistory>>, MemoryError> {
    Ok(self.lock().find(|s| s.id == id).map(|s| s.history))
  }

  async fn current_status(
    &self,
    id: i64,
  ) -> Result<Option<StatusSnapshot>, MemoryError> {
    let failing = self.failing_reads.load(Ordering::SeqCst);
    if failing > 0 {
      self.failing_reads.store(failing - 1, Ordering::SeqCst);
      return Err(MemoryError::Unavailable);
    }
    Ok(self.lock().find(|s| s.id == id).map(|s| StatusSnapshot {
      shipment_id: s.id,
      status:      s.status,
      location:    s.current_location,
      updated_at:  s.updated_at,
      notes:       s.notes,
    }))
  }

  async fn delete(&self, id: i64) -> Result<bool, MemoryError> {
    let mut inner = self.lock();
    let before = inner.shipments.len();
    inner.shipments.retain(|s| s.id != id);
    Ok(inner.shipments.len() != before)
  }
}
