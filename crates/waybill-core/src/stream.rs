//! [`UpdateStream`]: turns polled shipment state into a push feed.
//!
//! One controller watches one shipment. Each tick it reads the current
//! status and emits a [`ShipmentUpdate`] when it differs from the last status
//! seen. The seed is `Pending`, so a shipment that has already moved on is
//! reported on the first tick.
//!
//! The loop ends after emitting a terminal status, when the shipment no
//! longer exists, when the receiver is dropped, or when the cancellation
//! token fires. Cancellation is observed while waiting between ticks, while
//! backing off between read attempts, and while waiting for channel capacity.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, info, warn};

use crate::{
  shipment::{ShipmentStatus, StatusSnapshot},
  store::{ShipmentStore, StoreError as _},
};

/// Capacity of the channel returned by [`UpdateStream::spawn`].
pub const CHANNEL_CAPACITY: usize = 16;

/// Timing for [`UpdateStream`].
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
  pub poll_interval: Duration,
  /// Reads per tick before the tick is skipped.
  pub read_attempts: u32,
  /// Delay after the first failed read; doubles on each further failure.
  pub retry_backoff: Duration,
}

impl Default for StreamSettings {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_secs(5),
      read_attempts: 3,
      retry_backoff: Duration::from_millis(200),
    }
  }
}

/// An event pushed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentUpdate {
  pub shipment_id: i64,
  pub status:      ShipmentStatus,
  pub location:    Option<String>,
  /// When the shipment record last changed.
  pub timestamp:   DateTime<Utc>,
  pub notes:       Option<String>,
}

impl From<StatusSnapshot> for ShipmentUpdate {
  fn from(s: StatusSnapshot) -> Self {
    Self {
      shipment_id: s.shipment_id,
      status:      s.status,
      location:    s.location,
      timestamp:   s.updated_at,
      notes:       s.notes,
    }
  }
}

/// Why a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
  /// A terminal status was emitted.
  Terminal(ShipmentStatus),
  /// The shipment does not exist (or was deleted mid-stream).
  NotFound,
  Cancelled,
  /// The receiving side went away.
  Disconnected,
}

enum Observation {
  Current(StatusSnapshot),
  Missing,
  Unavailable,
  Cancelled,
}

pub struct UpdateStream<S> {
  store:       Arc<S>,
  shipment_id: i64,
  settings:    StreamSettings,
}

impl<S: ShipmentStore + 'static> UpdateStream<S> {
  pub fn new(store: Arc<S>, shipment_id: i64, settings: StreamSettings) -> Self {
    Self { store, shipment_id, settings }
  }

  /// Run the loop on a new task inside the caller's current span. Updates
  /// arrive on the returned receiver, which closes when the loop ends.
  pub fn spawn(
    self,
    cancel: CancellationToken,
  ) -> (mpsc::Receiver<ShipmentUpdate>, JoinHandle<StreamEnd>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = tokio::spawn(self.run(tx, cancel).in_current_span());
    (rx, handle)
  }

  pub async fn run(
    self,
    updates: mpsc::Sender<ShipmentUpdate>,
    cancel: CancellationToken,
  ) -> StreamEnd {
    let id = self.shipment_id;
    info!(shipment_id = id, "update stream started");
    let end = self.observe_loop(&updates, &cancel).await;
    info!(shipment_id = id, ?end, "update stream finished");
    end
  }

  async fn observe_loop(
    &self,
    updates: &mpsc::Sender<ShipmentUpdate>,
    cancel: &CancellationToken,
  ) -> StreamEnd {
    let mut last_seen = ShipmentStatus::Pending;

    loop {
      if cancel.is_cancelled() {
        return StreamEnd::Cancelled;
      }

      match self.observe(cancel).await {
        Observation::Cancelled => return StreamEnd::Cancelled,
        Observation::Missing => return StreamEnd::NotFound,
        Observation::Unavailable => {}
        Observation::Current(snapshot) if snapshot.status != last_seen => {
          let status = snapshot.status;
          debug!(shipment_id = self.shipment_id, %status, "status changed");
          tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamEnd::Cancelled,
            sent = updates.send(snapshot.into()) => {
              if sent.is_err() {
                return StreamEnd::Disconnected;
              }
            }
          }
          last_seen = status;
          if status.is_terminal() {
            return StreamEnd::Terminal(status);
          }
        }
        Observation::Current(_) => {}
      }

      tokio::select! {
        biased;
        _ = cancel.cancelled() => return StreamEnd::Cancelled,
        _ = updates.closed() => return StreamEnd::Disconnected,
        _ = tokio::time::sleep(self.settings.poll_interval) => {}
      }
    }
  }

  /// One tick's read, retrying transient failures with backoff.
  async fn observe(&self, cancel: &CancellationToken) -> Observation {
    let attempts = self.settings.read_attempts.max(1);
    let mut backoff = self.settings.retry_backoff;

    for attempt in 1..=attempts {
      match self.store.current_status(self.shipment_id).await {
        Ok(Some(snapshot)) => return Observation::Current(snapshot),
        Ok(None) => return Observation::Missing,
        Err(e) if e.is_transient() && attempt < attempts => {
          debug!(
            shipment_id = self.shipment_id,
            attempt,
            error = %e,
            "transient read failure, retrying"
          );
          tokio::select! {
            biased;
            _ = cancel.cancelled() => return Observation::Cancelled,
            _ = tokio::time::sleep(backoff) => {}
          }
          backoff = backoff.saturating_mul(2);
        }
        Err(e) => {
          warn!(
            shipment_id = self.shipment_id,
            attempt,
            error = %e,
            "read failed, skipping tick"
          );
          return Observation::Unavailable;
        }
      }
    }

    Observation::Unavailable
  }
}
