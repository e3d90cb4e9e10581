//! [`LifecycleEngine`]: creates shipments and applies status transitions.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::{
  Error, Result,
  shipment::{NewHistoryEntry, NewShipment, Recipient, Shipment, ShipmentStatus, non_blank},
  store::{ShipmentStore, StoreError as _},
  tracking::{RandomTrackingNumbers, TrackingNumberSource},
  transition::{Transition, TransitionKind, TransitionOutcome, TransitionPolicy},
};

/// Location assigned to every new shipment.
pub const DEFAULT_LOCATION: &str = "Warehouse";

/// Fixed lead time used for the estimated delivery date.
pub const DELIVERY_LEAD_DAYS: i64 = 4;

/// Tunables for [`LifecycleEngine`].
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
  pub transition_policy:     TransitionPolicy,
  /// Creation attempts before a tracking-number conflict is surfaced.
  pub max_tracking_attempts: u32,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      transition_policy:     TransitionPolicy::Permissive,
      max_tracking_attempts: 5,
    }
  }
}

/// Input to [`LifecycleEngine::create`].
#[derive(Debug, Clone)]
pub struct CreateShipment {
  pub order_id:  i64,
  pub recipient: Recipient,
  pub weight_kg: f64,
  pub notes:     Option<String>,
}

/// Owns every write path for shipments.
pub struct LifecycleEngine<S> {
  store:    Arc<S>,
  settings: EngineSettings,
  tracking: Arc<dyn TrackingNumberSource>,
}

impl<S: ShipmentStore> LifecycleEngine<S> {
  pub fn new(store: Arc<S>, settings: EngineSettings) -> Self {
    Self { store, settings, tracking: Arc::new(RandomTrackingNumbers) }
  }

  /// Replace the tracking-number generator.
  pub fn with_tracking_source(
    mut self,
    source: impl TrackingNumberSource,
  ) -> Self {
    self.tracking = Arc::new(source);
    self
  }

  pub fn settings(&self) -> EngineSettings { self.settings }

  /// Create a `Pending` shipment at the warehouse with its first history
  /// entry.
  ///
  /// A tracking-number collision regenerates the number and retries, up to
  /// `max_tracking_attempts` times.
  pub async fn create(&self, input: CreateShipment) -> Result<Shipment> {
    let missing = input.recipient.missing_fields();
    if !missing.is_empty() {
      return Err(Error::InvalidInput(format!(
        "missing recipient fields: {}",
        missing.join(", ")
      )));
    }
    if !input.weight_kg.is_finite() || input.weight_kg < 0.0 {
      return Err(Error::InvalidInput(format!(
        "weight must be a non-negative number, got {}",
        input.weight_kg
      )));
    }

    let attempts = self.settings.max_tracking_attempts.max(1);
    let notes = non_blank(input.notes);
    let mut recipient = input.recipient;
    recipient.phone = non_blank(recipient.phone);

    for attempt in 1..=attempts {
      let now = Utc::now();
      let draft = NewShipment {
        order_id:           input.order_id,
        tracking_number:    self.tracking.generate(now),
        recipient:          recipient.clone(),
        weight_kg:          input.weight_kg,
        current_location:   Some(DEFAULT_LOCATION.to_owned()),
        estimated_delivery: Some(now + Duration::days(DELIVERY_LEAD_DAYS)),
        notes:              notes.clone(),
      };
      let initial = NewHistoryEntry {
        status:   ShipmentStatus::Pending,
        location: Some(DEFAULT_LOCATION.to_owned()),
        notes:    Some("Shipment created".to_owned()),
      };

      match self.store.create(draft, initial).await {
        Ok(shipment) => {
          info!(
            shipment_id = shipment.id,
            order_id = shipment.order_id,
            tracking_number = %shipment.tracking_number,
            "shipment created"
          );
          return Ok(shipment);
        }
        Err(e) if e.is_unique_violation() => {
          warn!(
            order_id = input.order_id,
            attempt, "tracking number collision, regenerating"
          );
        }
        Err(e) => return Err(Error::store(e)),
      }
    }

    Err(Error::TrackingNumberExhausted(attempts))
  }

  /// Move a shipment to `status`. A non-blank `location` becomes the current
  /// location; otherwise the previous one is kept.
  pub async fn update_status(
    &self,
    id: i64,
    status: ShipmentStatus,
    location: Option<String>,
    notes: Option<String>,
  ) -> Result<Shipment> {
    let transition = Transition {
      kind: TransitionKind::Update,
      status,
      location: non_blank(location),
      notes: non_blank(notes),
    };
    let shipment = self.apply(id, transition).await?;
    info!(shipment_id = id, status = %shipment.status, "shipment status updated");
    Ok(shipment)
  }

  /// Cancel a shipment. Delivered and already-cancelled shipments are
  /// rejected and left untouched.
  pub async fn cancel(&self, id: i64, reason: &str) -> Result<Shipment> {
    let transition = Transition {
      kind:     TransitionKind::Cancel,
      status:   ShipmentStatus::Cancelled,
      location: None,
      notes:    Some(format!("Cancelled: {}", reason.trim())),
    };
    let shipment = self.apply(id, transition).await?;
    info!(shipment_id = id, "shipment cancelled");
    Ok(shipment)
  }

  async fn apply(&self, id: i64, transition: Transition) -> Result<Shipment> {
    let outcome = self
      .store
      .apply_transition(id, transition, self.settings.transition_policy)
      .await
      .map_err(Error::store)?;

    match outcome {
      TransitionOutcome::Applied(shipment) => Ok(shipment),
      TransitionOutcome::NotFound => Err(Error::ShipmentNotFound(id)),
      TransitionOutcome::Rejected(rejection) => {
        info!(shipment_id = id, %rejection, "transition rejected");
        Err(Error::Rejected(rejection))
      }
    }
  }
}
