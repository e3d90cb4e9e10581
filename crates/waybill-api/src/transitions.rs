//! Handlers that change a shipment's status.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/shipments/{id}/status` | Body: `{"status":"shipped","location":"Hub A","notes":null}` |
//! | `POST` | `/shipments/{id}/cancel` | Optional body: `{"reason":"changed mind"}`; 409 once delivered or cancelled |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{JsonRejection, PathRejection},
  },
};
use serde::Deserialize;
use waybill_core::{shipment::ShipmentStatus, store::ShipmentStore};

use crate::{AppState, envelope::ShipmentResponse, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status:   ShipmentStatus,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub notes:    Option<String>,
}

/// `PUT /shipments/{id}/status`
pub async fn update<S>(
  State(state): State<Arc<AppState<S>>>,
  id: Result<Path<i64>, PathRejection>,
  body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<ShipmentResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(id) = id?;
  let Json(body) = body?;
  let shipment = state
    .engine
    .update_status(id, body.status, body.location, body.notes)
    .await?;
  Ok(Json(ShipmentResponse::ok(
    shipment,
    "Shipment status updated successfully",
  )))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
  #[serde(default)]
  pub reason: String,
}

/// `POST /shipments/{id}/cancel`
///
/// A request without a `Content-Type` is treated as an empty reason.
pub async fn cancel<S>(
  State(state): State<Arc<AppState<S>>>,
  id: Result<Path<i64>, PathRejection>,
  body: Result<Option<Json<CancelBody>>, JsonRejection>,
) -> Result<Json<ShipmentResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(id) = id?;
  let body = body?.map(|Json(body)| body).unwrap_or_default();
  let shipment = state.engine.cancel(id, &body.reason).await?;
  Ok(Json(ShipmentResponse::ok(
    shipment,
    "Shipment cancelled successfully",
  )))
}
