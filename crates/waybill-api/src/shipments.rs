//! Handlers for creating and reading shipments.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/shipments` | Body: order id, recipient, weight, notes. 201 |
//! | `GET`  | `/shipments` | `?page=&page_size=&status=`; page is zero-based |
//! | `GET`  | `/shipments/{id}` | 404 if not found |
//! | `GET`  | `/shipments/order/{order_id}` | Newest shipment for the order |
//! | `GET`  | `/shipments/tracking/{tracking_number}` | |
//! | `GET`  | `/shipments/{id}/history` | Newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
};
use serde::Deserialize;
use waybill_core::{
  lifecycle::CreateShipment,
  query::DEFAULT_PAGE_SIZE,
  shipment::{Recipient, ShipmentStatus},
  store::ShipmentStore,
};

use crate::{
  AppState,
  envelope::{HistoryResponse, ShipmentListResponse, ShipmentResponse},
  error::ApiError,
};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub order_id:  i64,
  pub recipient: Recipient,
  pub weight_kg: f64,
  #[serde(default)]
  pub notes:     Option<String>,
}

/// `POST /shipments`
pub async fn create<S>(
  State(state): State<Arc<AppState<S>>>,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ShipmentResponse>), ApiError>
where
  S: ShipmentStore + 'static,
{
  let Json(body) = body?;
  let shipment = state
    .engine
    .create(CreateShipment {
      order_id:  body.order_id,
      recipient: body.recipient,
      weight_kg: body.weight_kg,
      notes:     body.notes,
    })
    .await?;
  Ok((
    StatusCode::CREATED,
    Json(ShipmentResponse::ok(shipment, "Shipment created successfully")),
  ))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub page:      u32,
  pub page_size: Option<u32>,
  pub status:    Option<ShipmentStatus>,
}

/// `GET /shipments[?page=&page_size=&status=]`
pub async fn list<S>(
  State(state): State<Arc<AppState<S>>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ShipmentListResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Query(params) = params?;
  let page = state
    .queries
    .list(
      params.page,
      params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
      params.status,
    )
    .await?;
  Ok(Json(page.into()))
}

// ─── Lookups ──────────────────────────────────────────────────────────────────

/// `GET /shipments/{id}`
pub async fn get_one<S>(
  State(state): State<Arc<AppState<S>>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ShipmentResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(id) = id?;
  let shipment = state.queries.get_by_id(id).await?;
  Ok(Json(ShipmentResponse::ok(shipment, "")))
}

/// `GET /shipments/order/{order_id}`
pub async fn by_order<S>(
  State(state): State<Arc<AppState<S>>>,
  order_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ShipmentResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(order_id) = order_id?;
  let shipment = state.queries.get_by_order_id(order_id).await?;
  Ok(Json(ShipmentResponse::ok(shipment, "")))
}

/// `GET /shipments/tracking/{tracking_number}`
pub async fn by_tracking<S>(
  State(state): State<Arc<AppState<S>>>,
  tracking_number: Result<Path<String>, PathRejection>,
) -> Result<Json<ShipmentResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(tracking_number) = tracking_number?;
  let shipment = state
    .queries
    .get_by_tracking_number(&tracking_number)
    .await?;
  Ok(Json(ShipmentResponse::ok(shipment, "")))
}

/// `GET /shipments/{id}/history`
pub async fn history<S>(
  State(state): State<Arc<AppState<S>>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<HistoryResponse>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(id) = id?;
  let history = state.queries.history(id).await?;
  Ok(Json(HistoryResponse {
    success: true,
    message: String::new(),
    shipment_id: id,
    history,
  }))
}
