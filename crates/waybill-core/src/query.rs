//! [`QueryService`]: read-only access to shipments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  Error, Result,
  shipment::{Shipment, ShipmentHistory, ShipmentStatus},
  store::{ShipmentQuery, ShipmentStore},
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One window of [`QueryService::list`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentPage {
  pub items:       Vec<Shipment>,
  /// Matching rows across all pages.
  pub total_count: u64,
  /// Zero-based.
  pub page:        u32,
  pub page_size:   u32,
}

pub struct QueryService<S> {
  store: Arc<S>,
}

impl<S: ShipmentStore> QueryService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn get_by_id(&self, id: i64) -> Result<Shipment> {
    debug!(shipment_id = id, "get shipment");
    self
      .store
      .get_by_id(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ShipmentNotFound(id))
  }

  pub async fn get_by_order_id(&self, order_id: i64) -> Result<Shipment> {
    debug!(order_id, "get shipment by order");
    self
      .store
      .get_by_order_id(order_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::OrderNotFound(order_id))
  }

  pub async fn get_by_tracking_number(
    &self,
    tracking_number: &str,
  ) -> Result<Shipment> {
    debug!(tracking_number, "get shipment by tracking number");
    self
      .store
      .get_by_tracking_number(tracking_number)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::TrackingNumberNotFound(tracking_number.to_owned()))
  }

  /// Page `page` (zero-based) of shipments, newest first. `page_size` is
  /// clamped to `1..=MAX_PAGE_SIZE`.
  ///
  /// The page and the count are read separately, so a concurrent write may
  /// make them disagree.
  pub async fn list(
    &self,
    page: u32,
    page_size: u32,
    status: Option<ShipmentStatus>,
  ) -> Result<ShipmentPage> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let query = ShipmentQuery {
      status,
      offset: u64::from(page) * u64::from(page_size),
      limit: u64::from(page_size),
    };
    debug!(page, page_size, ?status, "list shipments");

    let items = self.store.list(&query).await.map_err(Error::store)?;
    let total_count = self.count(status).await?;
    Ok(ShipmentPage { items, total_count, page, page_size })
  }

  pub async fn count(&self, status: Option<ShipmentStatus>) -> Result<u64> {
    self.store.count(status).await.map_err(Error::store)
  }

  /// History newest first.
  pub async fn history(&self, id: i64) -> Result<Vec<ShipmentHistory>> {
    debug!(shipment_id = id, "get history");
    self
      .store
      .history(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ShipmentNotFound(id))
  }
}
