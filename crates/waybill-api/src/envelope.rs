//! Response bodies. Each carries `success` and `message` alongside its
//! payload so callers can branch on one field.

use serde::{Deserialize, Serialize};
use waybill_core::{
  query::ShipmentPage,
  shipment::{Shipment, ShipmentHistory},
};

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
  pub success: bool,
  pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResponse {
  pub success:  bool,
  pub message:  String,
  pub shipment: Shipment,
}

impl ShipmentResponse {
  pub fn ok(shipment: Shipment, message: impl Into<String>) -> Self {
    Self { success: true, message: message.into(), shipment }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentListResponse {
  pub success:     bool,
  pub message:     String,
  pub items:       Vec<Shipment>,
  pub total_count: u64,
  pub page:        u32,
  pub page_size:   u32,
}

impl From<ShipmentPage> for ShipmentListResponse {
  fn from(page: ShipmentPage) -> Self {
    Self {
      success:     true,
      message:     String::new(),
      items:       page.items,
      total_count: page.total_count,
      page:        page.page,
      page_size:   page.page_size,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
  pub success:     bool,
  pub message:     String,
  pub shipment_id: i64,
  /// Newest first.
  pub history:     Vec<ShipmentHistory>,
}
