//! JSON API for Waybill.
//!
//! Exposes an axum [`Router`] backed by any
//! [`waybill_core::store::ShipmentStore`]. Every response body carries
//! `success` and `message` fields; failures also map to a matching HTTP
//! status. TLS and listener setup are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", waybill_api::api_router(state))
//! ```

pub mod envelope;
pub mod error;
pub mod shipments;
pub mod transitions;
pub mod updates;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use waybill_core::{
  lifecycle::{EngineSettings, LifecycleEngine},
  query::QueryService,
  store::ShipmentStore,
  stream::StreamSettings,
};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub engine:   LifecycleEngine<S>,
  pub queries:  QueryService<S>,
  pub store:    Arc<S>,
  pub stream:   StreamSettings,
  /// Parent of every update stream's cancellation token.
  pub shutdown: CancellationToken,
}

impl<S: ShipmentStore> AppState<S> {
  pub fn new(
    store: Arc<S>,
    engine: EngineSettings,
    stream: StreamSettings,
    shutdown: CancellationToken,
  ) -> Self {
    Self {
      engine: LifecycleEngine::new(store.clone(), engine),
      queries: QueryService::new(store.clone()),
      store,
      stream,
      shutdown,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: Arc<AppState<S>>) -> Router<()>
where
  S: ShipmentStore + 'static,
{
  Router::new()
    .route("/shipments", get(shipments::list::<S>).post(shipments::create::<S>))
    .route("/shipments/{id}", get(shipments::get_one::<S>))
    .route("/shipments/{id}/history", get(shipments::history::<S>))
    .route("/shipments/{id}/status", put(transitions::update::<S>))
    .route("/shipments/{id}/cancel", post(transitions::cancel::<S>))
    .route("/shipments/{id}/updates", get(updates::stream::<S>))
    .route("/shipments/order/{order_id}", get(shipments::by_order::<S>))
    .route(
      "/shipments/tracking/{tracking_number}",
      get(shipments::by_tracking::<S>),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
