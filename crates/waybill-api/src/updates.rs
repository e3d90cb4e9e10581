//! `GET /shipments/{id}/updates`: live status changes as Server-Sent Events.
//!
//! Each status change arrives as a `shipment_update` event whose data is a
//! JSON [`ShipmentUpdate`](waybill_core::stream::ShipmentUpdate). The event
//! stream ends once a terminal status has been sent or the shipment
//! disappears. Closing the connection stops the poll loop behind it, as does
//! server shutdown.

use std::sync::Arc;

use axum::{
  extract::{Path, State, rejection::PathRejection},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tracing::info_span;
use uuid::Uuid;
use waybill_core::{
  Error,
  store::ShipmentStore,
  stream::UpdateStream,
};

use crate::{AppState, error::ApiError};

pub const EVENT_NAME: &str = "shipment_update";

/// `GET /shipments/{id}/updates`
pub async fn stream<S>(
  State(state): State<Arc<AppState<S>>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: ShipmentStore + 'static,
{
  let Path(id) = id?;

  // Unknown ids get a 404 rather than an empty event stream.
  state
    .store
    .current_status(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ShipmentNotFound(id))?;

  let stream_id = Uuid::new_v4();
  let cancel = state.shutdown.child_token();
  let controller = UpdateStream::new(state.store.clone(), id, state.stream);
  let (rx, _handle) = info_span!("update_stream", %stream_id, shipment_id = id)
    .in_scope(|| controller.spawn(cancel.clone()));

  // The guard lives as long as the response body; dropping it on disconnect
  // cancels the loop.
  let events = stream::unfold(
    (rx, cancel.drop_guard()),
    |(mut rx, guard)| async move {
      let update = rx.recv().await?;
      let event = Event::default().event(EVENT_NAME).json_data(&update);
      Some((event, (rx, guard)))
    },
  );

  Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
