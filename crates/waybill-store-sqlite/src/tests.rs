//! Integration tests for `SqliteStore` against an in-memory database.

use waybill_core::{
  shipment::{NewHistoryEntry, NewShipment, Recipient, ShipmentStatus},
  store::{ShipmentQuery, ShipmentStore, StoreError as _},
  transition::{
    Rejection, Transition, TransitionKind, TransitionOutcome, TransitionPolicy,
  },
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn draft(order_id: i64, tracking_number: &str) -> NewShipment {
  NewShipment {
    order_id,
    tracking_number: tracking_number.to_owned(),
    recipient: Recipient {
      name:        "Jane Doe".into(),
      address:     "1 Main St".into(),
      city:        "Springfield".into(),
      postal_code: "12345".into(),
      country:     "US".into(),
      phone:       Some("555-0100".into()),
    },
    weight_kg: 2.5,
    current_location: Some("Warehouse".into()),
    estimated_delivery: None,
    notes: Some("fragile".into()),
  }
}

fn created() -> NewHistoryEntry {
  NewHistoryEntry {
    status:   ShipmentStatus::Pending,
    location: Some("Warehouse".into()),
    notes:    Some("Shipment created".into()),
  }
}

fn update(status: ShipmentStatus, location: Option<&str>) -> Transition {
  Transition {
    kind: TransitionKind::Update,
    status,
    location: location.map(str::to_owned),
    notes: None,
  }
}

fn cancel(reason: &str) -> Transition {
  Transition {
    kind:     TransitionKind::Cancel,
    status:   ShipmentStatus::Cancelled,
    location: None,
    notes:    Some(format!("Cancelled: {reason}")),
  }
}

async fn apply(s: &SqliteStore, id: i64, t: Transition) -> TransitionOutcome {
  s.apply_transition(id, t, TransitionPolicy::Permissive)
    .await
    .unwrap()
}

// ─── Create & lookup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_stores_shipment_with_initial_entry() {
  let s = store().await;
  let shipment = s.create(draft(10, "SHP1"), created()).await.unwrap();

  assert_eq!(shipment.order_id, 10);
  assert_eq!(shipment.status, ShipmentStatus::Pending);
  assert_eq!(shipment.created_at, shipment.updated_at);
  assert_eq!(shipment.recipient.phone.as_deref(), Some("555-0100"));
  assert_eq!(shipment.history.len(), 1);

  let entry = &shipment.history[0];
  assert_eq!(entry.shipment_id, shipment.id);
  assert_eq!(entry.status, ShipmentStatus::Pending);
  assert_eq!(entry.notes.as_deref(), Some("Shipment created"));
  assert_eq!(entry.timestamp, shipment.created_at);
}

#[tokio::test]
async fn lookups_by_id_order_and_tracking_number() {
  let s = store().await;
  let shipment = s.create(draft(10, "SHP1"), created()).await.unwrap();

  let by_id = s.get_by_id(shipment.id).await.unwrap().unwrap();
  let by_order = s.get_by_order_id(10).await.unwrap().unwrap();
  let by_tracking = s.get_by_tracking_number("SHP1").await.unwrap().unwrap();
  assert_eq!(by_id, shipment);
  assert_eq!(by_order, shipment);
  assert_eq!(by_tracking, shipment);

  assert!(s.get_by_id(shipment.id + 1).await.unwrap().is_none());
  assert!(s.get_by_order_id(11).await.unwrap().is_none());
  assert!(s.get_by_tracking_number("SHP2").await.unwrap().is_none());
}

#[tokio::test]
async fn order_lookup_returns_newest_shipment() {
  let s = store().await;
  s.create(draft(10, "SHP1"), created()).await.unwrap();
  let second = s.create(draft(10, "SHP2"), created()).await.unwrap();

  let found = s.get_by_order_id(10).await.unwrap().unwrap();
  assert_eq!(found.id, second.id);
}

#[tokio::test]
async fn duplicate_tracking_number_is_a_unique_violation() {
  let s = store().await;
  s.create(draft(10, "SHP1"), created()).await.unwrap();

  let err = s.create(draft(11, "SHP1"), created()).await.unwrap_err();
  assert!(err.is_unique_violation());
  assert!(!err.is_transient());

  // The failed insert left nothing behind.
  assert_eq!(s.count(None).await.unwrap(), 1);
  assert!(s.get_by_order_id(11).await.unwrap().is_none());
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn transition_updates_row_and_appends_history() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;

  let TransitionOutcome::Applied(shipped) =
    apply(&s, id, update(ShipmentStatus::Shipped, Some("Hub A"))).await
  else {
    panic!("expected transition to apply");
  };
  assert_eq!(shipped.status, ShipmentStatus::Shipped);
  assert_eq!(shipped.current_location.as_deref(), Some("Hub A"));
  assert!(shipped.updated_at >= shipped.created_at);
  assert_eq!(shipped.history.len(), 2);

  let latest = shipped.latest_entry().unwrap();
  assert_eq!(latest.status, ShipmentStatus::Shipped);
  assert_eq!(latest.location.as_deref(), Some("Hub A"));
  assert_eq!(latest.timestamp, shipped.updated_at);
}

#[tokio::test]
async fn transition_without_location_keeps_current_one() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;
  apply(&s, id, update(ShipmentStatus::Shipped, Some("Hub A"))).await;

  let TransitionOutcome::Applied(shipment) =
    apply(&s, id, update(ShipmentStatus::InTransit, None)).await
  else {
    panic!("expected transition to apply");
  };
  assert_eq!(shipment.current_location.as_deref(), Some("Hub A"));
  assert_eq!(
    shipment.latest_entry().unwrap().location.as_deref(),
    Some("Hub A")
  );
}

#[tokio::test]
async fn rejected_transition_writes_nothing() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;
  apply(&s, id, update(ShipmentStatus::Delivered, None)).await;
  let before = s.get_by_id(id).await.unwrap().unwrap();

  let outcome = apply(&s, id, cancel("too late")).await;
  assert!(matches!(
    outcome,
    TransitionOutcome::Rejected(Rejection::CancelDelivered)
  ));

  let after = s.get_by_id(id).await.unwrap().unwrap();
  assert_eq!(before, after);
  assert_eq!(after.history.len(), 2);
}

#[tokio::test]
async fn strict_policy_is_checked_inside_the_store() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;

  let outcome = s
    .apply_transition(
      id,
      update(ShipmentStatus::Delivered, None),
      TransitionPolicy::Strict,
    )
    .await
    .unwrap();
  assert!(matches!(
    outcome,
    TransitionOutcome::Rejected(Rejection::InvalidTransition { .. })
  ));
  assert_eq!(
    s.get_by_id(id).await.unwrap().unwrap().status,
    ShipmentStatus::Pending
  );
}

#[tokio::test]
async fn transition_on_missing_shipment_is_not_found() {
  let s = store().await;
  let outcome = apply(&s, 99, update(ShipmentStatus::Shipped, None)).await;
  assert!(matches!(outcome, TransitionOutcome::NotFound));
}

#[tokio::test]
async fn status_always_matches_newest_history_entry() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;

  for status in [
    ShipmentStatus::Processing,
    ShipmentStatus::Shipped,
    ShipmentStatus::InTransit,
    ShipmentStatus::InTransit,
    ShipmentStatus::OutForDelivery,
  ] {
    apply(&s, id, update(status, None)).await;
    let shipment = s.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(shipment.latest_entry().unwrap().status, shipment.status);
  }

  let history = s.history(id).await.unwrap().unwrap();
  assert_eq!(history.len(), 6);
  assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_is_newest_first_and_paginated() {
  let s = store().await;
  for i in 1..=5 {
    s.create(draft(i, &format!("SHP{i}")), created()).await.unwrap();
  }

  let first = s
    .list(&ShipmentQuery { status: None, offset: 0, limit: 2 })
    .await
    .unwrap();
  let order_ids: Vec<_> = first.iter().map(|s| s.order_id).collect();
  assert_eq!(order_ids, vec![5, 4]);
  assert_eq!(first[0].history.len(), 1);

  let last = s
    .list(&ShipmentQuery { status: None, offset: 4, limit: 2 })
    .await
    .unwrap();
  assert_eq!(last.len(), 1);
  assert_eq!(last[0].order_id, 1);

  let past_end = s
    .list(&ShipmentQuery { status: None, offset: 10, limit: 2 })
    .await
    .unwrap();
  assert!(past_end.is_empty());
}

#[tokio::test]
async fn list_and_count_filter_by_status() {
  let s = store().await;
  for i in 1..=4 {
    let id = s
      .create(draft(i, &format!("SHP{i}")), created())
      .await
      .unwrap()
      .id;
    if i % 2 == 0 {
      apply(&s, id, update(ShipmentStatus::Shipped, None)).await;
    }
  }

  let shipped = s
    .list(&ShipmentQuery {
      status: Some(ShipmentStatus::Shipped),
      offset: 0,
      limit:  10,
    })
    .await
    .unwrap();
  assert_eq!(shipped.len(), 2);
  assert!(shipped.iter().all(|s| s.status == ShipmentStatus::Shipped));

  assert_eq!(s.count(None).await.unwrap(), 4);
  assert_eq!(s.count(Some(ShipmentStatus::Shipped)).await.unwrap(), 2);
  assert_eq!(s.count(Some(ShipmentStatus::Delivered)).await.unwrap(), 0);
}

// ─── History, snapshot, delete ───────────────────────────────────────────────

#[tokio::test]
async fn history_of_missing_shipment_is_none() {
  let s = store().await;
  assert!(s.history(1).await.unwrap().is_none());
}

#[tokio::test]
async fn current_status_reports_shipment_notes() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;

  let snap = s.current_status(id).await.unwrap().unwrap();
  assert_eq!(snap.status, ShipmentStatus::Pending);
  assert_eq!(snap.notes.as_deref(), Some("fragile"));

  apply(&s, id, update(ShipmentStatus::Shipped, None)).await;
  apply(&s, id, cancel("customer request")).await;
  let snap = s.current_status(id).await.unwrap().unwrap();
  assert_eq!(snap.shipment_id, id);
  assert_eq!(snap.status, ShipmentStatus::Cancelled);
  assert_eq!(snap.location.as_deref(), Some("Warehouse"));
  assert_eq!(snap.notes.as_deref(), Some("fragile"));

  assert!(s.current_status(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn cancel_entry_records_no_location() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;
  apply(&s, id, update(ShipmentStatus::Shipped, Some("Hub A"))).await;

  let TransitionOutcome::Applied(cancelled) =
    apply(&s, id, cancel("customer request")).await
  else {
    panic!("cancel was not applied");
  };
  assert_eq!(cancelled.current_location.as_deref(), Some("Hub A"));
  assert_eq!(cancelled.history[0].status, ShipmentStatus::Cancelled);
  assert_eq!(cancelled.history[0].location, None);
  assert_eq!(
    cancelled.history[0].notes.as_deref(),
    Some("Cancelled: customer request")
  );
  assert_eq!(cancelled.history[1].location.as_deref(), Some("Hub A"));
}

#[tokio::test]
async fn delete_removes_shipment_and_history() {
  let s = store().await;
  let id = s.create(draft(10, "SHP1"), created()).await.unwrap().id;
  apply(&s, id, update(ShipmentStatus::Shipped, None)).await;

  assert_eq!(s.history_row_count(id).await, 2);

  assert!(s.delete(id).await.unwrap());
  assert!(!s.delete(id).await.unwrap());
  assert_eq!(s.history_row_count(id).await, 0);
  assert!(s.get_by_id(id).await.unwrap().is_none());
  assert!(s.history(id).await.unwrap().is_none());

  // The tracking number is free again once its shipment is gone.
  s.create(draft(11, "SHP1"), created()).await.unwrap();
}
