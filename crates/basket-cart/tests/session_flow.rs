//! End-to-end login, merge and logout flows against an in-process server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use basket_cart::{
    AuthEvent, CartConfig, CartEventEmitter, CartManager, CartState, ClientCartManager,
    ServerCartManager, SettleMode, SettleStrategy,
};
use basket_core::{
    AmountSource, CartQuery, CollectionKind, Money, NewCartItem, Relation, StaticProvider,
};
use basket_store::{
    CartCollection, LocalCollection, RemoteConnector, StoreError, StoreResult, Subscription,
};

// =============================================================================
// Helpers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Recorded {
    Active(CollectionKind),
    Merged(String, usize),
    Error(String),
}

#[derive(Default)]
struct RecordingEmitter {
    events: Mutex<Vec<Recorded>>,
}

impl RecordingEmitter {
    fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    fn switches(&self) -> Vec<CollectionKind> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Active(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }
}

impl CartEventEmitter for RecordingEmitter {
    fn emit_active_changed(&self, kind: CollectionKind) {
        self.events.lock().unwrap().push(Recorded::Active(kind));
    }

    fn emit_merged(&self, owner_id: &str, count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Merged(owner_id.to_string(), count));
    }

    fn emit_error(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Error(message.to_string()));
    }
}

/// Connector whose service is down.
struct UnavailableConnector;

impl RemoteConnector for UnavailableConnector {
    fn subscribe(&self, owner_id: &str) -> StoreResult<Subscription> {
        Err(StoreError::SubscriptionStopped {
            owner_id: owner_id.to_string(),
        })
    }
}

fn products(price_cents: i64) -> (String, Arc<dyn basket_core::ItemTypeProvider>) {
    (
        "product".to_string(),
        StaticProvider::new()
            .with("p1", AmountSource::fixed(Money::from_cents(price_cents)))
            .with("p2", AmountSource::fixed(Money::from_cents(price_cents)))
            .into_shared(),
    )
}

fn setup(settle: SettleStrategy) -> (ServerCartManager, Arc<ClientCartManager>, Arc<RecordingEmitter>) {
    let server = ServerCartManager::new();
    let emitter = Arc::new(RecordingEmitter::default());
    let client = ClientCartManager::builder(server.connector())
        .with_settle(settle)
        .with_emitter(emitter.clone())
        .build()
        .unwrap();
    (server, client, emitter)
}

fn login(client: &Arc<ClientCartManager>, owner_id: &str) {
    assert!(client.on_login(owner_id).unwrap());
    assert!(client.on_settled().unwrap());
}

// =============================================================================
// Cart Semantics
// =============================================================================

#[test]
fn test_repeated_add_merges_into_one_line() {
    let (_server, client, _) = setup(SettleStrategy::Readiness);
    client.configure([products(10)]);

    client.add(NewCartItem::new("product", "p1", 2)).unwrap();
    client.add(NewCartItem::new("product", "p1", 3)).unwrap();

    let items = client.items().fetch().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
    assert_eq!(client.amount().unwrap(), Money::from_cents(50));
}

#[test]
fn test_num_items_is_sum_of_quantities() {
    let (_server, client, _) = setup(SettleStrategy::Readiness);
    client.add(NewCartItem::new("product", "p1", 4)).unwrap();
    client.add(NewCartItem::new("product", "p2", 6)).unwrap();
    login(&client, "alice");
    client.add(NewCartItem::new("product", "p3", 1)).unwrap();

    let sum: i64 = client.items().iter().unwrap().map(|item| item.quantity).sum();
    assert_eq!(client.num_items().unwrap(), sum);
    assert_eq!(sum, 11);
}

#[test]
fn test_unconfigured_type_is_reported() {
    let (_server, client, _) = setup(SettleStrategy::Readiness);
    client.configure([products(10)]);
    client.add(NewCartItem::new("subscription", "monthly", 1)).unwrap();

    let err = client.amount().unwrap_err();
    assert!(err.is_misconfigured());
    assert!(err.to_string().contains("subscription"));
}

#[test]
fn test_item_doc_and_line_amount() {
    let (_server, client, _) = setup(SettleStrategy::Readiness);
    client.configure([products(125)]);
    let id = client.add(NewCartItem::new("product", "p2", 4)).unwrap();

    assert_eq!(client.line_amount(&id).unwrap(), Some(Money::from_cents(500)));
    let doc = client.item_doc(&Relation::new("product", "p2")).unwrap();
    assert_eq!(doc.resolve(), Money::from_cents(125));
    assert!(client.item_doc(&Relation::new("product", "zzz")).is_err());
}

#[test]
fn test_shared_ops_price_both_sides() {
    let server = ServerCartManager::new();
    let client = ClientCartManager::builder(server.connector())
        .with_ops(server.ops().clone())
        .build()
        .unwrap();
    server.configure([products(30)]);

    client.add(NewCartItem::new("product", "p1", 2)).unwrap();
    assert_eq!(client.amount().unwrap(), Money::from_cents(60));

    login(&client, "alice");
    assert_eq!(server.cart_for("alice").amount().unwrap(), Money::from_cents(60));
}

#[test]
fn test_oversized_amount_is_an_error() {
    let (_server, client, _) = setup(SettleStrategy::Readiness);
    client.configure([products(1000)]);
    client.add(NewCartItem::new("product", "p1", 10_i64.pow(16))).unwrap();

    let err = client.amount().unwrap_err();
    assert!(err.to_string().contains("overflowed"));
    assert_eq!(client.num_items().unwrap(), 10_i64.pow(16));
}

// =============================================================================
// Merge
// =============================================================================

#[test]
fn test_login_merges_local_into_remote() {
    let (server, client, emitter) = setup(SettleStrategy::Readiness);
    client.add(NewCartItem::new("product", "p1", 2)).unwrap();
    client.add(NewCartItem::new("product", "p2", 1)).unwrap();

    login(&client, "alice");

    assert!(client.local().is_empty());
    assert_eq!(client.active_kind(), CollectionKind::Remote);

    let remote = server.store().find_all(&CartQuery::owner("alice"));
    assert_eq!(remote.len(), 2);
    assert!(remote.iter().all(|item| item.owner_id.as_deref() == Some("alice")));

    let p1 = remote.iter().find(|item| item.relation_id == "p1").unwrap();
    assert_eq!(p1.quantity, 2);

    assert!(emitter
        .events()
        .contains(&Recorded::Merged("alice".to_string(), 2)));
}

#[test]
fn test_merge_does_not_dedupe() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    server
        .cart_for("alice")
        .add(NewCartItem::new("product", "p1", 1))
        .unwrap();

    client.add(NewCartItem::new("product", "p1", 2)).unwrap();
    login(&client, "alice");

    let p1 = server.store().find_all(
        &CartQuery::owner("alice").with_relation_id("p1"),
    );
    assert_eq!(p1.len(), 2);
}

#[test]
fn test_rerun_merge_duplicates() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    let remote = server.store().for_owner("alice");

    // Remote insert succeeded but the local delete was lost.
    client.add(NewCartItem::new("product", "p1", 3)).unwrap();
    assert_eq!(client.merge_carts(&remote).unwrap(), 1);
    client.add(NewCartItem::new("product", "p1", 3)).unwrap();
    assert_eq!(client.merge_carts(&remote).unwrap(), 1);

    let lines = remote.find(&CartQuery::all()).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|item| item.quantity == 3));
    assert!(client.local().is_empty());
}

#[test]
fn test_failed_subscribe_keeps_local_cart() {
    let emitter = Arc::new(RecordingEmitter::default());
    let client = ClientCartManager::builder(Arc::new(UnavailableConnector))
        .with_emitter(emitter.clone())
        .build()
        .unwrap();
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();

    client.handle_event(AuthEvent::LoggedIn {
        owner_id: "alice".into(),
    });
    client.handle_event(AuthEvent::Settled);

    assert_eq!(client.state(), CartState::Anonymous);
    assert_eq!(client.active_kind(), CollectionKind::Local);
    assert_eq!(client.local().len(), 1);
    assert!(matches!(emitter.events().as_slice(), [Recorded::Error(_)]));
}

// =============================================================================
// Switching
// =============================================================================

#[test]
fn test_switch_round_trip_fires_once_per_switch() {
    let (_server, client, emitter) = setup(SettleStrategy::Readiness);

    login(&client, "alice");
    assert!(client.on_logout());
    assert!(!client.on_logout());

    assert_eq!(client.active_kind(), CollectionKind::Local);
    assert_eq!(
        emitter.switches(),
        vec![CollectionKind::Remote, CollectionKind::Local]
    );
    assert_eq!(client.active_slot().state().switches, 2);
}

#[test]
fn test_logout_stops_remote_subscription() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    login(&client, "alice");
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();
    let remote = client.active_collection();

    client.on_logout();

    assert!(remote.find(&CartQuery::all()).is_err());
    assert_eq!(client.num_items().unwrap(), 0);
    assert_eq!(server.cart_for("alice").num_items().unwrap(), 1);
}

#[test]
fn test_remote_rejects_foreign_items() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    let bob_line = server
        .cart_for("bob")
        .add(NewCartItem::new("product", "p1", 1))
        .unwrap();
    login(&client, "alice");

    let err = client
        .active_collection()
        .remove(&CartQuery::id(&bob_line))
        .unwrap_err();
    assert!(err.is_access_error());
    assert_eq!(server.cart_for("bob").num_items().unwrap(), 1);
}

#[test]
fn test_server_empty_is_owner_scoped() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    server
        .cart_for("bob")
        .add(NewCartItem::new("product", "p2", 2))
        .unwrap();
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();
    login(&client, "alice");

    assert_eq!(server.empty("alice"), 1);
    assert_eq!(client.num_items().unwrap(), 0);
    assert_eq!(server.cart_for("bob").num_items().unwrap(), 2);
}

#[test]
fn test_client_empty_clears_active_only() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    login(&client, "alice");
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();
    client.add(NewCartItem::new("product", "p2", 1)).unwrap();
    server
        .cart_for("bob")
        .add(NewCartItem::new("product", "p1", 1))
        .unwrap();

    assert_eq!(client.empty().unwrap(), 2);
    assert_eq!(server.store().len(), 1);
}

// =============================================================================
// Settle Timing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_delay_settle_switches_after_delay() {
    let (_server, client, _) = setup(SettleStrategy::Delay(Duration::from_millis(300)));
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();

    client.on_login("alice").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.active_kind(), CollectionKind::Local);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        client.state(),
        CartState::Authenticated {
            owner_id: "alice".into()
        }
    );
    assert!(client.local().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logout_before_settle_cancels_switch() {
    let (server, client, emitter) = setup(SettleStrategy::Delay(Duration::from_millis(300)));
    client.add(NewCartItem::new("product", "p1", 2)).unwrap();

    client.on_login("alice").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!client.on_logout());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.state(), CartState::Anonymous);
    assert_eq!(client.active_kind(), CollectionKind::Local);
    assert_eq!(client.local().len(), 1);
    assert!(server.store().is_empty());
    assert!(emitter.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_newer_login_supersedes_pending_one() {
    let (_server, client, _) = setup(SettleStrategy::Delay(Duration::from_millis(300)));

    client.on_login("alice").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.on_login("bob").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(client.state(), CartState::PendingLogin { .. }));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.owner_id().as_deref(), Some("bob"));
    assert!(client.state().is_authenticated());
}

#[test]
fn test_readiness_waits_for_settled() {
    let (server, client, _) = setup(SettleStrategy::Readiness);
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();

    client.on_login("alice").unwrap();
    assert_eq!(client.active_kind(), CollectionKind::Local);
    assert!(server.store().is_empty());

    assert!(client.on_settled().unwrap());
    assert_eq!(client.active_kind(), CollectionKind::Remote);
    assert!(!client.on_settled().unwrap());
}

// =============================================================================
// Session Loop and Views
// =============================================================================

#[tokio::test]
async fn test_session_loop_applies_events() {
    let (_server, client, emitter) = setup(SettleStrategy::Readiness);
    client.add(NewCartItem::new("product", "p1", 1)).unwrap();
    let mut slot_rx = client.active_slot().watch();
    let session = client.spawn_session(4);

    session
        .send(AuthEvent::LoggedIn {
            owner_id: "alice".into(),
        })
        .await
        .unwrap();
    session.send(AuthEvent::Settled).await.unwrap();
    slot_rx.changed().await.unwrap();
    assert_eq!(slot_rx.borrow_and_update().kind, CollectionKind::Remote);

    session.send(AuthEvent::LoggedOut).await.unwrap();
    slot_rx.changed().await.unwrap();
    assert_eq!(slot_rx.borrow_and_update().kind, CollectionKind::Local);

    session.shutdown().await;
    assert_eq!(
        emitter.switches(),
        vec![CollectionKind::Remote, CollectionKind::Local]
    );
}

#[tokio::test]
async fn test_items_view_sees_login_switch() {
    let (_server, client, _) = setup(SettleStrategy::Readiness);
    client.add(NewCartItem::new("product", "p1", 2)).unwrap();
    let mut view = client.items();
    assert_eq!(view.count().unwrap(), 1);

    login(&client, "alice");
    view.changed().await;

    let items = view.fetch().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].owner_id.as_deref(), Some("alice"));
}

// =============================================================================
// Configuration and Persistence
// =============================================================================

#[test]
fn test_anonymous_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CartConfig::default();
    config.local.snapshot_path = Some(dir.path().join("local-cart.json"));
    let server = ServerCartManager::new();

    {
        let client = ClientCartManager::from_config(&config, server.connector()).unwrap();
        client.add(NewCartItem::new("product", "p1", 2)).unwrap();
    }

    let client = ClientCartManager::from_config(&config, server.connector()).unwrap();
    assert_eq!(client.num_items().unwrap(), 2);

    login(&client, "alice");
    let reopened = LocalCollection::open(config.local_snapshot().unwrap()).unwrap();
    assert!(reopened.is_empty());
}

#[test]
fn test_from_config_uses_settle_mode() {
    let mut config = CartConfig::ephemeral();
    config.session.settle = SettleMode::Delay;
    config.session.settle_delay_ms = 150;

    let client =
        ClientCartManager::from_config(&config, ServerCartManager::new().connector()).unwrap();
    assert_eq!(
        client.settle_strategy(),
        SettleStrategy::Delay(Duration::from_millis(150))
    );
}
