//! Integration tests for the session ticker and identity listener.
//!
//! Time is paused, so `tokio::time::sleep` advances the runtime clock
//! instantly and the ticker fires deterministically.

use std::sync::Arc;
use std::time::Duration;

use delivecrous_core::{CartLine, ItemId, Money, OrderStatus, UserId, UserRecord};
use delivecrous_integration_tests::{START, init_tracing, item};
use delivecrous_session::{
    Clock, IdentityProvider, KeyValueStore, ManualClock, MemoryStore, Session, SessionConfig,
    SessionHandle,
};

async fn spawn(store: &Arc<MemoryStore>, config: &SessionConfig) -> SessionHandle<MemoryStore> {
    init_tracing();
    let identity = IdentityProvider::load(Arc::clone(store)).await;
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_secs(START));
    let session = Session::open(identity, config, clock).await;
    SessionHandle::spawn(session, config)
}

fn line() -> CartLine {
    CartLine {
        item_id: ItemId::new("1"),
        name: "Menu".to_owned(),
        unit_price: Money::from_euros(8),
        quantity: 1,
        image: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_ticker_delivers_orders() {
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig {
        order_countdown_secs: 5,
        ..SessionConfig::default()
    };
    let handle = spawn(&store, &config).await;
    handle.identity().login(UserRecord::new("u")).await;
    handle.lock().await.add_order(vec![line()]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(handle.lock().await.orders()[0].remaining_time, 3);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let session = handle.lock().await;
    assert_eq!(session.orders()[0].status, OrderStatus::Delivered);
    drop(session);

    let stored = store.get("orders_u").await.unwrap().unwrap();
    assert!(stored.contains("delivered"));
}

#[tokio::test(start_paused = true)]
async fn test_listener_rebinds_on_login_and_logout() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn(&store, &SessionConfig::default()).await;

    handle.identity().login(UserRecord::new("u")).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    {
        let session = handle.lock().await;
        assert_eq!(session.current_user(), Some(&UserId::from("u")));
        assert_eq!(session.balance(), Money::from_euros(50));
    }
    assert_eq!(store.get("balance_u").await.unwrap().as_deref(), Some("50"));

    handle.lock().await.add_to_cart(&item(1, 10)).await.unwrap();
    handle.identity().logout().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(handle.lock().await.current_user(), None);
    assert!(store.get("cartItems_u").await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_poller_picks_up_external_writes() {
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig {
        identity_poll_interval: Some(Duration::from_secs(2)),
        ..SessionConfig::default()
    };
    let handle = spawn(&store, &config).await;

    store
        .set("user", r#"{"id":"polled"}"#.to_owned())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(
        handle.lock().await.current_user(),
        Some(&UserId::from("polled"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_ticking_and_flushes() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn(&store, &SessionConfig::default()).await;
    handle.identity().login(UserRecord::new("u")).await;
    handle.lock().await.add_order(vec![line()]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    handle.shutdown().await;
    let remaining = handle.lock().await.orders()[0].remaining_time;
    assert_eq!(remaining, 179);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.lock().await.orders()[0].remaining_time, remaining);
    assert!(store.get("orders_u").await.unwrap().unwrap().contains("179"));
}
