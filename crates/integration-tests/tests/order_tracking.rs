//! Integration tests for order countdowns and the ETA timer.

use delivecrous_core::{CartLine, ItemId, Money, OrderStatus, Tick};
use delivecrous_integration_tests::{TestContext, item};

fn snapshot() -> Vec<CartLine> {
    vec![CartLine {
        item_id: ItemId::new("1"),
        name: "Test Item".to_owned(),
        unit_price: Money::from_euros(10),
        quantity: 2,
        image: "test.jpg".to_owned(),
    }]
}

#[tokio::test]
async fn test_added_order_counts_down_to_delivered() {
    let mut ctx = TestContext::signed_in("user123").await;

    let order = ctx.session.add_order(snapshot()).await.unwrap();
    assert_eq!(order.total, Money::from_euros(20));
    assert_eq!(order.status, OrderStatus::InProgress);
    assert_eq!(order.remaining_time, 180);
    assert_eq!(order.start_time, delivecrous_integration_tests::START);

    for _ in 0..180 {
        ctx.clock.advance_secs(1);
        ctx.session.tick().await;
    }
    let tracked = &ctx.session.orders()[0];
    assert_eq!(tracked.remaining_time, 0);
    assert_eq!(tracked.status, OrderStatus::Delivered);

    let stored: serde_json::Value =
        serde_json::from_str(&ctx.stored("orders_user123").await.unwrap()).unwrap();
    assert_eq!(stored[0]["status"], "delivered");

    ctx.session.tick().await;
    assert_eq!(ctx.session.orders()[0].status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_add_order_leaves_cart_and_balance_alone() {
    let mut ctx = TestContext::signed_in("u").await;
    ctx.session.add_to_cart(&item(1, 10)).await.unwrap();

    ctx.session.add_order(snapshot()).await.unwrap();
    assert_eq!(ctx.session.total_quantity(), 1);
    assert_eq!(ctx.session.balance(), Money::from_euros(50));
}

#[tokio::test]
async fn test_countdown_catches_up_after_restart() {
    let mut ctx = TestContext::signed_in("u").await;
    let short = ctx.session.add_order(snapshot()).await.unwrap();

    ctx.clock.advance_secs(60);
    ctx.restart().await;
    let order = ctx.session.orders().iter().find(|o| o.id == short.id).unwrap();
    assert_eq!(order.remaining_time, 120);
    assert_eq!(order.status, OrderStatus::InProgress);

    ctx.clock.advance_secs(600);
    ctx.restart().await;
    assert_eq!(ctx.session.orders()[0].status, OrderStatus::Delivered);
    assert_eq!(ctx.session.orders()[0].remaining_time, 0);
}

#[tokio::test]
async fn test_later_order_does_not_reset_earlier_countdown() {
    let mut ctx = TestContext::signed_in("u").await;
    let first = ctx.session.add_order(snapshot()).await.unwrap();

    // No ticker runs; only the clock moves.
    ctx.clock.advance_secs(100);
    let second = ctx.session.add_order(snapshot()).await.unwrap();

    ctx.restart().await;
    let orders = ctx.session.orders();
    let first = orders.iter().find(|o| o.id == first.id).unwrap();
    let second = orders.iter().find(|o| o.id == second.id).unwrap();
    assert_eq!(first.remaining_time, 80);
    assert_eq!(second.remaining_time, 180);
}

#[tokio::test]
async fn test_skipped_ticks_are_caught_up_on_the_next_tick() {
    let mut ctx = TestContext::signed_in("u").await;
    ctx.session.add_order(snapshot()).await.unwrap();

    ctx.session.tick().await;
    assert_eq!(ctx.session.orders()[0].remaining_time, 179);

    ctx.clock.advance_secs(90);
    ctx.session.tick().await;
    assert_eq!(ctx.session.orders()[0].remaining_time, 90);

    ctx.session.flush().await;
    let stored: serde_json::Value =
        serde_json::from_str(&ctx.stored("orders_u").await.unwrap()).unwrap();
    assert_eq!(stored[0]["remainingTime"], 90);
    assert_eq!(stored[0]["duration"], 180);
}

#[tokio::test]
async fn test_order_ids_are_unique() {
    let mut ctx = TestContext::signed_in("u").await;
    let a = ctx.session.add_order(snapshot()).await.unwrap();
    let b = ctx.session.add_order(snapshot()).await.unwrap();
    assert!(b.id > a.id);

    ctx.restart().await;
    let c = ctx.session.add_order(snapshot()).await.unwrap();
    assert!(c.id > b.id);
}

#[tokio::test]
async fn test_remove_order() {
    let mut ctx = TestContext::signed_in("u").await;
    let order = ctx.session.add_order(snapshot()).await.unwrap();

    assert!(ctx.session.remove_order(order.id).await);
    assert!(!ctx.session.remove_order(order.id).await);
    assert!(ctx.session.orders().is_empty());
    assert_eq!(ctx.stored("orders_u").await.as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_placing_an_order_starts_the_eta_timer() {
    let mut ctx = TestContext::signed_in("u").await;
    assert!(!ctx.session.timer().order_in_progress());

    ctx.session.add_to_cart(&item(1, 10)).await.unwrap();
    ctx.session.process_order(None).await.unwrap();
    assert!(ctx.session.timer().order_in_progress());
    assert_eq!(ctx.session.timer().remaining_time(), 600);

    ctx.session.tick().await;
    assert_eq!(ctx.session.timer().eta(), "9 min 59 s");

    ctx.session.timer_mut().set_remaining_time(1);
    assert_eq!(ctx.session.timer_mut().tick(), Tick::Finished);
    assert!(!ctx.session.timer().order_in_progress());
}
