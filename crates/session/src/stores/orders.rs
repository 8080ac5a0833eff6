//! The signed-in user's orders and their delivery countdowns.

use std::sync::Arc;

use delivecrous_core::{CommerceError, Order, OrderId, UserId};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::storage::{KeyValueStore, Loaded, Persistence, keys};

/// Order tracker bound to at most one user.
///
/// Orders are persisted when added or removed, when flushed, and whenever a
/// countdown delivers one. Every load, tick, and write first catches the
/// countdowns up to the clock, so skipped ticks never leave stale time in
/// storage.
pub struct OrderTracker<S> {
    persistence: Persistence<S>,
    clock: Arc<dyn Clock>,
    user: Option<UserId>,
    orders: Vec<Order>,
    keep_stored: bool,
}

impl<S: KeyValueStore> OrderTracker<S> {
    #[must_use]
    pub fn new(persistence: Persistence<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            persistence,
            clock,
            user: None,
            orders: Vec::new(),
            keep_stored: false,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }

    /// Orders whose countdown is still running.
    pub fn in_progress(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|order| !order.is_delivered())
    }

    /// Rebind to `next`, saving the outgoing orders first.
    ///
    /// Loaded orders are caught up to the clock, so countdowns keep running
    /// while nobody is signed in.
    #[instrument(skip(self), fields(from = ?self.user))]
    pub async fn switch_user(&mut self, next: Option<UserId>) {
        if self.user == next {
            return;
        }
        self.flush().await;

        let loaded = match &next {
            Some(user) => {
                self.persistence
                    .load_json_checked::<Vec<Order>>(&keys::orders(user))
                    .await
            }
            None => Loaded::Missing,
        };
        self.keep_stored = loaded.is_undecodable();
        self.orders = loaded.into_value().unwrap_or_default();
        self.user = next;

        let delivered = self.catch_up();
        debug!(count = self.orders.len(), delivered, "Loaded orders");
        if delivered > 0 {
            self.flush().await;
        }
    }

    /// Bring every countdown in line with the clock. Returns how many orders
    /// were delivered by it.
    fn catch_up(&mut self) -> usize {
        let now = self.clock.now_secs();
        self.orders
            .iter_mut()
            .map(|order| order.catch_up(now))
            .filter(|delivered| *delivered)
            .count()
    }

    /// Write the orders under the bound user's key.
    pub async fn flush(&mut self) {
        let Some(user) = self.user.clone() else {
            return;
        };
        let delivered = self.catch_up();
        if delivered > 0 {
            info!(delivered, "Orders delivered while not ticking");
        }
        if self.keep_stored {
            debug!(%user, "Leaving undecodable stored orders in place");
            return;
        }
        self.persistence
            .save_json(&keys::orders(&user), &self.orders)
            .await;
    }

    pub fn discard(&mut self) {
        self.user = None;
        self.orders.clear();
        self.keep_stored = false;
    }

    /// Append `order` and persist.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a user; nothing is recorded.
    #[instrument(skip(self, order), fields(user = ?self.user, order_id = %order.id))]
    pub async fn add(&mut self, order: Order) -> Result<(), CommerceError> {
        if self.user.is_none() {
            warn!("Dropping order tracked without a signed-in user");
            return Err(CommerceError::Unauthenticated);
        }
        self.push(order);
        self.flush().await;
        Ok(())
    }

    /// Remove the order with `id`. Returns whether one was removed.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn remove(&mut self, id: OrderId) -> bool {
        let before = self.orders.len();
        self.orders.retain(|order| order.id != id);
        let removed = self.orders.len() != before;
        if removed {
            debug!(order_id = %id, "Removed order");
            self.keep_stored = false;
            self.flush().await;
        }
        removed
    }

    /// Advance every running countdown by one second, or further when the
    /// clock shows that ticks were missed.
    ///
    /// Returns how many orders this tick delivered; any delivery is persisted.
    pub async fn tick(&mut self) -> usize {
        let now = self.clock.now_secs();
        let mut delivered = 0;
        for order in &mut self.orders {
            if order.advance(now) {
                info!(order_id = %order.id, "Order delivered");
                delivered += 1;
            }
        }
        if delivered > 0 {
            self.flush().await;
        }
        delivered
    }

    /// Append without persisting. The caller has checked that a user is
    /// bound. Persist with [`flush`](Self::flush).
    pub(crate) fn push(&mut self, order: Order) {
        self.orders.push(order);
        self.keep_stored = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delivecrous_core::{CartLine, ItemId, Money, OrderStatus};

    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    const START: i64 = 1_700_000_000;

    fn order(id: i64, countdown: u32) -> Order {
        let line = CartLine {
            item_id: ItemId::new("1"),
            name: "Menu".to_owned(),
            unit_price: Money::from_euros(10),
            quantity: 2,
            image: String::new(),
        };
        Order::place(OrderId::new(id), UserId::from("u"), vec![line], START, countdown)
    }

    fn tracker(store: &Arc<MemoryStore>, clock: &ManualClock) -> OrderTracker<MemoryStore> {
        OrderTracker::new(Persistence::new(Arc::clone(store)), Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_add_requires_user() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);

        assert_eq!(orders.add(order(1, 180)).await, Err(CommerceError::Unauthenticated));
        assert!(orders.orders().is_empty());
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_countdown_delivers_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);
        orders.switch_user(Some(UserId::from("u"))).await;
        orders.add(order(1, 3)).await.unwrap();

        assert_eq!(orders.tick().await, 0);
        assert_eq!(orders.tick().await, 0);
        assert_eq!(orders.tick().await, 1);
        assert_eq!(orders.tick().await, 0);

        let stored: Vec<Order> =
            serde_json::from_str(&store.get("orders_u").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored[0].status, OrderStatus::Delivered);
        assert_eq!(orders.in_progress().count(), 0);
    }

    #[tokio::test]
    async fn test_load_catches_up_with_wall_clock() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);
        let user = UserId::from("u");
        orders.switch_user(Some(user.clone())).await;
        orders.add(order(1, 180)).await.unwrap();
        orders.add(order(2, 60)).await.unwrap();

        orders.switch_user(None).await;
        clock.advance_secs(100);
        orders.switch_user(Some(user)).await;

        let first = orders.get(OrderId::new(1)).unwrap();
        assert_eq!(first.remaining_time, 80);
        assert_eq!(first.status, OrderStatus::InProgress);
        let second = orders.get(OrderId::new(2)).unwrap();
        assert_eq!(second.remaining_time, 0);
        assert_eq!(second.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_ticked_orders_are_not_double_counted() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);
        let user = UserId::from("u");
        orders.switch_user(Some(user.clone())).await;
        orders.add(order(1, 180)).await.unwrap();

        for _ in 0..30 {
            clock.advance_secs(1);
            orders.tick().await;
        }
        orders.switch_user(None).await;
        clock.advance_secs(10);
        orders.switch_user(Some(user)).await;

        assert_eq!(orders.orders()[0].remaining_time, 140);
    }

    #[tokio::test]
    async fn test_flush_catches_up_untracked_time() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);
        let user = UserId::from("u");
        orders.switch_user(Some(user.clone())).await;
        orders.add(order(1, 180)).await.unwrap();

        clock.advance_secs(100);
        orders.add(order(2, 180)).await.unwrap();

        let stored: Vec<Order> =
            serde_json::from_str(&store.get("orders_u").await.unwrap().unwrap()).unwrap();
        assert_eq!(stored[0].remaining_time, 80);

        orders.switch_user(None).await;
        orders.switch_user(Some(user)).await;
        assert_eq!(orders.get(OrderId::new(1)).unwrap().remaining_time, 80);
    }

    #[tokio::test]
    async fn test_undecodable_orders_are_not_overwritten() {
        let store = Arc::new(MemoryStore::with_entries([("orders_u", "[{]")]));
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);
        orders.switch_user(Some(UserId::from("u"))).await;
        assert!(orders.orders().is_empty());

        orders.tick().await;
        orders.switch_user(None).await;
        assert_eq!(store.get("orders_u").await.unwrap().as_deref(), Some("[{]"));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at_secs(START);
        let mut orders = tracker(&store, &clock);
        orders.switch_user(Some(UserId::from("u"))).await;
        orders.add(order(1, 180)).await.unwrap();

        assert!(orders.remove(OrderId::new(1)).await);
        assert!(!orders.remove(OrderId::new(1)).await);
        assert_eq!(store.get("orders_u").await.unwrap().as_deref(), Some("[]"));
    }
}
