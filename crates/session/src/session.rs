//! The session orchestrator.
//!
//! [`Session`] is the whole surface the UI talks to. It owns one of each
//! store, follows the identity channel, and keeps every store bound to the
//! same user. Async operations first apply any identity change that is
//! waiting on the channel, so a call never runs against the previous user's
//! state.

use std::sync::Arc;

use delivecrous_core::{
    CartLine, CommerceError, ItemId, MenuItem, Money, Order, OrderId, OrderIdGenerator, Placement,
    UserId, UserRecord, checkout,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::identity::{IdentityProvider, IdentityTransition};
use crate::storage::{KeyValueStore, Persistence, keys};
use crate::stores::{BalanceLedger, CartStore, FavoritesStore, OrderTracker};
use crate::timer::OrderTimer;

/// Session-scoped commerce state for whoever is signed in.
pub struct Session<S> {
    identity: IdentityProvider<S>,
    identity_rx: watch::Receiver<Option<UserId>>,
    user: Option<UserId>,
    persistence: Persistence<S>,
    cart: CartStore<S>,
    balance: BalanceLedger<S>,
    favorites: FavoritesStore<S>,
    orders: OrderTracker<S>,
    timer: OrderTimer,
    clock: Arc<dyn Clock>,
    ids: OrderIdGenerator,
    order_countdown_secs: u32,
}

impl<S: KeyValueStore> Session<S> {
    /// Build a session on `identity`'s store and bind it to the current user.
    pub async fn open(
        identity: IdentityProvider<S>,
        config: &SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let persistence = identity.persistence().clone();
        let identity_rx = identity.subscribe();
        let mut session = Self {
            identity,
            identity_rx,
            user: None,
            cart: CartStore::new(persistence.clone()),
            balance: BalanceLedger::new(persistence.clone(), config.default_balance),
            favorites: FavoritesStore::new(persistence.clone()),
            orders: OrderTracker::new(persistence.clone(), Arc::clone(&clock)),
            persistence,
            timer: OrderTimer::new(config.timer_secs),
            clock,
            ids: OrderIdGenerator::new(),
            order_countdown_secs: config.order_countdown_secs,
        };
        session.sync_identity().await;
        session
    }

    #[must_use]
    pub const fn identity(&self) -> &IdentityProvider<S> {
        &self.identity
    }

    /// The user the stores are bound to.
    #[must_use]
    pub const fn current_user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Rebind every store if the published identity changed.
    ///
    /// Each store saves the outgoing user's state under the outgoing user's
    /// key before loading the incoming user's state.
    pub async fn sync_identity(&mut self) {
        let next = self.identity_rx.borrow_and_update().clone();
        let Some(transition) = IdentityTransition::classify(self.user.as_ref(), next.as_ref())
        else {
            return;
        };
        info!(?transition, "Switching session user");

        self.cart.switch_user(next.clone()).await;
        self.balance.switch_user(next.clone()).await;
        self.favorites.switch_user(next.clone()).await;
        self.orders.switch_user(next.clone()).await;
        for order in self.orders.orders() {
            self.ids.observe(order.id);
        }
        if transition.incoming().is_none() {
            self.timer.set_order_in_progress(false);
        }
        self.user = next;
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Sign in as `record` and load their state.
    pub async fn login(&mut self, record: UserRecord) {
        self.identity.login(record).await;
        self.sync_identity().await;
    }

    /// Sign out. The user's cart, balance, favorites, and orders stay in
    /// storage for their next login.
    pub async fn logout(&mut self) {
        self.identity.logout().await;
        self.sync_identity().await;
    }

    /// Sign out and delete everything stored for the current user.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn forget_current_user(&mut self) {
        self.sync_identity().await;
        let Some(user) = self.user.take() else {
            return;
        };
        self.cart.discard();
        self.balance.discard();
        self.favorites.discard();
        self.orders.discard();
        self.timer.set_order_in_progress(false);
        for key in keys::all_for(&user) {
            self.persistence.remove(&key).await;
        }
        info!(%user, "Removed stored user data");
        self.logout().await;
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn cart_items(&self) -> &[CartLine] {
        self.cart.items()
    }

    #[must_use]
    pub fn cart_total(&self) -> Money {
        self.cart.total()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.cart.total_quantity()
    }

    /// Add one of `item` to the cart. Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `InvalidAmount` for a negative price,
    /// `PerItemLimitExceeded`, or `TotalLimitExceeded`.
    pub async fn add_to_cart(&mut self, item: &MenuItem) -> Result<u32, CommerceError> {
        self.sync_identity().await;
        self.cart.add(item).await
    }

    /// Remove the line for `item_id`. Absent items are a no-op.
    pub async fn remove_from_cart(&mut self, item_id: &ItemId) -> bool {
        self.sync_identity().await;
        self.cart.remove(item_id).await
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `PerItemLimitExceeded`, or `TotalLimitExceeded`.
    pub async fn update_quantity(
        &mut self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        self.sync_identity().await;
        self.cart.update_quantity(item_id, quantity).await
    }

    pub async fn clear_cart(&mut self) {
        self.sync_identity().await;
        self.cart.clear().await;
    }

    /// Pay for the cart and start tracking the order.
    ///
    /// `total` overrides the amount charged; it defaults to the cart total.
    /// Balance, cart, and order list change together or not at all.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `EmptyCart`, `InvalidAmount`, or
    /// `InsufficientBalance`. Nothing changes on error.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn process_order(&mut self, total: Option<Money>) -> Result<Order, CommerceError> {
        self.sync_identity().await;
        let Some(user) = self.user.clone() else {
            warn!("Order attempted without a signed-in user");
            return Err(CommerceError::Unauthenticated);
        };
        if !self.stores_bound_to(&user) {
            warn!("Order attempted while stores are not bound to the user");
            return Err(CommerceError::Unauthenticated);
        }

        let placement = Placement {
            order_id: self.ids.next(self.clock.now_millis()),
            user_id: user,
            now: self.clock.now_secs(),
            countdown_secs: self.order_countdown_secs,
        };
        let done = checkout(self.balance.balance(), self.cart.cart(), total, placement)
            .inspect_err(|e| warn!(error = %e, "Order rejected"))?;

        // Infallible and without an await, so no partial state is observable.
        self.balance.commit(done.balance);
        self.cart.replace(done.cart);
        self.orders.push(done.order.clone());
        self.timer.start();

        self.balance.flush().await;
        self.cart.flush().await;
        self.orders.flush().await;

        info!(
            order_id = %done.order.id,
            charged = %done.charged,
            balance = %done.balance,
            "Order placed"
        );
        Ok(done.order)
    }

    fn stores_bound_to(&self, user: &UserId) -> bool {
        [self.cart.user(), self.balance.user(), self.orders.user()]
            .into_iter()
            .all(|bound| bound == Some(user))
    }

    // -------------------------------------------------------------------------
    // Balance
    // -------------------------------------------------------------------------

    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance.balance()
    }

    /// Top up the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` or `InvalidAmount`.
    pub async fn add_funds(&mut self, amount: Money) -> Result<Money, CommerceError> {
        self.sync_identity().await;
        self.balance.add_funds(amount).await
    }

    // -------------------------------------------------------------------------
    // Favorites
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn favorites(&self) -> &[MenuItem] {
        self.favorites.items()
    }

    #[must_use]
    pub fn is_favorite(&self, item_id: &ItemId) -> bool {
        self.favorites.is_favorite(item_id)
    }

    pub async fn add_to_favorites(&mut self, item: &MenuItem) -> bool {
        self.sync_identity().await;
        self.favorites.add(item).await
    }

    pub async fn remove_from_favorites(&mut self, item_id: &ItemId) -> bool {
        self.sync_identity().await;
        self.favorites.remove(item_id).await
    }

    pub async fn clear_all_favorites(&mut self) {
        self.sync_identity().await;
        self.favorites.clear().await;
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        self.orders.orders()
    }

    /// Track an order for `items` without touching the cart or balance.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`; the attempt is only logged.
    pub async fn add_order(&mut self, items: Vec<CartLine>) -> Result<Order, CommerceError> {
        self.sync_identity().await;
        let Some(user) = self.user.clone() else {
            warn!("Order tracking requested without a signed-in user");
            return Err(CommerceError::Unauthenticated);
        };
        let order = Order::place(
            self.ids.next(self.clock.now_millis()),
            user,
            items,
            self.clock.now_secs(),
            self.order_countdown_secs,
        );
        self.orders.add(order.clone()).await?;
        debug!(order_id = %order.id, "Tracking order");
        Ok(order)
    }

    pub async fn remove_order(&mut self, id: OrderId) -> bool {
        self.sync_identity().await;
        self.orders.remove(id).await
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    #[must_use]
    pub const fn timer(&self) -> &OrderTimer {
        &self.timer
    }

    pub const fn timer_mut(&mut self) -> &mut OrderTimer {
        &mut self.timer
    }

    /// One second of countdown for every order and the ETA timer.
    pub async fn tick(&mut self) {
        self.orders.tick().await;
        self.timer.tick();
    }

    /// Write every store's state under the current user's keys.
    pub async fn flush(&mut self) {
        self.cart.flush().await;
        self.balance.flush().await;
        self.favorites.flush().await;
        self.orders.flush().await;
    }
}
