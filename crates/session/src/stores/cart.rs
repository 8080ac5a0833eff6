//! The signed-in user's cart.

use delivecrous_core::{Cart, CartLine, CommerceError, ItemId, MenuItem, Money, UserId};
use tracing::{debug, instrument, warn};

use crate::storage::{KeyValueStore, Loaded, Persistence, keys};

/// Cart store bound to at most one user.
///
/// A stored cart that cannot be decoded loads as empty but is left in
/// storage until the user changes the cart.
pub struct CartStore<S> {
    persistence: Persistence<S>,
    user: Option<UserId>,
    cart: Cart,
    keep_stored: bool,
}

impl<S: KeyValueStore> CartStore<S> {
    /// An unbound, empty cart.
    #[must_use]
    pub const fn new(persistence: Persistence<S>) -> Self {
        Self {
            persistence,
            user: None,
            cart: Cart::new(),
            keep_stored: false,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        self.cart.lines()
    }

    /// `Σ unit_price × quantity`, recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Money {
        self.cart.total()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.cart.total_quantity()
    }

    /// Rebind to `next`, saving the outgoing cart first.
    #[instrument(skip(self), fields(from = ?self.user))]
    pub async fn switch_user(&mut self, next: Option<UserId>) {
        if self.user == next {
            return;
        }
        self.flush().await;

        let loaded = match &next {
            Some(user) => {
                self.persistence
                    .load_json_checked::<Cart>(&keys::cart_items(user))
                    .await
            }
            None => Loaded::Missing,
        };
        self.keep_stored = loaded.is_undecodable();
        self.cart = loaded.into_value().unwrap_or_default();
        debug!(lines = self.cart.lines().len(), "Loaded cart");
        self.user = next;
    }

    /// Write the cart under the bound user's key.
    pub async fn flush(&self) {
        let Some(user) = &self.user else {
            return;
        };
        if self.keep_stored {
            debug!(%user, "Leaving undecodable stored cart in place");
            return;
        }
        self.persistence
            .save_json(&keys::cart_items(user), &self.cart)
            .await;
    }

    /// Forget the in-memory cart and user without saving.
    pub fn discard(&mut self) {
        self.user = None;
        self.cart.clear();
        self.keep_stored = false;
    }

    async fn persist(&mut self) {
        self.keep_stored = false;
        self.flush().await;
    }

    /// Add one of `item`.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a user, or a limit error when the cart is
    /// full. The cart is unchanged on error.
    #[instrument(skip(self, item), fields(user = ?self.user, item_id = %item.id))]
    pub async fn add(&mut self, item: &MenuItem) -> Result<u32, CommerceError> {
        self.require_user()?;
        let quantity = self.cart.add(item).inspect_err(|e| {
            warn!(error = %e, "Rejected add to cart");
        })?;
        debug!(quantity, "Added to cart");
        self.persist().await;
        Ok(quantity)
    }

    /// Set the quantity of `item_id`. Zero removes the line.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a user, or a limit error when the proposed
    /// quantity is too high. The cart is unchanged on error.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn update_quantity(
        &mut self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        self.require_user()?;
        let changed = self
            .cart
            .update_quantity(item_id, quantity)
            .inspect_err(|e| warn!(error = %e, "Rejected quantity update"))?;
        if changed {
            debug!("Updated quantity");
            self.persist().await;
        }
        Ok(())
    }

    /// Remove the line for `item_id`. Returns whether a line was removed.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn remove(&mut self, item_id: &ItemId) -> bool {
        if self.user.is_none() {
            return false;
        }
        let removed = self.cart.remove(item_id);
        if removed {
            debug!("Removed from cart");
            self.persist().await;
        } else {
            self.flush().await;
        }
        removed
    }

    /// Empty the cart.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn clear(&mut self) {
        self.cart.clear();
        self.persist().await;
    }

    /// Install the result of a checkout. Persist with [`flush`](Self::flush).
    pub(crate) fn replace(&mut self, cart: Cart) {
        self.cart = cart;
        self.keep_stored = false;
    }

    fn require_user(&self) -> Result<(), CommerceError> {
        if self.user.is_none() {
            warn!("Cart mutation without a signed-in user");
            return Err(CommerceError::Unauthenticated);
        }
        Ok(())
    }
}
