//! The signed-in user's wallet balance.

use delivecrous_core::{CommerceError, Money, UserId};
use tracing::{debug, info, instrument, warn};

use crate::storage::{KeyValueStore, Persistence, keys};

/// Balance ledger bound to at most one user.
///
/// The balance is persisted as a plain decimal string (`"75.5"`). A user
/// seen for the first time gets the default balance, written immediately.
/// An unreadable stored balance reads as the default but is only replaced
/// once the balance actually changes.
pub struct BalanceLedger<S> {
    persistence: Persistence<S>,
    user: Option<UserId>,
    balance: Money,
    default_balance: Money,
    keep_stored: bool,
}

impl<S: KeyValueStore> BalanceLedger<S> {
    #[must_use]
    pub const fn new(persistence: Persistence<S>, default_balance: Money) -> Self {
        Self {
            persistence,
            user: None,
            balance: default_balance,
            default_balance,
            keep_stored: false,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance
    }

    /// Rebind to `next`, saving the outgoing balance first.
    ///
    /// On logout the in-memory balance goes back to the default.
    #[instrument(skip(self), fields(from = ?self.user))]
    pub async fn switch_user(&mut self, next: Option<UserId>) {
        if self.user == next {
            return;
        }
        self.flush().await;

        self.keep_stored = false;
        self.balance = match &next {
            Some(user) => self.load_or_init(user).await,
            None => self.default_balance,
        };
        self.user = next;
    }

    async fn load_or_init(&mut self, user: &UserId) -> Money {
        let key = keys::balance(user);
        if let Some(raw) = self.persistence.load_raw(&key).await {
            match raw.trim().parse::<Money>() {
                Ok(balance) => {
                    debug!(%balance, "Loaded balance");
                    return balance;
                }
                Err(e) => {
                    warn!(key, error = %e, "Ignoring unreadable balance");
                    self.keep_stored = true;
                    return self.default_balance;
                }
            }
        }
        info!(%user, balance = %self.default_balance, "Assigning default balance");
        self.persistence
            .save_raw(&key, self.default_balance.to_string())
            .await;
        self.default_balance
    }

    /// Write the balance under the bound user's key.
    pub async fn flush(&self) {
        let Some(user) = &self.user else {
            return;
        };
        if self.keep_stored {
            debug!(%user, "Leaving unreadable stored balance in place");
            return;
        }
        self.persistence
            .save_raw(&keys::balance(user), self.balance.to_string())
            .await;
    }

    /// Forget the bound user without saving and reset to the default.
    pub fn discard(&mut self) {
        self.user = None;
        self.balance = self.default_balance;
        self.keep_stored = false;
    }

    /// Top up the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without a user, `InvalidAmount` unless `amount` is
    /// positive.
    #[instrument(skip(self), fields(user = ?self.user, amount = %amount))]
    pub async fn add_funds(&mut self, amount: Money) -> Result<Money, CommerceError> {
        if self.user.is_none() {
            warn!("Top-up without a signed-in user");
            return Err(CommerceError::Unauthenticated);
        }
        if !amount.is_positive() {
            warn!("Rejected non-positive top-up");
            return Err(CommerceError::InvalidAmount { amount });
        }
        self.commit(self.balance + amount);
        debug!(balance = %self.balance, "Added funds");
        self.flush().await;
        Ok(self.balance)
    }

    /// Install a balance computed elsewhere (checkout). Persist with
    /// [`flush`](Self::flush).
    pub(crate) const fn commit(&mut self, balance: Money) {
        self.balance = balance;
        self.keep_stored = false;
    }
}
