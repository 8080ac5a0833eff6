//! The signed-in user and identity change notification.
//!
//! The login flow writes the user record under the `user` key. Every store
//! keys its data by that record's id, so the stores have to learn when it
//! changes. Instead of each store re-reading `user` on a timer, the
//! [`IdentityProvider`] publishes the current id on a `watch` channel and
//! stores react to the changes they receive.

use std::sync::Arc;

use delivecrous_core::{UserId, UserRecord};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::storage::{KeyValueStore, Persistence, keys};

/// A change of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityTransition {
    /// Someone signed in while nobody was.
    Login(UserId),
    /// One user replaced another without an intervening logout.
    Switch { from: UserId, to: UserId },
    /// The signed-in user signed out.
    Logout(UserId),
}

impl IdentityTransition {
    /// Classify the move from `prev` to `next`. `None` when nothing changed.
    #[must_use]
    pub fn classify(prev: Option<&UserId>, next: Option<&UserId>) -> Option<Self> {
        match (prev, next) {
            (None, Some(to)) => Some(Self::Login(to.clone())),
            (Some(from), None) => Some(Self::Logout(from.clone())),
            (Some(from), Some(to)) if from != to => Some(Self::Switch {
                from: from.clone(),
                to: to.clone(),
            }),
            _ => None,
        }
    }

    /// The user signed in after the transition.
    #[must_use]
    pub const fn incoming(&self) -> Option<&UserId> {
        match self {
            Self::Login(to) | Self::Switch { to, .. } => Some(to),
            Self::Logout(_) => None,
        }
    }

    /// The user signed in before the transition.
    #[must_use]
    pub const fn outgoing(&self) -> Option<&UserId> {
        match self {
            Self::Switch { from, .. } | Self::Logout(from) => Some(from),
            Self::Login(_) => None,
        }
    }
}

/// Owns the persisted user record and publishes its id.
///
/// Cheaply cloneable; clones share the same channel.
pub struct IdentityProvider<S> {
    persistence: Persistence<S>,
    current: Arc<watch::Sender<Option<UserId>>>,
}

impl<S> Clone for IdentityProvider<S> {
    fn clone(&self) -> Self {
        Self {
            persistence: self.persistence.clone(),
            current: Arc::clone(&self.current),
        }
    }
}

impl<S: KeyValueStore> IdentityProvider<S> {
    /// Read the persisted user record and start publishing its id.
    ///
    /// A missing or undecodable record means nobody is signed in.
    pub async fn load(store: Arc<S>) -> Self {
        let persistence = Persistence::new(store);
        let user = persistence
            .load_json::<UserRecord>(keys::USER)
            .await
            .map(|record| record.id);
        debug!(user = ?user, "Loaded identity");
        let (current, _) = watch::channel(user);
        Self {
            persistence,
            current: Arc::new(current),
        }
    }

    pub(crate) const fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user_id(&self) -> Option<UserId> {
        self.current.borrow().clone()
    }

    /// The full persisted user record, if any.
    pub async fn current_user(&self) -> Option<UserRecord> {
        self.persistence.load_json(keys::USER).await
    }

    /// A receiver that sees every published identity.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.current.subscribe()
    }

    /// Persist `record` as the signed-in user and publish its id.
    #[instrument(skip(self, record), fields(user = %record.id))]
    pub async fn login(&self, record: UserRecord) {
        self.persistence.save_json(keys::USER, &record).await;
        self.publish(Some(record.id));
    }

    /// Like [`login`](Self::login), also storing the session token the way
    /// the login screen does.
    pub async fn login_with_token(&self, record: UserRecord, token: impl Into<String>) {
        self.persistence
            .save_raw(keys::USER_TOKEN, token.into())
            .await;
        self.login(record).await;
    }

    /// Remove the user record and token and publish that nobody is signed in.
    ///
    /// Per-user data is left in storage.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.persistence.remove(keys::USER).await;
        self.persistence.remove(keys::USER_TOKEN).await;
        self.publish(None);
    }

    /// Re-read the persisted record and publish its id if it changed.
    ///
    /// Picks up writers that update `user` without going through this
    /// provider. Returns the current id.
    pub async fn refresh(&self) -> Option<UserId> {
        let user = self
            .persistence
            .load_json::<UserRecord>(keys::USER)
            .await
            .map(|record| record.id);
        self.publish(user.clone());
        user
    }

    fn publish(&self, next: Option<UserId>) {
        self.current.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if let Some(transition) = IdentityTransition::classify(current.as_ref(), next.as_ref())
            {
                info!(
                    from = ?transition.outgoing(),
                    to = ?transition.incoming(),
                    "Identity changed"
                );
            }
            *current = next;
            true
        });
    }
}
