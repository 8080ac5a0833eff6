//! The signed-in user's favorites.

use delivecrous_core::{FavoriteSet, ItemId, MenuItem, UserId};
use tracing::{debug, instrument};

use crate::storage::{KeyValueStore, Loaded, Persistence, keys};

/// Favorites store bound to at most one user.
///
/// Logging out saves the set and clears it from memory. Stored favorites are
/// never deleted, so they come back on the next login. An undecodable stored
/// set is left alone until the user changes their favorites.
pub struct FavoritesStore<S> {
    persistence: Persistence<S>,
    user: Option<UserId>,
    favorites: FavoriteSet,
    keep_stored: bool,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    #[must_use]
    pub const fn new(persistence: Persistence<S>) -> Self {
        Self {
            persistence,
            user: None,
            favorites: FavoriteSet::new(),
            keep_stored: false,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn items(&self) -> &[MenuItem] {
        self.favorites.items()
    }

    #[must_use]
    pub fn is_favorite(&self, item_id: &ItemId) -> bool {
        self.favorites.contains(item_id)
    }

    #[instrument(skip(self), fields(from = ?self.user))]
    pub async fn switch_user(&mut self, next: Option<UserId>) {
        if self.user == next {
            return;
        }
        self.flush().await;

        let loaded = match &next {
            Some(user) => {
                self.persistence
                    .load_json_checked::<FavoriteSet>(&keys::favorites(user))
                    .await
            }
            None => Loaded::Missing,
        };
        self.keep_stored = loaded.is_undecodable();
        self.favorites = loaded.into_value().unwrap_or_default();
        debug!(count = self.favorites.len(), "Loaded favorites");
        self.user = next;
    }

    pub async fn flush(&self) {
        let Some(user) = &self.user else {
            return;
        };
        if self.keep_stored {
            debug!(%user, "Leaving undecodable stored favorites in place");
            return;
        }
        self.persistence
            .save_json(&keys::favorites(user), &self.favorites)
            .await;
    }

    pub fn discard(&mut self) {
        self.user = None;
        self.favorites.clear();
        self.keep_stored = false;
    }

    async fn persist(&mut self) {
        self.keep_stored = false;
        self.flush().await;
    }

    /// Favorite `item`. False without a user or when already favorited.
    #[instrument(skip(self, item), fields(user = ?self.user, item_id = %item.id))]
    pub async fn add(&mut self, item: &MenuItem) -> bool {
        if self.user.is_none() || !self.favorites.add(item) {
            return false;
        }
        debug!("Added favorite");
        self.persist().await;
        true
    }

    /// Unfavorite `item_id`. False when it was not a favorite.
    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn remove(&mut self, item_id: &ItemId) -> bool {
        if self.user.is_none() || !self.favorites.remove(item_id) {
            return false;
        }
        debug!("Removed favorite");
        self.persist().await;
        true
    }

    #[instrument(skip(self), fields(user = ?self.user))]
    pub async fn clear(&mut self) {
        self.favorites.clear();
        self.persist().await;
    }
}
