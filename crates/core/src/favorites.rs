//! Favorite items.

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, MenuItem};

/// Insertion-ordered set of favorited item snapshots, unique by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MenuItem>", into = "Vec<MenuItem>")]
pub struct FavoriteSet {
    items: Vec<MenuItem>,
}

impl FavoriteSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Favorited items in the order they were added.
    #[must_use]
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `item_id` is favorited.
    #[must_use]
    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.items.iter().any(|item| item.id == *item_id)
    }

    /// Add a snapshot of `item`. Returns false if it was already present.
    pub fn add(&mut self, item: &MenuItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push(item.clone());
        true
    }

    /// Remove `item_id`. Returns whether anything was removed.
    pub fn remove(&mut self, item_id: &ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != *item_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl From<Vec<MenuItem>> for FavoriteSet {
    fn from(items: Vec<MenuItem>) -> Self {
        let mut set = Self::new();
        for item in &items {
            set.add(item);
        }
        set
    }
}

impl From<FavoriteSet> for Vec<MenuItem> {
    fn from(set: FavoriteSet) -> Self {
        set.items
    }
}
