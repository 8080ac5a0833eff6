//! Menu items as the UI hands them to the stores.

use serde::{Deserialize, Serialize};

use super::{ItemId, Money};

/// A catalogue entry at the moment the user acted on it.
///
/// Carts and favorites keep their own copy of this snapshot, so a later
/// catalogue change never rewrites what the user already picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MenuItem {
    /// A minimal item with an id, a name, and a price.
    #[must_use]
    pub fn new(id: ItemId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image: String::new(),
            category: None,
            description: None,
        }
    }

    /// Attach a category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
