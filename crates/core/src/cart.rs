//! Cart lines and quantity limits.
//!
//! A [`Cart`] holds at most one [`CartLine`] per item. Two limits apply to
//! every mutation: a line never exceeds [`MAX_QUANTITY_PER_ITEM`], and the
//! sum of all quantities never exceeds [`MAX_TOTAL_ITEMS`]. A mutation that
//! would break either limit is refused and leaves the cart as it was.

use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::types::{ItemId, MenuItem, Money};

/// Maximum quantity of a single item in one cart.
pub const MAX_QUANTITY_PER_ITEM: u32 = 5;

/// Maximum number of items (sum of quantities) in one cart.
pub const MAX_TOTAL_ITEMS: u32 = 20;

/// One item in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    /// Always in `1..=MAX_QUANTITY_PER_ITEM`.
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
}

impl CartLine {
    /// A new line for `item` with quantity 1.
    #[must_use]
    pub fn from_item(item: &MenuItem) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity: 1,
            image: item.image.clone(),
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// An ordered collection of cart lines.
///
/// Deserializing goes through [`Cart::from_lines`], so a persisted cart that
/// was edited by hand (zero quantities, duplicate items, oversize lines) is
/// brought back within the invariants on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, normalizing them.
    ///
    /// Lines with quantity 0 or a negative unit price are dropped, lines for
    /// an item already seen are merged into the first one, and each quantity
    /// is clamped to [`MAX_QUANTITY_PER_ITEM`].
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 || line.unit_price.is_negative() {
                continue;
            }
            if let Some(existing) = cart.line_mut(&line.item_id) {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            } else {
                cart.lines.push(line);
            }
        }
        for line in &mut cart.lines {
            line.quantity = line.quantity.min(MAX_QUANTITY_PER_ITEM);
        }
        cart
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line for `item_id`, if present.
    #[must_use]
    pub fn line(&self, item_id: &ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.item_id == *item_id)
    }

    fn line_mut(&mut self, item_id: &ItemId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.item_id == *item_id)
    }

    /// `Σ unit_price × quantity`, recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// `Σ quantity`.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Add one unit of `item`.
    ///
    /// Increments the existing line or appends a new line with quantity 1.
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::InvalidAmount`] if the item has a negative price
    /// - [`CommerceError::PerItemLimitExceeded`] if the line is already full
    /// - [`CommerceError::TotalLimitExceeded`] if the cart is already full
    pub fn add(&mut self, item: &MenuItem) -> Result<u32, CommerceError> {
        if item.price.is_negative() {
            return Err(CommerceError::InvalidAmount { amount: item.price });
        }
        let current = self.line(&item.id).map_or(0, |line| line.quantity);
        if current >= MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::PerItemLimitExceeded {
                item_id: item.id.clone(),
                max: MAX_QUANTITY_PER_ITEM,
            });
        }
        if self.total_quantity() >= MAX_TOTAL_ITEMS {
            return Err(CommerceError::TotalLimitExceeded {
                max: MAX_TOTAL_ITEMS,
            });
        }

        if let Some(line) = self.line_mut(&item.id) {
            line.quantity += 1;
            Ok(line.quantity)
        } else {
            self.lines.push(CartLine::from_item(item));
            Ok(1)
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity of 0 removes the line. Setting the quantity of an item that
    /// is not in the cart does nothing. Returns whether the cart changed.
    ///
    /// # Errors
    ///
    /// The same two limit errors as [`Cart::add`], checked against the
    /// proposed quantity.
    pub fn update_quantity(
        &mut self,
        item_id: &ItemId,
        quantity: u32,
    ) -> Result<bool, CommerceError> {
        if quantity == 0 {
            return Ok(self.remove(item_id));
        }
        let Some(current) = self.line(item_id).map(|line| line.quantity) else {
            return Ok(false);
        };
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::PerItemLimitExceeded {
                item_id: item_id.clone(),
                max: MAX_QUANTITY_PER_ITEM,
            });
        }
        if self.total_quantity() - current + quantity > MAX_TOTAL_ITEMS {
            return Err(CommerceError::TotalLimitExceeded {
                max: MAX_TOTAL_ITEMS,
            });
        }

        if let Some(line) = self.line_mut(item_id) {
            line.quantity = quantity;
        }
        Ok(current != quantity)
    }

    /// Remove the line for `item_id`. Returns whether a line was removed.
    pub fn remove(&mut self, item_id: &ItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.item_id != *item_id);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i64, euros: i64) -> MenuItem {
        MenuItem::new(ItemId::from(id), format!("Item {id}"), Money::from_euros(euros))
    }

    #[test]
    fn test_add_same_item_twice_increments() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(&item(1, 10)).unwrap(), 1);
        assert_eq!(cart.add(&item(1, 10)).unwrap(), 2);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&ItemId::new("1")).unwrap().quantity, 2);
        assert_eq!(cart.total(), Money::from_euros(20));
    }

    #[test]
    fn test_per_item_limit() {
        let mut cart = Cart::new();
        for _ in 0..MAX_QUANTITY_PER_ITEM {
            cart.add(&item(1, 2)).unwrap();
        }
        let before = cart.clone();

        let err = cart.add(&item(1, 2)).unwrap_err();
        assert_eq!(
            err,
            CommerceError::PerItemLimitExceeded {
                item_id: ItemId::new("1"),
                max: MAX_QUANTITY_PER_ITEM
            }
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_total_limit() {
        let mut cart = Cart::new();
        for id in 1..=4 {
            for _ in 0..MAX_QUANTITY_PER_ITEM {
                cart.add(&item(id, 1)).unwrap();
            }
        }
        assert_eq!(cart.total_quantity(), MAX_TOTAL_ITEMS);

        let err = cart.add(&item(99, 1)).unwrap_err();
        assert!(matches!(err, CommerceError::TotalLimitExceeded { max: 20 }));
        assert!(cart.line(&ItemId::new("99")).is_none());
    }

    #[test]
    fn test_limits_hold_for_any_add_sequence() {
        let mut cart = Cart::new();
        // Deterministic pseudo-random walk over a handful of items.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let id = i64::try_from(seed % 7).unwrap();
            let _ = cart.add(&item(id, 3));

            assert!(cart.total_quantity() <= MAX_TOTAL_ITEMS);
            assert!(
                cart.lines()
                    .iter()
                    .all(|l| (1..=MAX_QUANTITY_PER_ITEM).contains(&l.quantity))
            );
        }
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut by_update = Cart::new();
        by_update.add(&item(1, 10)).unwrap();
        by_update.add(&item(2, 5)).unwrap();
        let mut by_remove = by_update.clone();

        assert!(by_update.update_quantity(&ItemId::new("1"), 0).unwrap());
        assert!(by_remove.remove(&ItemId::new("1")));
        assert_eq!(by_update, by_remove);
    }

    #[test]
    fn test_update_quantity_checks_proposed_value() {
        let mut cart = Cart::new();
        cart.add(&item(1, 1)).unwrap();
        for id in 2..=4 {
            for _ in 0..MAX_QUANTITY_PER_ITEM {
                cart.add(&item(id, 1)).unwrap();
            }
        }
        // 1 + 15 = 16 items; raising item 1 to 5 would make 20 (allowed).
        assert!(cart.update_quantity(&ItemId::new("1"), 5).unwrap());
        assert_eq!(cart.total_quantity(), 20);

        assert!(matches!(
            cart.update_quantity(&ItemId::new("1"), 6),
            Err(CommerceError::PerItemLimitExceeded { .. })
        ));

        cart.update_quantity(&ItemId::new("1"), 1).unwrap();
        cart.add(&item(5, 1)).unwrap();
        cart.add(&item(5, 1)).unwrap();
        cart.add(&item(5, 1)).unwrap();
        // 19 items; item 1 from 1 to 3 would make 21.
        let before = cart.clone();
        assert!(matches!(
            cart.update_quantity(&ItemId::new("1"), 3),
            Err(CommerceError::TotalLimitExceeded { .. })
        ));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_missing_item_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.update_quantity(&ItemId::new("8"), 3).unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = Cart::new();
        cart.add(&item(1, 10)).unwrap();
        assert!(cart.remove(&ItemId::new("1")));
        let after_first = cart.clone();
        assert!(!cart.remove(&ItemId::new("1")));
        assert_eq!(cart, after_first);
    }

    #[test]
    fn test_total_is_exact() {
        let mut cart = Cart::new();
        let coffee = MenuItem::new(ItemId::new("1"), "Cafe", Money::from_cents(110));
        let croissant = MenuItem::new(ItemId::new("2"), "Croissant", Money::from_cents(95));
        cart.add(&coffee).unwrap();
        cart.add(&coffee).unwrap();
        cart.add(&croissant).unwrap();
        assert_eq!(cart.total(), Money::from_cents(315));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let raw = r#"[
            {"itemId":1,"name":"A","unitPrice":2,"quantity":4},
            {"itemId":"2","name":"B","unitPrice":3,"quantity":0},
            {"itemId":"1","name":"A","unitPrice":2,"quantity":3},
            {"itemId":"9","name":"Refund","unitPrice":-4,"quantity":1}
        ]"#;
        let cart: Cart = serde_json::from_str(raw).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, MAX_QUANTITY_PER_ITEM);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let mut cart = Cart::new();
        cart.add(&item(1, 10)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["itemId"], "1");
        assert_eq!(json[0]["unitPrice"], 10.0);
        assert_eq!(json[0]["quantity"], 1);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut cart = Cart::new();
        cart.add(&item(1, 10)).unwrap();
        let before = cart.clone();

        let err = cart.add(&item(2, -30)).unwrap_err();
        assert_eq!(
            err,
            CommerceError::InvalidAmount {
                amount: Money::from_euros(-30)
            }
        );
        assert_eq!(cart, before);
        assert_eq!(cart.total(), Money::from_euros(10));
    }
}
