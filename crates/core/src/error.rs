//! User-facing commerce errors.
//!
//! Every variant is recovered locally: the store operation that produced it
//! left its state untouched, and the UI turns the `Display` text into a
//! notice.

use thiserror::Error;

use crate::types::{ItemId, Money};

/// Why a cart, balance, favorites, or order operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommerceError {
    /// A mutating operation was attempted with nobody signed in.
    #[error("you must be signed in to do that")]
    Unauthenticated,

    /// A single cart line would exceed the per-item limit.
    #[error("you can order at most {max} of item {item_id}")]
    PerItemLimitExceeded {
        /// Item whose line is full.
        item_id: ItemId,
        /// Per-item limit.
        max: u32,
    },

    /// The cart as a whole would exceed the item limit.
    #[error("your cart cannot hold more than {max} items")]
    TotalLimitExceeded {
        /// Total item limit.
        max: u32,
    },

    /// The order total is larger than the available balance.
    #[error(
        "you don't have enough balance to complete this order ({} needed, {} available)",
        .total.display(),
        .balance.display()
    )]
    InsufficientBalance {
        /// Amount the order would cost.
        total: Money,
        /// Balance at the time of the attempt.
        balance: Money,
    },

    /// Checkout was attempted with nothing in the cart.
    #[error("your cart is empty")]
    EmptyCart,

    /// A top-up, order total, or item price was out of range.
    #[error("invalid amount: {}", .amount.display())]
    InvalidAmount {
        /// The rejected amount.
        amount: Money,
    },
}
