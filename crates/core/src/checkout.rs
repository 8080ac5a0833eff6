//! Order placement as one transaction.
//!
//! Paying for the cart touches three pieces of state: the balance is
//! debited, the cart is emptied, and a new order starts its countdown.
//! [`checkout`] computes all three from the current values without mutating
//! anything, so a caller either commits the whole [`Checkout`] or keeps its
//! state exactly as it was.

use crate::cart::Cart;
use crate::error::CommerceError;
use crate::order::Order;
use crate::types::{Money, OrderId, UserId};

/// Who is ordering, when, and with which id and countdown.
#[derive(Debug, Clone)]
pub struct Placement {
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Epoch seconds.
    pub now: i64,
    pub countdown_secs: u32,
}

/// The state after a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    /// Balance after the debit.
    pub balance: Money,
    /// The emptied cart.
    pub cart: Cart,
    /// The order that was placed.
    pub order: Order,
    /// Amount that was debited.
    pub charged: Money,
}

/// Pay for `cart` out of `balance`.
///
/// `total` overrides the amount charged (the cart screen passes the total it
/// displayed); it defaults to [`Cart::total`].
///
/// # Errors
///
/// - [`CommerceError::EmptyCart`] if there is nothing to order
/// - [`CommerceError::InvalidAmount`] if `total` is negative
/// - [`CommerceError::InsufficientBalance`] if `total` exceeds `balance`
pub fn checkout(
    balance: Money,
    cart: &Cart,
    total: Option<Money>,
    placement: Placement,
) -> Result<Checkout, CommerceError> {
    if cart.is_empty() {
        return Err(CommerceError::EmptyCart);
    }
    let charged = total.unwrap_or_else(|| cart.total());
    if charged.is_negative() {
        return Err(CommerceError::InvalidAmount { amount: charged });
    }
    let remaining = balance
        .checked_debit(charged)
        .ok_or(CommerceError::InsufficientBalance {
            total: charged,
            balance,
        })?;

    let order = Order::place(
        placement.order_id,
        placement.user_id,
        cart.lines().to_vec(),
        placement.now,
        placement.countdown_secs,
    );

    Ok(Checkout {
        balance: remaining,
        cart: Cart::new(),
        order,
        charged,
    })
}
