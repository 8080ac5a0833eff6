//! DeliveCrous Core - Domain types and rules.
//!
//! This crate provides the types shared by the session layer and its tests:
//! identifiers, money, the user record, menu items, and the cart, favorites,
//! and order rules that the session stores enforce.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no async,
//! no storage. Every rule that decides whether a mutation is allowed lives
//! here so it can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, users, and menu items
//! - [`cart`] - Cart lines and the per-item / per-cart quantity limits
//! - [`favorites`] - Per-user favorite item snapshots
//! - [`countdown`] - The countdown primitive shared by orders and the ETA timer
//! - [`order`] - Placed orders and their delivery state machine
//! - [`checkout`] - The all-or-nothing balance + cart + order transaction
//! - [`error`] - User-facing commerce errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod countdown;
pub mod error;
pub mod favorites;
pub mod order;
pub mod types;

pub use cart::{Cart, CartLine, MAX_QUANTITY_PER_ITEM, MAX_TOTAL_ITEMS};
pub use checkout::{Checkout, Placement, checkout};
pub use countdown::{Countdown, Tick, format_eta};
pub use error::CommerceError;
pub use favorites::FavoriteSet;
pub use order::{DEFAULT_ORDER_COUNTDOWN_SECS, Order, OrderIdGenerator};
pub use types::*;
