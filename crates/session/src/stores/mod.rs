//! Per-user state stores.
//!
//! Each store owns one slice of a user's persisted state and the id it is
//! currently bound to. The lifecycle is the same for all of them:
//!
//! - `switch_user(next)` writes the outgoing user's state under the outgoing
//!   user's key, then loads the incoming user's state (or defaults).
//! - Mutators change memory first, then persist under the bound user's key.
//! - `discard()` drops in-memory state without writing anything.

mod balance;
mod cart;
mod favorites;
mod orders;

pub use balance::BalanceLedger;
pub use cart::CartStore;
pub use favorites::FavoritesStore;
pub use orders::OrderTracker;
