//! Core types for DeliveCrous.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod item;
pub mod money;
pub mod status;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use item::MenuItem;
pub use money::Money;
pub use status::OrderStatus;
pub use user::UserRecord;
