//! DeliveCrous session layer.
//!
//! Keeps the signed-in user's cart, balance, favorites, and orders in memory,
//! persists them to a key-value store under per-user keys, and swaps them
//! whenever the signed-in user changes.
//!
//! # Modules
//!
//! - [`storage`] - Key-value backends and the persistence helpers
//! - [`identity`] - The signed-in user and identity change notification
//! - [`stores`] - Cart, balance, favorites, and order stores
//! - [`timer`] - The single-order ETA timer
//! - [`session`] - The orchestrator the UI calls into
//! - [`state`] - Shared handle running the tick and identity tasks
//! - [`config`] - Environment configuration
//! - [`clock`] - Wall-clock access

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod identity;
pub mod session;
pub mod state;
pub mod storage;
pub mod stores;
pub mod timer;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SessionConfig};
pub use identity::{IdentityProvider, IdentityTransition};
pub use session::Session;
pub use state::SessionHandle;
pub use storage::{Backend, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use timer::OrderTimer;

/// Open storage as configured, bind a session to the stored user, and start
/// its background tasks.
///
/// # Errors
///
/// Returns `StorageError` if the data directory cannot be opened.
pub async fn start(config: &SessionConfig) -> Result<SessionHandle<Backend>, StorageError> {
    let store = Arc::new(Backend::from_config(config).await?);
    let identity = IdentityProvider::load(store).await;
    let session = Session::open(identity, config, Arc::new(SystemClock)).await;
    Ok(SessionHandle::spawn(session, config))
}
