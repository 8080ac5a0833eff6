//! Persistent key-value storage.
//!
//! The stores persist everything as strings under deterministic keys:
//!
//! ```text
//! user                  → UserRecord JSON (written by the login flow)
//! userToken             → opaque login token
//! cartItems_<userId>    → CartLine[] JSON
//! balance_<userId>      → decimal string, e.g. "75.5"
//! favorites_<userId>    → MenuItem[] JSON
//! orders_<userId>       → Order[] JSON
//! ```
//!
//! Backends implement [`KeyValueStore`]. Store code never talks to a backend
//! directly; it goes through [`Persistence`], which logs and swallows I/O
//! and decode failures so they never reach UI code.

mod file;
mod memory;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SessionConfig;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key cannot be stored by this backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Async string key-value storage.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// The backend selected by [`SessionConfig::data_dir`].
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryStore),
    File(FileStore),
}

impl Backend {
    /// A file store under `data_dir` when one is configured, memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the data directory cannot be created.
    pub async fn from_config(config: &SessionConfig) -> Result<Self, StorageError> {
        match &config.data_dir {
            Some(dir) => Ok(Self::File(FileStore::open(dir).await?)),
            None => Ok(Self::Memory(MemoryStore::new())),
        }
    }
}

impl KeyValueStore for Backend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::File(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        match self {
            Self::Memory(store) => store.set(key, value).await,
            Self::File(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            Self::Memory(store) => store.remove(key).await,
            Self::File(store) => store.remove(key).await,
        }
    }
}

/// Storage keys.
pub mod keys {
    use delivecrous_core::UserId;

    /// Key for the signed-in user record.
    pub const USER: &str = "user";

    /// Key for the login token written next to the user record.
    pub const USER_TOKEN: &str = "userToken";

    /// Key for a user's cart.
    #[must_use]
    pub fn cart_items(user: &UserId) -> String {
        format!("cartItems_{user}")
    }

    /// Key for a user's balance.
    #[must_use]
    pub fn balance(user: &UserId) -> String {
        format!("balance_{user}")
    }

    /// Key for a user's favorites.
    #[must_use]
    pub fn favorites(user: &UserId) -> String {
        format!("favorites_{user}")
    }

    /// Key for a user's orders.
    #[must_use]
    pub fn orders(user: &UserId) -> String {
        format!("orders_{user}")
    }

    /// Every per-user key.
    #[must_use]
    pub fn all_for(user: &UserId) -> [String; 4] {
        [cart_items(user), balance(user), favorites(user), orders(user)]
    }
}

/// Result of [`Persistence::load_json_checked`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded<T> {
    /// Nothing stored under the key.
    Missing,
    /// The decoded value.
    Value(T),
    /// Something is stored but could not be decoded.
    Undecodable,
}

impl<T> Loaded<T> {
    /// The decoded value, if any.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing | Self::Undecodable => None,
        }
    }

    /// Whether a stored value was present but unreadable.
    #[must_use]
    pub const fn is_undecodable(&self) -> bool {
        matches!(self, Self::Undecodable)
    }
}

/// Error-swallowing persistence helpers shared by the stores.
pub struct Persistence<S> {
    store: Arc<S>,
}

impl<S> Clone for Persistence<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> Persistence<S> {
    /// Wrap a shared backend.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Read a raw string value. Failures are logged and read as missing.
    pub async fn load_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read from storage");
                None
            }
        }
    }

    /// Write a raw string value. Failures are logged and dropped.
    pub async fn save_raw(&self, key: &str, value: String) {
        if let Err(e) = self.store.set(key, value).await {
            warn!(key, error = %e, "Failed to write to storage");
        } else {
            debug!(key, "Saved");
        }
    }

    /// Read and decode a JSON value. A value that fails to decode is logged
    /// and treated as missing.
    pub async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load_json_checked(key).await.into_value()
    }

    /// Like [`Persistence::load_json`], but tells a missing key apart from a
    /// value that is present and undecodable.
    pub async fn load_json_checked<T: DeserializeOwned>(&self, key: &str) -> Loaded<T> {
        let Some(raw) = self.load_raw(key).await else {
            return Loaded::Missing;
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Loaded::Value(value),
            Err(e) => {
                warn!(key, error = %e, "Ignoring undecodable stored value");
                Loaded::Undecodable
            }
        }
    }

    /// Encode and write a JSON value.
    pub async fn save_json<T: Serialize + Sync>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.save_raw(key, raw).await,
            Err(e) => warn!(key, error = %e, "Failed to encode value for storage"),
        }
    }

    /// Delete a key. Failures are logged and dropped.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!(key, error = %e, "Failed to remove from storage");
        }
    }
}
