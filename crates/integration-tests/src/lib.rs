//! Integration tests for DeliveCrous.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p delivecrous-integration-tests
//!
//! # With store logging
//! RUST_LOG=delivecrous_session=debug cargo test -p delivecrous-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - Cart limits, totals, and order placement
//! - `identity_switch` - Login, switch, and logout across all stores
//! - `order_tracking` - Order countdowns, catch-up, and the ETA timer
//! - `background_tasks` - The ticker and identity listener under paused time
//! - `file_persistence` - Restarting a session on a data directory

use std::sync::Arc;

use delivecrous_core::{ItemId, MenuItem, Money, UserRecord};
use delivecrous_session::{
    Clock, IdentityProvider, KeyValueStore, ManualClock, MemoryStore, Session, SessionConfig,
};
use tracing_subscriber::EnvFilter;

/// Epoch second every test clock starts at.
pub const START: i64 = 1_700_000_000;

/// Install a log subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A session on an in-memory store with a manual clock.
pub struct TestContext<S = MemoryStore> {
    pub store: Arc<S>,
    pub clock: ManualClock,
    pub config: SessionConfig,
    pub session: Session<S>,
}

impl TestContext<MemoryStore> {
    /// Nobody signed in, nothing stored.
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), SessionConfig::default()).await
    }

    /// Nobody signed in, nothing stored, custom configuration.
    pub async fn with_config(config: SessionConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config).await
    }

    /// A store pre-filled with `entries`, as an earlier app run left it.
    pub async fn seeded(entries: &[(&str, &str)]) -> Self {
        let store = MemoryStore::with_entries(entries.iter().copied());
        Self::with_store(Arc::new(store), SessionConfig::default()).await
    }

    /// Signed in as `user`.
    pub async fn signed_in(user: &str) -> Self {
        let mut ctx = Self::new().await;
        ctx.session.login(UserRecord::new(user)).await;
        ctx
    }
}

impl<S: KeyValueStore> TestContext<S> {
    /// A session over an existing store.
    pub async fn with_store(store: Arc<S>, config: SessionConfig) -> Self {
        init_tracing();
        let clock = ManualClock::at_secs(START);
        let session = open_session(&store, &config, &clock).await;
        Self {
            store,
            clock,
            config,
            session,
        }
    }

    /// Drop the session and open a new one over the same store, as an app
    /// restart would.
    pub async fn restart(&mut self) {
        self.session = open_session(&self.store, &self.config, &self.clock).await;
    }

    /// Raw value stored under `key`.
    pub async fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key).await.ok().flatten()
    }
}

async fn open_session<S: KeyValueStore>(
    store: &Arc<S>,
    config: &SessionConfig,
    clock: &ManualClock,
) -> Session<S> {
    let identity = IdentityProvider::load(Arc::clone(store)).await;
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    Session::open(identity, config, clock).await
}

/// A menu item priced in whole euros.
#[must_use]
pub fn item(id: i64, euros: i64) -> MenuItem {
    MenuItem::new(ItemId::from(id), format!("Item {id}"), Money::from_euros(euros))
}
