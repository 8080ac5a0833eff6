//! Shared session handle and its background tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::identity::IdentityProvider;
use crate::session::Session;
use crate::storage::KeyValueStore;

/// A running session shared between UI callers and its background tasks.
///
/// This struct is cheaply cloneable via `Arc`. Spawning it starts:
///
/// - a ticker that advances every countdown once per tick interval,
/// - a listener that rebinds the stores as soon as the identity changes,
/// - optionally, a poller that re-reads the stored user record for writers
///   that bypass the identity provider.
///
/// The tasks stop on [`shutdown`](Self::shutdown) or when the last handle is
/// dropped.
pub struct SessionHandle<S> {
    inner: Arc<SessionHandleInner<S>>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionHandleInner<S> {
    session: Arc<Mutex<Session<S>>>,
    identity: IdentityProvider<S>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S> Drop for SessionHandleInner<S> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl<S: KeyValueStore> SessionHandle<S> {
    /// Start the background tasks for `session`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(session: Session<S>, config: &SessionConfig) -> Self {
        let identity = session.identity().clone();
        let session = Arc::new(Mutex::new(session));

        let mut tasks = vec![
            spawn_ticker(Arc::clone(&session), config.tick_interval),
            spawn_identity_listener(Arc::clone(&session), &identity),
        ];
        if let Some(every) = config.identity_poll_interval {
            tasks.push(spawn_identity_poller(identity.clone(), every));
        }
        info!(
            tick_interval = ?config.tick_interval,
            polling = config.identity_poll_interval.is_some(),
            "Session tasks started"
        );

        Self {
            inner: Arc::new(SessionHandleInner {
                session,
                identity,
                tasks,
            }),
        }
    }

    /// Lock the session for a batch of operations.
    pub async fn lock(&self) -> MutexGuard<'_, Session<S>> {
        self.inner.session.lock().await
    }

    /// Get a reference to the identity provider.
    #[must_use]
    pub fn identity(&self) -> &IdentityProvider<S> {
        &self.inner.identity
    }

    /// Stop the background tasks and write all state to storage.
    pub async fn shutdown(&self) {
        for task in &self.inner.tasks {
            task.abort();
        }
        self.inner.session.lock().await.flush().await;
        info!("Session shut down");
    }
}

fn spawn_ticker<S: KeyValueStore>(
    session: Arc<Mutex<Session<S>>>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            session.lock().await.tick().await;
        }
    })
}

fn spawn_identity_listener<S: KeyValueStore>(
    session: Arc<Mutex<Session<S>>>,
    identity: &IdentityProvider<S>,
) -> JoinHandle<()> {
    let mut changes = identity.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            debug!("Identity change received");
            session.lock().await.sync_identity().await;
        }
    })
}

fn spawn_identity_poller<S: KeyValueStore>(
    identity: IdentityProvider<S>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            identity.refresh().await;
        }
    })
}
