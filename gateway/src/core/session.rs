//! Session registry for in-flight synthesis streams.
//!
//! Maps a client-visible session id to the cancel signal of the one driver
//! currently streaming for it. The registry is owned by the application state
//! and shared by `Arc`; request handlers call [`SessionRegistry::start_or_restart`]
//! and [`SessionRegistry::interrupt`], the driver's cleanup calls
//! [`SessionRegistry::release`].
//!
//! Uses `DashMap` so operations on different ids never contend on one lock.
//! No map guard is held across an await point.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One logical synthesis stream and its cancel signal.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    generation: u64,
    cancel: CancellationToken,
}

impl Session {
    /// Session identifier.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cancel signal observed by the driver.
    #[inline]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once an interrupt or restart has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug)]
struct SessionEntry {
    generation: u64,
    cancel: CancellationToken,
}

/// Process-lifetime mapping from session id to cancel signal.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
    next_generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh cancel signal for `id`, interrupting any stream that
    /// already uses it.
    ///
    /// The previous signal is set and the task yields once so the old driver
    /// gets a chance to observe it. This is best-effort ordering: the old
    /// driver may still be winding down when the new one starts.
    ///
    /// Whatever entry the insert replaces is cancelled as well, so concurrent
    /// restarts of one id leave exactly one live stream, the registered one.
    pub async fn start_or_restart(&self, id: &str) -> Session {
        let existing = self.sessions.get(id).map(|entry| entry.cancel.clone());
        if let Some(previous) = existing {
            debug!(session_id = %id, "Restarting session, interrupting previous stream");
            previous.cancel();
            tokio::task::yield_now().await;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let displaced = self.sessions.insert(
            id.to_string(),
            SessionEntry {
                generation,
                cancel: cancel.clone(),
            },
        );
        // A concurrent restart may have registered between our read and insert.
        if let Some(displaced) = displaced {
            displaced.cancel.cancel();
        }
        debug!(session_id = %id, generation, "Session registered");

        Session {
            id: id.to_string(),
            generation,
            cancel,
        }
    }

    /// Sets the cancel signal of `id`.
    ///
    /// Returns `false` when no stream is registered under `id`.
    pub fn interrupt(&self, id: &str) -> bool {
        match self.sessions.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                debug!(session_id = %id, "Session interrupted");
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `id` regardless of which stream installed it.
    pub fn remove(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            debug!(session_id = %id, "Session removed");
        }
    }

    /// Removes the entry for `session` only if it was installed for that
    /// session.
    ///
    /// A stream superseded by a restart must not evict its successor's entry.
    pub fn release(&self, session: &Session) {
        let removed = self
            .sessions
            .remove_if(&session.id, |_, entry| entry.generation == session.generation);
        if removed.is_some() {
            debug!(session_id = %session.id, "Session released");
        }
    }

    /// True when a stream is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
