//! Per-browser-session synchronizers.
//!
//! Each browser session gets its own transcript; all of them share the one
//! backend transport. Nothing here is persisted: an evicted or restarted
//! session starts over with an empty transcript.

use crate::sync::{SyncOptions, Synchronizer};
use crate::transport::Transport;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct SessionEntry {
    synchronizer: Arc<Synchronizer>,
    last_seen: Instant,
}

pub struct SessionRegistry {
    transport: Arc<dyn Transport>,
    options: SyncOptions,
    sessions: DashMap<Uuid, SessionEntry>,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn Transport>, options: SyncOptions) -> Self {
        Self {
            transport,
            options,
            sessions: DashMap::new(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Synchronizer for `id`, created on first use.
    pub fn open(&self, id: Uuid) -> Arc<Synchronizer> {
        let mut entry = self.sessions.entry(id).or_insert_with(|| {
            tracing::debug!(session = %id, "Opening chat session");
            SessionEntry {
                synchronizer: Arc::new(Synchronizer::new(self.transport.clone(), self.options)),
                last_seen: Instant::now(),
            }
        });
        entry.last_seen = Instant::now();
        entry.synchronizer.clone()
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Synchronizer>> {
        self.sessions
            .get(id)
            .map(|entry| entry.synchronizer.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions not used for `max_idle`; returns how many were dropped.
    ///
    /// Requests already holding a synchronizer keep it alive until they finish.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() < max_idle);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.sessions.len(), "Evicted idle chat sessions");
        }
        evicted
    }
}
