//! Sound registry
//!
//! Session-scoped bookkeeping behind the coordinator: one clip handle per id,
//! last-played timestamps for cooldowns, pending deferred-ready listeners,
//! dynamic source URIs, live instances and the unlock phase.
//!
//! The registry is plain data. The coordinator keeps it behind a mutex and
//! never holds that lock across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::{AudioBackend, ClipKey, ClipSpec, LoadReporter, LoadState};
use crate::catalog::{AssetCatalog, CatalogEntry, SoundId};
use crate::instances::InstanceTracker;

/// Where the session is in the one-time unlock procedure
///
/// A single enum keeps "unlocking" and "unlocked" mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnlockPhase {
    /// No gesture seen yet
    Locked,
    /// Unlock and warm-up in progress; playback requests are ignored
    Unlocking,
    /// Done for the rest of the session
    Unlocked,
}

/// One loadable clip and its load state
pub(crate) struct ClipHandle {
    /// Backend key
    pub(crate) key: ClipKey,
    /// What the backend loads
    pub(crate) spec: ClipSpec,
    /// Minimum time between plays
    pub(crate) cooldown: Duration,
    state: Arc<watch::Sender<LoadState>>,
}

impl ClipHandle {
    fn new(key: ClipKey, spec: ClipSpec, cooldown: Duration) -> Self {
        let (state, _) = watch::channel(LoadState::Unloaded);
        Self {
            key,
            spec,
            cooldown,
            state: Arc::new(state),
        }
    }

    /// Current load state
    pub(crate) fn load_state(&self) -> LoadState {
        *self.state.borrow()
    }

    /// Receiver that observes every later state change
    pub(crate) fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    /// Move `Unloaded -> Loading` and hand the clip to the backend
    ///
    /// Returns false when loading was already requested earlier.
    pub(crate) fn begin_load(&self, id: &str, backend: &dyn AudioBackend) -> bool {
        if self.load_state() != LoadState::Unloaded {
            return false;
        }

        self.state.send_replace(LoadState::Loading);
        log::debug!("Loading '{id}' from {} ({})", self.spec.uri, self.key);
        let reporter = LoadReporter::new(id.to_string(), self.spec.uri.clone(), Arc::clone(&self.state));
        backend.load(self.key, &self.spec, reporter);
        true
    }
}

/// Armed deferred-ready listener
struct PendingReady {
    ticket: u64,
    task: JoinHandle<()>,
}

/// Registry state for one audio session
pub(crate) struct Registry {
    /// Catalog ids in catalog order
    catalog_ids: Vec<SoundId>,
    handles: HashMap<SoundId, ClipHandle>,
    last_played_at: HashMap<SoundId, Instant>,
    pending_ready: HashMap<SoundId, PendingReady>,
    dynamic_uris: HashMap<SoundId, String>,
    /// Instances started through the playback controller
    pub(crate) instances: InstanceTracker,
    /// Unlock procedure progress
    pub(crate) phase: UnlockPhase,
    /// Bumped every time voices are silenced
    pub(crate) voice_epoch: u64,
    next_key: u64,
    next_ticket: u64,
}

impl Registry {
    /// Create one unloaded handle per catalog entry
    pub(crate) fn from_catalog(catalog: &AssetCatalog, default_streaming: bool) -> Self {
        let mut registry = Self {
            catalog_ids: Vec::with_capacity(catalog.len()),
            handles: HashMap::with_capacity(catalog.len()),
            last_played_at: HashMap::new(),
            pending_ready: HashMap::new(),
            dynamic_uris: HashMap::new(),
            instances: InstanceTracker::new(),
            phase: UnlockPhase::Locked,
            voice_epoch: 0,
            next_key: 0,
            next_ticket: 0,
        };

        for entry in catalog.iter() {
            let spec = Self::spec_for(entry, &entry.uri, default_streaming);
            registry.insert_handle(&entry.id, spec, entry.cooldown());
            registry.catalog_ids.push(entry.id.clone());
        }
        registry
    }

    /// Clip spec for a catalog entry, optionally pointed at another URI
    pub(crate) fn spec_for(entry: &CatalogEntry, uri: &str, default_streaming: bool) -> ClipSpec {
        ClipSpec {
            uri: uri.to_string(),
            looping: entry.looping,
            volume: entry.volume,
            streaming: entry.streaming.unwrap_or(default_streaming),
        }
    }

    /// Catalog ids in catalog order
    pub(crate) fn catalog_ids(&self) -> &[SoundId] {
        &self.catalog_ids
    }

    /// Look up a handle
    pub(crate) fn handle(&self, id: &str) -> Option<&ClipHandle> {
        self.handles.get(id)
    }

    /// Iterate all handles
    pub(crate) fn handles(&self) -> impl Iterator<Item = (&SoundId, &ClipHandle)> {
        self.handles.iter()
    }

    /// Create (or replace) the handle for `id` with a fresh clip key
    pub(crate) fn insert_handle(&mut self, id: &str, spec: ClipSpec, cooldown: Duration) -> &ClipHandle {
        let key = ClipKey::new(self.next_key);
        self.next_key += 1;
        self.handles.insert(id.to_string(), ClipHandle::new(key, spec, cooldown));
        &self.handles[id]
    }

    /// Remove the handle for `id`
    pub(crate) fn remove_handle(&mut self, id: &str) -> Option<ClipHandle> {
        self.handles.remove(id)
    }

    /// Check whether `id` was played less than its cooldown ago
    pub(crate) fn is_cooling_down(&self, id: &str, cooldown: Duration, now: Instant) -> bool {
        if cooldown.is_zero() {
            return false;
        }
        self.last_played_at
            .get(id)
            .is_some_and(|&last| now < last + cooldown)
    }

    /// Record a play for cooldown tracking
    pub(crate) fn mark_played(&mut self, id: &str, now: Instant) {
        self.last_played_at.insert(id.to_string(), now);
    }

    /// Check for an armed deferred-ready listener
    pub(crate) fn has_pending(&self, id: &str) -> bool {
        self.pending_ready.contains_key(id)
    }

    /// Ticket for the next listener; lets a finishing listener tell itself apart from a newer one
    pub(crate) fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Store an armed listener, cancelling any previous one for the same id
    pub(crate) fn arm_pending(&mut self, id: &str, ticket: u64, task: JoinHandle<()>) {
        if let Some(previous) = self.pending_ready.insert(id.to_string(), PendingReady { ticket, task }) {
            previous.task.abort();
        }
    }

    /// Clear the listener for `id` if it is still the one holding `ticket`
    pub(crate) fn clear_pending(&mut self, id: &str, ticket: u64) -> bool {
        if self.pending_ready.get(id).is_some_and(|pending| pending.ticket == ticket) {
            self.pending_ready.remove(id);
            true
        } else {
            false
        }
    }

    /// Cancel the listener for `id`
    pub(crate) fn cancel_pending(&mut self, id: &str) -> bool {
        self.pending_ready.remove(id).map(|pending| pending.task.abort()).is_some()
    }

    /// Cancel every listener whose id matches; returns how many were cancelled
    pub(crate) fn cancel_pending_where(&mut self, mut matches: impl FnMut(&str) -> bool) -> usize {
        let doomed: Vec<SoundId> = self
            .pending_ready
            .keys()
            .filter(|id| matches(id))
            .cloned()
            .collect();
        doomed.iter().filter(|id| self.cancel_pending(id)).count()
    }

    /// URI most recently requested through the dynamic-source API
    pub(crate) fn dynamic_uri(&self, id: &str) -> Option<&str> {
        self.dynamic_uris.get(id).map(String::as_str)
    }

    /// Remember the dynamic URI for `id`
    pub(crate) fn set_dynamic_uri(&mut self, id: &str, uri: &str) {
        self.dynamic_uris.insert(id.to_string(), uri.to_string());
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for pending in self.pending_ready.values() {
            pending.task.abort();
        }
    }
}
