//! Load supervisor
//!
//! Drives bulk loading at startup and on-demand loading afterwards. A clip
//! that fails to load is logged and counted as settled; it never blocks the
//! rest of the game from starting.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;

use super::AudioCoordinator;
use crate::backend::{ClipSpec, LoadState, PlaybackEnd};
use crate::catalog::SoundId;
use crate::registry::Registry;

/// Outcome of [`load_all`](AudioCoordinator::load_all)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Clips ready to play
    pub loaded: usize,
    /// Clips that failed for the rest of the session
    pub failed: usize,
}

impl LoadSummary {
    /// Total settled clips
    pub const fn total(&self) -> usize {
        self.loaded + self.failed
    }
}

/// Wait until a clip is `Loaded` or `LoadError`
///
/// A handle torn down before settling counts as failed.
pub(super) async fn settled(mut state: watch::Receiver<LoadState>) -> LoadState {
    match state.wait_for(|state| state.is_settled()).await {
        Ok(state) => *state,
        Err(_) => LoadState::LoadError,
    }
}

impl AudioCoordinator {
    /// Load every catalog entry and wait until each one has loaded or failed
    pub async fn load_all(&self) -> LoadSummary {
        let pending: Vec<(SoundId, watch::Receiver<LoadState>)> = {
            let registry = self.lock();
            registry
                .catalog_ids()
                .iter()
                .filter_map(|id| {
                    let handle = registry.handle(id)?;
                    handle.begin_load(id, self.backend());
                    Some((id.clone(), handle.subscribe()))
                })
                .collect()
        };

        let results = join_all(pending.into_iter().map(|(id, state)| async move { (id, settled(state).await) })).await;

        let mut summary = LoadSummary::default();
        for (id, state) in results {
            if state == LoadState::Loaded {
                summary.loaded += 1;
            } else {
                log::debug!("'{id}' unavailable for this session");
                summary.failed += 1;
            }
        }

        log::info!("Loaded {}/{} sounds ({} failed)", summary.loaded, summary.total(), summary.failed);
        summary
    }

    /// Check whether `id` is playable, starting its load if nobody has yet
    pub(super) fn ensure_loaded(&self, id: &str) -> bool {
        let registry = self.lock();
        let Some(handle) = registry.handle(id) else {
            return false;
        };

        match handle.load_state() {
            LoadState::Loaded => true,
            LoadState::Unloaded => {
                handle.begin_load(id, self.backend());
                false
            }
            LoadState::Loading | LoadState::LoadError => false,
        }
    }

    /// Start loading `id` if needed and wait (bounded) for it to settle
    ///
    /// Returns `None` for unknown ids and on timeout.
    pub(super) async fn wait_until_settled(&self, id: &str, timeout: Duration) -> Option<LoadState> {
        self.ensure_loaded(id);
        let state = self.lock().handle(id).map(|handle| handle.subscribe())?;

        match tokio::time::timeout(timeout, settled(state)).await {
            Ok(state) => Some(state),
            Err(_) => {
                log::debug!(
                    "{}",
                    crate::AudioError::TimeoutExceeded {
                        id: id.to_string(),
                        timeout,
                    }
                );
                None
            }
        }
    }

    /// Point `id` at a runtime-chosen URI and start loading it
    ///
    /// Repeating the current URI reuses the existing handle. A new URI tears
    /// the old handle down first. Returns true when a new handle was created.
    pub fn set_dynamic_source(&self, id: &str, uri: &str) -> bool {
        let mut registry = self.lock();

        if registry.dynamic_uri(id) == Some(uri) && registry.handle(id).is_some() {
            return false;
        }

        let (spec, cooldown) = self.dynamic_spec(&registry, id, uri);

        if let Some(old) = registry.remove_handle(id) {
            log::debug!("Replacing source of '{id}': {} -> {uri}", old.spec.uri);
            self.backend().stop(old.key, None);
            self.backend().unload(old.key);
            registry.instances.finish(id, PlaybackEnd::Stopped);
            registry.cancel_pending(id);
        }

        registry.set_dynamic_uri(id, uri);
        let handle = registry.insert_handle(id, spec, cooldown);
        handle.begin_load(id, self.backend());
        true
    }

    /// Set a dynamic source and play it as soon as it is ready
    pub fn play_dynamic(&self, id: &str, uri: &str) {
        self.set_dynamic_source(id, uri);
        self.play_when_ready(id);
    }

    /// Catalog settings for `id` (when present) pointed at `uri`
    fn dynamic_spec(&self, registry: &Registry, id: &str, uri: &str) -> (ClipSpec, Duration) {
        let inherited = registry.handle(id).filter(|_| registry.catalog_ids().iter().any(|known| known == id));
        match inherited {
            Some(handle) => {
                let mut spec = handle.spec.clone();
                spec.uri = uri.to_string();
                (spec, handle.cooldown)
            }
            None => (
                ClipSpec {
                    uri: uri.to_string(),
                    looping: false,
                    volume: 1.0,
                    streaming: self.inner.config.default_streaming,
                },
                Duration::ZERO,
            ),
        }
    }
}
