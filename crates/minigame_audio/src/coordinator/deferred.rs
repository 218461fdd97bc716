//! Deferred-ready channel
//!
//! `play_when_ready` makes the first tap play the right sound even when the
//! clip is still loading. At most one listener is armed per id; repeated taps
//! while loading do not pile up extra plays.

use tokio::runtime::Handle;

use super::loader::settled;
use super::AudioCoordinator;
use crate::backend::LoadState;
use crate::registry::UnlockPhase;

impl AudioCoordinator {
    /// Play `id` now if it is loaded, otherwise as soon as it finishes loading
    ///
    /// Must be called from inside a Tokio runtime when the clip is not loaded
    /// yet; outside one the request is dropped with a warning.
    pub fn play_when_ready(&self, id: &str) {
        let mut registry = self.lock();

        if registry.phase == UnlockPhase::Unlocking {
            log::debug!("Ignoring play_when_ready('{id}') while unlocking");
            return;
        }

        let state = registry.handle(id).map(|handle| handle.load_state());
        match state {
            // Unknown ids go through `play` so they get the usual warning
            None | Some(LoadState::Loaded) => {
                drop(registry);
                self.play(id);
                return;
            }
            Some(LoadState::LoadError) => {
                log::debug!("'{id}' failed to load; nothing to wait for");
                return;
            }
            Some(LoadState::Unloaded | LoadState::Loading) => {}
        }

        if registry.has_pending(id) {
            log::trace!("'{id}' already has a pending ready listener");
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            log::warn!("play_when_ready('{id}') called outside a Tokio runtime");
            return;
        };

        let Some(handle) = registry.handle(id) else {
            return;
        };
        handle.begin_load(id, self.backend());
        let state = handle.subscribe();

        let ticket = registry.next_ticket();
        let coordinator = self.downgrade();
        let sound_id = id.to_string();

        // Spawned while the registry is locked, so the task cannot clear its
        // entry before the entry exists
        let task = runtime.spawn(async move {
            let outcome = settled(state).await;
            let Some(coordinator) = Self::upgrade(&coordinator) else {
                return;
            };
            if !coordinator.lock().clear_pending(&sound_id, ticket) {
                return;
            }
            if outcome == LoadState::Loaded {
                coordinator.play(&sound_id);
            }
        });

        registry.arm_pending(id, ticket, task);
        log::trace!("Armed ready listener #{ticket} for '{id}'");
    }

    /// Check whether a deferred-ready listener is armed for `id`
    pub fn is_pending(&self, id: &str) -> bool {
        self.lock().has_pending(id)
    }
}
