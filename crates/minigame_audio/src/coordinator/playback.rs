//! Playback controller
//!
//! Synchronous play/stop surface. `play` never queues or retries; anything
//! that cannot start right now is reported through [`PlayOutcome`] and
//! otherwise ignored.

use tokio::sync::oneshot;
use tokio::time::Instant;

use super::AudioCoordinator;
use crate::backend::{Completion, InstanceId, InstanceReporter, LoadState, PlaybackEnd};
use crate::registry::UnlockPhase;

/// Result of a [`play`](AudioCoordinator::play) request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new instance started
    Started(InstanceId),
    /// Unlock in progress; request dropped
    Unlocking,
    /// Played less than its cooldown ago
    CoolingDown,
    /// Id is not in the catalog
    UnknownId,
    /// Looping clip already has a playing instance
    AlreadyLooping,
    /// Clip is not loaded yet (or failed to load)
    NotReady(LoadState),
    /// Backend refused to start the instance
    Failed,
    /// A newer voice line or `stop_all_voices` superseded this voice while it loaded
    Interrupted,
}

impl PlayOutcome {
    /// Instance id when playback started
    pub const fn instance(self) -> Option<InstanceId> {
        match self {
            Self::Started(instance) => Some(instance),
            _ => None,
        }
    }

    /// Check whether playback started
    pub const fn is_started(self) -> bool {
        matches!(self, Self::Started(_))
    }
}

impl AudioCoordinator {
    /// Play `id` once if it is loaded and allowed to play right now
    ///
    /// Unloaded clips begin loading but are not played later; use
    /// [`play_when_ready`](Self::play_when_ready) for that.
    pub fn play(&self, id: &str) -> PlayOutcome {
        self.play_tracked(id, None).0
    }

    /// Play and hand back a receiver that resolves when the instance finishes
    ///
    /// With `voice_epoch` set, the play is dropped when voices were silenced
    /// after that epoch was read.
    pub(super) fn play_tracked(
        &self,
        id: &str,
        voice_epoch: Option<u64>,
    ) -> (PlayOutcome, Option<oneshot::Receiver<PlaybackEnd>>) {
        let mut registry = self.lock();

        if voice_epoch.is_some_and(|epoch| epoch != registry.voice_epoch) {
            log::debug!("Voice '{id}' was interrupted before it started");
            return (PlayOutcome::Interrupted, None);
        }

        if registry.phase == UnlockPhase::Unlocking {
            log::debug!("Ignoring play('{id}') while unlocking");
            return (PlayOutcome::Unlocking, None);
        }

        let Some(handle) = registry.handle(id) else {
            log::warn!("{}", crate::AudioError::UnknownId(id.to_string()));
            return (PlayOutcome::UnknownId, None);
        };

        let now = Instant::now();
        if registry.is_cooling_down(id, handle.cooldown, now) {
            log::trace!("'{id}' is cooling down");
            return (PlayOutcome::CoolingDown, None);
        }

        if handle.spec.looping && self.backend().is_playing(handle.key) {
            log::debug!("'{id}' is already looping");
            return (PlayOutcome::AlreadyLooping, None);
        }

        // Never plays on this call, even if the backend loads synchronously
        let state = handle.load_state();
        if state != LoadState::Loaded {
            handle.begin_load(id, self.backend());
            log::debug!("'{id}' not ready to play ({state:?})");
            return (PlayOutcome::NotReady(state), None);
        }

        let key = handle.key;
        let (completion, rx) = Completion::channel();
        registry.mark_played(id, now);

        match self.backend().play(key, InstanceReporter::new(completion.clone())) {
            Ok(instance) => {
                registry.instances.track(id, instance, completion);
                (PlayOutcome::Started(instance), Some(rx))
            }
            Err(e) => {
                log::warn!("Failed to play '{id}': {e}");
                (PlayOutcome::Failed, None)
            }
        }
    }

    /// Stop every instance of `id`; unknown or silent ids are fine
    pub fn stop(&self, id: &str) {
        let mut registry = self.lock();
        let Some(key) = registry.handle(id).map(|handle| handle.key) else {
            return;
        };

        self.backend().stop(key, None);
        registry.instances.finish(id, PlaybackEnd::Stopped);
    }

    /// Stop every instance of every id
    pub fn stop_all(&self) {
        let mut registry = self.lock();
        for (_, handle) in registry.handles() {
            self.backend().stop(handle.key, None);
        }
        let stopped = registry.instances.finish_all(PlaybackEnd::Stopped);
        log::debug!("Stopped all sounds ({stopped} tracked instances)");
    }

    /// Check if any instance of `id` is playing
    pub fn is_playing(&self, id: &str) -> bool {
        let registry = self.lock();
        registry
            .handle(id)
            .is_some_and(|handle| self.backend().is_playing(handle.key))
    }
}
