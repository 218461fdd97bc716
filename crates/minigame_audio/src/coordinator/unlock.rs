//! Unlock sequencer
//!
//! Runs once per session after the first user gesture: resumes the platform
//! audio context, then absorbs first-play output latency by playing each
//! warm-up clip at volume 0 for a moment. Platforms that dump queued sounds
//! on resume only preload the warm-up clips instead.

use parking_lot::Mutex;

use super::AudioCoordinator;
use crate::backend::{ContextState, InstanceReporter, LoadState};
use crate::registry::{Registry, UnlockPhase};
use crate::AudioError;

/// Finishes the unlock when dropped, even if warm-up failed or the future was dropped
struct UnlockGuard<'a> {
    registry: &'a Mutex<Registry>,
}

impl Drop for UnlockGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock().phase = UnlockPhase::Unlocked;
    }
}

impl AudioCoordinator {
    /// Unlock with the configured warm-up ids
    pub async fn unlock(&self) {
        let warmup_ids = self.inner.config.warmup_ids.clone();
        self.unlock_and_warmup(&warmup_ids).await;
    }

    /// Resume the audio context and warm up `warmup_ids`
    ///
    /// Only the first call does anything; later or concurrent calls return
    /// immediately. Playback requests made while this runs are ignored.
    pub async fn unlock_and_warmup<S: AsRef<str>>(&self, warmup_ids: &[S]) {
        {
            let mut registry = self.lock();
            if registry.phase != UnlockPhase::Locked {
                return;
            }
            registry.phase = UnlockPhase::Unlocking;
        }
        let _guard = UnlockGuard {
            registry: &self.inner.registry,
        };

        self.resume_context().await;

        if self.inner.quirks.should_skip_audible_warmup() {
            log::debug!("Skipping audible warm-up ('{}' quirks)", self.inner.quirks.name());
            for id in warmup_ids {
                self.ensure_loaded(id.as_ref());
            }
        } else if let Err(e) = self.warm_up_all(warmup_ids).await {
            log::warn!("Warm-up aborted: {e}");
        }

        log::info!("Audio unlocked");
    }

    async fn resume_context(&self) {
        let Some(context) = self.inner.context.as_ref() else {
            return;
        };
        if context.state() != ContextState::Suspended {
            return;
        }

        // Some platforms only resume on a later gesture
        match context.resume().await {
            Ok(()) => log::debug!("Audio context resumed"),
            Err(e) => log::debug!("Audio context still suspended: {e}"),
        }
    }

    async fn warm_up_all<S: AsRef<str>>(&self, warmup_ids: &[S]) -> Result<(), AudioError> {
        for id in warmup_ids {
            self.warm_up(id.as_ref()).await?;
        }
        Ok(())
    }

    /// Play one clip at volume 0 briefly, then restore its volume
    async fn warm_up(&self, id: &str) -> Result<(), AudioError> {
        match self.wait_until_settled(id, self.inner.config.warmup_load_timeout()).await {
            Some(LoadState::Loaded) => {}
            Some(state) => {
                log::debug!("Skipping warm-up of '{id}': {state:?}");
                return Ok(());
            }
            None => {
                log::debug!("Skipping warm-up of '{id}': unknown or still loading");
                return Ok(());
            }
        }

        let Some((key, volume)) = self.lock().handle(id).map(|handle| (handle.key, handle.spec.volume)) else {
            return Ok(());
        };

        let backend = self.backend();
        // Muting would silence the live instance too
        if backend.is_playing(key) {
            log::debug!("Skipping warm-up of '{id}': already playing");
            return Ok(());
        }

        backend.set_volume(key, 0.0);
        let played = backend.play(key, InstanceReporter::detached());
        if let Ok(instance) = played {
            tokio::time::sleep(self.inner.config.warmup_delay()).await;
            backend.stop(key, Some(instance));
        }
        backend.set_volume(key, volume);

        log::trace!("Warmed up '{id}'");
        played.map(|_| ())
    }
}
