//! Voice interrupt channel
//!
//! Spoken lines (guidance, prompts, correct-answer stingers) are mutually
//! exclusive: starting one silences every other. Sound effects are not
//! affected and may overlap freely.

use super::{AudioCoordinator, WaitOptions};
use crate::backend::PlaybackEnd;
use crate::registry::UnlockPhase;

/// Naming convention for voice-like ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePolicy {
    prefixes: Vec<String>,
}

impl VoicePolicy {
    /// Policy matching ids that start with any of `prefixes`
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).filter(|p: &String| !p.is_empty()).collect(),
        }
    }

    /// Check whether `id` is reserved for spoken content
    pub fn is_voice(&self, id: &str) -> bool {
        self.prefixes.iter().any(|prefix| id.starts_with(prefix.as_str()))
    }

    /// Configured prefixes
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl AudioCoordinator {
    /// Silence every voice line, then play `id` as soon as it is ready
    pub fn play_voice_interrupt(&self, id: &str) {
        if !self.interrupt_voices_for(id) {
            return;
        }
        self.play_when_ready(id);
    }

    /// Silence every voice line, then play `id` and wait for it to finish
    ///
    /// Resolves like [`play_and_wait`](Self::play_and_wait); false when `id`
    /// is unknown or unlocking is in progress.
    pub async fn play_voice_interrupt_and_wait(&self, id: &str, options: WaitOptions) -> bool {
        if !self.interrupt_voices_for(id) {
            return false;
        }
        self.play_and_wait(id, options).await
    }

    /// Stop every playing or pending voice line
    ///
    /// Call before anything else grabs the output device (speech capture, for example).
    pub fn stop_all_voices(&self) {
        self.silence_voices();
    }

    /// Shared prelude; returns false when the interrupt must not happen
    fn interrupt_voices_for(&self, id: &str) -> bool {
        {
            let registry = self.lock();
            if registry.handle(id).is_none() {
                log::debug!("Voice interrupt for unknown id '{id}' ignored");
                return false;
            }
            if registry.phase == UnlockPhase::Unlocking {
                log::debug!("Ignoring voice interrupt '{id}' while unlocking");
                return false;
            }
        }
        self.silence_voices();
        true
    }

    fn silence_voices(&self) {
        let voices = &self.inner.voices;
        let mut registry = self.lock();
        registry.voice_epoch += 1;

        let cancelled = registry.cancel_pending_where(|id| voices.is_voice(id));

        let playing: Vec<_> = registry
            .handles()
            .filter(|(id, handle)| voices.is_voice(id) && self.backend().is_playing(handle.key))
            .map(|(id, handle)| (id.clone(), handle.key))
            .collect();

        for (id, key) in &playing {
            log::debug!("Interrupting voice '{id}'");
            self.backend().stop(*key, None);
            registry.instances.finish(id, PlaybackEnd::Stopped);
        }

        if cancelled > 0 || !playing.is_empty() {
            log::trace!("Silenced {} voices, cancelled {cancelled} pending", playing.len());
        }
    }
}
