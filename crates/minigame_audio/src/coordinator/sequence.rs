//! Sequencer
//!
//! Await-to-completion playback. A sequence captures a token when it starts;
//! starting another sequence bumps the token and the older run stops after
//! the item it is currently playing.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use super::AudioCoordinator;
use crate::backend::{LoadState, PlaybackEnd};

/// Options for [`play_and_wait`](AudioCoordinator::play_and_wait)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOptions {
    /// Overall time limit; `None` uses the configured default
    pub timeout: Option<Duration>,
}

impl WaitOptions {
    /// Wait at most `timeout_ms` milliseconds
    pub const fn timeout_ms(timeout_ms: u64) -> Self {
        Self {
            timeout: Some(Duration::from_millis(timeout_ms)),
        }
    }
}

/// Options for [`play_sequence`](AudioCoordinator::play_sequence)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceOptions {
    /// Time limit for each item; `None` uses the configured default
    pub timeout_per_item: Option<Duration>,
    /// Silence between items; `None` uses the configured default
    pub gap: Option<Duration>,
}

impl SequenceOptions {
    /// Set the per-item timeout (builder pattern)
    pub const fn with_timeout_per_item(mut self, timeout: Duration) -> Self {
        self.timeout_per_item = Some(timeout);
        self
    }

    /// Set the gap between items (builder pattern)
    pub const fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = Some(gap);
        self
    }
}

impl AudioCoordinator {
    /// Play `id` and wait until it finishes
    ///
    /// One deadline covers loading and playback. Resolves:
    /// - `false` if the clip is unknown, does not load in time, or does not start
    /// - `false` for a voice line silenced by another voice while it was loading
    /// - `true` when the instance reaches its natural end
    /// - `false` when the instance is stopped
    /// - `true` when the deadline passes while it is still playing
    pub async fn play_and_wait(&self, id: &str, options: WaitOptions) -> bool {
        let timeout = options.timeout.unwrap_or_else(|| self.inner.config.default_wait_timeout());
        let deadline = Instant::now() + timeout;
        let voice_epoch = self
            .inner
            .voices
            .is_voice(id)
            .then(|| self.lock().voice_epoch);

        match self.wait_until_settled(id, timeout).await {
            Some(LoadState::Loaded) => {}
            Some(state) => {
                log::debug!("Not playing '{id}': {state:?}");
                return false;
            }
            None => return false,
        }

        let (outcome, finished) = self.play_tracked(id, voice_epoch);
        let Some(finished) = finished else {
            log::debug!("'{id}' did not start: {outcome:?}");
            return false;
        };

        match tokio::time::timeout_at(deadline, finished).await {
            Ok(Ok(PlaybackEnd::Ended)) => true,
            Ok(Ok(PlaybackEnd::Stopped) | Err(_)) => false,
            Err(_) => {
                log::debug!(
                    "{}",
                    crate::AudioError::TimeoutExceeded {
                        id: id.to_string(),
                        timeout,
                    }
                );
                true
            }
        }
    }

    /// Play `ids` back to back, superseding any sequence already running
    pub async fn play_sequence<S: AsRef<str>>(&self, ids: &[S], options: SequenceOptions) {
        let token = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let wait = WaitOptions {
            timeout: options.timeout_per_item,
        };
        let gap = options.gap.unwrap_or_else(|| self.inner.config.default_sequence_gap());

        log::debug!("Sequence #{token} started ({} items)", ids.len());

        for (index, id) in ids.iter().enumerate() {
            if !self.is_current_sequence(token) {
                log::debug!("Sequence #{token} superseded before '{}'", id.as_ref());
                return;
            }

            self.play_and_wait(id.as_ref(), wait).await;

            let is_last = index + 1 == ids.len();
            if !is_last && !gap.is_zero() {
                if !self.is_current_sequence(token) {
                    return;
                }
                tokio::time::sleep(gap).await;
            }
        }

        if self.is_current_sequence(token) {
            log::debug!("Sequence #{token} finished");
        }
    }

    /// Abandon every running sequence after its current item
    pub fn cancel_sequences(&self) {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current_sequence(&self, token: u64) -> bool {
        self.inner.sequence.load(Ordering::SeqCst) == token
    }
}
