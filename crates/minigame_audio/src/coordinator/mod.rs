//! Audio resource & playback coordinator
//!
//! One [`AudioCoordinator`] is built per session and handed to every scene
//! that plays sound. It is a cheap `Clone` handle over shared state, so scenes
//! can keep their own copy.
//!
//! ## Components
//!
//! - **Load supervisor** (`loader`): bulk and on-demand loading, dynamic sources
//! - **Unlock sequencer** (`unlock`): context resume and warm-up after the first gesture
//! - **Playback controller** (`playback`): synchronous play/stop with cooldowns
//! - **Deferred-ready channel** (`deferred`): play as soon as a clip finishes loading
//! - **Voice interrupt channel** (`voice`): spoken lines never overlap
//! - **Sequencer** (`sequence`): await-to-completion playback and cancellable sequences
//!
//! Nothing here returns an error to the caller. Every failure is logged and
//! degrades to "the sound did not play".

mod deferred;
mod loader;
mod playback;
mod sequence;
mod unlock;
mod voice;

#[cfg(test)]
mod tests;

pub use loader::LoadSummary;
pub use playback::PlayOutcome;
pub use sequence::{SequenceOptions, WaitOptions};
pub use voice::VoicePolicy;

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use crate::backend::{AudioBackend, AudioContext, LoadState};
use crate::catalog::AssetCatalog;
use crate::config::CoordinatorConfig;
use crate::quirks::{PlaybackQuirks, StandardQuirks};
use crate::registry::{Registry, UnlockPhase};

/// Shared coordinator state
struct Inner {
    registry: Mutex<Registry>,
    backend: Arc<dyn AudioBackend>,
    context: Option<Arc<dyn AudioContext>>,
    quirks: Box<dyn PlaybackQuirks>,
    voices: VoicePolicy,
    config: CoordinatorConfig,
    /// Token of the most recently started sequence
    sequence: AtomicU64,
}

/// Audio resource & playback coordinator
#[derive(Clone)]
pub struct AudioCoordinator {
    inner: Arc<Inner>,
}

impl AudioCoordinator {
    /// Start building a coordinator for a catalog and backend
    pub fn builder(catalog: AssetCatalog, backend: Arc<dyn AudioBackend>) -> AudioCoordinatorBuilder {
        AudioCoordinatorBuilder::new(catalog, backend)
    }

    /// Coordinator with default config, no audio context and standard quirks
    pub fn new(catalog: AssetCatalog, backend: Arc<dyn AudioBackend>) -> Self {
        Self::builder(catalog, backend).build()
    }

    /// Check whether `id` has a handle that has not permanently failed
    pub fn has(&self, id: &str) -> bool {
        self.lock()
            .handle(id)
            .is_some_and(|handle| handle.load_state() != LoadState::LoadError)
    }

    /// Current load state of `id`, `None` for unknown ids
    pub fn load_state(&self, id: &str) -> Option<LoadState> {
        self.lock().handle(id).map(|handle| handle.load_state())
    }

    /// Check whether the one-time unlock has completed
    pub fn is_unlocked(&self) -> bool {
        self.lock().phase == UnlockPhase::Unlocked
    }

    /// Check whether the unlock procedure is running right now
    pub fn is_unlocking(&self) -> bool {
        self.lock().phase == UnlockPhase::Unlocking
    }

    /// Active configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Voice-like id policy
    pub fn voice_policy(&self) -> &VoicePolicy {
        &self.inner.voices
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry.lock()
    }

    fn backend(&self) -> &dyn AudioBackend {
        self.inner.backend.as_ref()
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl std::fmt::Debug for AudioCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCoordinator")
            .field("quirks", &self.inner.quirks.name())
            .field("voices", &self.inner.voices)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AudioCoordinator`]
pub struct AudioCoordinatorBuilder {
    catalog: AssetCatalog,
    backend: Arc<dyn AudioBackend>,
    context: Option<Arc<dyn AudioContext>>,
    quirks: Box<dyn PlaybackQuirks>,
    config: CoordinatorConfig,
}

impl AudioCoordinatorBuilder {
    fn new(catalog: AssetCatalog, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            catalog,
            backend,
            context: None,
            quirks: Box::new(StandardQuirks),
            config: CoordinatorConfig::default(),
        }
    }

    /// Platform audio context resumed during unlock
    pub fn context(mut self, context: Arc<dyn AudioContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Platform quirks consulted during unlock
    pub fn quirks(mut self, quirks: Box<dyn PlaybackQuirks>) -> Self {
        self.quirks = quirks;
        self
    }

    /// Coordinator configuration
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the coordinator; every catalog entry starts `Unloaded`
    pub fn build(self) -> AudioCoordinator {
        let registry = Registry::from_catalog(&self.catalog, self.config.default_streaming);
        let voices = VoicePolicy::new(self.config.voice_prefixes.iter().cloned());

        log::info!(
            "Audio coordinator ready: {} sounds, '{}' quirks, context {}",
            self.catalog.len(),
            self.quirks.name(),
            if self.context.is_some() { "attached" } else { "absent" },
        );

        AudioCoordinator {
            inner: Arc::new(Inner {
                registry: Mutex::new(registry),
                backend: self.backend,
                context: self.context,
                quirks: self.quirks,
                voices,
                config: self.config,
                sequence: AtomicU64::new(0),
            }),
        }
    }
}
