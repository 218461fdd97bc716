//! Audio backend implementations
//!
//! Platform-independent abstraction over whatever actually decodes and plays
//! clips. The coordinator only needs a backend that can load a URI into a
//! playable clip and report lifecycle events back through the reporters below.

#[cfg(feature = "rodio")]
pub mod rodio_backend;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::catalog::SoundId;
use crate::AudioError;

/// Backend-facing key for one loaded clip
///
/// Keys are never reused, so a clip recreated for a new dynamic URI gets a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipKey(u64);

impl ClipKey {
    /// Create a clip key
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw key value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

/// Handle to one playing instance of a clip, assigned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Create an instance id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Everything a backend needs to load a clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    /// Source URI
    pub uri: String,
    /// Loop until stopped
    pub looping: bool,
    /// Configured volume (0.0 to 1.0)
    pub volume: f32,
    /// Decode from the source on each play instead of buffering the whole clip
    ///
    /// Backends without a streaming path may treat this as a hint.
    pub streaming: bool,
}

/// Load lifecycle of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Nothing requested yet
    Unloaded,
    /// Backend is loading the clip
    Loading,
    /// Clip can be played
    Loaded,
    /// Backend reported a load error; permanent for the session
    LoadError,
}

impl LoadState {
    /// Loaded or failed; no further transitions will happen
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Loaded | Self::LoadError)
    }
}

/// How a playing instance finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// Reached its natural end
    Ended,
    /// Stopped before the end
    Stopped,
}

/// One-shot channel a backend uses to report the outcome of a load
///
/// Consuming methods make "reported once" a property of the type.
pub struct LoadReporter {
    id: SoundId,
    uri: String,
    state: Arc<watch::Sender<LoadState>>,
}

impl LoadReporter {
    pub(crate) fn new(id: SoundId, uri: String, state: Arc<watch::Sender<LoadState>>) -> Self {
        Self { id, uri, state }
    }

    /// Sound id being loaded
    pub fn id(&self) -> &str {
        &self.id
    }

    /// URI being loaded
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Report that the clip is ready to play
    pub fn loaded(self) {
        log::debug!("Loaded '{}' from {}", self.id, self.uri);
        self.state.send_replace(LoadState::Loaded);
    }

    /// Report a decode or network failure
    pub fn failed(self, reason: impl fmt::Display) {
        let error = AudioError::LoadFailure {
            id: self.id,
            uri: self.uri,
            reason: reason.to_string(),
        };
        log::warn!("{error}");
        self.state.send_replace(LoadState::LoadError);
    }
}

impl fmt::Debug for LoadReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadReporter")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .finish_non_exhaustive()
    }
}

/// Shared completion slot for a playing instance
///
/// The first resolution wins; later ones are ignored. Both the backend's
/// reporter and the coordinator's `stop` path hold a clone.
#[derive(Clone)]
pub(crate) struct Completion(Arc<Mutex<Option<oneshot::Sender<PlaybackEnd>>>>);

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<PlaybackEnd>) {
        let (tx, rx) = oneshot::channel();
        (Self(Arc::new(Mutex::new(Some(tx)))), rx)
    }

    pub(crate) fn resolve(&self, end: PlaybackEnd) {
        if let Some(tx) = self.0.lock().take() {
            // Receiver may be gone (fire-and-forget play); nothing to do then
            let _ = tx.send(end);
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.0.lock().is_none()
    }
}

/// Channel a backend uses to report how one playing instance finished
pub struct InstanceReporter {
    completion: Completion,
}

impl InstanceReporter {
    pub(crate) fn new(completion: Completion) -> Self {
        Self { completion }
    }

    /// Reporter whose outcome nobody is waiting on
    pub fn detached() -> Self {
        let (completion, _rx) = Completion::channel();
        Self { completion }
    }

    /// Instance played to its natural end
    pub fn ended(self) {
        self.completion.resolve(PlaybackEnd::Ended);
    }

    /// Instance was stopped before its end
    pub fn stopped(self) {
        self.completion.resolve(PlaybackEnd::Stopped);
    }
}

impl fmt::Debug for InstanceReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceReporter")
            .field("resolved", &self.completion.is_resolved())
            .finish()
    }
}

/// Audio backend trait for platform abstraction
///
/// Implementations must be callable from any task. Reporters may be invoked
/// synchronously from inside these methods or later from another thread.
pub trait AudioBackend: Send + Sync {
    /// Begin loading a clip; the backend must eventually call exactly one of
    /// `reporter.loaded()` or `reporter.failed(..)`
    fn load(&self, clip: ClipKey, spec: &ClipSpec, reporter: LoadReporter);

    /// Release a clip; any playing instances are stopped
    fn unload(&self, clip: ClipKey);

    /// Start a new playing instance of a loaded clip
    fn play(&self, clip: ClipKey, reporter: InstanceReporter) -> Result<InstanceId, AudioError>;

    /// Stop one instance, or every instance of the clip when `instance` is `None`
    fn stop(&self, clip: ClipKey, instance: Option<InstanceId>);

    /// Set clip volume (0.0 to 1.0)
    fn set_volume(&self, clip: ClipKey, volume: f32);

    /// Current clip volume
    fn volume(&self, clip: ClipKey) -> f32;

    /// Check if any instance of the clip is playing
    fn is_playing(&self, clip: ClipKey) -> bool;
}

/// State of the platform audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Output blocked until resumed from a user gesture
    Suspended,
    /// Output running
    Running,
    /// Context torn down
    Closed,
}

/// Platform audio context that may start out suspended
#[async_trait]
pub trait AudioContext: Send + Sync {
    /// Current context state
    fn state(&self) -> ContextState;

    /// Try to resume a suspended context
    async fn resume(&self) -> Result<(), AudioError>;
}
