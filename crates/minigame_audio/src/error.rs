//! Audio error types
//!
//! None of these cross the coordinator's public surface. They are produced by
//! backends and internal helpers, logged, and turned into "the sound did not play".

use std::time::Duration;
use thiserror::Error;

/// Errors raised inside the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Caller passed an id that is not in the catalog
    #[error("Unknown sound id: {0}")]
    UnknownId(String),

    /// Backend reported a decode or network error for a clip
    #[error("Failed to load '{id}' from {uri}: {reason}")]
    LoadFailure {
        /// Sound id
        id: String,
        /// URI the backend tried to load
        uri: String,
        /// Backend supplied reason
        reason: String,
    },

    /// Platform audio context refused to resume (usually needs another gesture)
    #[error("Audio context resume failed: {0}")]
    ContextResumeFailure(String),

    /// A wait ran out of time
    #[error("Timed out after {timeout:?} waiting on '{id}'")]
    TimeoutExceeded {
        /// Sound id being waited on
        id: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// Backend could not start or control playback
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Backend could not open its output device
    #[error("Audio backend initialization failed: {0}")]
    BackendInitFailed(String),
}
