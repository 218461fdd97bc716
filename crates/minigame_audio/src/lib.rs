//! # Minigame Audio
//!
//! Audio resource loading and playback coordination for mini-games running
//! in hosts that block audio until a user gesture and load clips
//! asynchronously.
//!
//! ## Features
//!
//! - **Bulk and on-demand loading**: one bad asset never blocks the rest
//! - **One-time unlock**: context resume plus silent warm-up, platform aware
//! - **Cooldowns**: rapid repeated taps play once per window
//! - **Deferred-ready play**: the first tap plays even if the clip is still loading
//! - **Voice interrupts**: spoken lines never overlap
//! - **Sequences**: await-to-completion playback with supersession
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use minigame_audio::prelude::*;
//!
//! # async fn run(backend: Arc<dyn AudioBackend>) {
//! let catalog = AssetCatalog::from_entries([
//!     CatalogEntry::new("bgm", "music/theme.mp3").looping().with_volume(0.4),
//!     CatalogEntry::new("click", "sfx/click.mp3").with_cooldown_ms(200),
//!     CatalogEntry::new("guide_intro", "voice/intro.mp3"),
//! ]);
//!
//! let audio = AudioCoordinator::new(catalog, backend);
//! audio.load_all().await;
//!
//! // On the first user gesture
//! audio.unlock_and_warmup(&["click"]).await;
//!
//! audio.play("bgm");
//! audio.play_when_ready("click");
//! audio.play_voice_interrupt("guide_intro");
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod backend;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod quirks;

mod coordinator;
mod error;
mod instances;
mod registry;

pub use coordinator::{
    AudioCoordinator, AudioCoordinatorBuilder, LoadSummary, PlayOutcome, SequenceOptions, VoicePolicy,
    WaitOptions,
};
pub use error::AudioError;

/// Common imports for coordinator users
pub mod prelude {
    pub use crate::{
        backend::{AudioBackend, AudioContext, ContextState, InstanceId, LoadState},
        catalog::{AssetCatalog, CatalogEntry, SoundId},
        config::{Config, CoordinatorConfig},
        quirks::PlaybackQuirks,
        AudioCoordinator, AudioError, LoadSummary, PlayOutcome, SequenceOptions, WaitOptions,
    };
}
