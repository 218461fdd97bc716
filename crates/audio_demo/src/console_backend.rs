//! Simulated audio output
//!
//! Prints what would be heard instead of opening a device. Load latency and
//! clip length are derived from the URI so the demo exercises slow loads,
//! failed loads and long voice lines deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use minigame_audio::backend::{
    AudioBackend, AudioContext, ClipKey, ClipSpec, ContextState, InstanceId, InstanceReporter, LoadReporter,
};
use minigame_audio::AudioError;

/// Simulated load time for a URI; `None` means the load fails
fn load_latency(uri: &str) -> Option<Duration> {
    if uri.starts_with("missing/") {
        None
    } else if uri.starts_with("slow/") {
        Some(Duration::from_millis(600))
    } else {
        Some(Duration::from_millis(40))
    }
}

/// Simulated clip length for a URI
fn clip_length(uri: &str) -> Duration {
    if uri.starts_with("voice/") {
        Duration::from_millis(900)
    } else {
        Duration::from_millis(200)
    }
}

struct ConsoleClip {
    uri: String,
    looping: bool,
    volume: f32,
}

struct Instance {
    clip: ClipKey,
    reporter: InstanceReporter,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct ConsoleState {
    clips: HashMap<ClipKey, ConsoleClip>,
    playing: HashMap<InstanceId, Instance>,
    next_instance: u64,
}

impl ConsoleState {
    fn uri(&self, clip: ClipKey) -> &str {
        self.clips.get(&clip).map_or("?", |c| c.uri.as_str())
    }
}

/// Backend that logs playback and fakes timing with Tokio timers
pub struct ConsoleBackend {
    runtime: Handle,
    state: Arc<Mutex<ConsoleState>>,
}

impl ConsoleBackend {
    /// Create a backend bound to the current Tokio runtime
    pub fn new() -> Self {
        Self {
            runtime: Handle::current(),
            state: Arc::new(Mutex::new(ConsoleState::default())),
        }
    }
}

impl AudioBackend for ConsoleBackend {
    fn load(&self, clip: ClipKey, spec: &ClipSpec, reporter: LoadReporter) {
        self.state.lock().clips.insert(
            clip,
            ConsoleClip {
                uri: spec.uri.clone(),
                looping: spec.looping,
                volume: spec.volume,
            },
        );

        let latency = load_latency(&spec.uri);
        let streaming = spec.streaming;
        self.runtime.spawn(async move {
            match latency {
                Some(latency) => {
                    tokio::time::sleep(latency).await;
                    if streaming {
                        log::debug!("[out] {} ready to stream", reporter.uri());
                    }
                    reporter.loaded();
                }
                None => {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    reporter.failed("404 Not Found");
                }
            }
        });
    }

    fn unload(&self, clip: ClipKey) {
        self.stop(clip, None);
        if let Some(unloaded) = self.state.lock().clips.remove(&clip) {
            log::info!("[out] unload {}", unloaded.uri);
        }
    }

    fn play(&self, clip: ClipKey, reporter: InstanceReporter) -> Result<InstanceId, AudioError> {
        let mut state = self.state.lock();
        let Some(console_clip) = state.clips.get(&clip) else {
            return Err(AudioError::Playback(format!("{clip} is not loaded")));
        };

        let length = clip_length(&console_clip.uri);
        let looping = console_clip.looping;
        if console_clip.volume > 0.0 {
            log::info!(
                "[out] play {} at {:.0}%{}",
                console_clip.uri,
                console_clip.volume * 100.0,
                if looping { " (looping)" } else { "" }
            );
        } else {
            log::debug!("[out] play {} muted", console_clip.uri);
        }

        let instance = InstanceId::new(state.next_instance);
        state.next_instance += 1;

        let timer = (!looping).then(|| {
            let shared = Arc::clone(&self.state);
            self.runtime.spawn(async move {
                tokio::time::sleep(length).await;
                let finished = shared.lock().playing.remove(&instance);
                if let Some(finished) = finished {
                    finished.reporter.ended();
                }
            })
        });

        state.playing.insert(instance, Instance { clip, reporter, timer });
        Ok(instance)
    }

    fn stop(&self, clip: ClipKey, instance: Option<InstanceId>) {
        let stopped: Vec<Instance> = {
            let mut state = self.state.lock();
            let doomed: Vec<InstanceId> = state
                .playing
                .iter()
                .filter(|(id, playing)| playing.clip == clip && instance.map_or(true, |wanted| **id == wanted))
                .map(|(id, _)| *id)
                .collect();
            if !doomed.is_empty() {
                log::info!("[out] stop {}", state.uri(clip));
            }
            doomed.iter().filter_map(|id| state.playing.remove(id)).collect()
        };

        for instance in stopped {
            if let Some(timer) = instance.timer {
                timer.abort();
            }
            instance.reporter.stopped();
        }
    }

    fn set_volume(&self, clip: ClipKey, volume: f32) {
        if let Some(console_clip) = self.state.lock().clips.get_mut(&clip) {
            console_clip.volume = volume;
        }
    }

    fn volume(&self, clip: ClipKey) -> f32 {
        self.state.lock().clips.get(&clip).map_or(0.0, |c| c.volume)
    }

    fn is_playing(&self, clip: ClipKey) -> bool {
        self.state.lock().playing.values().any(|playing| playing.clip == clip)
    }
}

/// Audio context that starts suspended, like a browser tab before a gesture
pub struct ConsoleContext {
    state: Mutex<ContextState>,
}

impl ConsoleContext {
    /// Context waiting for the first gesture
    pub fn suspended() -> Self {
        Self {
            state: Mutex::new(ContextState::Suspended),
        }
    }
}

#[async_trait]
impl AudioContext for ConsoleContext {
    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<(), AudioError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        *self.state.lock() = ContextState::Running;
        log::info!("[out] audio context running");
        Ok(())
    }
}
