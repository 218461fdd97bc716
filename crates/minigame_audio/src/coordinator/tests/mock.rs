//! Scriptable backend and audio context for coordinator tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::{
    AudioBackend, AudioContext, ClipKey, ClipSpec, ContextState, InstanceId, InstanceReporter, LoadReporter,
};
use crate::catalog::{AssetCatalog, CatalogEntry};
use crate::AudioError;

/// When the mock reports load results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Report from inside `load`
    Immediate,
    /// Queue until the test calls `complete_load`/`fail_load`
    Manual,
}

struct MockClip {
    id: String,
    uri: String,
    volume: f32,
}

struct Playing {
    clip: ClipKey,
    reporter: InstanceReporter,
}

struct MockState {
    mode: LoadMode,
    failing_uris: HashSet<String>,
    clips: HashMap<ClipKey, MockClip>,
    queued_loads: Vec<LoadReporter>,
    playing: HashMap<InstanceId, Playing>,
    next_instance: u64,
    load_requests: Vec<String>,
    events: Vec<String>,
}

/// In-memory backend that records what the coordinator asked it to do
///
/// Events are `"play <id>"` for audible plays, `"mute <id>"` for plays at
/// volume 0 and `"stop <id>"` when an instance is stopped.
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(mode: LoadMode) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                mode,
                failing_uris: HashSet::new(),
                clips: HashMap::new(),
                queued_loads: Vec::new(),
                playing: HashMap::new(),
                next_instance: 1,
                load_requests: Vec::new(),
                events: Vec::new(),
            }),
        })
    }

    pub fn immediate() -> Arc<Self> {
        Self::new(LoadMode::Immediate)
    }

    pub fn manual() -> Arc<Self> {
        Self::new(LoadMode::Manual)
    }

    /// Make every load of `uri` fail
    pub fn fail_uri(&self, uri: &str) {
        self.state.lock().failing_uris.insert(uri.to_string());
    }

    /// Finish queued loads of `id` successfully
    pub fn complete_load(&self, id: &str) {
        for reporter in self.take_queued(id) {
            reporter.loaded();
        }
    }

    /// Fail queued loads of `id`
    pub fn fail_load(&self, id: &str) {
        for reporter in self.take_queued(id) {
            reporter.failed("decode error");
        }
    }

    /// Let every playing instance of `id` reach its natural end
    pub fn finish(&self, id: &str) {
        let ended: Vec<Playing> = {
            let mut state = self.state.lock();
            let keys = state.keys_for(id);
            let done: Vec<InstanceId> = state
                .playing
                .iter()
                .filter(|(_, playing)| keys.contains(&playing.clip))
                .map(|(instance, _)| *instance)
                .collect();
            done.iter().filter_map(|instance| state.playing.remove(instance)).collect()
        };
        for playing in ended {
            playing.reporter.ended();
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    /// Audible plays of `id`
    pub fn plays(&self, id: &str) -> usize {
        let wanted = format!("play {id}");
        self.state.lock().events.iter().filter(|event| **event == wanted).count()
    }

    /// Every play, audible or not
    pub fn total_plays(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| event.starts_with("play ") || event.starts_with("mute "))
            .count()
    }

    /// URIs handed to `load`, in order
    pub fn load_requests(&self) -> Vec<String> {
        self.state.lock().load_requests.clone()
    }

    pub fn is_id_playing(&self, id: &str) -> bool {
        let state = self.state.lock();
        let keys = state.keys_for(id);
        state.playing.values().any(|playing| keys.contains(&playing.clip))
    }

    /// Volume of the live clip for `id`
    pub fn volume_of(&self, id: &str) -> Option<f32> {
        self.state.lock().clips.values().find(|clip| clip.id == id).map(|clip| clip.volume)
    }

    /// URI of the live clip for `id`
    pub fn uri_of(&self, id: &str) -> Option<String> {
        self.state.lock().clips.values().find(|clip| clip.id == id).map(|clip| clip.uri.clone())
    }

    fn take_queued(&self, id: &str) -> Vec<LoadReporter> {
        let mut state = self.state.lock();
        let (matching, rest): (Vec<_>, Vec<_>) = state.queued_loads.drain(..).partition(|r| r.id() == id);
        state.queued_loads = rest;
        matching
    }
}

impl MockState {
    fn keys_for(&self, id: &str) -> Vec<ClipKey> {
        self.clips
            .iter()
            .filter(|(_, clip)| clip.id == id)
            .map(|(key, _)| *key)
            .collect()
    }

    fn clip_id(&self, clip: ClipKey) -> String {
        self.clips.get(&clip).map_or_else(|| clip.to_string(), |c| c.id.clone())
    }
}

impl AudioBackend for MockBackend {
    fn load(&self, clip: ClipKey, spec: &ClipSpec, reporter: LoadReporter) {
        let mut state = self.state.lock();
        state.load_requests.push(spec.uri.clone());
        state.clips.insert(
            clip,
            MockClip {
                id: reporter.id().to_string(),
                uri: spec.uri.clone(),
                volume: spec.volume,
            },
        );

        let fails = state.failing_uris.contains(&spec.uri);
        let mode = state.mode;
        match mode {
            LoadMode::Manual => state.queued_loads.push(reporter),
            LoadMode::Immediate => {
                drop(state);
                if fails {
                    reporter.failed("decode error");
                } else {
                    reporter.loaded();
                }
            }
        }
    }

    fn unload(&self, clip: ClipKey) {
        self.stop(clip, None);
        self.state.lock().clips.remove(&clip);
    }

    fn play(&self, clip: ClipKey, reporter: InstanceReporter) -> Result<InstanceId, AudioError> {
        let mut state = self.state.lock();
        let Some(mock) = state.clips.get(&clip) else {
            return Err(AudioError::Playback(format!("{clip} was never loaded")));
        };
        let event = if mock.volume > 0.0 {
            format!("play {}", mock.id)
        } else {
            format!("mute {}", mock.id)
        };

        let instance = InstanceId::new(state.next_instance);
        state.next_instance += 1;
        state.events.push(event);
        state.playing.insert(instance, Playing { clip, reporter });
        Ok(instance)
    }

    fn stop(&self, clip: ClipKey, instance: Option<InstanceId>) {
        let stopped: Vec<Playing> = {
            let mut state = self.state.lock();
            let doomed: Vec<InstanceId> = state
                .playing
                .iter()
                .filter(|(id, playing)| playing.clip == clip && instance.map_or(true, |wanted| **id == wanted))
                .map(|(id, _)| *id)
                .collect();
            if !doomed.is_empty() {
                let event = format!("stop {}", state.clip_id(clip));
                state.events.push(event);
            }
            doomed.iter().filter_map(|id| state.playing.remove(id)).collect()
        };
        for playing in stopped {
            playing.reporter.stopped();
        }
    }

    fn set_volume(&self, clip: ClipKey, volume: f32) {
        if let Some(mock) = self.state.lock().clips.get_mut(&clip) {
            mock.volume = volume;
        }
    }

    fn volume(&self, clip: ClipKey) -> f32 {
        self.state.lock().clips.get(&clip).map_or(0.0, |mock| mock.volume)
    }

    fn is_playing(&self, clip: ClipKey) -> bool {
        self.state.lock().playing.values().any(|playing| playing.clip == clip)
    }
}

/// Suspended context that counts resume attempts
pub struct MockContext {
    state: Mutex<ContextState>,
    resumes: AtomicUsize,
    resume_delay: Duration,
    refuse: bool,
}

impl MockContext {
    pub fn suspended(resume_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ContextState::Suspended),
            resumes: AtomicUsize::new(0),
            resume_delay,
            refuse: false,
        })
    }

    /// Context that stays suspended no matter how often it is resumed
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ContextState::Suspended),
            resumes: AtomicUsize::new(0),
            resume_delay: Duration::ZERO,
            refuse: true,
        })
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioContext for MockContext {
    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<(), AudioError> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.resume_delay).await;
        if self.refuse {
            return Err(AudioError::ContextResumeFailure("needs another gesture".to_string()));
        }
        *self.state.lock() = ContextState::Running;
        Ok(())
    }
}

/// Catalog where every entry's URI is `<id>.mp3`
pub fn catalog(ids: &[&str]) -> AssetCatalog {
    ids.iter().map(|id| CatalogEntry::new(*id, format!("{id}.mp3"))).collect()
}

/// Let spawned tasks run until they block again
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
