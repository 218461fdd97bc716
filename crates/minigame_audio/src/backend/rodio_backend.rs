//! Rodio audio backend implementation
//!
//! Native playback for desktop builds and tools. URIs are file paths; clips
//! are read and validated on a loader thread, then decoded from memory for
//! each play. Streaming clips (long music beds) are only validated at load
//! and decoded straight from the file on every play instead of being held in
//! memory. Rodio is pure Rust and supports WAV, OGG Vorbis, MP3, and FLAC.
//!
//! Rodio has no end-of-playback callback, so call [`RodioBackend::update`]
//! once per frame to report finished instances.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use minigame_audio::backend::rodio_backend::RodioBackend;
//! use minigame_audio::catalog::{AssetCatalog, CatalogEntry};
//! use minigame_audio::AudioCoordinator;
//!
//! let backend = Arc::new(RodioBackend::new().unwrap());
//! let catalog = AssetCatalog::from_entries([CatalogEntry::new("click", "resources/audio/click.wav")]);
//! let audio = AudioCoordinator::new(catalog, backend.clone());
//!
//! // In the game loop
//! backend.update();
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::{AudioBackend, ClipKey, ClipSpec, InstanceId, InstanceReporter, LoadReporter};
use crate::AudioError;

/// Where a loaded clip is decoded from
#[derive(Clone)]
enum ClipData {
    /// Whole file held in memory
    Buffered(Arc<[u8]>),
    /// Reopened from disk on each play
    Streamed,
}

type BoxedSource = Box<dyn Source<Item = i16> + Send>;

impl ClipData {
    fn decoder(&self, uri: &str) -> Result<BoxedSource, String> {
        match self {
            Self::Buffered(data) => Decoder::new(Cursor::new(Arc::clone(data)))
                .map(|source| Box::new(source) as BoxedSource)
                .map_err(|e| format!("Failed to decode audio: {e}")),
            Self::Streamed => {
                let file = File::open(uri).map_err(|e| format!("Failed to open audio file: {e}"))?;
                Decoder::new(BufReader::new(file))
                    .map(|source| Box::new(source) as BoxedSource)
                    .map_err(|e| format!("Failed to decode audio: {e}"))
            }
        }
    }
}

/// Loaded (or loading) clip
struct ClipSlot {
    spec: ClipSpec,
    data: Option<ClipData>,
    volume: f32,
}

/// One playing sink
struct ActiveSound {
    clip: ClipKey,
    sink: Sink,
    reporter: Option<InstanceReporter>,
}

impl ActiveSound {
    fn finish(mut self, stopped: bool) {
        if stopped {
            self.sink.stop();
        }
        if let Some(reporter) = self.reporter.take() {
            if stopped {
                reporter.stopped();
            } else {
                reporter.ended();
            }
        }
    }
}

#[derive(Default)]
struct RodioState {
    clips: HashMap<ClipKey, ClipSlot>,
    active: HashMap<InstanceId, ActiveSound>,
    next_instance: u64,
}

impl RodioState {
    fn next_instance(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_instance);
        self.next_instance = self.next_instance.wrapping_add(1);
        id
    }

    fn take_instances(&mut self, clip: ClipKey, instance: Option<InstanceId>) -> Vec<ActiveSound> {
        let doomed: Vec<InstanceId> = self
            .active
            .iter()
            .filter(|(id, sound)| sound.clip == clip && instance.map_or(true, |wanted| **id == wanted))
            .map(|(id, _)| *id)
            .collect();
        doomed.iter().filter_map(|id| self.active.remove(id)).collect()
    }
}

/// Rodio-based audio backend
pub struct RodioBackend {
    /// Output stream handle for creating sinks
    stream_handle: OutputStreamHandle,
    /// Clips and active sinks, shared with loader threads
    state: Arc<Mutex<RodioState>>,
    /// Dropping this ends the output thread
    shutdown: Option<mpsc::Sender<()>>,
    /// Thread that owns the (non-`Send`) output stream
    output_thread: Option<JoinHandle<()>>,
}

impl RodioBackend {
    /// Open the default output device
    ///
    /// # Errors
    /// - `BackendInitFailed` if no output device can be opened
    pub fn new() -> Result<Self, AudioError> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        // OutputStream must stay alive but cannot leave the thread that made it
        let output_thread = std::thread::Builder::new()
            .name("rodio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| AudioError::BackendInitFailed(format!("Failed to spawn output thread: {e}")))?;

        let stream_handle = handle_rx
            .recv()
            .map_err(|e| AudioError::BackendInitFailed(e.to_string()))?
            .map_err(|e| AudioError::BackendInitFailed(format!("Failed to create audio output: {e}")))?;

        log::info!("Rodio audio backend initialized");
        Ok(Self {
            stream_handle,
            state: Arc::new(Mutex::new(RodioState::default())),
            shutdown: Some(shutdown_tx),
            output_thread: Some(output_thread),
        })
    }

    /// Report instances that played to the end (call once per frame)
    pub fn update(&self) {
        let finished: Vec<ActiveSound> = {
            let mut state = self.state.lock();
            let done: Vec<InstanceId> = state
                .active
                .iter()
                .filter(|(_, sound)| sound.sink.empty())
                .map(|(id, _)| *id)
                .collect();
            done.iter().filter_map(|id| state.active.remove(id)).collect()
        };

        for sound in finished {
            sound.finish(false);
        }
    }

    /// Number of sinks still tracked
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    fn read_clip(uri: &str, streaming: bool) -> Result<ClipData, String> {
        let data = if streaming {
            ClipData::Streamed
        } else {
            let bytes = std::fs::read(uri).map_err(|e| format!("Failed to open audio file: {e}"))?;
            ClipData::Buffered(Arc::from(bytes))
        };
        // Decode the header now so corrupt files fail at load time, not at first play
        data.decoder(uri)?;
        Ok(data)
    }
}

impl AudioBackend for RodioBackend {
    fn load(&self, clip: ClipKey, spec: &ClipSpec, reporter: LoadReporter) {
        self.state.lock().clips.insert(
            clip,
            ClipSlot {
                spec: spec.clone(),
                data: None,
                volume: spec.volume,
            },
        );

        let state = Arc::clone(&self.state);
        let uri = spec.uri.clone();
        let streaming = spec.streaming;
        let spawned = std::thread::Builder::new()
            .name(format!("rodio-load-{}", clip.raw()))
            .spawn(move || match Self::read_clip(&uri, streaming) {
                Ok(data) => {
                    let mut state = state.lock();
                    match state.clips.get_mut(&clip) {
                        Some(slot) => {
                            slot.data = Some(data);
                            drop(state);
                            reporter.loaded();
                        }
                        None => {
                            drop(state);
                            reporter.failed("clip unloaded while loading");
                        }
                    }
                }
                Err(reason) => reporter.failed(reason),
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn loader thread for {clip}: {e}");
        }
    }

    fn unload(&self, clip: ClipKey) {
        let stopped = {
            let mut state = self.state.lock();
            state.clips.remove(&clip);
            state.take_instances(clip, None)
        };
        for sound in stopped {
            sound.finish(true);
        }
    }

    fn play(&self, clip: ClipKey, reporter: InstanceReporter) -> Result<InstanceId, AudioError> {
        let mut state = self.state.lock();
        let slot = state
            .clips
            .get(&clip)
            .ok_or_else(|| AudioError::Playback(format!("Unknown {clip}")))?;
        let data = slot
            .data
            .clone()
            .ok_or_else(|| AudioError::Playback(format!("{clip} is not loaded")))?;
        let (looping, volume) = (slot.spec.looping, slot.volume);

        let source = data.decoder(&slot.spec.uri).map_err(AudioError::Playback)?;

        // Create sink for this sound
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::Playback(format!("Failed to create sink: {e}")))?;

        sink.set_volume(volume);
        if looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }

        let instance = state.next_instance();
        state.active.insert(
            instance,
            ActiveSound {
                clip,
                sink,
                reporter: Some(reporter),
            },
        );
        Ok(instance)
    }

    fn stop(&self, clip: ClipKey, instance: Option<InstanceId>) {
        let stopped = self.state.lock().take_instances(clip, instance);
        for sound in stopped {
            sound.finish(true);
        }
    }

    fn set_volume(&self, clip: ClipKey, volume: f32) {
        let mut state = self.state.lock();
        if let Some(slot) = state.clips.get_mut(&clip) {
            slot.volume = volume;
        }
        for sound in state.active.values().filter(|sound| sound.clip == clip) {
            sound.sink.set_volume(volume);
        }
    }

    fn volume(&self, clip: ClipKey) -> f32 {
        self.state.lock().clips.get(&clip).map_or(0.0, |slot| slot.volume)
    }

    fn is_playing(&self, clip: ClipKey) -> bool {
        self.state
            .lock()
            .active
            .values()
            .any(|sound| sound.clip == clip && !sound.sink.is_paused() && !sound.sink.empty())
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        let stopped: Vec<ActiveSound> = self.state.lock().active.drain().map(|(_, sound)| sound).collect();
        for sound in stopped {
            sound.finish(true);
        }

        // Closing the channel releases the output stream
        self.shutdown.take();
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
        log::info!("Rodio audio backend shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LoadState;
    use std::time::{Duration, Instant};
    use tokio::sync::watch;

    fn clip_spec(uri: &str) -> ClipSpec {
        ClipSpec {
            uri: uri.to_string(),
            looping: false,
            volume: 0.5,
            streaming: false,
        }
    }

    /// Short silent 16-bit mono WAV
    fn write_silent_wav(path: &std::path::Path) {
        let samples = 800u32;
        let data_len = samples * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8000u32.to_le_bytes());
        bytes.extend_from_slice(&16000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_read_clip_buffers_or_streams() {
        let path = std::env::temp_dir().join(format!("minigame_audio_silent_{}.wav", std::process::id()));
        write_silent_wav(&path);
        let uri = path.to_string_lossy().into_owned();

        assert!(matches!(RodioBackend::read_clip(&uri, false), Ok(ClipData::Buffered(_))));
        assert!(matches!(RodioBackend::read_clip(&uri, true), Ok(ClipData::Streamed)));

        // Streamed clips go back to the file on every play
        std::fs::remove_file(&path).unwrap();
        assert!(ClipData::Streamed.decoder(&uri).is_err());
        assert!(RodioBackend::read_clip(&uri, true).is_err());
    }

    fn wait_settled(rx: &watch::Receiver<LoadState>) -> LoadState {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            let state = *rx.borrow();
            if state.is_settled() {
                return state;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        *rx.borrow()
    }

    #[test]
    fn test_backend_initialization() {
        // May fail in CI/test environments without audio device
        if let Ok(backend) = RodioBackend::new() {
            assert_eq!(backend.active_count(), 0);
        }
    }

    #[test]
    fn test_missing_file_reports_load_failure() {
        let Ok(backend) = RodioBackend::new() else {
            return;
        };
        let (tx, rx) = watch::channel(LoadState::Loading);
        let clip = ClipKey::new(1);
        let spec = clip_spec("definitely/not/here.wav");

        backend.load(clip, &spec, LoadReporter::new("missing".into(), spec.uri.clone(), Arc::new(tx)));
        assert_eq!(wait_settled(&rx), LoadState::LoadError);
        assert!(backend.play(clip, InstanceReporter::detached()).is_err());
    }

    #[test]
    fn test_invalid_clip_operations() {
        let Ok(backend) = RodioBackend::new() else {
            return;
        };
        let unknown = ClipKey::new(999);

        assert!(matches!(
            backend.play(unknown, InstanceReporter::detached()),
            Err(AudioError::Playback(_))
        ));
        assert!(!backend.is_playing(unknown));
        assert_eq!(backend.volume(unknown), 0.0);
        backend.stop(unknown, None);
        backend.unload(unknown);
        backend.update();
    }
}
