//! Audio coordinator demo
//!
//! Plays a scripted mini-game session against a console backend that fakes
//! load latency and clip lengths, so the coordinator's decisions can be
//! followed in the log without an audio device.
//!
//! `RUST_LOG=debug` also shows suppressed plays. Set `AUDIO_DEMO_USER_AGENT`
//! to a mobile Safari string to see the queue-dumping warm-up path.

mod console_backend;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use minigame_audio::prelude::*;
use minigame_audio::{logging, quirks};

use console_backend::{ConsoleBackend, ConsoleContext};

fn asset_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets").join(name)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let catalog = AssetCatalog::load_from_file(asset_path("catalog.toml"))?;
    let config = CoordinatorConfig::load_from_file(asset_path("coordinator.ron"))?;
    let user_agent = std::env::var("AUDIO_DEMO_USER_AGENT").unwrap_or_default();

    let audio = AudioCoordinator::builder(catalog, Arc::new(ConsoleBackend::new()))
        .context(Arc::new(ConsoleContext::suspended()))
        .quirks(quirks::detect(&user_agent))
        .config(config)
        .build();

    run_session(&audio).await?;

    log::info!("Demo finished");
    Ok(())
}

async fn run_session(audio: &AudioCoordinator) -> Result<(), Box<dyn Error>> {
    log::info!("== Title screen: loading in the background");
    let loader = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.load_all().await })
    };

    log::info!("== First tap: unlock");
    audio.unlock().await;
    // Still loading; plays once the clip arrives, however often it is tapped
    for _ in 0..3 {
        audio.play_when_ready("pop");
    }

    let summary = loader.await?;
    log::info!("== Loaded {} sounds, {} unavailable", summary.loaded, summary.failed);

    audio.play("bgm");
    audio.play("fanfare");

    log::info!("== Rapid taps inside the cooldown");
    for _ in 0..4 {
        let outcome = audio.play("tap");
        log::info!("tap -> {outcome:?}");
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    log::info!("== Guidance interrupted by a hint");
    audio.play_voice_interrupt("guide_intro");
    tokio::time::sleep(Duration::from_millis(300)).await;
    audio.play("tap");
    audio.play_voice_interrupt("guide_hint");

    let finished = audio
        .play_voice_interrupt_and_wait("correct_chime", WaitOptions::default())
        .await;
    log::info!("correct_chime finished naturally: {finished}");

    log::info!("== Question sequence, superseded halfway");
    let questions = {
        let audio = audio.clone();
        tokio::spawn(async move {
            audio
                .play_sequence(&["prompt_q1", "prompt_q2", "guide_intro"], SequenceOptions::default())
                .await;
        })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    audio
        .play_sequence(&["prompt_q2"], SequenceOptions::default().with_gap(Duration::ZERO))
        .await;
    questions.await?;

    log::info!("== Runtime narration");
    audio.play_dynamic("narration", "voice/narration_q1.mp3");
    tokio::time::sleep(Duration::from_millis(100)).await;
    audio.play_dynamic("narration", "voice/narration_q1.mp3");
    tokio::time::sleep(Duration::from_millis(100)).await;
    audio.play_dynamic("narration", "voice/narration_q2.mp3");
    tokio::time::sleep(Duration::from_millis(100)).await;

    log::info!("== Microphone opens: silence voices");
    audio.stop_all_voices();
    tokio::time::sleep(Duration::from_millis(200)).await;
    audio.stop_all();

    Ok(())
}
