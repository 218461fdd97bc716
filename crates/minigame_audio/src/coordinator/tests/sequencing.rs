//! Await-to-completion playback and sequence scenarios

use std::time::Duration;

use tokio::time::Instant;

use super::mock::{catalog, settle, MockBackend};
use crate::{AudioCoordinator, SequenceOptions, WaitOptions};

/// Paused clock timers can round up by a millisecond
fn assert_elapsed(elapsed: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(1),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_play_and_wait_resolves_true_on_end() {
    let backend = MockBackend::immediate();
    let audio = AudioCoordinator::new(catalog(&["guide1"]), backend.clone());

    let waiter = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.play_and_wait("guide1", WaitOptions::default()).await })
    };
    settle().await;
    assert!(backend.is_id_playing("guide1"));

    backend.finish("guide1");
    assert!(waiter.await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_play_and_wait_resolves_false_on_stop() {
    let backend = MockBackend::immediate();
    let audio = AudioCoordinator::new(catalog(&["guide1"]), backend.clone());

    let waiter = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.play_and_wait("guide1", WaitOptions::default()).await })
    };
    settle().await;

    audio.stop("guide1");
    assert!(!waiter.await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_play_and_wait_timeout_resolves_true() {
    let backend = MockBackend::immediate();
    let audio = AudioCoordinator::new(catalog(&["drone"]), backend.clone());

    let started = Instant::now();
    let finished = audio.play_and_wait("drone", WaitOptions::timeout_ms(500)).await;

    assert!(finished);
    assert_elapsed(started.elapsed(), 500);
    // The clip keeps playing past the timeout
    assert!(backend.is_id_playing("drone"));
}

#[tokio::test(start_paused = true)]
async fn test_play_and_wait_single_deadline_covers_loading() {
    let backend = MockBackend::manual();
    let audio = AudioCoordinator::new(catalog(&["drone"]), backend.clone());

    let waiter = {
        let audio = audio.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let finished = audio.play_and_wait("drone", WaitOptions::timeout_ms(500)).await;
            (finished, started.elapsed())
        })
    };
    settle().await;

    tokio::time::advance(Duration::from_millis(300)).await;
    backend.complete_load("drone");

    let (finished, elapsed) = waiter.await.unwrap();
    assert!(finished);
    assert_elapsed(elapsed, 500);
}

#[tokio::test(start_paused = true)]
async fn test_play_and_wait_false_when_unavailable() {
    let backend = MockBackend::immediate();
    backend.fail_uri("broken.mp3");
    let audio = AudioCoordinator::new(catalog(&["broken"]), backend.clone());

    assert!(!audio.play_and_wait("missing", WaitOptions::default()).await);
    assert!(!audio.play_and_wait("broken", WaitOptions::default()).await);
    assert_eq!(backend.total_plays(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_play_and_wait_false_when_never_loaded() {
    let backend = MockBackend::manual();
    let audio = AudioCoordinator::new(catalog(&["slow"]), backend.clone());

    let started = Instant::now();
    assert!(!audio.play_and_wait("slow", WaitOptions::timeout_ms(250)).await);
    assert_elapsed(started.elapsed(), 250);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_plays_in_order() {
    let backend = MockBackend::immediate();
    let audio = AudioCoordinator::new(catalog(&["a", "b", "c"]), backend.clone());

    let sequence = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.play_sequence(&["a", "b", "c"], SequenceOptions::default()).await })
    };

    for id in ["a", "b", "c"] {
        settle().await;
        assert!(backend.is_id_playing(id));
        backend.finish(id);
    }
    sequence.await.unwrap();

    assert_eq!(backend.events(), ["play a", "play b", "play c"]);
}

#[tokio::test(start_paused = true)]
async fn test_new_sequence_supersedes_running_one() {
    let backend = MockBackend::immediate();
    let audio = AudioCoordinator::new(catalog(&["a", "b", "c", "x", "y"]), backend.clone());

    let first = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.play_sequence(&["a", "b", "c"], SequenceOptions::default()).await })
    };
    settle().await;

    let second = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.play_sequence(&["x", "y"], SequenceOptions::default()).await })
    };
    settle().await;

    backend.finish("a");
    settle().await;
    assert!(first.is_finished());

    backend.finish("x");
    settle().await;
    backend.finish("y");
    second.await.unwrap();

    assert_eq!(backend.events(), ["play a", "play x", "play y"]);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_gap_and_cancel() {
    let backend = MockBackend::immediate();
    let audio = AudioCoordinator::new(catalog(&["a", "b", "c"]), backend.clone());

    let sequence = {
        let audio = audio.clone();
        let options = SequenceOptions::default().with_gap(Duration::from_millis(100));
        tokio::spawn(async move { audio.play_sequence(&["a", "b", "c"], options).await })
    };
    settle().await;
    backend.finish("a");
    settle().await;

    // Still inside the gap
    assert!(!backend.is_id_playing("b"));
    tokio::time::advance(Duration::from_millis(101)).await;
    settle().await;
    assert!(backend.is_id_playing("b"));

    audio.cancel_sequences();
    backend.finish("b");
    sequence.await.unwrap();

    assert_eq!(backend.plays("c"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_skips_failed_items() {
    let backend = MockBackend::immediate();
    backend.fail_uri("b.mp3");
    let audio = AudioCoordinator::new(catalog(&["a", "b", "c"]), backend.clone());

    let sequence = {
        let audio = audio.clone();
        tokio::spawn(async move { audio.play_sequence(&["a", "b", "missing", "c"], SequenceOptions::default()).await })
    };
    settle().await;
    backend.finish("a");
    settle().await;
    backend.finish("c");
    sequence.await.unwrap();

    assert_eq!(backend.events(), ["play a", "play c"]);
}
