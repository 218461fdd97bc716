//! Coordinator scenario tests against a scripted backend
//!
//! All tests run on a paused Tokio clock, so cooldowns, timeouts and warm-up
//! delays advance instantly and deterministically.

mod mock;

mod sequencing;
