//! Platform playback quirks
//!
//! Some touch platforms queue sounds triggered while the audio context is
//! still suspended and then play the whole queue at once when it resumes.
//! The unlock sequencer asks a [`PlaybackQuirks`] implementation whether an
//! audible warm-up is safe instead of matching user agents itself.

/// Platform behavior that changes how unlocking warms clips up
pub trait PlaybackQuirks: Send + Sync {
    /// Skip the volume-0 play/stop warm-up and only preload
    fn should_skip_audible_warmup(&self) -> bool;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Desktop browsers and native hosts: warm-up plays are silent and safe
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardQuirks;

impl PlaybackQuirks for StandardQuirks {
    fn should_skip_audible_warmup(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

/// Touch platforms that dump queued sounds in one burst on resume
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueDumpingQuirks;

impl PlaybackQuirks for QueueDumpingQuirks {
    fn should_skip_audible_warmup(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "queue-dumping"
    }
}

/// Check a user agent string for platforms known to dump queued sounds
///
/// Matches iOS devices, iPadOS in desktop mode (reports `Macintosh` but
/// carries a `Mobile/` build token) and Android WebViews.
pub fn dumps_queued_sounds(user_agent: &str) -> bool {
    const IOS_DEVICES: [&str; 3] = ["iPhone", "iPad", "iPod"];

    if IOS_DEVICES.iter().any(|device| user_agent.contains(device)) {
        return true;
    }
    if user_agent.contains("Macintosh") && user_agent.contains("Mobile/") {
        return true;
    }
    user_agent.contains("Android") && user_agent.contains("; wv)")
}

/// Select quirks for a user agent at startup
pub fn detect(user_agent: &str) -> Box<dyn PlaybackQuirks> {
    let quirks: Box<dyn PlaybackQuirks> = if dumps_queued_sounds(user_agent) {
        Box::new(QueueDumpingQuirks)
    } else {
        Box::new(StandardQuirks)
    };
    log::debug!("Selected '{}' playback quirks", quirks.name());
    quirks
}
