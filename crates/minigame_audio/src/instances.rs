//! Live instance tracking
//!
//! Keeps the completion slot of every instance started through the playback
//! controller, grouped by sound id. Stopping an id resolves its waiters here
//! even if the backend never reports the stop itself.

use std::collections::HashMap;

use crate::backend::{Completion, InstanceId, PlaybackEnd};
use crate::catalog::SoundId;

/// One started instance
struct LiveInstance {
    /// Backend instance id
    instance: InstanceId,
    /// Shared with the backend's reporter
    completion: Completion,
}

/// Started instances per sound id
#[derive(Default)]
pub(crate) struct InstanceTracker {
    instances: HashMap<SoundId, Vec<LiveInstance>>,
}

impl InstanceTracker {
    /// Create an empty tracker
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a newly started instance
    pub(crate) fn track(&mut self, id: &str, instance: InstanceId, completion: Completion) {
        let slots = self.instances.entry(id.to_string()).or_default();
        // Drop instances the backend already reported as finished
        slots.retain(|live| !live.completion.is_resolved());
        slots.push(LiveInstance { instance, completion });
    }

    /// Resolve every unfinished instance of `id`; returns how many were resolved
    pub(crate) fn finish(&mut self, id: &str, end: PlaybackEnd) -> usize {
        let Some(slots) = self.instances.remove(id) else {
            return 0;
        };

        let mut resolved = 0;
        for live in slots {
            if !live.completion.is_resolved() {
                log::trace!("Resolving instance {} of '{id}' as {end:?}", live.instance.raw());
                live.completion.resolve(end);
                resolved += 1;
            }
        }
        resolved
    }

    /// Resolve every unfinished instance of every id
    pub(crate) fn finish_all(&mut self, end: PlaybackEnd) -> usize {
        let ids: Vec<SoundId> = self.instances.keys().cloned().collect();
        ids.iter().map(|id| self.finish(id, end)).sum()
    }

    /// Number of instances of `id` that have not finished
    #[cfg(test)]
    pub(crate) fn active_count(&self, id: &str) -> usize {
        self.instances
            .get(id)
            .map_or(0, |slots| slots.iter().filter(|live| !live.completion.is_resolved()).count())
    }

    /// Number of ids with at least one tracked instance
    #[cfg(test)]
    pub(crate) fn tracked_ids(&self) -> usize {
        self.instances.len()
    }
}
