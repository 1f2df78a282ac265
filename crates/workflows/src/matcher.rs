//! Trigger matching.
//!
//! A workflow fires for an event when the event's type satisfies the
//! workflow's [`TriggerSpec`]. The comparison rule is an explicit
//! [`MatchStrategy`] so that changing it is a visible, reviewable decision.
//!
//! Only [`MatchStrategy::Exact`] exists: case-sensitive string equality.
//! An empty event type never matches anything, including an empty trigger.

use crate::TriggerSpec;

/// How an event type is compared with a trigger specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Byte-for-byte equality (`"deploy:finished" == "deploy:finished"`).
    #[default]
    Exact,
}

/// Pure predicate deciding whether a workflow fires for an event.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventMatcher {
    strategy: MatchStrategy,
}

impl EventMatcher {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self { strategy }
    }

    /// Returns `true` if `event_type` satisfies `trigger`.
    pub fn matches(&self, event_type: &str, trigger: &TriggerSpec) -> bool {
        if event_type.is_empty() {
            return false;
        }
        match self.strategy {
            MatchStrategy::Exact => event_type == trigger.as_str(),
        }
    }
}
