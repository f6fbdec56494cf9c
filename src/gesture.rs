use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::GestureConfig;

/// Progress of one tracked key toward the unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// One click seen
    Armed,
    /// Two clicks seen
    Armed2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Click,
    /// No click arrived within the window
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    None,
    Trigger,
}

/// The whole state table
pub fn transition(state: GestureState, event: GestureEvent) -> (GestureState, GestureAction) {
    use GestureAction as A;
    use GestureEvent as E;
    use GestureState as S;

    match (state, event) {
        (S::Idle, E::Click) => (S::Armed, A::None),
        (S::Armed, E::Click) => (S::Armed2, A::None),
        (S::Armed2, E::Click) => (S::Idle, A::Trigger),
        (_, E::Timeout) => (S::Idle, A::None),
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    state: GestureState,
    last_click: Instant,
}

/// Triple-click unlock tracked independently per key.
///
/// Callers pass the current `Instant` so the machine stays deterministic.
#[derive(Debug)]
pub struct UnlockGesture<K> {
    window: Duration,
    tracked: HashMap<K, Tracked>,
}

impl<K> UnlockGesture<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            tracked: HashMap::new(),
        }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Feed a click; returns `Trigger` on the third click within the window
    pub fn click(&mut self, key: K, now: Instant) -> GestureAction {
        let current = self.state_at(&key, now);
        let (next, action) = transition(current, GestureEvent::Click);
        debug!("Gesture {:?}: {:?} -> {:?}", key, current, next);

        if next == GestureState::Idle {
            self.tracked.remove(&key);
        } else {
            self.tracked.insert(
                key,
                Tracked {
                    state: next,
                    last_click: now,
                },
            );
        }
        action
    }

    /// State of `key` at `now`, with the timeout edge applied
    pub fn state_at(&self, key: &K, now: Instant) -> GestureState {
        match self.tracked.get(key) {
            Some(tracked) if now.saturating_duration_since(tracked.last_click) > self.window => {
                transition(tracked.state, GestureEvent::Timeout).0
            }
            Some(tracked) => tracked.state,
            None => GestureState::Idle,
        }
    }

    /// Apply the timeout edge to every key whose window has elapsed
    pub fn expire(&mut self, now: Instant) {
        let window = self.window;
        self.tracked
            .retain(|_, tracked| now.saturating_duration_since(tracked.last_click) <= window);
    }

    /// Number of keys not in `Idle`
    pub fn active(&self) -> usize {
        self.tracked.len()
    }
}
