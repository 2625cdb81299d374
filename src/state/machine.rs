//! Modifier double-tap state machine
//!
//! Each modifier has its own state, Idle or Armed. A bare press arms the
//! modifier; a second bare press within the window fires and returns it to
//! Idle. Anything else in between disarms every modifier.

use std::time::Duration;

use tracing::{debug, info};

use crate::hotkey::{KeyEvent, ModifierKey};

/// Maximum gap between the two presses of a double tap
pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(500);

/// Double-tap state of a single modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    /// No pending tap
    #[default]
    Idle,
    /// First bare press seen at `pressed_at`
    Armed { pressed_at: Duration },
}

impl std::fmt::Display for TapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TapState::Idle => write!(f, "Idle"),
            TapState::Armed { pressed_at } => write!(f, "Armed({}ms)", pressed_at.as_millis()),
        }
    }
}

/// Tracks the double-tap state of every modifier
#[derive(Debug, Clone)]
pub struct DoubleTapDetector {
    window: Duration,
    states: [TapState; ModifierKey::ALL.len()],
}

impl Default for DoubleTapDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DOUBLE_TAP_WINDOW)
    }
}

impl DoubleTapDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            states: [TapState::Idle; ModifierKey::ALL.len()],
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current state of `modifier`
    pub fn state(&self, modifier: ModifierKey) -> TapState {
        self.states[modifier.index()]
    }

    /// Feed a keydown event; returns the modifier whose double tap completed
    pub fn observe(&mut self, event: &KeyEvent) -> Option<ModifierKey> {
        let Some(modifier) = bare_modifier(event) else {
            self.reset();
            return None;
        };

        // Holding the key down has not released it yet
        if event.repeat {
            return None;
        }

        for other in ModifierKey::ALL.into_iter().filter(|m| *m != modifier) {
            self.states[other.index()] = TapState::Idle;
        }

        let now = event.timestamp;
        let next = self.next_state(self.state(modifier), now);
        self.states[modifier.index()] = next;

        match next {
            TapState::Idle => {
                info!(%modifier, "modifier double tap");
                Some(modifier)
            }
            TapState::Armed { .. } => {
                debug!(%modifier, state = %next, "modifier armed");
                None
            }
        }
    }

    /// Compute the state after a bare press at `now`
    fn next_state(&self, current: TapState, now: Duration) -> TapState {
        match current {
            TapState::Idle => TapState::Armed { pressed_at: now },
            TapState::Armed { pressed_at } => match now.checked_sub(pressed_at) {
                Some(elapsed) if elapsed <= self.window => TapState::Idle,
                // Window elapsed, or the clock went backwards: treat as a first press
                _ => TapState::Armed { pressed_at: now },
            },
        }
    }

    /// Disarm every modifier
    pub fn reset(&mut self) {
        if self.states.iter().any(|state| *state != TapState::Idle) {
            debug!("double tap sequence interrupted");
        }
        self.states = [TapState::Idle; ModifierKey::ALL.len()];
    }
}

/// The modifier pressed on its own by `event`, if that is what it is
fn bare_modifier(event: &KeyEvent) -> Option<ModifierKey> {
    event
        .key
        .as_modifier()
        .filter(|modifier| event.modifiers == modifier.flag())
}
