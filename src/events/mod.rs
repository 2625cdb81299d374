//! Events module for fired hotkey actions
//!
//! Named actions from the bindings file do not run code inside the daemon;
//! they publish one of these events for subscribed clients to act on.

use serde::{Deserialize, Serialize};

use crate::hotkey::Trigger;

/// Events published when a daemon-side binding fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HotkeyEvent {
    /// A binding fired its named action
    ActionTriggered {
        /// Action name from the bindings file
        action: String,
        /// What fired it
        trigger: Trigger,
    },

    /// An action failed while the daemon was dispatching
    ActionFailed {
        trigger: String,
        message: String,
    },
}

impl std::fmt::Display for HotkeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HotkeyEvent::ActionTriggered { action, trigger } => {
                write!(f, "ACTION_TRIGGERED {} ({})", action, trigger)
            }
            HotkeyEvent::ActionFailed { trigger, message } => {
                write!(f, "ACTION_FAILED {}: {}", trigger, message)
            }
        }
    }
}
