//! Error types for binding registration and action invocation

use super::keys::{Key, ModifierKey};

/// A binding could not be constructed from the given key or modifiers
///
/// Raised synchronously at registration (or chord parsing) time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBinding {
    #[error("unrecognized key identifier: {0:?}")]
    UnknownKey(String),

    #[error("unrecognized key code: {0:#04x}")]
    UnknownCode(u8),

    #[error("unrecognized modifier: {0:?}")]
    UnknownModifier(String),

    #[error("modifier {0} is listed more than once")]
    DuplicateModifier(ModifierKey),

    #[error("modifier key {0} cannot be the key of a chord")]
    ModifierAsKey(Key),

    #[error("chord is empty")]
    EmptyChord,
}

/// A bound action failed while being invoked
///
/// Captured per binding during dispatch and handed back to the caller of
/// `handle_key_event`; never propagated into the dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("action for {trigger} failed: {source}")]
    Failed {
        trigger: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("action for {trigger} panicked: {message}")]
    Panicked { trigger: String, message: String },
}

impl CallbackError {
    /// The formatted trigger (chord or double-tap) of the failing binding
    pub fn trigger(&self) -> &str {
        match self {
            CallbackError::Failed { trigger, .. } | CallbackError::Panicked { trigger, .. } => {
                trigger
            }
        }
    }
}
