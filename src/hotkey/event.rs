//! The normalized key event consumed by the engine

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::context::ElementContext;
use super::keys::{Key, Modifiers};

/// A keydown event, already translated from the platform representation
///
/// `timestamp` is measured from an arbitrary origin chosen by the bridge;
/// only differences between timestamps are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default, with = "modifier_list")]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub context: ElementContext,
    #[serde(rename = "timestamp_ms", with = "millis")]
    pub timestamp: Duration,
    /// Auto-repeat firing of a held key
    #[serde(default)]
    pub repeat: bool,
}

impl KeyEvent {
    /// A non-repeating keydown on a plain element
    pub fn new(key: Key, modifiers: Modifiers, timestamp: Duration) -> Self {
        Self {
            key,
            modifiers,
            context: ElementContext::PlainElement,
            timestamp,
            repeat: false,
        }
    }

    pub fn in_context(mut self, context: ElementContext) -> Self {
        self.context = context;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }
}

/// Modifiers on the wire: a list such as `["ctrl", "shift"]`
mod modifier_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::hotkey::keys::{ModifierKey, Modifiers};

    pub fn serialize<S: Serializer>(
        modifiers: &Modifiers,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        modifiers.keys().collect::<Vec<_>>().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Modifiers, D::Error> {
        let keys = Vec::<ModifierKey>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
