//! Hotkey module: key vocabulary, binding registry and dispatch
//!
//! The engine consumes already-normalized key events; capturing them from
//! the platform is left to whoever feeds [`HotKeys::handle_key_event`].

mod context;
mod engine;
mod error;
mod event;
mod keys;
mod matcher;
mod registry;

pub use context::{permits, ContextSet, ElementContext, FocusedElement};
pub use engine::{DispatchOutcome, HotKeys, Scope};
pub use error::{CallbackError, InvalidBinding};
pub use event::KeyEvent;
pub use keys::{Chord, Key, ModifierKey, Modifiers};
pub use matcher::chord_matches;
pub use registry::{Action, Binding, BindingHandle, BindingInfo, BindingOptions, Registry, Trigger};
