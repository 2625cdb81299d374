//! The hotkey engine
//!
//! `HotKeys` owns the binding registry and the double-tap detector and runs
//! one dispatch pass per key event: chord matching first, then double-tap
//! detection. Clones share the same state, so a handle can be given to
//! whichever part of the host delivers key events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use super::error::{CallbackError, InvalidBinding};
use super::event::KeyEvent;
use super::keys::{Chord, Key, ModifierKey, Modifiers};
use super::matcher;
use super::registry::{Action, Binding, BindingHandle, BindingOptions, Registry, Trigger};
use crate::state::{DoubleTapDetector, DEFAULT_DOUBLE_TAP_WINDOW};

/// Result of handing one key event to the engine
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// At least one chord binding fired
    pub matched: bool,
    /// The bridge should stop the keystroke's default effect
    pub should_prevent_default: bool,
    /// Modifier whose double tap completed on this event
    pub double_tap: Option<ModifierKey>,
    /// Failures of individual actions; the pass continued past each
    pub errors: Vec<CallbackError>,
}

struct Inner {
    registry: Mutex<Registry>,
    detector: Mutex<DoubleTapDetector>,
}

/// Hotkey registration and dispatch
#[derive(Clone)]
pub struct HotKeys {
    inner: Arc<Inner>,
}

impl Default for HotKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl HotKeys {
    pub fn new() -> Self {
        Self::with_double_tap_window(DEFAULT_DOUBLE_TAP_WINDOW)
    }

    pub fn with_double_tap_window(window: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new()),
                detector: Mutex::new(DoubleTapDetector::new(window)),
            }),
        }
    }

    // No action ever runs while one of these locks is held, so a poisoned
    // lock still guards consistent data.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn detector(&self) -> MutexGuard<'_, DoubleTapDetector> {
        self.inner
            .detector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn double_tap_window(&self) -> Duration {
        self.detector().window()
    }

    /// Bind `action` to `key` pressed with exactly `modifiers`
    ///
    /// Fails if `key` is itself a modifier key.
    pub fn register<F>(
        &self,
        key: Key,
        modifiers: Modifiers,
        options: BindingOptions,
        action: F,
    ) -> Result<BindingHandle, InvalidBinding>
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let chord = Chord::new(modifiers, key)?;
        Ok(self.insert(Trigger::Chord { chord }, options, Box::new(action)))
    }

    /// Bind `action` to a chord written as text, e.g. `Ctrl+Shift+S`
    pub fn register_chord<F>(
        &self,
        chord: &str,
        options: BindingOptions,
        action: F,
    ) -> Result<BindingHandle, InvalidBinding>
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let chord: Chord = chord.parse()?;
        Ok(self.insert(Trigger::Chord { chord }, options, Box::new(action)))
    }

    /// Bind `action` to a double tap of `modifier` pressed on its own
    ///
    /// The action receives the second press.
    pub fn register_modifier_double_tap<F>(&self, modifier: ModifierKey, action: F) -> BindingHandle
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.insert(
            Trigger::DoubleTap { modifier },
            BindingOptions::new(),
            Box::new(action),
        )
    }

    fn insert(
        &self,
        trigger: Trigger,
        options: BindingOptions,
        action: Box<Action>,
    ) -> BindingHandle {
        self.registry().insert(trigger, options, action)
    }

    /// Dispose a binding; disposing twice is a no-op
    pub fn dispose(&self, handle: &BindingHandle) {
        handle.dispose();
    }

    /// Dispose every binding
    pub fn clear(&self) {
        let disposed = self.registry().clear();
        info!(disposed, "all hotkey bindings cleared");
    }

    /// Active bindings in registration order
    pub fn snapshot_active(&self) -> Vec<Arc<Binding>> {
        self.registry().snapshot_active()
    }

    /// Create a scope whose bindings can be disposed together
    pub fn scope(&self) -> Scope {
        Scope {
            hotkeys: self.clone(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Run one dispatch pass for a keydown event
    pub fn handle_key_event(&self, event: &KeyEvent) -> DispatchOutcome {
        let snapshot = {
            let mut registry = self.registry();
            registry.compact();
            registry.snapshot_active()
        };

        debug!(
            key = %event.key,
            modifiers = ?event.modifiers,
            context = ?event.context,
            repeat = event.repeat,
            "dispatching key event"
        );

        let eligible = matcher::eligible(&snapshot, event);
        let (invoked, mut errors) = matcher::invoke_all(&eligible, event);
        let matched = invoked > 0;

        let double_tap = self.detector().observe(event);
        if let Some(modifier) = double_tap {
            let bindings = matcher::double_tap_bindings(&snapshot, modifier);
            let (_, tap_errors) = matcher::invoke_all(&bindings, event);
            errors.extend(tap_errors);
        }

        DispatchOutcome {
            matched,
            should_prevent_default: matched,
            double_tap,
            errors,
        }
    }
}

/// A group of bindings registered together, e.g. by one page
///
/// Dropping a scope leaves its bindings active; call [`Scope::dispose`].
pub struct Scope {
    hotkeys: HotKeys,
    handles: Mutex<Vec<BindingHandle>>,
}

impl Scope {
    fn track(&self, handle: BindingHandle) -> BindingHandle {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|tracked| !tracked.is_disposed());
        handles.push(handle.clone());
        handle
    }

    pub fn register<F>(
        &self,
        key: Key,
        modifiers: Modifiers,
        options: BindingOptions,
        action: F,
    ) -> Result<BindingHandle, InvalidBinding>
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handle = self.hotkeys.register(key, modifiers, options, action)?;
        Ok(self.track(handle))
    }

    pub fn register_chord<F>(
        &self,
        chord: &str,
        options: BindingOptions,
        action: F,
    ) -> Result<BindingHandle, InvalidBinding>
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handle = self.hotkeys.register_chord(chord, options, action)?;
        Ok(self.track(handle))
    }

    pub fn register_modifier_double_tap<F>(&self, modifier: ModifierKey, action: F) -> BindingHandle
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handle = self.hotkeys.register_modifier_double_tap(modifier, action);
        self.track(handle)
    }

    /// Dispose every binding registered through this scope
    pub fn dispose(&self) {
        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let disposed = handles.iter().filter(|handle| handle.dispose()).count();
        debug!(disposed, "hotkey scope disposed");
    }
}
