//! Binding registry
//!
//! Bindings are kept in registration order, which is also the order their
//! actions run in when several match the same event. Disposal only flips a
//! flag; disposed entries are compacted away between dispatch passes so a
//! callback may dispose bindings while a pass is iterating a snapshot.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::{ContextSet, ElementContext};
use super::event::KeyEvent;
use super::keys::{Chord, ModifierKey};

/// Callback run when a binding fires
pub type Action = dyn Fn(&KeyEvent) -> anyhow::Result<()> + Send + Sync;

/// What makes a binding fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// A key pressed with an exact modifier set
    Chord { chord: Chord },
    /// Two bare presses of one modifier within the double-tap window
    DoubleTap { modifier: ModifierKey },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Chord { chord } => write!(f, "{}", chord),
            Trigger::DoubleTap { modifier } => write!(f, "{} (double tap)", modifier),
        }
    }
}

/// Optional settings for a chord binding
#[derive(Debug, Clone, Default)]
pub struct BindingOptions {
    pub allow_in: ContextSet,
    pub description: Option<String>,
}

impl BindingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the binding fire even when focus is in `contexts`
    pub fn allow_in(mut self, contexts: impl Into<ContextSet>) -> Self {
        self.allow_in |= contexts.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A registered hotkey rule
///
/// Everything but the disposed flag is fixed at registration.
pub struct Binding {
    id: u64,
    trigger: Trigger,
    allow_in: ContextSet,
    description: Option<String>,
    action: Box<Action>,
    disposed: AtomicBool,
}

impl Binding {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn allow_in(&self) -> ContextSet {
        self.allow_in
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Returns true only for the call that actually disposed the binding
    fn dispose(&self) -> bool {
        !self.disposed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn action(&self) -> &Action {
        &*self.action
    }

    /// Serializable summary for cheat sheets
    pub fn info(&self) -> BindingInfo {
        BindingInfo {
            id: self.id,
            trigger: self.trigger,
            description: self.description.clone(),
            allow_in: self.allow_in.contexts().collect(),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .field("allow_in", &self.allow_in)
            .field("description", &self.description)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Description of an active binding, as listed to external UIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingInfo {
    pub id: u64,
    pub trigger: Trigger,
    pub description: Option<String>,
    pub allow_in: Vec<ElementContext>,
}

/// Disposal handle returned by registration
///
/// Dropping the handle does not dispose the binding.
#[derive(Debug, Clone)]
pub struct BindingHandle {
    binding: Arc<Binding>,
}

impl BindingHandle {
    pub fn id(&self) -> u64 {
        self.binding.id
    }

    pub fn trigger(&self) -> Trigger {
        self.binding.trigger
    }

    pub fn is_disposed(&self) -> bool {
        self.binding.is_disposed()
    }

    /// Dispose the binding; disposing twice is a no-op
    ///
    /// Returns whether this call changed anything.
    pub fn dispose(&self) -> bool {
        let disposed = self.binding.dispose();
        if disposed {
            debug!(id = self.binding.id, trigger = %self.binding.trigger, "binding disposed");
        }
        disposed
    }
}

/// Append-only store of live bindings with soft deletion
#[derive(Debug, Default)]
pub struct Registry {
    bindings: Vec<Arc<Binding>>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding and return its disposal handle
    pub fn insert(
        &mut self,
        trigger: Trigger,
        options: BindingOptions,
        action: Box<Action>,
    ) -> BindingHandle {
        self.compact();

        self.next_id += 1;
        let binding = Arc::new(Binding {
            id: self.next_id,
            trigger,
            allow_in: options.allow_in,
            description: options.description,
            action,
            disposed: AtomicBool::new(false),
        });
        self.bindings.push(Arc::clone(&binding));

        debug!(id = binding.id, %trigger, "binding registered");
        BindingHandle { binding }
    }

    /// All bindings that are not disposed, in registration order
    pub fn snapshot_active(&self) -> Vec<Arc<Binding>> {
        self.bindings
            .iter()
            .filter(|binding| !binding.is_disposed())
            .cloned()
            .collect()
    }

    /// Drop disposed entries; returns how many were removed
    pub fn compact(&mut self) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|binding| !binding.is_disposed());
        before - self.bindings.len()
    }

    /// Dispose every binding; returns how many were still active
    pub fn clear(&mut self) -> usize {
        let disposed = self
            .bindings
            .iter()
            .filter(|binding| binding.dispose())
            .count();
        self.bindings.clear();
        disposed
    }

    /// Number of active bindings
    pub fn len(&self) -> usize {
        self.bindings
            .iter()
            .filter(|binding| !binding.is_disposed())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
