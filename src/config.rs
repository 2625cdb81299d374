//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::HotkeyEvent;
use crate::hotkey::{
    BindingOptions, Chord, ContextSet, ElementContext, HotKeys, KeyEvent, ModifierKey, Scope,
    Trigger,
};
use crate::state::DEFAULT_DOUBLE_TAP_WINDOW;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// JSON file declaring the daemon's bindings
    pub bindings_path: PathBuf,

    /// Maximum gap between the two presses of a modifier double tap
    pub double_tap_window: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("hotkeys");

        let socket_path = lookup("HOTKEYS_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let bindings_path = lookup("HOTKEYS_BINDINGS")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("bindings.json"));

        let double_tap_window = match lookup("HOTKEYS_DOUBLE_TAP_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .with_context(|| format!("invalid HOTKEYS_DOUBLE_TAP_MS: {ms:?}"))?,
            ),
            None => DEFAULT_DOUBLE_TAP_WINDOW,
        };

        Ok(Self {
            socket_path,
            data_dir,
            bindings_path,
            double_tap_window,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

/// A chord binding declared in the bindings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordEntry {
    pub chord: String,
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allow_in: Vec<ElementContext>,
}

/// A modifier double-tap binding declared in the bindings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubleTapEntry {
    pub modifier: ModifierKey,
    pub action: String,
}

/// Contents of the bindings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingsFile {
    #[serde(default)]
    pub bindings: Vec<ChordEntry>,
    #[serde(default)]
    pub double_taps: Vec<DoubleTapEntry>,
}

impl BindingsFile {
    /// Read the bindings file; a missing file yields `None`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        let file = Self::parse(&contents)
            .with_context(|| format!("failed to load bindings from {}", path.display()))?;
        Ok(Some(file))
    }

    /// Parse and validate bindings file contents
    pub fn parse(contents: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(contents).context("malformed bindings file")?;
        for entry in &file.bindings {
            entry
                .chord
                .parse::<Chord>()
                .with_context(|| format!("invalid chord for action {:?}", entry.action))?;
        }
        Ok(file)
    }

    /// Register every entry on `hotkeys`
    ///
    /// Each action publishes a [`HotkeyEvent::ActionTriggered`] on `events`.
    /// The returned scope disposes the whole set.
    pub fn apply(
        &self,
        hotkeys: &HotKeys,
        events: &broadcast::Sender<HotkeyEvent>,
    ) -> Result<Scope> {
        let scope = hotkeys.scope();

        for entry in &self.bindings {
            let chord: Chord = entry
                .chord
                .parse()
                .with_context(|| format!("invalid chord for action {:?}", entry.action))?;

            let mut options = BindingOptions::new()
                .allow_in(entry.allow_in.iter().copied().collect::<ContextSet>());
            if let Some(description) = &entry.description {
                options = options.description(description.clone());
            }

            let publish = publisher(events, &entry.action, Trigger::Chord { chord });
            scope.register(chord.key(), chord.modifiers(), options, publish)?;
            debug!(%chord, action = %entry.action, "chord binding loaded");
        }

        for entry in &self.double_taps {
            let publish = publisher(
                events,
                &entry.action,
                Trigger::DoubleTap {
                    modifier: entry.modifier,
                },
            );
            scope.register_modifier_double_tap(entry.modifier, publish);
            debug!(modifier = %entry.modifier, action = %entry.action, "double tap binding loaded");
        }

        info!(
            chords = self.bindings.len(),
            double_taps = self.double_taps.len(),
            "bindings applied"
        );
        Ok(scope)
    }
}

/// Action that announces `action` fired via `trigger`
fn publisher(
    events: &broadcast::Sender<HotkeyEvent>,
    action: &str,
    trigger: Trigger,
) -> impl Fn(&KeyEvent) -> Result<()> + Send + Sync + 'static {
    let events = events.clone();
    let action = action.to_string();
    move |_| {
        // No subscribers is fine
        let _ = events.send(HotkeyEvent::ActionTriggered {
            action: action.clone(),
            trigger,
        });
        Ok(())
    }
}
