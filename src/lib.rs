//! Hotkey matching and dispatch.
//!
//! The [`hotkey`] module is the engine: callers register chord bindings and
//! modifier double taps on a [`hotkey::HotKeys`] and feed it normalized
//! [`hotkey::KeyEvent`]s. Each event reports whether it matched so the host
//! can suppress the default action.
//!
//! The remaining modules build the `hotkeys-daemon` binary, which serves the
//! engine over a Unix socket:
//!
//! - [`config`]: environment configuration and the JSON bindings file
//! - [`events`]: notifications published when daemon bindings fire
//! - [`ipc`]: framed JSON protocol and the socket server
//! - [`lifecycle`]: signal handling
//! - [`state`]: the modifier double-tap detector

pub mod config;
pub mod events;
pub mod hotkey;
pub mod ipc;
pub mod lifecycle;
pub mod state;
