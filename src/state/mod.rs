//! State machine module for modifier double taps
//!
//! Provides an explicit per-modifier state machine with two states:
//! - Idle: no pending tap
//! - Armed: one bare press seen, waiting for the second within the window

mod machine;

pub use machine::{DoubleTapDetector, TapState, DEFAULT_DOUBLE_TAP_WINDOW};
