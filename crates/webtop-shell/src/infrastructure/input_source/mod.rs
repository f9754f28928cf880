//! Input source infrastructure for the shell.
//!
//! A browser host delivers pointer, resize, keyboard and focus notifications
//! from its event loop.  Here they arrive as [`RawInputEvent`]s on a channel
//! handed out by an [`InputSource`], so the shell never touches a DOM or a
//! windowing system.
//!
//! # Testability
//!
//! [`mock::MockInputSource`] lets tests inject events one by one;
//! [`scripted::ScriptedInputSource`] replays a recorded JSON session and is
//! what the `webtop-shell` binary uses.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use webtop_core::{DragPayload, Key, PointerEvent};

pub mod mock;
pub mod scripted;

/// A raw input notification from the host surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawInputEvent {
    /// A pointer sample (mouse, pen or finger).
    Pointer(PointerEvent),
    /// The viewport changed size.
    Resize {
        width: f64,
        height: f64,
        #[serde(default)]
        touch: bool,
        time_ms: u64,
    },
    /// The device was rotated.  Carries the viewport after rotation.
    OrientationChange {
        width: f64,
        height: f64,
        #[serde(default)]
        touch: bool,
        time_ms: u64,
    },
    /// A key was pressed.
    Key { key: Key, time_ms: u64 },
    /// A text input gained or lost focus.
    InputFocus { focused: bool },
    /// Host clock heartbeat; drives debounced work.
    Tick { time_ms: u64 },
    /// A draggable element was picked up at `(x, y)`.
    DragSource { payload: DragPayload, x: f64, y: f64 },
    /// A desktop icon was opened.
    IconActivate { app_id: String },
}

impl RawInputEvent {
    /// Host timestamp, when the event carries one.
    pub fn time_ms(&self) -> Option<u64> {
        match self {
            RawInputEvent::Pointer(p) => Some(p.time_ms),
            RawInputEvent::Resize { time_ms, .. }
            | RawInputEvent::OrientationChange { time_ms, .. }
            | RawInputEvent::Key { time_ms, .. }
            | RawInputEvent::Tick { time_ms } => Some(*time_ms),
            RawInputEvent::InputFocus { .. }
            | RawInputEvent::DragSource { .. }
            | RawInputEvent::IconActivate { .. } => None,
        }
    }
}

/// Error type for input source operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("input source has already been started")]
    AlreadyStarted,
    #[error("input source has already been stopped")]
    AlreadyStopped,
    #[error("input script could not be read: {0}")]
    Script(#[from] scripted::ScriptError),
}

/// Trait abstracting input event production.
pub trait InputSource: Send {
    /// Starts the source and returns a receiver for its events.
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError>;
    /// Stops the source.  The receiver disconnects once drained.
    fn stop(&self);
}
