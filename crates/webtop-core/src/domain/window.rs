//! Window lifecycle state machine and process/app identifiers.
//!
//! # Window lifecycle (for beginners)
//!
//! ```text
//!             ┌──────────► Minimized
//!             │  minimize     │ restore
//! Opening ──► Normal ◄────────┘
//!             │  ▲
//!    maximize │  │ restore
//!             ▼  │
//!           Maximized
//!
//! any non-terminal state ──close──► Closing ──► Closed (terminal)
//! ```
//!
//! - `Opening`: the window exists but has not been shown yet.  The window
//!   manager moves it to `Normal` immediately after creation.
//! - `Normal` / `Maximized`: visible in the stacking order.
//! - `Minimized`: hidden from the stacking order; geometry is kept.
//! - `Closing`: teardown in progress.  Nothing can stop it.
//! - `Closed`: gone.  The window manager forgets the window afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{Point, Rect, Size};

/// Identifier of a window.  Allocated from a monotonically increasing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win-{}", self.0)
    }
}

/// Identifier of a running process.
///
/// Allocated from a monotonically increasing counter, so ordering process ids
/// is the same as ordering processes by launch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc-{}", self.0)
    }
}

/// Lifecycle state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Opening,
    Normal,
    Minimized,
    Maximized,
    Closing,
    Closed,
}

/// Requests that move a window between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    Show,
    Minimize,
    Maximize,
    Restore,
    Close,
    Finalize,
}

/// A requested transition is not allowed from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action:?} a window in state {from:?}")]
pub struct TransitionError {
    pub from: WindowState,
    pub action: WindowAction,
}

impl WindowState {
    /// Applies `action` and returns the next state.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for any edge not drawn in the module diagram.
    pub fn transition(self, action: WindowAction) -> Result<WindowState, TransitionError> {
        use WindowAction as A;
        use WindowState as S;

        let next = match (self, action) {
            (S::Opening, A::Show) => S::Normal,
            (S::Normal, A::Minimize) => S::Minimized,
            (S::Normal, A::Maximize) => S::Maximized,
            (S::Minimized, A::Restore) | (S::Maximized, A::Restore) => S::Normal,
            (from, A::Close) if !from.is_terminal() && from != S::Closing => S::Closing,
            (S::Closing, A::Finalize) => S::Closed,
            (from, action) => return Err(TransitionError { from, action }),
        };
        Ok(next)
    }

    /// `Closed` is the only terminal state.
    pub fn is_terminal(self) -> bool {
        self == WindowState::Closed
    }

    /// Windows in these states take part in the visible stacking order.
    pub fn is_visible(self) -> bool {
        matches!(self, WindowState::Normal | WindowState::Maximized)
    }

    /// `true` until teardown has started.
    pub fn is_open(self) -> bool {
        !matches!(self, WindowState::Closing | WindowState::Closed)
    }
}

/// A window as seen by the rest of the shell.
///
/// The window manager owns the authoritative copy; bus events carry clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub process_id: ProcessId,
    pub title: String,
    pub position: Point,
    pub size: Size,
    /// Stacking key.  Higher is closer to the viewer.
    pub z_index: u64,
    pub state: WindowState,
}

impl Window {
    pub fn bounds(&self) -> Rect {
        Rect {
            origin: self.position,
            size: self.size,
        }
    }
}

/// Direction for gesture-driven app switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleDirection {
    Forward,
    Backward,
}

/// Static description of a launchable application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    pub app_id: String,
    pub title: String,
    /// When `true`, every launch starts a separate process.
    #[serde(default)]
    pub multi_instance: bool,
    /// When `true`, the process survives the closing of its last window.
    #[serde(default)]
    pub persistent: bool,
    #[serde(default = "default_window_size")]
    pub default_size: Size,
    /// Desktop icon that launches this app, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

fn default_window_size() -> Size {
    Size::new(640.0, 480.0)
}

impl AppSpec {
    /// Definition used for app ids that were never registered: single instance,
    /// not persistent, 640×480.
    pub fn fallback(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            title: app_id.to_string(),
            multi_instance: false,
            persistent: false,
            default_size: default_window_size(),
            icon_ref: None,
        }
    }
}
