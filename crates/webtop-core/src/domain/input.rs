//! Input primitives shared by the gesture handler and the drag-drop coordinator.
//!
//! These mirror the pointer-events model of the host surface: every mouse,
//! pen or finger interaction is a sequence `Down → Move* → (Up | Cancel)`
//! identified by a `pointer_id`.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// The host aborted the interaction (e.g. the browser took over a scroll).
    Cancel,
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// A single pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    #[serde(default = "default_pointer_id")]
    pub pointer_id: u32,
    #[serde(default = "default_pointer_kind")]
    pub kind: PointerKind,
    pub position: Point,
    /// Milliseconds on the host's monotonic clock.
    pub time_ms: u64,
}

fn default_pointer_id() -> u32 {
    1
}

fn default_pointer_kind() -> PointerKind {
    PointerKind::Touch
}

impl PointerEvent {
    /// A primary touch pointer sample.
    pub fn new(phase: PointerPhase, position: Point, time_ms: u64) -> Self {
        Self {
            phase,
            pointer_id: default_pointer_id(),
            kind: default_pointer_kind(),
            position,
            time_ms,
        }
    }

    /// Builder-style override of the pointer id.
    pub fn with_pointer_id(mut self, pointer_id: u32) -> Self {
        self.pointer_id = pointer_id;
        self
    }

    /// Builder-style override of the pointer kind.
    pub fn with_kind(mut self, kind: PointerKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Keys the shell reacts to.  Everything else is passed through to apps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Escape,
    Other(String),
}
