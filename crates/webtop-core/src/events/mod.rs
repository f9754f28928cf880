//! Everything the shell publishes on its event bus.
//!
//! # One payload shape per channel (for beginners)
//!
//! A bus channel is a named route such as `"WINDOW_FOCUSED"`.  Instead of
//! letting any channel carry any value, every channel maps to exactly one
//! variant of [`ShellEvent`], and [`ShellEvent::channel`] derives the channel
//! from the variant.  A subscriber therefore never has to guess what it
//! received: it `match`es on the enum and the compiler checks that every case
//! is handled.
//!
//! All events derive `Serialize` so the logging consumer (and any renderer
//! living on the other side of a JS bridge) can turn them into JSON.

pub mod sequence;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::device::DeviceProfile;
use crate::domain::drag::{DragPayload, DragSessionId};
use crate::domain::geometry::{Point, Rect};
use crate::domain::gesture::Gesture;
use crate::domain::icon::IconId;
use crate::domain::window::{ProcessId, Window, WindowId, WindowState};

pub use sequence::SequenceCounter;

/// Routing key for bus subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    DragStart,
    Drop,
    DragEnd,
    Gesture,
    ProcessStarted,
    ProcessExited,
    WindowOpened,
    WindowStateChanged,
    WindowFocused,
    WindowGeometryChanged,
    WindowClosed,
    DeviceChanged,
    KeyboardVisibility,
    IconMoved,
    /// Free-form channel for extensions and host integrations.
    Custom(String),
}

impl Channel {
    /// Wire name of the channel, as used by the rendering collaborator.
    pub fn name(&self) -> &str {
        match self {
            Channel::DragStart => "DRAG_START",
            Channel::Drop => "DROP",
            Channel::DragEnd => "DRAG_END",
            Channel::Gesture => "GESTURE",
            Channel::ProcessStarted => "PROCESS_STARTED",
            Channel::ProcessExited => "PROCESS_EXITED",
            Channel::WindowOpened => "WINDOW_OPENED",
            Channel::WindowStateChanged => "WINDOW_STATE_CHANGED",
            Channel::WindowFocused => "WINDOW_FOCUSED",
            Channel::WindowGeometryChanged => "WINDOW_GEOMETRY_CHANGED",
            Channel::WindowClosed => "WINDOW_CLOSED",
            Channel::DeviceChanged => "DEVICE_CHANGED",
            Channel::KeyboardVisibility => "KEYBOARD_VISIBILITY",
            Channel::IconMoved => "ICON_MOVED",
            Channel::Custom(name) => name,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a drag session ended without a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The user pressed Escape.
    Escape,
    /// The host aborted the pointer interaction.
    PointerCancel,
    /// A new drag started while this one was active.
    Superseded,
    /// Cancelled programmatically.
    Requested,
}

/// How a drag session ended.  Carried by `DRAG_END`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DragOutcome {
    /// Released over an accepting target; `accepted` is the target's verdict.
    Dropped { target: String, accepted: bool },
    /// Released with no accepting target under the pointer.
    Released,
    Cancelled { reason: CancelReason },
}

/// A bus event.  See the module docs for the channel mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShellEvent {
    DragStart {
        session: DragSessionId,
        payload: DragPayload,
        origin: Point,
    },
    Drop {
        session: DragSessionId,
        target: String,
        payload: DragPayload,
        success: bool,
    },
    DragEnd {
        session: DragSessionId,
        payload: DragPayload,
        outcome: DragOutcome,
    },
    Gesture(Gesture),
    ProcessStarted {
        process: ProcessId,
        app_id: String,
    },
    ProcessExited {
        process: ProcessId,
        app_id: String,
    },
    WindowOpened(Window),
    WindowStateChanged {
        window: WindowId,
        from: WindowState,
        to: WindowState,
    },
    WindowFocused {
        window: WindowId,
        process: ProcessId,
        z_index: u64,
    },
    WindowGeometryChanged {
        window: WindowId,
        bounds: Rect,
    },
    WindowClosed {
        window: WindowId,
        process: ProcessId,
    },
    DeviceChanged(DeviceProfile),
    KeyboardVisibility {
        visible: bool,
    },
    IconMoved {
        icon: IconId,
        position: Point,
    },
    Custom {
        name: String,
        payload: String,
    },
}

impl ShellEvent {
    /// The channel this event is delivered on.
    pub fn channel(&self) -> Channel {
        match self {
            ShellEvent::DragStart { .. } => Channel::DragStart,
            ShellEvent::Drop { .. } => Channel::Drop,
            ShellEvent::DragEnd { .. } => Channel::DragEnd,
            ShellEvent::Gesture(_) => Channel::Gesture,
            ShellEvent::ProcessStarted { .. } => Channel::ProcessStarted,
            ShellEvent::ProcessExited { .. } => Channel::ProcessExited,
            ShellEvent::WindowOpened(_) => Channel::WindowOpened,
            ShellEvent::WindowStateChanged { .. } => Channel::WindowStateChanged,
            ShellEvent::WindowFocused { .. } => Channel::WindowFocused,
            ShellEvent::WindowGeometryChanged { .. } => Channel::WindowGeometryChanged,
            ShellEvent::WindowClosed { .. } => Channel::WindowClosed,
            ShellEvent::DeviceChanged(_) => Channel::DeviceChanged,
            ShellEvent::KeyboardVisibility { .. } => Channel::KeyboardVisibility,
            ShellEvent::IconMoved { .. } => Channel::IconMoved,
            ShellEvent::Custom { name, .. } => Channel::Custom(name.clone()),
        }
    }

    /// Convenience constructor for extension channels.
    pub fn custom(name: impl Into<String>, payload: impl Into<String>) -> Self {
        ShellEvent::Custom {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drag::DragKind;

    #[test]
    fn test_custom_event_routes_to_its_named_channel() {
        let event = ShellEvent::custom("X", "hello");
        assert_eq!(event.channel(), Channel::Custom("X".to_string()));
        assert_eq!(event.channel().name(), "X");
    }

    #[test]
    fn test_builtin_channel_names_match_renderer_contract() {
        assert_eq!(Channel::DragStart.name(), "DRAG_START");
        assert_eq!(Channel::Drop.name(), "DROP");
        assert_eq!(Channel::DragEnd.name(), "DRAG_END");
        assert_eq!(Channel::Gesture.name(), "GESTURE");
    }

    #[test]
    fn test_drag_end_serializes_with_channel_tag() {
        // Arrange
        let event = ShellEvent::DragEnd {
            session: DragSessionId::new(),
            payload: DragPayload::new(DragKind::Icon, "trash", "desktop"),
            outcome: DragOutcome::Cancelled {
                reason: CancelReason::Escape,
            },
        };

        // Act
        let json = serde_json::to_value(&event).expect("serialize");

        // Assert
        assert_eq!(json["channel"], "DRAG_END");
        assert_eq!(json["outcome"]["outcome"], "cancelled");
        assert_eq!(json["outcome"]["reason"], "escape");
    }
}
