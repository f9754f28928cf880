//! # webtop-core
//!
//! Shared library for the Webtop desktop shell containing the domain model,
//! the typed event-bus payloads, and the sequence counters used for stacking
//! order and save ordering.
//!
//! This crate is used by the shell runtime (`webtop-shell`) and by anything
//! that wants to consume the shell's bus events (renderers, analytics).
//! It has zero dependencies on browser APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Webtop simulates a classic desktop operating system inside a web page:
//! applications run as *processes* that own *windows*, icons sit on a desktop
//! surface and can be dragged around, and on phones the user navigates with
//! swipe gestures instead of a mouse.
//!
//! This crate (`webtop-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business logic with no I/O.  Geometry, the drop-target
//!   spatial index, device classification, gesture classification, the window
//!   lifecycle state machine, drag payloads and desktop icons.
//!
//! - **`events`** – The tagged union of everything the shell publishes on its
//!   event bus (one payload shape per channel), plus [`SequenceCounter`], the
//!   monotonic counter behind window z-order and icon-save ordering.

// Declare the two top-level modules.  Rust will look for each in a
// subdirectory with the same name (e.g., src/domain/mod.rs).
pub mod domain;
pub mod events;

// Re-export the most-used types at the crate root so callers can write
// `webtop_core::Rect` instead of `webtop_core::domain::geometry::Rect`.
pub use domain::device::{DeviceClass, DeviceProfile, DeviceThresholds, Orientation, Viewport};
pub use domain::drag::{DragKind, DragPayload, DragSessionId};
pub use domain::geometry::{Point, Rect, Size};
pub use domain::gesture::{classify_gesture, Gesture, GestureKind, GestureThresholds};
pub use domain::icon::{DesktopIcon, IconId, IconPositionRecord};
pub use domain::input::{Key, PointerEvent, PointerKind, PointerPhase};
pub use domain::spatial::SpatialIndex;
pub use domain::window::{
    AppSpec, CycleDirection, ProcessId, TransitionError, Window, WindowAction, WindowId,
    WindowState,
};
pub use events::{CancelReason, Channel, DragOutcome, SequenceCounter, ShellEvent};
