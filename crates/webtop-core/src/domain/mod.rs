//! Domain entities for the Webtop shell.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core rules of the application.
//! - Has **no** imports from browser APIs, network libraries, storage drivers,
//!   or UI frameworks.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! For Webtop that means: how a swipe is recognised, which states a window may
//! move between, which drop target sits on top at a given point, and how a
//! viewport is classified.  The runtime in `webtop-shell` orchestrates these
//! pieces; it never re-implements them.

/// Device classification (mobile / tablet / desktop) and chrome insets.
pub mod device;
/// Drag payloads carried by the drag-drop coordinator.
pub mod drag;
/// Points, sizes and rectangles in CSS pixel space.
pub mod geometry;
/// Swipe and edge-swipe classification.
pub mod gesture;
/// Desktop icons and their persisted position records.
pub mod icon;
/// Pointer, touch and keyboard input primitives.
pub mod input;
/// Layered rectangle index used for drop-target hit-testing.
pub mod spatial;
/// Window lifecycle state machine, process and app identifiers.
pub mod window;
