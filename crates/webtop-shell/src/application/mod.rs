//! Application layer of the shell.
//!
//! # What lives here? (for beginners)
//!
//! The application layer turns host notifications into shell behaviour.  It
//! orchestrates the pure types from `webtop_core`, talks to collaborators
//! only through traits ([`icon_sync::IconStore`]), and performs no I/O of
//! its own.
//!
//! # Sub-modules
//!
//! - **`event_bus`** – Synchronous publish/subscribe.  Every other service
//!   announces its state changes here.
//!
//! - **`window_manager`** – Processes, windows, focus order and lifecycle,
//!   plus gesture-driven navigation on phones.
//!
//! - **`drag_drop`** – The single active drag session, drop-target
//!   registration and hit-testing.
//!
//! - **`gesture_handler`** – Turns pointer sequences into swipes.
//!
//! - **`device_detector`** – Debounced viewport classification and the
//!   virtual-keyboard heuristic.
//!
//! - **`icon_sync`** – Optimistic icon layout with sequenced, batched saves.
//!
//! - **`shell`** – The composition root that builds and wires all of the
//!   above.

pub mod device_detector;
pub mod drag_drop;
pub mod event_bus;
pub mod gesture_handler;
pub mod icon_sync;
pub mod shell;
pub mod window_manager;
