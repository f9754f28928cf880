//! GestureHandler: turns pointer sequences into swipe gestures.
//!
//! ```text
//!            Down (first pointer)
//!   Idle ───────────────────────────► Tracking { pointer, start, t0 }
//!    ▲                                   │
//!    │  Up (same pointer)  → classify, publish GESTURE if any
//!    │  Down (second pointer) → discard (multi-touch is not a swipe)
//!    └──Cancel / disable() ◄─────────────┘
//! ```
//!
//! Classification itself lives in [`webtop_core::classify_gesture`]; this
//! type only tracks the interaction and publishes the result.

use tracing::{debug, info};
use webtop_core::{
    classify_gesture, Gesture, GestureThresholds, Point, PointerEvent, PointerPhase, ShellEvent,
};

use super::event_bus::EventBus;

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrackingState {
    Idle,
    Tracking {
        pointer_id: u32,
        start: Point,
        started_ms: u64,
    },
}

pub struct GestureHandler {
    bus: EventBus,
    thresholds: GestureThresholds,
    screen_width: f64,
    enabled: bool,
    state: TrackingState,
}

impl GestureHandler {
    /// Creates a disabled handler.
    pub fn new(bus: EventBus, thresholds: GestureThresholds, screen_width: f64) -> Self {
        Self {
            bus,
            thresholds,
            screen_width,
            enabled: false,
            state: TrackingState::Idle,
        }
    }

    /// Starts listening.  Calling it again is a no-op.
    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            info!("gesture recognition enabled");
        }
    }

    /// Stops listening and drops any interaction in progress.  Idempotent.
    pub fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            self.state = TrackingState::Idle;
            info!("gesture recognition disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackingState::Tracking { .. })
    }

    /// Edge swipes are measured against this width.
    pub fn set_screen_width(&mut self, width: f64) {
        self.screen_width = width;
    }

    /// Forgets the interaction in progress, if any.
    pub fn cancel(&mut self) {
        self.state = TrackingState::Idle;
    }

    /// Feeds one pointer sample.  Returns the gesture published, if any.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<Gesture> {
        if !self.enabled {
            return None;
        }

        match (event.phase, self.state) {
            (PointerPhase::Down, TrackingState::Idle) => {
                if !event.position.is_finite() {
                    debug!(position = ?event.position, "ignoring pointer down with malformed position");
                    return None;
                }
                self.state = TrackingState::Tracking {
                    pointer_id: event.pointer_id,
                    start: event.position,
                    started_ms: event.time_ms,
                };
                None
            }
            (PointerPhase::Down, TrackingState::Tracking { .. }) => {
                debug!(pointer = event.pointer_id, "second pointer down, discarding swipe");
                self.state = TrackingState::Idle;
                None
            }
            (
                PointerPhase::Up,
                TrackingState::Tracking {
                    pointer_id,
                    start,
                    started_ms,
                },
            ) if pointer_id == event.pointer_id => {
                self.state = TrackingState::Idle;
                self.finish(start, started_ms, event)
            }
            (PointerPhase::Cancel, _) => {
                self.state = TrackingState::Idle;
                None
            }
            _ => None,
        }
    }

    fn finish(&self, start: Point, started_ms: u64, end: &PointerEvent) -> Option<Gesture> {
        if end.time_ms < started_ms {
            debug!(
                started_ms,
                ended_ms = end.time_ms,
                "ignoring gesture whose clock went backwards"
            );
            return None;
        }
        if !end.position.is_finite() {
            debug!(position = ?end.position, "ignoring pointer up with malformed position");
            return None;
        }

        let gesture = classify_gesture(
            start,
            end.position,
            end.time_ms - started_ms,
            self.screen_width,
            &self.thresholds,
        )?;
        debug!(kind = ?gesture.kind, duration_ms = gesture.duration_ms, "gesture recognised");
        self.bus.publish(ShellEvent::Gesture(gesture));
        Some(gesture)
    }
}
