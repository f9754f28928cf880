//! DeviceDetector: keeps the current [`DeviceProfile`] up to date.
//!
//! Resize and orientation notifications arrive in bursts while the user drags
//! a browser edge or rotates a phone.  The detector applies a *trailing
//! debounce*: each notification pushes the deadline back, and the newest
//! viewport is classified once the host has been quiet for `debounce_ms`.
//!
//! Time is injected (`now_ms` arguments and [`DeviceDetector::tick`]) rather
//! than read from a clock, so the debounce is deterministic under test.
//!
//! The virtual keyboard cannot be observed directly from a web page.  The
//! heuristic used here: on a phone, while an input element has focus, a
//! viewport that is at least `keyboard_shrink_ratio` shorter than the tallest
//! height seen at the same width means the keyboard is up.

use tracing::{debug, info};
use webtop_core::{DeviceProfile, DeviceThresholds, ShellEvent, Viewport};

use super::event_bus::EventBus;

/// Tunables for [`DeviceDetector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    pub thresholds: DeviceThresholds,
    /// Quiet period before a resize burst is applied.
    pub debounce_ms: u64,
    /// Fraction of the baseline height the viewport must lose for the
    /// keyboard to count as visible.
    pub keyboard_shrink_ratio: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            thresholds: DeviceThresholds::default(),
            debounce_ms: 150,
            keyboard_shrink_ratio: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingResize {
    viewport: Viewport,
    due_ms: u64,
}

/// Tallest height observed at a given width.
#[derive(Debug, Clone, Copy)]
struct HeightBaseline {
    width: f64,
    height: f64,
}

pub struct DeviceDetector {
    bus: EventBus,
    settings: DetectorSettings,
    profile: DeviceProfile,
    pending: Option<PendingResize>,
    baseline: HeightBaseline,
    input_focused: bool,
    keyboard_visible: bool,
}

impl DeviceDetector {
    /// Classifies `initial` immediately.  Nothing is published until
    /// [`announce`](Self::announce) or the first applied resize.
    pub fn new(bus: EventBus, initial: Viewport, settings: DetectorSettings) -> Self {
        Self {
            bus,
            profile: DeviceProfile::classify(initial, &settings.thresholds),
            settings,
            pending: None,
            baseline: HeightBaseline {
                width: initial.width,
                height: initial.height,
            },
            input_focused: false,
            keyboard_visible: false,
        }
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn keyboard_visible(&self) -> bool {
        self.keyboard_visible
    }

    /// `true` while a debounced resize is waiting for its deadline.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Publishes the current profile so late subscribers can initialise.
    pub fn announce(&self) {
        self.bus.publish(ShellEvent::DeviceChanged(self.profile));
    }

    /// Records a resize notification.  Applied by a later [`tick`](Self::tick).
    pub fn on_resize(&mut self, viewport: Viewport, now_ms: u64) {
        if !viewport.is_valid() {
            debug!(?viewport, "ignoring invalid viewport");
            return;
        }
        self.pending = Some(PendingResize {
            viewport,
            due_ms: now_ms.saturating_add(self.settings.debounce_ms),
        });
    }

    /// Orientation changes are debounced exactly like resizes; the browser
    /// fires a resize burst alongside them anyway.
    pub fn on_orientation_change(&mut self, viewport: Viewport, now_ms: u64) {
        self.on_resize(viewport, now_ms);
    }

    /// Applies the pending resize if its deadline has passed.
    ///
    /// Returns `true` when the device profile changed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.pending {
            Some(pending) if now_ms >= pending.due_ms => {
                self.pending = None;
                self.apply(pending.viewport)
            }
            _ => false,
        }
    }

    /// Applies any pending resize immediately, ignoring the debounce.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => self.apply(pending.viewport),
            None => false,
        }
    }

    /// Tracks whether a text input owns focus.  Losing focus always hides the
    /// keyboard.
    pub fn set_input_focused(&mut self, focused: bool) {
        self.input_focused = focused;
        self.update_keyboard();
    }

    fn apply(&mut self, viewport: Viewport) -> bool {
        if viewport.width != self.baseline.width {
            self.baseline = HeightBaseline {
                width: viewport.width,
                height: viewport.height,
            };
        } else if viewport.height > self.baseline.height {
            self.baseline.height = viewport.height;
        }

        let next = DeviceProfile::classify(viewport, &self.settings.thresholds);
        let changed = next != self.profile;
        if changed {
            if next.class != self.profile.class || next.orientation != self.profile.orientation {
                info!(class = ?next.class, orientation = ?next.orientation, "device profile changed");
            }
            self.profile = next;
            self.bus.publish(ShellEvent::DeviceChanged(next));
        }
        self.update_keyboard();
        changed
    }

    fn update_keyboard(&mut self) {
        let shrunk = self.profile.viewport.height
            <= self.baseline.height * (1.0 - self.settings.keyboard_shrink_ratio);
        let visible = self.profile.is_mobile() && self.input_focused && shrunk;
        if visible != self.keyboard_visible {
            self.keyboard_visible = visible;
            debug!(visible, "virtual keyboard visibility changed");
            self.bus.publish(ShellEvent::KeyboardVisibility { visible });
        }
    }
}
