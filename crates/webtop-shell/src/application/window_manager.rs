//! WindowManager: running processes, their windows, focus and stacking.
//!
//! # Ownership model (for beginners)
//!
//! ```text
//! WindowManager
//!  ├─ processes: BTreeMap<ProcessId, Process>   launch order = key order
//!  │    └─ window_ids: [WindowId, …]            first entry = primary window
//!  └─ windows:   HashMap<WindowId, Window>       authoritative window state
//! ```
//!
//! Process ids come from a counter, so iterating the `BTreeMap` visits
//! processes in the order they were launched.  App switching relies on that.
//!
//! Stacking uses one counter for the whole shell.  Every focus takes the next
//! value, so the most recently focused window always has the largest
//! `z_index` and two windows never tie.
//!
//! Every state change is published on the bus after the manager's own state
//! is consistent.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, info, warn};
use webtop_core::{
    AppSpec, CycleDirection, DeviceProfile, Gesture, GestureKind, Point, ProcessId, Rect,
    SequenceCounter, ShellEvent, Size, TransitionError, Window, WindowAction, WindowId,
    WindowState,
};

use super::event_bus::EventBus;

/// Distance below the top inset within which a downward swipe closes the
/// active window.
pub const DEFAULT_CLOSE_ZONE: f64 = 60.0;

/// Smallest size a window can be resized to.
pub const MIN_WINDOW_SIZE: Size = Size::new(120.0, 80.0);

/// Offset between successive cascaded windows on desktop.
const CASCADE_STEP: f64 = 24.0;
const CASCADE_SLOTS: u64 = 8;

/// Error type for window operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
    #[error("process {0} not found")]
    ProcessNotFound(ProcessId),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("window geometry must be finite")]
    InvalidGeometry,
}

/// A running application instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub id: ProcessId,
    pub app_id: String,
    /// Windows in opening order.  The first is the primary window.
    pub window_ids: Vec<WindowId>,
    pub icon_ref: Option<String>,
    /// Survives the closing of its last window.
    pub persistent: bool,
}

impl Process {
    pub fn primary_window(&self) -> Option<WindowId> {
        self.window_ids.first().copied()
    }
}

pub struct WindowManager {
    bus: EventBus,
    apps: HashMap<String, AppSpec>,
    processes: BTreeMap<ProcessId, Process>,
    windows: HashMap<WindowId, Window>,
    /// Geometry to return to when a maximized window is restored.
    restore_bounds: HashMap<WindowId, Rect>,
    z_counter: SequenceCounter,
    next_process: u64,
    next_window: u64,
    opened_total: u64,
    device: DeviceProfile,
    close_zone: f64,
}

impl WindowManager {
    pub fn new(bus: EventBus, device: DeviceProfile) -> Self {
        Self {
            bus,
            apps: HashMap::new(),
            processes: BTreeMap::new(),
            windows: HashMap::new(),
            restore_bounds: HashMap::new(),
            z_counter: SequenceCounter::starting_at(1),
            next_process: 1,
            next_window: 1,
            opened_total: 0,
            device,
            close_zone: DEFAULT_CLOSE_ZONE,
        }
    }

    pub fn with_close_zone(mut self, close_zone: f64) -> Self {
        self.close_zone = close_zone;
        self
    }

    /// Adds or replaces an entry in the app registry.
    pub fn register_app(&mut self, spec: AppSpec) {
        self.apps.insert(spec.app_id.clone(), spec);
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id)
    }

    /// Running processes in launch order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// The visible window with the highest `z_index`.
    pub fn active_window(&self) -> Option<WindowId> {
        self.windows
            .values()
            .filter(|w| w.state.is_visible())
            .max_by_key(|w| w.z_index)
            .map(|w| w.id)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Launches `app_id`, or brings a single-instance app's running process
    /// forward.  Returns the window that ends up focused.
    pub fn launch(&mut self, app_id: &str) -> Result<WindowId, WindowError> {
        let spec = self
            .apps
            .get(app_id)
            .cloned()
            .unwrap_or_else(|| AppSpec::fallback(app_id));

        if !spec.multi_instance {
            let running = self
                .processes
                .values()
                .find(|p| p.app_id == app_id)
                .map(|p| (p.id, p.primary_window()));
            if let Some((pid, primary)) = running {
                return match primary {
                    Some(wid) => {
                        debug!(app_id, %pid, "app already running, bringing it forward");
                        self.bring_forward(wid)?;
                        Ok(wid)
                    }
                    None => self.open_window(pid, &spec.title),
                };
            }
        }

        let pid = ProcessId(self.next_process);
        self.next_process += 1;
        self.processes.insert(
            pid,
            Process {
                id: pid,
                app_id: spec.app_id.clone(),
                window_ids: Vec::new(),
                icon_ref: spec.icon_ref.clone(),
                persistent: spec.persistent,
            },
        );
        info!(app_id, %pid, "process started");
        self.bus.publish(ShellEvent::ProcessStarted {
            process: pid,
            app_id: spec.app_id.clone(),
        });
        self.open_window(pid, &spec.title)
    }

    /// Opens another window inside a running process.
    pub fn open_window(&mut self, pid: ProcessId, title: &str) -> Result<WindowId, WindowError> {
        let app_id = self
            .processes
            .get(&pid)
            .map(|p| p.app_id.clone())
            .ok_or(WindowError::ProcessNotFound(pid))?;
        let size = self
            .apps
            .get(&app_id)
            .map(|s| s.default_size)
            .unwrap_or_else(|| AppSpec::fallback(&app_id).default_size);

        let wid = WindowId(self.next_window);
        self.next_window += 1;
        let bounds = self.initial_bounds(size);
        let mut window = Window {
            id: wid,
            process_id: pid,
            title: title.to_string(),
            position: bounds.origin,
            size: bounds.size,
            z_index: self.z_counter.next(),
            state: WindowState::Opening,
        };
        self.opened_total += 1;

        if let Some(process) = self.processes.get_mut(&pid) {
            process.window_ids.push(wid);
        }
        self.windows.insert(wid, window.clone());
        self.bus.publish(ShellEvent::WindowOpened(window.clone()));

        window.state = self.transition(wid, WindowAction::Show)?;
        info!(%wid, %pid, z = window.z_index, "window opened");
        self.bus.publish(ShellEvent::WindowFocused {
            window: wid,
            process: pid,
            z_index: window.z_index,
        });
        Ok(wid)
    }

    /// Raises `id` above every other window.
    ///
    /// Unknown and closing windows are ignored.  A minimized window takes the
    /// new stacking value but stays minimized.
    pub fn focus(&mut self, id: WindowId) -> Result<(), WindowError> {
        let Some(window) = self.windows.get_mut(&id) else {
            debug!(%id, "focus on unknown window ignored");
            return Ok(());
        };
        if !window.state.is_open() {
            debug!(%id, state = ?window.state, "focus on closing window ignored");
            return Ok(());
        }
        window.z_index = self.z_counter.next();
        let (process, z_index) = (window.process_id, window.z_index);
        self.bus.publish(ShellEvent::WindowFocused {
            window: id,
            process,
            z_index,
        });
        Ok(())
    }

    /// `Normal → Minimized`.
    pub fn minimize(&mut self, id: WindowId) -> Result<(), WindowError> {
        self.transition(id, WindowAction::Minimize)?;
        Ok(())
    }

    /// `Minimized | Maximized → Normal`, then focus.
    pub fn restore(&mut self, id: WindowId) -> Result<(), WindowError> {
        let from = self.state_of(id)?;
        self.transition(id, WindowAction::Restore)?;
        if from == WindowState::Maximized {
            if let Some(bounds) = self.restore_bounds.remove(&id) {
                self.set_bounds(id, bounds);
            }
        }
        self.focus(id)
    }

    /// `Normal → Maximized`, filling the desktop area, then focus.
    pub fn maximize(&mut self, id: WindowId) -> Result<(), WindowError> {
        let before = self.window(id).map(Window::bounds);
        self.transition(id, WindowAction::Maximize)?;
        if let Some(before) = before {
            self.restore_bounds.insert(id, before);
        }
        self.set_bounds(id, self.device.desktop_bounds());
        self.focus(id)
    }

    /// Moves a window.  The title bar can never go above the top inset.
    pub fn move_window(&mut self, id: WindowId, to: Point) -> Result<(), WindowError> {
        if !to.is_finite() {
            return Err(WindowError::InvalidGeometry);
        }
        let window = self.windows.get(&id).ok_or(WindowError::WindowNotFound(id))?;
        let top = self.device.desktop_bounds().origin.y;
        let position = Point::new(to.x, to.y.max(top));
        let bounds = Rect {
            origin: position,
            size: window.size,
        };
        self.set_bounds(id, bounds);
        Ok(())
    }

    /// Resizes a window, never below [`MIN_WINDOW_SIZE`].
    pub fn resize_window(&mut self, id: WindowId, size: Size) -> Result<(), WindowError> {
        if !size.width.is_finite() || !size.height.is_finite() {
            return Err(WindowError::InvalidGeometry);
        }
        let window = self.windows.get(&id).ok_or(WindowError::WindowNotFound(id))?;
        let bounds = Rect {
            origin: window.position,
            size: Size::new(
                size.width.max(MIN_WINDOW_SIZE.width),
                size.height.max(MIN_WINDOW_SIZE.height),
            ),
        };
        self.set_bounds(id, bounds);
        Ok(())
    }

    /// `* → Closing → Closed`.  The window is forgotten afterwards; its
    /// process exits with it unless the process is persistent or still owns
    /// other windows.
    pub fn close(&mut self, id: WindowId) -> Result<(), WindowError> {
        self.transition(id, WindowAction::Close)?;
        self.transition(id, WindowAction::Finalize)?;

        let Some(window) = self.windows.remove(&id) else {
            return Ok(());
        };
        self.restore_bounds.remove(&id);
        let pid = window.process_id;

        let exited = match self.processes.get_mut(&pid) {
            Some(process) => {
                process.window_ids.retain(|w| *w != id);
                process.window_ids.is_empty() && !process.persistent
            }
            None => false,
        };
        let exited = if exited {
            self.processes.remove(&pid)
        } else {
            None
        };

        info!(%id, %pid, "window closed");
        self.bus.publish(ShellEvent::WindowClosed {
            window: id,
            process: pid,
        });
        if let Some(process) = exited {
            info!(%pid, app_id = %process.app_id, "process exited");
            self.bus.publish(ShellEvent::ProcessExited {
                process: pid,
                app_id: process.app_id,
            });
        }
        Ok(())
    }

    /// Switches to the next or previous process in launch order, wrapping
    /// around.  Returns the window that was brought forward.
    pub fn cycle_apps(&mut self, direction: CycleDirection) -> Option<WindowId> {
        let order: Vec<(ProcessId, WindowId)> = self
            .processes
            .values()
            .filter_map(|p| p.primary_window().map(|w| (p.id, w)))
            .collect();
        if order.is_empty() {
            return None;
        }

        let current = self
            .active_window()
            .and_then(|w| self.windows.get(&w))
            .and_then(|w| order.iter().position(|(pid, _)| *pid == w.process_id));
        let len = order.len();
        let next = match (current, direction) {
            (Some(i), CycleDirection::Forward) => (i + 1) % len,
            (Some(i), CycleDirection::Backward) => (i + len - 1) % len,
            (None, CycleDirection::Forward) => 0,
            (None, CycleDirection::Backward) => len - 1,
        };

        let (pid, wid) = order[next];
        debug!(?direction, %pid, "cycling apps");
        match self.bring_forward(wid) {
            Ok(()) => Some(wid),
            Err(e) => {
                warn!(%wid, error = %e, "could not bring window forward while cycling");
                None
            }
        }
    }

    /// Navigation wiring for recognised gestures.  Only active on phones.
    pub fn handle_gesture(&mut self, gesture: &Gesture) {
        if !self.device.is_mobile() {
            debug!(kind = ?gesture.kind, "gesture ignored on non-mobile device");
            return;
        }
        match gesture.kind {
            GestureKind::SwipeDown => {
                let zone = self.device.top_inset + self.close_zone;
                if gesture.start.y > zone {
                    return;
                }
                if let Some(active) = self.active_window() {
                    if let Err(e) = self.close(active) {
                        warn!(%active, error = %e, "swipe-down close failed");
                    }
                }
            }
            GestureKind::SwipeLeft if self.switchable_count() >= 2 => {
                self.cycle_apps(CycleDirection::Forward);
            }
            GestureKind::SwipeRight if self.switchable_count() >= 2 => {
                self.cycle_apps(CycleDirection::Backward);
            }
            kind => debug!(?kind, "gesture has no navigation action"),
        }
    }

    /// Processes `cycle_apps` can switch to.
    fn switchable_count(&self) -> usize {
        self.processes
            .values()
            .filter(|p| p.primary_window().is_some())
            .count()
    }

    /// Adopts a new device profile and keeps windows inside the new desktop
    /// area.
    pub fn set_device(&mut self, device: DeviceProfile) {
        self.device = device;
        let area = device.desktop_bounds();
        let updates: Vec<(WindowId, Rect)> = self
            .windows
            .values()
            .filter(|w| w.state.is_open())
            .filter_map(|w| {
                let next = if w.state == WindowState::Maximized {
                    area
                } else {
                    Rect {
                        origin: Point::new(w.position.x, w.position.y.max(area.origin.y)),
                        size: w.size,
                    }
                };
                (next != w.bounds()).then_some((w.id, next))
            })
            .collect();
        for (id, bounds) in updates {
            self.set_bounds(id, bounds);
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn bring_forward(&mut self, id: WindowId) -> Result<(), WindowError> {
        if self.state_of(id)? == WindowState::Minimized {
            self.restore(id)
        } else {
            self.focus(id)
        }
    }

    fn state_of(&self, id: WindowId) -> Result<WindowState, WindowError> {
        self.windows
            .get(&id)
            .map(|w| w.state)
            .ok_or(WindowError::WindowNotFound(id))
    }

    /// Applies one state-machine edge and publishes it.
    fn transition(&mut self, id: WindowId, action: WindowAction) -> Result<WindowState, WindowError> {
        let window = self
            .windows
            .get_mut(&id)
            .ok_or(WindowError::WindowNotFound(id))?;
        let from = window.state;
        let to = from.transition(action)?;
        window.state = to;
        self.bus.publish(ShellEvent::WindowStateChanged {
            window: id,
            from,
            to,
        });
        Ok(to)
    }

    fn set_bounds(&mut self, id: WindowId, bounds: Rect) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.position = bounds.origin;
            window.size = bounds.size;
            self.bus.publish(ShellEvent::WindowGeometryChanged { window: id, bounds });
        }
    }

    /// Phones open windows full-screen; larger screens cascade them.
    fn initial_bounds(&self, size: Size) -> Rect {
        let area = self.device.desktop_bounds();
        if self.device.is_mobile() {
            return area;
        }
        let step = (self.opened_total % CASCADE_SLOTS) as f64 * CASCADE_STEP;
        let wanted = Point::new(area.origin.x + step, area.origin.y + step);
        Rect {
            origin: area.clamp_box(wanted, size),
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use webtop_core::{Channel, DeviceThresholds, Viewport};

    use super::*;

    fn desktop() -> DeviceProfile {
        DeviceProfile::classify(Viewport::new(1440.0, 900.0, false), &DeviceThresholds::default())
    }

    fn phone() -> DeviceProfile {
        DeviceProfile::classify(Viewport::new(390.0, 844.0, true), &DeviceThresholds::default())
    }

    fn manager(device: DeviceProfile) -> (WindowManager, Rc<RefCell<Vec<ShellEvent>>>) {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = bus.subscribe_all(move |e| {
            s.borrow_mut().push(e.clone());
            Ok(())
        });
        (WindowManager::new(bus, device), seen)
    }

    fn z(wm: &WindowManager, id: WindowId) -> u64 {
        wm.window(id).map(|w| w.z_index).unwrap_or_default()
    }

    fn swipe(kind: GestureKind, start: Point) -> Gesture {
        Gesture {
            kind,
            start,
            end: start,
            duration_ms: 150,
        }
    }

    #[test]
    fn test_launch_creates_process_and_normal_window() {
        // Arrange
        let (mut wm, seen) = manager(desktop());

        // Act
        let w = wm.launch("notes").expect("launch");

        // Assert
        let window = wm.window(w).expect("window exists");
        assert_eq!(window.state, WindowState::Normal);
        assert_eq!(wm.process_count(), 1);
        let channels: Vec<Channel> = seen.borrow().iter().map(ShellEvent::channel).collect();
        assert_eq!(
            channels,
            vec![
                Channel::ProcessStarted,
                Channel::WindowOpened,
                Channel::WindowStateChanged,
                Channel::WindowFocused,
            ]
        );
    }

    #[test]
    fn test_later_launch_is_stacked_above_earlier_one() {
        let (mut wm, _) = manager(desktop());

        let w1 = wm.launch("a").unwrap();
        let w2 = wm.launch("b").unwrap();

        assert!(z(&wm, w2) > z(&wm, w1));
        assert_eq!(wm.active_window(), Some(w2));
    }

    #[test]
    fn test_focus_puts_window_strictly_above_all_others() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let w1 = wm.launch("a").unwrap();
        let w2 = wm.launch("b").unwrap();
        let w3 = wm.launch("c").unwrap();

        // Act
        wm.focus(w1).unwrap();

        // Assert
        assert!(z(&wm, w1) > z(&wm, w2));
        assert!(z(&wm, w1) > z(&wm, w3));
    }

    #[test]
    fn test_focus_on_unknown_window_is_silent_noop() {
        let (mut wm, seen) = manager(desktop());

        let result = wm.focus(WindowId(99));

        assert_eq!(result, Ok(()));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_single_instance_relaunch_reuses_process() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let first = wm.launch("notes").unwrap();
        wm.launch("other").unwrap();

        // Act
        let again = wm.launch("notes").unwrap();

        // Assert
        assert_eq!(first, again);
        assert_eq!(wm.process_count(), 2);
        assert_eq!(wm.active_window(), Some(first));
    }

    #[test]
    fn test_multi_instance_app_gets_new_process_each_launch() {
        let (mut wm, _) = manager(desktop());
        wm.register_app(AppSpec {
            multi_instance: true,
            ..AppSpec::fallback("terminal")
        });

        wm.launch("terminal").unwrap();
        wm.launch("terminal").unwrap();

        assert_eq!(wm.process_count(), 2);
    }

    #[test]
    fn test_relaunch_restores_minimized_window() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("notes").unwrap();
        wm.minimize(w).unwrap();

        // Act
        wm.launch("notes").unwrap();

        // Assert
        assert_eq!(wm.window(w).map(|w| w.state), Some(WindowState::Normal));
        assert_eq!(wm.active_window(), Some(w));
    }

    #[test]
    fn test_minimized_window_leaves_visible_stack() {
        let (mut wm, _) = manager(desktop());
        let w1 = wm.launch("a").unwrap();
        let w2 = wm.launch("b").unwrap();

        wm.minimize(w2).unwrap();

        assert_eq!(wm.active_window(), Some(w1));
    }

    #[test]
    fn test_restore_makes_window_topmost() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let w1 = wm.launch("a").unwrap();
        let w2 = wm.launch("b").unwrap();
        wm.minimize(w1).unwrap();

        // Act
        wm.restore(w1).unwrap();

        // Assert
        assert!(z(&wm, w1) > z(&wm, w2));
        assert_eq!(wm.active_window(), Some(w1));
    }

    #[test]
    fn test_minimize_from_maximized_is_rejected() {
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();
        wm.maximize(w).unwrap();

        let result = wm.minimize(w);

        assert!(matches!(result, Err(WindowError::InvalidTransition(_))));
    }

    #[test]
    fn test_maximize_fills_desktop_and_restore_returns_geometry() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();
        let before = wm.window(w).map(Window::bounds).unwrap();

        // Act
        wm.maximize(w).unwrap();
        let maximized = wm.window(w).map(Window::bounds).unwrap();
        wm.restore(w).unwrap();

        // Assert
        assert_eq!(maximized, Rect::new(0.0, 20.0, 1440.0, 880.0));
        assert_eq!(wm.window(w).map(Window::bounds), Some(before));
    }

    #[test]
    fn test_move_window_is_clamped_below_top_inset() {
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();

        wm.move_window(w, Point::new(300.0, -50.0)).unwrap();

        assert_eq!(wm.window(w).map(|w| w.position), Some(Point::new(300.0, 20.0)));
    }

    #[test]
    fn test_resize_window_enforces_minimum_size() {
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();

        wm.resize_window(w, Size::new(10.0, 500.0)).unwrap();

        assert_eq!(wm.window(w).map(|w| w.size), Some(Size::new(120.0, 500.0)));
    }

    #[test]
    fn test_non_finite_geometry_is_rejected() {
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();

        assert_eq!(
            wm.move_window(w, Point::new(f64::NAN, 0.0)),
            Err(WindowError::InvalidGeometry)
        );
    }

    #[test]
    fn test_closing_last_window_exits_process() {
        // Arrange
        let (mut wm, seen) = manager(desktop());
        let w = wm.launch("a").unwrap();
        seen.borrow_mut().clear();

        // Act
        wm.close(w).unwrap();

        // Assert
        assert!(wm.window(w).is_none());
        assert_eq!(wm.process_count(), 0);
        let seen = seen.borrow();
        assert!(matches!(
            seen[0],
            ShellEvent::WindowStateChanged {
                to: WindowState::Closing,
                ..
            }
        ));
        assert!(matches!(
            seen[1],
            ShellEvent::WindowStateChanged {
                to: WindowState::Closed,
                ..
            }
        ));
        assert_eq!(seen[2].channel(), Channel::WindowClosed);
        assert_eq!(seen[3].channel(), Channel::ProcessExited);
    }

    #[test]
    fn test_persistent_process_survives_without_windows_and_reopens() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        wm.register_app(AppSpec {
            persistent: true,
            ..AppSpec::fallback("music")
        });
        let w = wm.launch("music").unwrap();

        // Act
        wm.close(w).unwrap();
        let reopened = wm.launch("music").unwrap();

        // Assert
        assert_eq!(wm.process_count(), 1);
        assert_ne!(w, reopened);
        assert_eq!(wm.window(reopened).map(|w| w.state), Some(WindowState::Normal));
    }

    #[test]
    fn test_process_with_two_windows_survives_closing_one() {
        let (mut wm, _) = manager(desktop());
        let w1 = wm.launch("files").unwrap();
        let pid = wm.window(w1).map(|w| w.process_id).unwrap();
        let w2 = wm.open_window(pid, "Downloads").unwrap();

        wm.close(w1).unwrap();

        let process = wm.process(pid).expect("process still running");
        assert_eq!(process.window_ids, vec![w2]);
    }

    #[test]
    fn test_close_updates_process_before_announcing() {
        // Arrange
        let (mut wm, seen) = manager(desktop());
        let w1 = wm.launch("files").unwrap();
        let pid = wm.window(w1).map(|w| w.process_id).unwrap();
        let w2 = wm.open_window(pid, "Downloads").unwrap();
        seen.borrow_mut().clear();

        // Act
        wm.close(w2).unwrap();
        wm.close(w1).unwrap();

        // Assert
        let channels: Vec<Channel> = seen.borrow().iter().map(|e| e.channel()).collect();
        assert_eq!(
            channels,
            vec![
                Channel::WindowStateChanged,
                Channel::WindowStateChanged,
                Channel::WindowClosed,
                Channel::WindowStateChanged,
                Channel::WindowStateChanged,
                Channel::WindowClosed,
                Channel::ProcessExited,
            ]
        );
        assert!(wm.process(pid).is_none());
        assert_eq!(wm.windows().count(), 0);
    }

    #[test]
    fn test_close_unknown_window_is_an_error() {
        let (mut wm, _) = manager(desktop());

        assert_eq!(
            wm.close(WindowId(7)),
            Err(WindowError::WindowNotFound(WindowId(7)))
        );
    }

    #[test]
    fn test_cycle_apps_follows_launch_order_and_wraps() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let a = wm.launch("a").unwrap();
        let b = wm.launch("b").unwrap();
        let c = wm.launch("c").unwrap();
        wm.focus(a).unwrap();

        // Act / Assert
        assert_eq!(wm.cycle_apps(CycleDirection::Forward), Some(b));
        assert_eq!(wm.cycle_apps(CycleDirection::Forward), Some(c));
        assert_eq!(wm.cycle_apps(CycleDirection::Forward), Some(a));
        assert_eq!(wm.cycle_apps(CycleDirection::Backward), Some(c));
    }

    #[test]
    fn test_cycle_apps_restores_minimized_target() {
        let (mut wm, _) = manager(desktop());
        let a = wm.launch("a").unwrap();
        let b = wm.launch("b").unwrap();
        wm.minimize(b).unwrap();

        let focused = wm.cycle_apps(CycleDirection::Forward);

        assert_eq!(focused, Some(b));
        assert_eq!(wm.window(b).map(|w| w.state), Some(WindowState::Normal));
        assert!(z(&wm, b) > z(&wm, a));
    }

    #[test]
    fn test_swipe_left_on_phone_switches_to_next_process() {
        // Arrange
        let (mut wm, _) = manager(phone());
        let w1 = wm.launch("a").unwrap();
        let w2 = wm.launch("b").unwrap();
        wm.focus(w1).unwrap();

        // Act
        wm.handle_gesture(&swipe(GestureKind::SwipeLeft, Point::new(300.0, 400.0)));

        // Assert
        assert_eq!(wm.active_window(), Some(w2));
    }

    #[test]
    fn test_swipe_left_with_single_process_does_nothing() {
        let (mut wm, seen) = manager(phone());
        wm.launch("a").unwrap();
        seen.borrow_mut().clear();

        wm.handle_gesture(&swipe(GestureKind::SwipeLeft, Point::new(300.0, 400.0)));

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_swipe_left_ignores_persistent_process_without_windows() {
        // Arrange – one windowless persistent process and one running app
        let (mut wm, seen) = manager(phone());
        wm.register_app(AppSpec {
            persistent: true,
            ..AppSpec::fallback("music")
        });
        let music = wm.launch("music").unwrap();
        wm.close(music).unwrap();
        let notes = wm.launch("notes").unwrap();
        assert_eq!(wm.process_count(), 2);
        seen.borrow_mut().clear();

        // Act
        wm.handle_gesture(&swipe(GestureKind::SwipeLeft, Point::new(300.0, 400.0)));
        wm.handle_gesture(&swipe(GestureKind::SwipeRight, Point::new(100.0, 400.0)));

        // Assert
        assert!(seen.borrow().is_empty());
        assert_eq!(wm.active_window(), Some(notes));
    }

    #[test]
    fn test_swipe_down_from_top_closes_active_window_on_phone() {
        let (mut wm, _) = manager(phone());
        let w = wm.launch("a").unwrap();

        wm.handle_gesture(&swipe(GestureKind::SwipeDown, Point::new(200.0, 60.0)));

        assert!(wm.window(w).is_none());
    }

    #[test]
    fn test_swipe_down_from_middle_of_screen_is_ignored() {
        let (mut wm, _) = manager(phone());
        let w = wm.launch("a").unwrap();

        wm.handle_gesture(&swipe(GestureKind::SwipeDown, Point::new(200.0, 400.0)));

        assert!(wm.window(w).is_some());
    }

    #[test]
    fn test_gestures_are_ignored_on_desktop() {
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();

        wm.handle_gesture(&swipe(GestureKind::SwipeDown, Point::new(200.0, 10.0)));

        assert!(wm.window(w).is_some());
    }

    #[test]
    fn test_phone_windows_open_full_screen() {
        let (mut wm, _) = manager(phone());

        let w = wm.launch("a").unwrap();

        assert_eq!(
            wm.window(w).map(Window::bounds),
            Some(Rect::new(0.0, 44.0, 390.0, 800.0))
        );
    }

    #[test]
    fn test_device_change_pushes_windows_below_new_inset() {
        // Arrange
        let (mut wm, _) = manager(desktop());
        let w = wm.launch("a").unwrap();
        wm.move_window(w, Point::new(0.0, 20.0)).unwrap();

        // Act
        wm.set_device(phone());

        // Assert
        assert_eq!(wm.window(w).map(|w| w.position.y), Some(44.0));
    }
}
