//! Shell: the composition root.
//!
//! Builds every service around one [`EventBus`], wires the bus subscriptions
//! between them, and routes [`RawInputEvent`]s from the host.
//!
//! ```text
//!  RawInputEvent
//!    ├─ pointer ─┬─ drag active ─► DragDropCoordinator ─► DRAG_* / DROP
//!    │           └─ otherwise ───► GestureHandler ──────► GESTURE
//!    ├─ resize / orientation / focus ─► DeviceDetector ─► DEVICE_CHANGED
//!    ├─ key (Escape) ─► DragDropCoordinator
//!    └─ drag source / icon activate ─► start_drag / launch
//!
//!  bus wiring
//!    GESTURE        → WindowManager::handle_gesture
//!    DEVICE_CHANGED → WindowManager::set_device, IconPositionSync::set_bounds
//!    DRAG_END(icon) → IconPositionSync::end_drag
//! ```
//!
//! Bus closures hold `Weak` handles to the services they call, so the bus
//! never keeps a service alive on its own.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info, warn};
use webtop_core::{
    AppSpec, Channel, DragKind, DragOutcome, DragPayload, DragSessionId, GestureThresholds,
    IconId, Point, PointerEvent, PointerPhase, ShellEvent, Size, Viewport, WindowId,
};

use super::device_detector::{DetectorSettings, DeviceDetector};
use super::drag_drop::{DragDropCoordinator, DropTarget, DropTargetGuard};
use super::event_bus::{EventBus, Subscription};
use super::gesture_handler::GestureHandler;
use super::icon_sync::{IconPositionSync, IconStore, PersistenceError, DEFAULT_ICON_SIZE};
use super::window_manager::{WindowError, WindowManager, DEFAULT_CLOSE_ZONE};
use crate::infrastructure::input_source::RawInputEvent;

/// Everything the shell needs that is not a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellSettings {
    pub owner_key: String,
    pub gestures: GestureThresholds,
    pub detector: DetectorSettings,
    pub close_zone: f64,
    pub icon_size: Size,
    pub apps: Vec<AppSpec>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            owner_key: "guest".to_string(),
            gestures: GestureThresholds::default(),
            detector: DetectorSettings::default(),
            close_zone: DEFAULT_CLOSE_ZONE,
            icon_size: DEFAULT_ICON_SIZE,
            apps: Vec::new(),
        }
    }
}

/// An icon being dragged across the desktop.
#[derive(Debug, Clone)]
struct IconDrag {
    icon: IconId,
    /// Pointer position minus icon top-left at pick-up.
    grab_offset: (f64, f64),
    /// Where the icon was before the drag; restored on cancel.
    origin: Point,
}

pub struct Shell {
    bus: EventBus,
    windows: Rc<RefCell<WindowManager>>,
    icons: Rc<RefCell<IconPositionSync>>,
    icon_drag: Rc<RefCell<Option<IconDrag>>>,
    drag: DragDropCoordinator,
    gestures: GestureHandler,
    device: DeviceDetector,
    subscriptions: Vec<Subscription>,
    now_ms: u64,
}

impl Shell {
    pub fn new(settings: ShellSettings, viewport: Viewport, store: Arc<dyn IconStore>) -> Self {
        let bus = EventBus::new();
        let device = DeviceDetector::new(bus.clone(), viewport, settings.detector);
        let profile = device.profile();

        let mut wm = WindowManager::new(bus.clone(), profile).with_close_zone(settings.close_zone);
        for app in settings.apps {
            wm.register_app(app);
        }
        let windows = Rc::new(RefCell::new(wm));
        let icons = Rc::new(RefCell::new(
            IconPositionSync::new(bus.clone(), store, settings.owner_key, profile.desktop_bounds())
                .with_icon_size(settings.icon_size),
        ));
        let icon_drag = Rc::new(RefCell::new(None));

        let subscriptions = vec![
            subscribe_gestures(&bus, Rc::downgrade(&windows)),
            subscribe_device(&bus, Rc::downgrade(&windows), Rc::downgrade(&icons)),
            subscribe_icon_drags(&bus, Rc::downgrade(&icons), Rc::downgrade(&icon_drag)),
        ];

        let mut shell = Self {
            gestures: GestureHandler::new(bus.clone(), settings.gestures, viewport.width),
            drag: DragDropCoordinator::new(bus.clone()),
            bus,
            windows,
            icons,
            icon_drag,
            device,
            subscriptions,
            now_ms: 0,
        };
        shell.sync_gestures();
        info!(class = ?profile.class, width = viewport.width, height = viewport.height, "shell started");
        shell
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn window_manager(&self) -> Ref<'_, WindowManager> {
        self.windows.borrow()
    }

    pub fn window_manager_mut(&self) -> RefMut<'_, WindowManager> {
        self.windows.borrow_mut()
    }

    pub fn icons(&self) -> Ref<'_, IconPositionSync> {
        self.icons.borrow()
    }

    pub fn drag(&self) -> &DragDropCoordinator {
        &self.drag
    }

    pub fn gestures(&self) -> &GestureHandler {
        &self.gestures
    }

    pub fn device(&self) -> &DeviceDetector {
        &self.device
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Publishes the current device profile for late subscribers.
    pub fn announce(&self) {
        self.device.announce();
    }

    pub fn launch(&self, app_id: &str) -> Result<WindowId, WindowError> {
        self.windows.borrow_mut().launch(app_id)
    }

    pub fn register_drop_target(&self, target: DropTarget) -> DropTargetGuard {
        self.drag.register_drop_target(target)
    }

    /// Picks up `payload` at `origin`.  Icon payloads carry the icon id in
    /// `data` and move the icon with the pointer.
    pub fn start_drag(&mut self, payload: DragPayload, origin: Point) -> DragSessionId {
        self.gestures.cancel();
        let icon = (payload.kind == DragKind::Icon).then(|| IconId::new(payload.data.clone()));
        let session = self.drag.start_drag(payload, origin);

        if let Some(icon) = icon {
            let at = self.icons.borrow().position(&icon).unwrap_or(origin);
            *self.icon_drag.borrow_mut() = Some(IconDrag {
                icon,
                grab_offset: (origin.x - at.x, origin.y - at.y),
                origin: at,
            });
        }
        session
    }

    /// Routes one host notification.
    pub fn handle_input(&mut self, event: RawInputEvent) {
        if let Some(t) = event.time_ms() {
            self.now_ms = self.now_ms.max(t);
        }

        match event {
            RawInputEvent::Pointer(pointer) => self.handle_pointer(&pointer),
            RawInputEvent::Resize {
                width,
                height,
                touch,
                time_ms,
            } => self
                .device
                .on_resize(Viewport::new(width, height, touch), time_ms),
            RawInputEvent::OrientationChange {
                width,
                height,
                touch,
                time_ms,
            } => self
                .device
                .on_orientation_change(Viewport::new(width, height, touch), time_ms),
            RawInputEvent::Key { key, .. } => {
                self.drag.handle_key(&key);
            }
            RawInputEvent::InputFocus { focused } => self.device.set_input_focused(focused),
            RawInputEvent::Tick { .. } => {}
            RawInputEvent::DragSource { payload, x, y } => {
                self.start_drag(payload, Point::new(x, y));
            }
            RawInputEvent::IconActivate { app_id } => {
                if let Err(e) = self.launch(&app_id) {
                    warn!(%app_id, error = %e, "launch from icon failed");
                }
            }
        }

        self.tick(self.now_ms);
    }

    /// Applies debounced work whose deadline has passed.
    pub fn tick(&mut self, now_ms: u64) {
        if self.device.tick(now_ms) {
            self.sync_gestures();
        }
    }

    /// Applies a pending resize immediately.
    pub fn flush_device(&mut self) {
        if self.device.flush() {
            self.sync_gestures();
        }
    }

    /// Applies finished saves and starts the next batched save.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn pump(&self) {
        let mut icons = self.icons.borrow_mut();
        icons.drain_completions();
        icons.flush_in_background();
    }

    /// Waits until every icon save, corrective ones included, has completed.
    pub async fn settle(&self) {
        let signal = self.icons.borrow().completion_signal();
        loop {
            {
                let mut icons = self.icons.borrow_mut();
                icons.drain_completions();
                icons.flush_in_background();
                if icons.in_flight() == 0 {
                    return;
                }
            }
            signal.notified().await;
        }
    }

    /// Restores the stored icon layout.
    pub async fn load_icons(&self) -> Result<usize, PersistenceError> {
        let (store, owner_key) = {
            let icons = self.icons.borrow();
            (icons.store(), icons.owner_key().to_string())
        };
        let records = store.load_icon_positions(owner_key).await?;
        Ok(self.icons.borrow_mut().apply_loaded(records))
    }

    /// Cancels any drag and detaches the bus wiring.
    pub fn shutdown(mut self) {
        self.drag.cancel();
        self.gestures.disable();
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
        info!("shell stopped");
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn handle_pointer(&mut self, event: &PointerEvent) {
        if !self.drag.is_dragging() {
            self.gestures.handle_pointer(event);
            return;
        }

        self.gestures.cancel();
        if matches!(event.phase, PointerPhase::Move | PointerPhase::Up) {
            self.move_dragged_icon(event.position);
        }
        self.drag.handle_pointer(event);
    }

    fn move_dragged_icon(&self, pointer: Point) {
        let Some(drag) = self.icon_drag.borrow().clone() else {
            return;
        };
        let (dx, dy) = drag.grab_offset;
        self.icons
            .borrow_mut()
            .on_icon_move(&drag.icon, pointer.x - dx, pointer.y - dy);
    }

    /// Swipe navigation only exists on phones.
    fn sync_gestures(&mut self) {
        let profile = self.device.profile();
        self.gestures.set_screen_width(profile.viewport.width);
        if profile.is_mobile() {
            self.gestures.enable();
        } else {
            self.gestures.disable();
        }
    }
}

// ── Bus wiring ────────────────────────────────────────────────────────────────

fn subscribe_gestures(bus: &EventBus, windows: Weak<RefCell<WindowManager>>) -> Subscription {
    bus.subscribe(Channel::Gesture, move |event| {
        let ShellEvent::Gesture(gesture) = event else {
            return Ok(());
        };
        let Some(windows) = windows.upgrade() else {
            return Ok(());
        };
        let mut wm = windows
            .try_borrow_mut()
            .map_err(|_| anyhow!("window manager busy, dropping gesture"))?;
        wm.handle_gesture(gesture);
        Ok(())
    })
}

fn subscribe_device(
    bus: &EventBus,
    windows: Weak<RefCell<WindowManager>>,
    icons: Weak<RefCell<IconPositionSync>>,
) -> Subscription {
    bus.subscribe(Channel::DeviceChanged, move |event| {
        let ShellEvent::DeviceChanged(profile) = event else {
            return Ok(());
        };
        if let Some(windows) = windows.upgrade() {
            windows
                .try_borrow_mut()
                .map_err(|_| anyhow!("window manager busy, device change not applied"))?
                .set_device(*profile);
        }
        if let Some(icons) = icons.upgrade() {
            icons
                .try_borrow_mut()
                .map_err(|_| anyhow!("icon sync busy, bounds not updated"))?
                .set_bounds(profile.desktop_bounds());
        }
        Ok(())
    })
}

fn subscribe_icon_drags(
    bus: &EventBus,
    icons: Weak<RefCell<IconPositionSync>>,
    icon_drag: Weak<RefCell<Option<IconDrag>>>,
) -> Subscription {
    bus.subscribe(Channel::DragEnd, move |event| {
        let ShellEvent::DragEnd {
            payload, outcome, ..
        } = event
        else {
            return Ok(());
        };
        if payload.kind != DragKind::Icon {
            return Ok(());
        }
        let (Some(icons), Some(icon_drag)) = (icons.upgrade(), icon_drag.upgrade()) else {
            return Ok(());
        };
        let Some(drag) = icon_drag.borrow_mut().take() else {
            return Ok(());
        };

        let mut icons = icons
            .try_borrow_mut()
            .map_err(|_| anyhow!("icon sync busy, icon drag end lost"))?;
        if let DragOutcome::Cancelled { reason } = outcome {
            debug!(icon = %drag.icon, ?reason, "icon drag cancelled, restoring position");
            icons.on_icon_move(&drag.icon, drag.origin.x, drag.origin.y);
        }
        icons.end_drag(&drag.icon);
        Ok(())
    })
}
