//! End-to-end scenarios driven through the public `Shell` API.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;
use webtop_core::{
    classify_gesture, CancelReason, Channel, DragKind, DragOutcome, DragPayload, Gesture,
    GestureKind, GestureThresholds, IconId, IconPositionRecord, Point, PointerEvent, PointerPhase,
    ShellEvent, Viewport,
};
use webtop_shell::application::event_bus::EventBus;
use webtop_shell::application::icon_sync::{IconStore, PersistenceError};
use webtop_shell::application::shell::{Shell, ShellSettings};
use webtop_shell::infrastructure::input_source::scripted::ScriptedInputSource;
use webtop_shell::infrastructure::input_source::{InputSource, RawInputEvent};

// ── Test doubles ──────────────────────────────────────────────────────────────

/// Store whose saves can be held back until the test releases them.  A save
/// is gated when the x coordinate of its first record has a registered gate.
#[derive(Default)]
struct GatedStore {
    gates: Mutex<HashMap<i64, oneshot::Receiver<()>>>,
    persisted: Mutex<HashMap<IconId, Point>>,
    saves: Mutex<usize>,
}

impl GatedStore {
    fn gate(&self, x: f64) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(x as i64, rx);
        tx
    }

    fn persisted(&self, icon: &IconId) -> Option<Point> {
        self.persisted.lock().unwrap().get(icon).copied()
    }

    fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl IconStore for GatedStore {
    async fn save_icon_positions(
        &self,
        _owner_key: String,
        icons: Vec<IconPositionRecord>,
    ) -> Result<(), PersistenceError> {
        let gate = icons
            .first()
            .and_then(|r| self.gates.lock().unwrap().remove(&(r.x as i64)));
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let mut persisted = self.persisted.lock().unwrap();
        for record in &icons {
            persisted.insert(record.id.clone(), record.position());
        }
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn load_icon_positions(
        &self,
        _owner_key: String,
    ) -> Result<Vec<IconPositionRecord>, PersistenceError> {
        Ok(Vec::new())
    }
}

fn desktop() -> Viewport {
    Viewport::new(1440.0, 900.0, false)
}

fn phone() -> Viewport {
    Viewport::new(390.0, 844.0, true)
}

fn shell_on(viewport: Viewport) -> (Shell, Arc<GatedStore>) {
    let store = Arc::new(GatedStore::default());
    let settings = ShellSettings {
        owner_key: "alice".to_string(),
        ..ShellSettings::default()
    };
    let shell = Shell::new(settings, viewport, store.clone());
    (shell, store)
}

fn pointer(phase: PointerPhase, x: f64, y: f64, t: u64) -> RawInputEvent {
    RawInputEvent::Pointer(PointerEvent::new(phase, Point::new(x, y), t))
}

/// Picks up the icon at `from` and releases it at `to`.
fn drag_icon(shell: &mut Shell, icon: &str, from: Point, to: Point, t: u64) {
    shell.handle_input(RawInputEvent::DragSource {
        payload: DragPayload::new(DragKind::Icon, icon, "desktop"),
        x: from.x,
        y: from.y,
    });
    shell.handle_input(pointer(PointerPhase::Move, to.x, to.y, t));
    shell.handle_input(pointer(PointerPhase::Up, to.x, to.y, t + 10));
}

async fn yield_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
}

fn z_of(shell: &Shell, id: webtop_core::WindowId) -> u64 {
    shell
        .window_manager()
        .window(id)
        .map(|w| w.z_index)
        .unwrap_or_default()
}

// ── Event bus ─────────────────────────────────────────────────────────────────

#[test]
fn test_unsubscribed_handler_never_sees_later_publish() {
    // Arrange
    let bus = EventBus::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    let sub = bus.subscribe(Channel::Custom("X".into()), move |e| {
        s.borrow_mut().push(e.clone());
        Ok(())
    });
    bus.publish(ShellEvent::custom("X", "first"));

    // Act
    sub.unsubscribe();
    bus.publish(ShellEvent::custom("X", "second"));

    // Assert
    assert_eq!(*seen.borrow(), vec![ShellEvent::custom("X", "first")]);
}

#[test]
fn test_failing_handler_does_not_starve_its_neighbour() {
    // Arrange
    let bus = EventBus::new();
    let received = Rc::new(RefCell::new(0));
    let r = Rc::clone(&received);
    let _h1 = bus.subscribe(Channel::Custom("X".into()), |_| {
        panic!("handler blew up");
    });
    let _h2 = bus.subscribe(Channel::Custom("X".into()), move |_| {
        *r.borrow_mut() += 1;
        Ok(())
    });
    let _h3 = bus.subscribe(Channel::Custom("X".into()), |_| {
        anyhow::bail!("handler returned an error")
    });

    // Act
    let delivered = bus.publish(ShellEvent::custom("X", "payload"));

    // Assert
    assert_eq!(*received.borrow(), 1);
    assert_eq!(delivered, 1);
}

// ── Windows ───────────────────────────────────────────────────────────────────

#[test]
fn test_launch_then_focus_reorders_stack() {
    // Arrange
    let (shell, _) = shell_on(desktop());
    let w1 = shell.launch("A").unwrap();
    let w2 = shell.launch("B").unwrap();
    assert!(z_of(&shell, w2) > z_of(&shell, w1));

    // Act
    shell.window_manager_mut().focus(w1).unwrap();

    // Assert
    assert!(z_of(&shell, w1) > z_of(&shell, w2));
    assert_eq!(shell.window_manager().active_window(), Some(w1));
}

#[test]
fn test_focused_window_is_strictly_on_top_of_all_others() {
    let (shell, _) = shell_on(desktop());
    let ids: Vec<_> = ["A", "B", "C", "D"]
        .iter()
        .map(|app| shell.launch(app).unwrap())
        .collect();

    for &target in [ids[2], ids[0], ids[3], ids[0]].iter() {
        shell.window_manager_mut().focus(target).unwrap();

        let top = z_of(&shell, target);
        for &other in ids.iter().filter(|&&w| w != target) {
            assert!(top > z_of(&shell, other), "{target} not above {other}");
        }
    }
}

#[test]
fn test_swipe_left_cycles_to_next_process_on_phone() {
    // Arrange
    let (shell, _) = shell_on(phone());
    let w1 = shell.launch("A").unwrap();
    let w2 = shell.launch("B").unwrap();
    shell.window_manager_mut().focus(w1).unwrap();

    // Act
    shell.bus().publish(ShellEvent::Gesture(Gesture {
        kind: GestureKind::SwipeLeft,
        start: Point::new(300.0, 400.0),
        end: Point::new(150.0, 410.0),
        duration_ms: 120,
    }));

    // Assert
    assert_eq!(shell.window_manager().active_window(), Some(w2));
}

// ── Gestures ──────────────────────────────────────────────────────────────────

#[test]
fn test_gesture_classification_thresholds() {
    let thresholds = GestureThresholds::default();

    let right = classify_gesture(
        Point::new(100.0, 300.0),
        Point::new(190.0, 310.0),
        200,
        390.0,
        &thresholds,
    );
    let tap = classify_gesture(
        Point::new(100.0, 300.0),
        Point::new(110.0, 310.0),
        100,
        390.0,
        &thresholds,
    );

    assert_eq!(right.map(|g| g.kind), Some(GestureKind::SwipeRight));
    assert_eq!(tap, None);
}

// ── Drag and drop ─────────────────────────────────────────────────────────────

#[test]
fn test_second_drag_cancels_the_first() {
    // Arrange
    let (mut shell, _) = shell_on(desktop());
    let ends = Rc::new(RefCell::new(Vec::new()));
    let e = Rc::clone(&ends);
    let _sub = shell.bus().subscribe(Channel::DragEnd, move |event| {
        if let ShellEvent::DragEnd { outcome, .. } = event {
            e.borrow_mut().push(outcome.clone());
        }
        Ok(())
    });
    let first = shell.start_drag(
        DragPayload::new(DragKind::Text, "one", "editor"),
        Point::new(10.0, 10.0),
    );

    // Act
    let second = shell.start_drag(
        DragPayload::new(DragKind::File, "two.txt", "files"),
        Point::new(20.0, 20.0),
    );

    // Assert
    assert_ne!(first, second);
    assert_eq!(
        *ends.borrow(),
        vec![DragOutcome::Cancelled {
            reason: CancelReason::Superseded
        }]
    );
    assert_eq!(shell.drag().session_id(), Some(second));
    assert_eq!(
        shell.drag().active_payload().map(|p| p.data.as_str()),
        Some("two.txt")
    );
}

// ── Icons ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_icon_dragged_to_top_edge_is_stored_below_status_bar() {
    // Arrange
    let (mut shell, store) = shell_on(phone());
    let icon = IconId::new("notes");

    // Act
    drag_icon(&mut shell, "notes", Point::new(100.0, 300.0), Point::new(100.0, 0.0), 0);
    shell.settle().await;

    // Assert
    assert_eq!(shell.icons().position(&icon), Some(Point::new(100.0, 44.0)));
    assert_eq!(store.persisted(&icon), Some(Point::new(100.0, 44.0)));
}

#[tokio::test]
async fn test_out_of_order_saves_converge_on_latest_position() {
    // Arrange – the first save is held back until the second has landed
    let (mut shell, store) = shell_on(desktop());
    let icon = IconId::new("notes");
    let release_first = store.gate(100.0);

    drag_icon(&mut shell, "notes", Point::new(500.0, 500.0), Point::new(100.0, 200.0), 0);
    shell.pump();
    tokio::task::yield_now().await;

    drag_icon(&mut shell, "notes", Point::new(100.0, 200.0), Point::new(250.0, 300.0), 100);
    shell.pump();
    yield_until(|| store.save_count() == 1).await;
    assert_eq!(store.persisted(&icon), Some(Point::new(250.0, 300.0)));

    // Act – the stale save lands last
    let _ = release_first.send(());
    shell.settle().await;

    // Assert
    assert_eq!(store.persisted(&icon), Some(Point::new(250.0, 300.0)));
    assert_eq!(shell.icons().confirmed_position(&icon), Some(Point::new(250.0, 300.0)));
    assert!(!shell.icons().is_dirty(&icon));
    assert_eq!(store.save_count(), 3);
}

// ── Scripted input ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scripted_session_replays_through_shell() {
    // Arrange
    let script = r#"{
        "events": [
            {"type": "icon_activate", "app_id": "notes"},
            {"type": "icon_activate", "app_id": "mail"},
            {"type": "drag_source", "payload": {"kind": "icon", "data": "notes", "source_id": "desktop"}, "x": 40.0, "y": 60.0},
            {"type": "pointer", "phase": "move", "position": {"x": 400.0, "y": 300.0}, "time_ms": 10},
            {"type": "pointer", "phase": "up", "position": {"x": 400.0, "y": 300.0}, "time_ms": 20},
            {"type": "resize", "width": 390.0, "height": 844.0, "touch": true, "time_ms": 30},
            {"type": "tick", "time_ms": 500}
        ]
    }"#;
    let source = ScriptedInputSource::from_json(script).unwrap();
    let (mut shell, store) = shell_on(desktop());

    // Act
    for event in source.start().unwrap().iter() {
        shell.handle_input(event);
        shell.pump();
    }
    shell.settle().await;

    // Assert
    assert_eq!(shell.window_manager().process_count(), 2);
    assert!(shell.window_manager().device().is_mobile());
    assert!(shell.gestures().is_enabled());
    assert!(store.persisted(&IconId::new("notes")).is_some());
    assert_eq!(source.remaining(), 0);
}
