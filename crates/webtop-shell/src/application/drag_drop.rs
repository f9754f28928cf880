//! DragDropCoordinator: the single active drag session and its drop targets.
//!
//! # State machine (for beginners)
//!
//! ```text
//!                start_drag(payload)
//!   Idle ─────────────────────────────► Dragging { session, payload, hover }
//!    ▲                                     │  pointer move → update hover
//!    │                                     │
//!    └──── end_session(outcome) ◄──────────┤  pointer up  → drop on hover target
//!          (the ONE cleanup path)          │  pointer cancel / Escape / cancel()
//!                                          │  start_drag while dragging
//! ```
//!
//! Only one session can exist because the state is an enum: `Dragging`
//! carries the payload, `Idle` carries nothing.  Starting a drag while one is
//! active cancels the running session (reason `Superseded`) through the same
//! cleanup path before the new one starts.
//!
//! # Drop targets
//!
//! Targets register a rectangle, a stacking layer, the payload kinds they
//! accept, and a [`DropHandler`].  Hit-testing is a lookup in a
//! [`SpatialIndex`], not a walk over a rendered element tree.
//!
//! Registration hands back a [`DropTargetGuard`].  Dropping the guard (or
//! calling [`DropTargetGuard::release`]) removes the target, so a component
//! that forgets to clean up cannot leave a dangling callback behind.
//!
//! Every callback into a handler runs with the registry borrow released and
//! inside `catch_unwind`; a panicking handler is logged and treated as having
//! rejected the payload.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};
use webtop_core::{
    CancelReason, DragKind, DragOutcome, DragPayload, DragSessionId, Key, Point, PointerEvent,
    PointerPhase, Rect, ShellEvent, SpatialIndex,
};

use super::event_bus::EventBus;

/// Callbacks a drop target implements.  Only `on_drop` is mandatory.
pub trait DropHandler {
    /// Called when the payload is released over the target.  Returns whether
    /// the drop was accepted.
    fn on_drop(&self, payload: &DragPayload) -> bool;

    /// Called on every pointer move over the target.  Returning `false`
    /// rejects the payload for this move.
    fn on_drag_over(&self, _payload: &DragPayload) -> bool {
        true
    }

    /// Called once when a continuous hover begins.
    fn on_drag_enter(&self, _payload: &DragPayload) {}

    /// Called once when a continuous hover ends, including after a drop.
    fn on_drag_leave(&self, _payload: &DragPayload) {}
}

/// Registration request for a drop target.
pub struct DropTarget {
    pub id: String,
    pub accepts: HashSet<DragKind>,
    pub bounds: Rect,
    /// Stacking layer.  Higher layers win hit-tests.
    pub layer: i32,
    pub handler: Rc<dyn DropHandler>,
}

impl DropTarget {
    pub fn new(
        id: impl Into<String>,
        accepts: impl IntoIterator<Item = DragKind>,
        bounds: Rect,
        handler: Rc<dyn DropHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            accepts: accepts.into_iter().collect(),
            bounds,
            layer: 0,
            handler,
        }
    }

    pub fn on_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }
}

struct RegisteredTarget {
    accepts: HashSet<DragKind>,
    handler: Rc<dyn DropHandler>,
    /// Distinguishes re-registrations of the same id.
    token: u64,
}

#[derive(Default)]
struct TargetRegistry {
    index: SpatialIndex<String>,
    targets: HashMap<String, RegisteredTarget>,
    next_token: u64,
}

impl TargetRegistry {
    fn remove_if_token(&mut self, id: &str, token: u64) -> bool {
        match self.targets.get(id) {
            Some(t) if t.token == token => {
                self.targets.remove(id);
                self.index.remove(&id.to_string());
                true
            }
            _ => false,
        }
    }

    fn handler(&self, hover: &Hover) -> Option<Rc<dyn DropHandler>> {
        self.targets
            .get(&hover.id)
            .filter(|t| t.token == hover.token)
            .map(|t| Rc::clone(&t.handler))
    }
}

/// Deregistration capability returned by
/// [`DragDropCoordinator::register_drop_target`].
#[must_use = "dropping the guard immediately unregisters the drop target"]
pub struct DropTargetGuard {
    id: String,
    token: u64,
    registry: Weak<RefCell<TargetRegistry>>,
    released: bool,
}

impl DropTargetGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Unregisters the target now.
    pub fn release(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(registry) = self.registry.upgrade() {
            if registry.borrow_mut().remove_if_token(&self.id, self.token) {
                debug!(target_id = %self.id, "drop target unregistered");
            }
        }
    }
}

impl Drop for DropTargetGuard {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Hover {
    id: String,
    token: u64,
}

struct DragSession {
    id: DragSessionId,
    payload: DragPayload,
    hover: Option<Hover>,
    pointer: Point,
}

enum DragState {
    Idle,
    Dragging(DragSession),
}

pub struct DragDropCoordinator {
    bus: EventBus,
    targets: Rc<RefCell<TargetRegistry>>,
    state: DragState,
    listening: bool,
}

impl DragDropCoordinator {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            targets: Rc::new(RefCell::new(TargetRegistry::default())),
            state: DragState::Idle,
            listening: false,
        }
    }

    // ── Drop target registry ──────────────────────────────────────────────────

    /// Registers (or replaces) a drop target.
    pub fn register_drop_target(&self, target: DropTarget) -> DropTargetGuard {
        let mut registry = self.targets.borrow_mut();
        let token = registry.next_token;
        registry.next_token += 1;
        registry
            .index
            .insert(target.id.clone(), target.bounds, target.layer);
        registry.targets.insert(
            target.id.clone(),
            RegisteredTarget {
                accepts: target.accepts,
                handler: target.handler,
                token,
            },
        );
        debug!(target_id = %target.id, layer = target.layer, "drop target registered");
        DropTargetGuard {
            id: target.id,
            token,
            registry: Rc::downgrade(&self.targets),
            released: false,
        }
    }

    /// Moves or resizes a registered target.  Returns `false` for unknown ids.
    pub fn update_drop_target_bounds(&self, id: &str, bounds: Rect) -> bool {
        self.targets
            .borrow_mut()
            .index
            .update_bounds(&id.to_string(), bounds)
    }

    pub fn drop_target_count(&self) -> usize {
        self.targets.borrow().targets.len()
    }

    // ── Session queries ───────────────────────────────────────────────────────

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// `true` while the coordinator wants pointer input routed to it.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn active_payload(&self) -> Option<&DragPayload> {
        match &self.state {
            DragState::Dragging(session) => Some(&session.payload),
            DragState::Idle => None,
        }
    }

    pub fn session_id(&self) -> Option<DragSessionId> {
        match &self.state {
            DragState::Dragging(session) => Some(session.id),
            DragState::Idle => None,
        }
    }

    /// Id of the target currently hovered with an accepted payload.
    pub fn current_target(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging(session) => session.hover.as_ref().map(|h| h.id.as_str()),
            DragState::Idle => None,
        }
    }

    pub fn pointer(&self) -> Option<Point> {
        match &self.state {
            DragState::Dragging(session) => Some(session.pointer),
            DragState::Idle => None,
        }
    }

    // ── Session lifecycle ─────────────────────────────────────────────────────

    /// Starts a drag.  An active session is cancelled first.
    pub fn start_drag(&mut self, payload: DragPayload, origin: Point) -> DragSessionId {
        if self.is_dragging() {
            debug!("drag started while another is active, cancelling the old one");
            self.end_with_cancel(CancelReason::Superseded);
        }

        let id = DragSessionId::new();
        info!(session = %id, kind = ?payload.kind, source = %payload.source_id, "drag started");
        self.state = DragState::Dragging(DragSession {
            id,
            payload: payload.clone(),
            hover: None,
            pointer: origin,
        });
        self.listening = true;
        self.bus.publish(ShellEvent::DragStart {
            session: id,
            payload,
            origin,
        });
        id
    }

    /// Routes a pointer sample to the active session.
    ///
    /// Returns `true` when the event was consumed by a drag.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        if !self.is_dragging() {
            return false;
        }
        match event.phase {
            PointerPhase::Move => self.update_hover(event.position),
            PointerPhase::Up => self.finish(event.position),
            PointerPhase::Cancel => self.end_with_cancel(CancelReason::PointerCancel),
            PointerPhase::Down => {}
        }
        true
    }

    /// Escape cancels the active drag.  Returns `true` when consumed.
    pub fn handle_key(&mut self, key: &Key) -> bool {
        if *key == Key::Escape && self.is_dragging() {
            self.end_with_cancel(CancelReason::Escape);
            return true;
        }
        false
    }

    /// Cancels the active drag, if any.
    pub fn cancel(&mut self) -> bool {
        if self.is_dragging() {
            self.end_with_cancel(CancelReason::Requested);
            return true;
        }
        false
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn update_hover(&mut self, point: Point) {
        if !point.is_finite() {
            debug!(?point, "ignoring drag move with malformed position");
            return;
        }
        let DragState::Dragging(session) = &mut self.state else {
            return;
        };
        session.pointer = point;

        let candidate = resolve_target(&self.targets, point, &session.payload);
        let next = candidate.as_ref().map(|(hover, _)| hover.clone());
        if next == session.hover {
            return;
        }

        let previous = std::mem::replace(&mut session.hover, next);
        let payload = session.payload.clone();

        if let Some(old) = previous {
            let handler = self.targets.borrow().handler(&old);
            if let Some(handler) = handler {
                guarded(&old.id, "on_drag_leave", (), || handler.on_drag_leave(&payload));
            }
        }
        if let Some((hover, handler)) = candidate {
            guarded(&hover.id, "on_drag_enter", (), || handler.on_drag_enter(&payload));
        }
    }

    fn finish(&mut self, point: Point) {
        self.update_hover(point);

        let Some(session) = self.take_session() else {
            return;
        };
        let hovered = session
            .hover
            .as_ref()
            .and_then(|hover| self.targets.borrow().handler(hover).map(|h| (hover.id.clone(), h)));

        let outcome = match hovered {
            Some((target, handler)) => {
                let accepted = guarded(&target, "on_drop", false, || handler.on_drop(&session.payload));
                info!(session = %session.id, %target, accepted, "payload dropped");
                self.bus.publish(ShellEvent::Drop {
                    session: session.id,
                    target: target.clone(),
                    payload: session.payload.clone(),
                    success: accepted,
                });
                guarded(&target, "on_drag_leave", (), || {
                    handler.on_drag_leave(&session.payload)
                });
                DragOutcome::Dropped { target, accepted }
            }
            None => DragOutcome::Released,
        };
        self.publish_end(session, outcome);
    }

    fn end_with_cancel(&mut self, reason: CancelReason) {
        let Some(session) = self.take_session() else {
            return;
        };
        if let Some(hover) = &session.hover {
            let handler = self.targets.borrow().handler(hover);
            if let Some(handler) = handler {
                guarded(&hover.id, "on_drag_leave", (), || {
                    handler.on_drag_leave(&session.payload)
                });
            }
        }
        info!(session = %session.id, ?reason, "drag cancelled");
        self.publish_end(session, DragOutcome::Cancelled { reason });
    }

    /// The cleanup path.  Every way out of `Dragging` goes through here, so
    /// the state is `Idle` and listeners are off before anyone hears about it.
    fn take_session(&mut self) -> Option<DragSession> {
        self.listening = false;
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    fn publish_end(&self, session: DragSession, outcome: DragOutcome) {
        self.bus.publish(ShellEvent::DragEnd {
            session: session.id,
            payload: session.payload,
            outcome,
        });
    }
}

/// Finds the topmost target under `point` that accepts `payload`.
fn resolve_target(
    targets: &Rc<RefCell<TargetRegistry>>,
    point: Point,
    payload: &DragPayload,
) -> Option<(Hover, Rc<dyn DropHandler>)> {
    let (hover, handler) = {
        let registry = targets.borrow();
        let id = registry.index.topmost_at(point)?;
        let target = registry.targets.get(id)?;
        if !target.accepts.contains(&payload.kind) {
            return None;
        }
        (
            Hover {
                id: id.clone(),
                token: target.token,
            },
            Rc::clone(&target.handler),
        )
    };

    let accepted = guarded(&hover.id, "on_drag_over", false, || handler.on_drag_over(payload));
    accepted.then_some((hover, handler))
}

/// Runs a drop-target callback, converting a panic into `fallback`.
fn guarded<T>(target: &str, callback: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            warn!(target_id = target, callback, "drop target callback panicked");
            fallback
        }
    }
}
