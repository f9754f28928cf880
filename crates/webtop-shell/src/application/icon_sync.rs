//! IconPositionSync: optimistic desktop-icon layout with batched persistence.
//!
//! # Sequencing (for beginners)
//!
//! Every icon move takes a fresh *intent* number from one counter.  A save
//! carries, per icon, the intent number of the position it is saving.  When a
//! save completes:
//!
//! ```text
//! entry.intent > slot.confirmed   → authoritative, becomes the confirmed state
//! entry.intent ≤ slot.confirmed   → stale: an older save landed after a newer
//!                                   one, so the store now holds an old
//!                                   position.  Re-save the latest position
//!                                   under a new intent number.
//! ```
//!
//! Only *committed* positions are ever saved: the position an icon had when
//! its drag ended.  A corrective save that becomes due while the icon is
//! being dragged again waits for that drag to end.
//!
//! Saves run as tokio tasks.  Their completions come back over an unbounded
//! channel and are applied on the shell thread by
//! [`IconPositionSync::drain_completions`]; nothing here is shared across
//! threads except the store handle and the channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};
use webtop_core::{IconId, IconPositionRecord, Point, Rect, SequenceCounter, ShellEvent, Size};

use super::event_bus::EventBus;

/// Default icon footprint used for clamping.
pub const DEFAULT_ICON_SIZE: Size = Size::new(80.0, 80.0);

/// Error type for the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("icon store unavailable: {0}")]
    Unavailable(String),
    #[error("icon store I/O error: {0}")]
    Io(String),
    #[error("could not encode icon layout: {0}")]
    Encode(String),
    #[error("could not decode icon layout: {0}")]
    Decode(String),
}

/// Where icon layouts are persisted.
///
/// The file-backed implementation lives in `infrastructure::storage`; tests
/// use gated doubles or the generated `MockIconStore`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IconStore: Send + Sync {
    /// Replaces the stored positions of the given icons for `owner_key`.
    async fn save_icon_positions(
        &self,
        owner_key: String,
        icons: Vec<IconPositionRecord>,
    ) -> Result<(), PersistenceError>;

    /// Returns every stored position for `owner_key`.
    async fn load_icon_positions(
        &self,
        owner_key: String,
    ) -> Result<Vec<IconPositionRecord>, PersistenceError>;
}

/// One icon inside a [`SaveTicket`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveEntry {
    pub icon: IconId,
    pub intent_seq: u64,
    pub position: Point,
}

/// One batched save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub ticket_seq: u64,
    pub entries: Vec<SaveEntry>,
}

impl SaveTicket {
    fn records(&self) -> Vec<IconPositionRecord> {
        self.entries
            .iter()
            .map(|e| IconPositionRecord {
                id: e.icon.clone(),
                x: e.position.x,
                y: e.position.y,
            })
            .collect()
    }
}

/// Result of a save task, queued back to the shell thread.
#[derive(Debug)]
pub struct SaveCompletion {
    pub ticket: SaveTicket,
    pub result: Result<(), PersistenceError>,
}

/// What applying a completion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResolution {
    Applied,
    /// Some entries were older than the confirmed state; that many icons were
    /// queued for a corrective save.
    Stale { resaved: usize },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct IconSlot {
    position: Point,
    intent_seq: u64,
    /// Intent and position of the last drag end; what a save writes.
    committed_seq: u64,
    committed_position: Point,
    confirmed_seq: u64,
    confirmed_position: Option<Point>,
    /// Moved since the last drag end.
    dragging: bool,
    /// A corrective save is due once the current drag ends.
    needs_resave: bool,
    dirty: bool,
}

impl IconSlot {
    fn commit(&mut self, intent_seq: u64) {
        self.intent_seq = intent_seq;
        self.committed_seq = intent_seq;
        self.committed_position = self.position;
        self.dirty = true;
    }
}

pub struct IconPositionSync {
    bus: EventBus,
    store: Arc<dyn IconStore>,
    owner_key: String,
    bounds: Rect,
    icon_size: Size,
    slots: BTreeMap<IconId, IconSlot>,
    intents: SequenceCounter,
    tickets: SequenceCounter,
    tx: mpsc::UnboundedSender<SaveCompletion>,
    rx: mpsc::UnboundedReceiver<SaveCompletion>,
    in_flight: usize,
    signal: Arc<Notify>,
}

impl IconPositionSync {
    pub fn new(
        bus: EventBus,
        store: Arc<dyn IconStore>,
        owner_key: impl Into<String>,
        bounds: Rect,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            bus,
            store,
            owner_key: owner_key.into(),
            bounds,
            icon_size: DEFAULT_ICON_SIZE,
            slots: BTreeMap::new(),
            intents: SequenceCounter::starting_at(1),
            tickets: SequenceCounter::starting_at(1),
            tx,
            rx,
            in_flight: 0,
            signal: Arc::new(Notify::new()),
        }
    }

    pub fn with_icon_size(mut self, icon_size: Size) -> Self {
        self.icon_size = icon_size;
        self
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    pub fn store(&self) -> Arc<dyn IconStore> {
        Arc::clone(&self.store)
    }

    /// Current local position, which may be ahead of the store.
    pub fn position(&self, icon: &IconId) -> Option<Point> {
        self.slots.get(icon).map(|s| s.position)
    }

    /// Last position the store acknowledged.
    pub fn confirmed_position(&self, icon: &IconId) -> Option<Point> {
        self.slots.get(icon).and_then(|s| s.confirmed_position)
    }

    pub fn is_dirty(&self, icon: &IconId) -> bool {
        self.slots.get(icon).is_some_and(|s| s.dirty)
    }

    pub fn icons(&self) -> impl Iterator<Item = (&IconId, Point)> {
        self.slots.iter().map(|(id, s)| (id, s.position))
    }

    /// Saves spawned but not yet drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Notified once per finished save task.
    pub fn completion_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.signal)
    }

    // ── Local layout ──────────────────────────────────────────────────────────

    /// Moves an icon, clamped so it stays fully inside the desktop area.
    ///
    /// Returns the stored position, or `None` for malformed coordinates.
    pub fn on_icon_move(&mut self, icon: &IconId, x: f64, y: f64) -> Option<Point> {
        let wanted = Point::new(x, y);
        if !wanted.is_finite() {
            debug!(%icon, x, y, "ignoring icon move with malformed position");
            return None;
        }
        let position = self.bounds.clamp_box(wanted, self.icon_size);
        let intent_seq = self.intents.next();
        let slot = self.slots.entry(icon.clone()).or_insert(IconSlot {
            position,
            intent_seq,
            committed_seq: 0,
            committed_position: position,
            confirmed_seq: 0,
            confirmed_position: None,
            dragging: true,
            needs_resave: false,
            dirty: false,
        });
        slot.position = position;
        slot.intent_seq = intent_seq;
        slot.dragging = true;

        self.bus.publish(ShellEvent::IconMoved {
            icon: icon.clone(),
            position,
        });
        Some(position)
    }

    /// Commits the icon's position and marks it for the next batched save.
    /// Returns `false` when there is nothing newer than what the store
    /// already acknowledged.
    pub fn end_drag(&mut self, icon: &IconId) -> bool {
        let Some(slot) = self.slots.get_mut(icon) else {
            return false;
        };
        slot.dragging = false;
        if slot.intent_seq > slot.confirmed_seq {
            slot.needs_resave = false;
            let seq = slot.intent_seq;
            slot.commit(seq);
            return true;
        }
        if slot.needs_resave {
            slot.needs_resave = false;
            slot.commit(self.intents.next());
            return true;
        }
        false
    }

    /// `true` while the icon has moved since its last drag end.
    pub fn is_dragging(&self, icon: &IconId) -> bool {
        self.slots.get(icon).is_some_and(|s| s.dragging)
    }

    /// Re-clamps every icon into new bounds.  Local only; the stored layout
    /// is left alone until the user moves the icon again.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        let mut moved = Vec::new();
        for (id, slot) in self.slots.iter_mut() {
            slot.committed_position = bounds.clamp_box(slot.committed_position, self.icon_size);
            let clamped = bounds.clamp_box(slot.position, self.icon_size);
            if clamped != slot.position {
                slot.position = clamped;
                moved.push((id.clone(), clamped));
            }
        }
        for (icon, position) in moved {
            self.bus.publish(ShellEvent::IconMoved { icon, position });
        }
    }

    // ── Saving ────────────────────────────────────────────────────────────────

    /// Collects the committed position of every dirty icon into one ticket.
    pub fn flush(&mut self) -> Option<SaveTicket> {
        let entries: Vec<SaveEntry> = self
            .slots
            .iter_mut()
            .filter(|(_, slot)| slot.dirty)
            .map(|(id, slot)| {
                slot.dirty = false;
                SaveEntry {
                    icon: id.clone(),
                    intent_seq: slot.committed_seq,
                    position: slot.committed_position,
                }
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        let ticket = SaveTicket {
            ticket_seq: self.tickets.next(),
            entries,
        };
        debug!(ticket = ticket.ticket_seq, icons = ticket.entries.len(), "icon save batched");
        Some(ticket)
    }

    /// Runs `ticket` against the store on a tokio task.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn spawn_save(&mut self, ticket: SaveTicket) {
        self.in_flight += 1;
        let store = Arc::clone(&self.store);
        let owner_key = self.owner_key.clone();
        let records = ticket.records();
        let tx = self.tx.clone();
        let signal = Arc::clone(&self.signal);

        tokio::spawn(async move {
            // A panicking store must still produce a completion.
            let save =
                tokio::spawn(async move { store.save_icon_positions(owner_key, records).await });
            let result = match save.await {
                Ok(result) => result,
                Err(e) => Err(PersistenceError::Unavailable(format!("save task failed: {e}"))),
            };
            if tx.send(SaveCompletion { ticket, result }).is_err() {
                debug!("icon sync dropped before save completed");
            }
            signal.notify_one();
        });
    }

    /// `flush` + `spawn_save`.  Returns the ticket number, if any.
    pub fn flush_in_background(&mut self) -> Option<u64> {
        let ticket = self.flush()?;
        let seq = ticket.ticket_seq;
        self.spawn_save(ticket);
        Some(seq)
    }

    /// Applies every completion that has arrived so far.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.complete_save(completion);
            applied += 1;
        }
        applied
    }

    /// Applies one finished save.
    pub fn complete_save(&mut self, completion: SaveCompletion) -> SaveResolution {
        let SaveCompletion { ticket, result } = completion;
        if let Err(e) = result {
            warn!(
                ticket = ticket.ticket_seq,
                error = %e,
                "icon save failed, keeping local layout"
            );
            return SaveResolution::Failed;
        }

        let mut resaved = 0;
        for entry in &ticket.entries {
            let Some(slot) = self.slots.get_mut(&entry.icon) else {
                continue;
            };
            if entry.intent_seq > slot.confirmed_seq {
                slot.confirmed_seq = entry.intent_seq;
                slot.confirmed_position = Some(entry.position);
                continue;
            }

            debug!(
                icon = %entry.icon,
                stale = entry.intent_seq,
                confirmed = slot.confirmed_seq,
                "stale icon save landed late, re-saving latest position"
            );
            if slot.dragging {
                slot.needs_resave = true;
            } else {
                slot.commit(self.intents.next());
            }
            resaved += 1;
        }

        if resaved == 0 {
            SaveResolution::Applied
        } else {
            SaveResolution::Stale { resaved }
        }
    }

    /// Saves everything dirty and waits until no save is outstanding,
    /// corrective saves included.
    pub async fn settle(&mut self) {
        let signal = self.completion_signal();
        loop {
            self.drain_completions();
            self.flush_in_background();
            if self.in_flight == 0 {
                return;
            }
            signal.notified().await;
        }
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Restores the stored layout for this owner.
    pub async fn load(&mut self) -> Result<usize, PersistenceError> {
        let records = self
            .store
            .load_icon_positions(self.owner_key.clone())
            .await?;
        Ok(self.apply_loaded(records))
    }

    /// Installs positions read from the store.  Positions that no longer fit
    /// the current bounds are clamped and queued for saving.
    pub fn apply_loaded(&mut self, records: Vec<IconPositionRecord>) -> usize {
        let mut installed = 0;
        for record in records {
            let stored = record.position();
            if !stored.is_finite() {
                debug!(icon = %record.id, "skipping stored icon with malformed position");
                continue;
            }
            let position = self.bounds.clamp_box(stored, self.icon_size);
            let confirmed_seq = self.intents.next();
            let clamped = position != stored;
            let intent_seq = if clamped {
                self.intents.next()
            } else {
                confirmed_seq
            };
            self.slots.insert(
                record.id.clone(),
                IconSlot {
                    position,
                    intent_seq,
                    committed_seq: intent_seq,
                    committed_position: position,
                    confirmed_seq,
                    confirmed_position: Some(stored),
                    dragging: false,
                    needs_resave: false,
                    dirty: clamped,
                },
            );
            self.bus.publish(ShellEvent::IconMoved {
                icon: record.id,
                position,
            });
            installed += 1;
        }
        info!(owner = %self.owner_key, icons = installed, "icon layout loaded");
        installed
    }
}
