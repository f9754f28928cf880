//! Drag payloads.
//!
//! A drag payload describes *what* is being dragged, independently of *where*
//! it is going.  Drop targets declare which [`DragKind`]s they accept and the
//! coordinator only offers a payload to targets that accept its kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The category of a drag payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    File,
    Text,
    Icon,
    Window,
    Custom,
}

/// Identifies one drag session from `DRAG_START` to `DRAG_END`.
///
/// Subscribers use it to correlate the start, drop and end events of the
/// same gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DragSessionId(pub Uuid);

impl DragSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DragSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DragSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The single thing being dragged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPayload {
    pub kind: DragKind,
    /// Kind-specific data: a file path, the dragged text, an icon id, a window id…
    pub data: String,
    /// Identifier of the element the drag started from.
    pub source_id: String,
    /// Optional reference to a preview image the renderer shows under the cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_ref: Option<String>,
}

impl DragPayload {
    pub fn new(kind: DragKind, data: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
            source_id: source_id.into(),
            preview_ref: None,
        }
    }

    /// Builder-style setter for the preview reference.
    pub fn with_preview(mut self, preview_ref: impl Into<String>) -> Self {
        self.preview_ref = Some(preview_ref.into());
        self
    }
}
