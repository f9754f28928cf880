//! Desktop icons.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// Identifier of a desktop icon, stable across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconId(pub String);

impl IconId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A launcher icon on the desktop surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesktopIcon {
    pub id: IconId,
    pub label: String,
    /// Top-left corner of the icon in desktop coordinates.
    pub position: Point,
    /// The app launched when the icon is opened.
    pub owner_app: String,
}

/// The shape handed to the persistence collaborator: `{ id, x, y }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconPositionRecord {
    pub id: IconId,
    pub x: f64,
    pub y: f64,
}

impl IconPositionRecord {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
