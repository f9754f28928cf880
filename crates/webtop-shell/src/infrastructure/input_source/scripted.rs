//! Replays a recorded input session from JSON.
//!
//! Two layouts are accepted:
//!
//! ```json
//! { "events": [ { "type": "tick", "time_ms": 0 }, ... ] }
//! ```
//!
//! or a bare array of events.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{CaptureError, InputSource, RawInputEvent};

/// Error type for loading input scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("I/O error reading script at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse input script: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Wrapped { events: Vec<RawInputEvent> },
    Bare(Vec<RawInputEvent>),
}

/// An [`InputSource`] that emits a fixed list of events, then disconnects.
pub struct ScriptedInputSource {
    events: Mutex<Option<Vec<RawInputEvent>>>,
}

impl ScriptedInputSource {
    pub fn new(events: Vec<RawInputEvent>) -> Self {
        Self {
            events: Mutex::new(Some(events)),
        }
    }

    /// Parses a script from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let events = match serde_json::from_str(json)? {
            ScriptFile::Wrapped { events } | ScriptFile::Bare(events) => events,
        };
        Ok(Self::new(events))
    }

    /// Reads and parses a script file.
    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Events not yet handed out by [`InputSource::start`].
    pub fn remaining(&self) -> usize {
        self.events
            .lock()
            .map(|g| g.as_ref().map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl InputSource for ScriptedInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        let events = self
            .events
            .lock()
            .map_err(|_| CaptureError::AlreadyStopped)?
            .take()
            .ok_or(CaptureError::AlreadyStarted)?;

        debug!(events = events.len(), "replaying input script");
        let (tx, rx) = mpsc::channel();
        for event in events {
            if tx.send(event).is_err() {
                break;
            }
        }
        // `tx` is dropped here, so the receiver ends after the last event.
        Ok(rx)
    }

    fn stop(&self) {
        if let Ok(mut guard) = self.events.lock() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use webtop_core::Key;

    use super::*;

    #[test]
    fn test_wrapped_script_replays_in_order_then_disconnects() {
        // Arrange
        let json = r#"{ "events": [
            { "type": "tick", "time_ms": 0 },
            { "type": "key", "key": "escape", "time_ms": 5 }
        ] }"#;
        let source = ScriptedInputSource::from_json(json).expect("parse");

        // Act
        let rx = source.start().expect("start");
        let events: Vec<RawInputEvent> = rx.iter().collect();

        // Assert
        assert_eq!(
            events,
            vec![
                RawInputEvent::Tick { time_ms: 0 },
                RawInputEvent::Key {
                    key: Key::Escape,
                    time_ms: 5
                },
            ]
        );
    }

    #[test]
    fn test_bare_array_script_is_accepted() {
        let source = ScriptedInputSource::from_json(r#"[{ "type": "input_focus", "focused": true }]"#)
            .expect("parse");

        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn test_script_can_only_start_once() {
        let source = ScriptedInputSource::new(Vec::new());
        let _rx = source.start().expect("first start");

        assert!(matches!(source.start(), Err(CaptureError::AlreadyStarted)));
    }

    #[test]
    fn test_malformed_script_returns_parse_error() {
        let result = ScriptedInputSource::from_json(r#"{ "events": [ { "type": "warp" } ] }"#);

        assert!(matches!(result, Err(ScriptError::Parse(_))));
    }

    #[test]
    fn test_missing_script_file_returns_io_error() {
        let result = ScriptedInputSource::from_path(Path::new("/nonexistent/webtop/script.json"));

        assert!(matches!(result, Err(ScriptError::Io { .. })));
    }
}
