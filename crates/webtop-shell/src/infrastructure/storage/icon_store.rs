//! File-backed [`IconStore`] used by the binary.
//!
//! All owners share one TOML file:
//!
//! ```toml
//! [owners.alice]
//! notes = { x = 24.0, y = 64.0 }
//! trash = { x = 24.0, y = 160.0 }
//! ```
//!
//! A save merges the given icons into the owner's table; icons that are not
//! part of the batch keep their stored position.  Read-modify-write cycles
//! are serialised by an async mutex because saves run on concurrent tasks.
//!
//! The file is replaced atomically: the new layout goes to a sibling
//! `*.tmp` file which is then renamed over the original.  A layout that
//! cannot be decoded when saving is moved aside to `*.bad` and the save
//! starts from an empty layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use webtop_core::{IconId, IconPositionRecord};

use crate::application::icon_sync::{IconStore, PersistenceError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StoredPosition {
    x: f64,
    y: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LayoutFile {
    #[serde(default)]
    owners: BTreeMap<String, BTreeMap<String, StoredPosition>>,
}

pub struct TomlIconStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TomlIconStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<LayoutFile, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| PersistenceError::Decode(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LayoutFile::default()),
            Err(e) => Err(io_error(&self.path, &e)),
        }
    }

    async fn write(&self, file: &LayoutFile) -> Result<(), PersistenceError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error(dir, &e))?;
        }
        let content =
            toml::to_string_pretty(file).map_err(|e| PersistenceError::Encode(e.to_string()))?;
        let tmp = self.sibling("tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| io_error(&tmp, &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, &e))
    }

    /// Reads the layout for a save.  An undecodable layout is moved aside so
    /// that saving keeps working.
    async fn read_for_save(&self) -> Result<LayoutFile, PersistenceError> {
        match self.read().await {
            Err(PersistenceError::Decode(reason)) => {
                let bad = self.sibling("bad");
                tokio::fs::rename(&self.path, &bad)
                    .await
                    .map_err(|e| io_error(&self.path, &e))?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %bad.display(),
                    error = %reason,
                    "icon layout unreadable, starting a new one"
                );
                Ok(LayoutFile::default())
            }
            other => other,
        }
    }

    /// `icons.toml` → `icons.toml.<ext>`.
    fn sibling(&self, ext: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }
}

#[async_trait]
impl IconStore for TomlIconStore {
    async fn save_icon_positions(
        &self,
        owner_key: String,
        icons: Vec<IconPositionRecord>,
    ) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut file = self.read_for_save().await?;
        let owner = file.owners.entry(owner_key.clone()).or_default();
        for record in &icons {
            owner.insert(
                record.id.as_str().to_string(),
                StoredPosition {
                    x: record.x,
                    y: record.y,
                },
            );
        }
        self.write(&file).await?;
        debug!(owner = %owner_key, icons = icons.len(), path = %self.path.display(), "icon layout written");
        Ok(())
    }

    async fn load_icon_positions(
        &self,
        owner_key: String,
    ) -> Result<Vec<IconPositionRecord>, PersistenceError> {
        let _guard = self.lock.lock().await;
        let file = self.read().await?;
        Ok(file
            .owners
            .get(&owner_key)
            .map(|icons| {
                icons
                    .iter()
                    .map(|(id, pos)| IconPositionRecord {
                        id: IconId::new(id.clone()),
                        x: pos.x,
                        y: pos.y,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn io_error(path: &Path, e: &std::io::Error) -> PersistenceError {
    PersistenceError::Io(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn temp_store() -> (TomlIconStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("webtop_icons_{}", Uuid::new_v4()));
        (TomlIconStore::new(dir.join("icons.toml")), dir)
    }

    fn record(id: &str, x: f64, y: f64) -> IconPositionRecord {
        IconPositionRecord {
            id: IconId::new(id),
            x,
            y,
        }
    }

    #[tokio::test]
    async fn test_load_from_missing_file_is_empty() {
        let (store, _dir) = temp_store();

        let loaded = store.load_icon_positions("alice".into()).await;

        assert_eq!(loaded, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_saved_positions_load_back_per_owner() {
        // Arrange
        let (store, dir) = temp_store();

        // Act
        store
            .save_icon_positions("alice".into(), vec![record("notes", 10.0, 44.0)])
            .await
            .expect("save alice");
        store
            .save_icon_positions("bob".into(), vec![record("notes", 99.0, 99.0)])
            .await
            .expect("save bob");
        let alice = store.load_icon_positions("alice".into()).await.expect("load");

        // Assert
        assert_eq!(alice, vec![record("notes", 10.0, 44.0)]);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_save_merges_into_existing_layout() {
        // Arrange
        let (store, dir) = temp_store();
        store
            .save_icon_positions(
                "alice".into(),
                vec![record("notes", 10.0, 44.0), record("trash", 10.0, 140.0)],
            )
            .await
            .expect("first save");

        // Act
        store
            .save_icon_positions("alice".into(), vec![record("notes", 200.0, 44.0)])
            .await
            .expect("second save");
        let loaded = store.load_icon_positions("alice".into()).await.expect("load");

        // Assert
        assert_eq!(
            loaded,
            vec![record("notes", 200.0, 44.0), record("trash", 10.0, 140.0)]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_decode_error() {
        // Arrange
        let (store, dir) = temp_store();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(store.path(), "owners = 5").unwrap();

        // Act
        let result = store.load_icon_positions("alice".into()).await;

        // Assert
        assert!(matches!(result, Err(PersistenceError::Decode(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_save_over_truncated_file_moves_it_aside_and_succeeds() {
        // Arrange – a layout cut off mid-write
        let (store, dir) = temp_store();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(store.path(), "[owners.alice\nnotes = { x = ").unwrap();

        // Act
        let alice = store
            .save_icon_positions("alice".into(), vec![record("notes", 10.0, 44.0)])
            .await;
        let bob = store
            .save_icon_positions("bob".into(), vec![record("trash", 30.0, 60.0)])
            .await;

        // Assert
        assert_eq!(alice, Ok(()));
        assert_eq!(bob, Ok(()));
        assert_eq!(
            store.load_icon_positions("alice".into()).await,
            Ok(vec![record("notes", 10.0, 44.0)])
        );
        assert_eq!(
            store.load_icon_positions("bob".into()).await,
            Ok(vec![record("trash", 30.0, 60.0)])
        );
        let bad = std::fs::read_to_string(dir.join("icons.toml.bad")).unwrap();
        assert!(bad.starts_with("[owners.alice"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file_behind() {
        let (store, dir) = temp_store();

        store
            .save_icon_positions("alice".into(), vec![record("notes", 10.0, 44.0)])
            .await
            .expect("save");

        assert!(store.path().exists());
        assert!(!dir.join("icons.toml.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
