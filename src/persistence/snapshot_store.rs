//! File-backed snapshot store
//!
//! Layout: `<data_dir>/<mode>_<name>.json`, holding a JSON array of
//! `[payload, message_id]` pairs, oldest first.
//!
//! Writes go through a temp file in the same directory that is renamed over
//! the target, so a reader never observes a half-written snapshot. Callers
//! serialize writes for one name (the broker holds that name's lock), which
//! keeps last-write-wins consistent with in-memory order.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::broker::message::{Message, Mode};
use crate::utils::BrokerError;

const EXTENSION: &str = "json";

/// One restored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub name: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Use `dir` as the snapshot directory, creating it if absent.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, BrokerError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| BrokerError::persistence(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, mode: Mode, name: &str) -> PathBuf {
        self.dir.join(format!("{mode}_{name}.{EXTENSION}"))
    }

    /// Replace the snapshot for `(mode, name)` with `messages`. An empty list
    /// removes the file instead.
    pub fn save<'a, I>(&self, mode: Mode, name: &str, messages: I) -> Result<(), BrokerError>
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let pairs: Vec<(&str, &str)> = messages
            .into_iter()
            .map(|m| (m.payload.as_str(), m.message_id.as_str()))
            .collect();
        if pairs.is_empty() {
            return self.delete(mode, name);
        }

        let path = self.path_for(mode, name);
        let json = serde_json::to_vec(&pairs).map_err(|e| BrokerError::persistence(&path, e))?;

        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| BrokerError::persistence(&path, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| BrokerError::persistence(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| BrokerError::persistence(&path, e))?;

        debug!(%mode, name, count = pairs.len(), "snapshot written");
        Ok(())
    }

    /// Load the snapshot for `(mode, name)`; a missing file is an empty list.
    pub fn load(&self, mode: Mode, name: &str) -> Result<Vec<Message>, BrokerError> {
        Self::read_file(&self.path_for(mode, name))
    }

    pub fn delete(&self, mode: Mode, name: &str) -> Result<(), BrokerError> {
        let path = self.path_for(mode, name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BrokerError::persistence(&path, e)),
        }
    }

    /// Scan the directory and load every snapshot in it. Files that do not
    /// follow the naming scheme are skipped; unreadable ones are logged and
    /// skipped.
    pub fn load_all(&self) -> Result<Vec<Snapshot>, BrokerError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| BrokerError::persistence(&self.dir, e))?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| BrokerError::persistence(&self.dir, e))?
                .path();
            let Some((mode, name)) = parse_file_name(&path) else {
                continue;
            };
            match Self::read_file(&path) {
                Ok(messages) => snapshots.push(Snapshot {
                    mode,
                    name,
                    messages,
                }),
                Err(e) => warn!("Skipping unreadable snapshot: {e}"),
            }
        }

        snapshots.sort_by(|a, b| (a.mode.as_str(), &a.name).cmp(&(b.mode.as_str(), &b.name)));
        Ok(snapshots)
    }

    fn read_file(path: &Path) -> Result<Vec<Message>, BrokerError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BrokerError::persistence(path, e)),
        };
        let pairs: Vec<(String, String)> =
            serde_json::from_slice(&bytes).map_err(|e| BrokerError::persistence(path, e))?;
        Ok(pairs
            .into_iter()
            .map(|(payload, message_id)| Message {
                payload,
                message_id,
            })
            .collect())
    }
}

/// Split `pubsub_orders.json` into `(Mode::PubSub, "orders")`.
fn parse_file_name(path: &Path) -> Option<(Mode, String)> {
    if path.extension()? != EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    [Mode::PubSub, Mode::Queue].into_iter().find_map(|mode| {
        stem.strip_prefix(mode.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|name| !name.is_empty())
            .map(|name| (mode, name.to_string()))
    })
}
