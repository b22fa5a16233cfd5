//! Durable snapshots of the counter mapping.
//!
//! A [`PersistedSnapshot`] is a timestamp plus the full key to count map.
//! [`JsonFileStore`] keeps exactly one snapshot on disk as human-readable
//! JSON:
//!
//! ```json
//! {"timestamp":"2024-05-01T12:00:00Z","counts":{"/index.html":42}}
//! ```
//!
//! Each save replaces the previous file as a whole. The new content is
//! written to a sibling temporary file first and then renamed into place,
//! so a reader never sees a half-written snapshot. Saves on one store are
//! serialized, and a snapshot older than the last one written is dropped,
//! so overlapping writers can never roll the file back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::SnapshotError;

/// File name of the snapshot inside the application data directory.
pub const SNAPSHOT_FILE_NAME: &str = "hitcounters.json";

/// Environment variable overriding the application data directory.
pub const DATA_DIR_ENV: &str = "HITCOUNTER_DATA_DIR";

/// A point-in-time copy of all counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedSnapshot {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// The counts at that time.
    pub counts: HashMap<String, u64>,
}

impl PersistedSnapshot {
    /// Creates a snapshot of `counts` taken at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>, counts: HashMap<String, u64>) -> Self {
        Self { timestamp, counts }
    }
}

/// Single-slot durable storage for a [`PersistedSnapshot`].
pub trait SnapshotStore: Send + Sync {
    /// Reads the latest snapshot.
    ///
    /// Returns `Ok(None)` if nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedSnapshot>, SnapshotError>;

    /// Replaces the stored snapshot with `snapshot`.
    fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), SnapshotError>;

    /// Where snapshots are kept, if the store lives on the filesystem.
    fn location(&self) -> Option<&Path> {
        None
    }
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    fn load(&self) -> Result<Option<PersistedSnapshot>, SnapshotError> {
        (**self).load()
    }

    fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), SnapshotError> {
        (**self).save(snapshot)
    }

    fn location(&self) -> Option<&Path> {
        (**self).location()
    }
}

/// Stores the snapshot as a JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Held for the whole save. Timestamp of the newest snapshot written.
    last_written: Mutex<Option<DateTime<Utc>>>,
}

impl JsonFileStore {
    /// Creates a store backed by the file at `path`.
    ///
    /// Missing parent directories are created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_written: Mutex::new(None),
        }
    }

    /// Creates a store at [`default_snapshot_path`].
    pub fn at_default_location() -> Self {
        Self::new(default_snapshot_path())
    }

    /// The snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| SNAPSHOT_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedSnapshot>, SnapshotError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let snapshot = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), SnapshotError> {
        let mut last_written = self
            .last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last_written.is_some_and(|last| snapshot.timestamp < last) {
            tracing::debug!(
                timestamp = %snapshot.timestamp,
                "skipping snapshot older than the one on disk"
            );
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        let mut writer = BufWriter::new(File::create(&temp)?);
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.write_all(b"\n")?;
        writer.into_inner().map_err(|err| err.into_error())?.sync_all()?;

        fs::rename(&temp, &self.path)?;
        *last_written = Some(snapshot.timestamp);
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// The directory application data is kept in.
///
/// Resolved in order from `HITCOUNTER_DATA_DIR`, `$XDG_DATA_HOME/hitcounter`,
/// `$HOME/.local/share/hitcounter`, falling back to `./hitcounter`.
pub fn app_data_dir() -> PathBuf {
    resolve_data_dir(|name| std::env::var_os(name))
}

/// The default location of the snapshot file.
pub fn default_snapshot_path() -> PathBuf {
    app_data_dir().join(SNAPSHOT_FILE_NAME)
}

fn resolve_data_dir(var: impl Fn(&str) -> Option<std::ffi::OsString>) -> PathBuf {
    let set = |name: &str| var(name).filter(|value| !value.is_empty());

    if let Some(dir) = set(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = set("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("hitcounter");
    }
    if let Some(home) = set("HOME") {
        return PathBuf::from(home).join(".local/share/hitcounter");
    }
    PathBuf::from("./hitcounter")
}
