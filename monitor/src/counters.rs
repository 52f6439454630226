//! Durable per-player death counters.
//!
//! Counts are kept in memory and mirrored to a single pretty-printed JSON
//! file (`{"Steve": 3, "Alex": 1}`) that is rewritten in full after every
//! increment.
//!
//! # Durability
//!
//! - Writes go to `<path>.tmp`, are fsynced, then renamed over the real file,
//!   so a crash mid-write leaves the previous file readable.
//! - A failed write is logged and does not roll back the in-memory count. The
//!   in-memory map is authoritative for the running process.
//! - A missing file starts empty. A corrupt file also starts empty and the
//!   failure is logged once at load time.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while reading or writing the counter file.
#[derive(Error, Debug)]
pub enum CounterError {
    /// File system I/O error.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file exists but does not hold a name-to-count JSON object.
    #[error("corrupt counter file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the in-memory map failed.
    #[error("failed to serialize counters: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Player name to death count mapping backed by a JSON file.
///
/// Names are case-sensitive. Counts never decrease.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    counts: BTreeMap<String, u64>,
}

impl CounterStore {
    /// Loads counters from `path`.
    ///
    /// Never fails: a missing file yields an empty store and an unreadable or
    /// corrupt file is reported with `warn!` and also yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let counts = match read_counts(&path) {
            Ok(Some(counts)) => {
                info!(
                    path = %path.display(),
                    players = counts.len(),
                    "Loaded death counters"
                );
                counts
            }
            Ok(None) => {
                debug!(path = %path.display(), "No death counter file, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load death counters, starting empty");
                BTreeMap::new()
            }
        };

        Self { path, counts }
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current count for `player` (0 if never seen).
    #[must_use]
    pub fn get(&self, player: &str) -> u64 {
        self.counts.get(player).copied().unwrap_or(0)
    }

    /// Returns a read-only view of every count.
    #[must_use]
    pub fn snapshot(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Returns all players ordered by count (highest first), ties by name.
    #[must_use]
    pub fn leaderboard(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Increments `player`'s count and persists the whole map before
    /// returning the new count.
    ///
    /// A persistence failure is logged; the increment still stands.
    pub fn increment(&mut self, player: &str) -> u64 {
        let count = self.counts.entry(player.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let new_count = *count;

        if let Err(e) = self.save() {
            warn!(
                player = %player,
                count = new_count,
                error = %e,
                "Failed to persist death counters"
            );
        }

        new_count
    }

    /// Writes the full map to disk atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn save(&self) -> Result<(), CounterError> {
        let bytes = serde_json::to_vec_pretty(&self.counts).map_err(CounterError::Serialize)?;
        write_atomic(&self.path, &bytes).map_err(|source| CounterError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Reads the counter file, returning `None` if it does not exist.
fn read_counts(path: &Path) -> Result<Option<BTreeMap<String, u64>>, CounterError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CounterError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|source| CounterError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes `bytes` to `path` via a temp file, fsync, then rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)
}
