//! Log tailer for the Minecraft server's `latest.log`.
//!
//! The tailer keeps a byte offset into the log and, on each poll, returns
//! only the lines appended since the previous poll. It never re-reads
//! content that has already been delivered.
//!
//! # Offsets
//!
//! - On [`LogTailer::initialize`], the offset jumps to the end of the file so
//!   history written before the monitor started is never replayed. A missing
//!   file starts at offset 0 and is picked up from its first byte once it
//!   appears.
//! - The offset only advances past complete lines. A trailing line that has
//!   not been terminated by `\n` yet is left for the next poll.
//! - If the file shrinks below the offset (rotation or truncation), the
//!   tailer starts over from the beginning of the new file.
//! - If a read fails, the offset is left untouched so the next poll retries
//!   from the same position.
//!
//! # Example
//!
//! ```no_run
//! use void_monitor::tailer::LogTailer;
//!
//! let mut tailer = LogTailer::new("logs/latest.log");
//! tailer.initialize();
//!
//! for line in tailer.poll().unwrap_or_default() {
//!     println!("{line}");
//! }
//! ```

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors that can occur while tailing the log.
#[derive(Error, Debug)]
pub enum TailerError {
    /// Failed to open, stat, seek or read the log file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Tracks a byte offset into a growing log file.
#[derive(Debug)]
pub struct LogTailer {
    /// Path to the log file being followed.
    path: PathBuf,

    /// Byte position after the last delivered line.
    offset: u64,
}

impl LogTailer {
    /// Creates a tailer for `path` positioned at offset 0.
    ///
    /// Call [`initialize`](Self::initialize) before the first poll to skip
    /// existing content.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    /// Returns the path being followed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Positions the tailer at the end of the file, or at 0 if the file does
    /// not exist yet.
    ///
    /// Failure to read the file's metadata is logged and treated like a
    /// missing file.
    pub fn initialize(&mut self) {
        self.offset = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    path = %self.path.display(),
                    "Log file does not exist yet, waiting for it to appear"
                );
                0
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read log file metadata, starting at offset 0"
                );
                0
            }
        };

        debug!(
            path = %self.path.display(),
            offset = self.offset,
            "Initialized log tailer"
        );
    }

    /// Returns the complete lines appended since the last poll, in file order.
    ///
    /// A missing file yields no lines. Undecodable byte sequences are replaced
    /// with U+FFFD rather than failing the read. Line terminators (`\n` or
    /// `\r\n`) are stripped and blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TailerError::Io`] if the file exists but cannot be read. The
    /// offset is unchanged in that case.
    pub fn poll(&mut self) -> Result<Vec<String>, TailerError> {
        let io_err = |source: io::Error| TailerError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Log file not present");
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_err(e)),
        };

        let file_size = file.metadata().map_err(io_err)?.len();

        // Handle truncation: if file is smaller than last position, restart
        let read_position = if file_size < self.offset {
            info!(
                path = %self.path.display(),
                old_pos = self.offset,
                new_size = file_size,
                "Log file truncated or rotated, resetting position to 0"
            );
            0
        } else {
            self.offset
        };

        if read_position >= file_size {
            self.offset = file_size;
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(read_position)).map_err(io_err)?;

        let mut buf = Vec::with_capacity(usize::try_from(file_size - read_position).unwrap_or(0));
        file.take(file_size - read_position)
            .read_to_end(&mut buf)
            .map_err(io_err)?;

        // Only consume up to the last newline; a partial line waits for the next poll
        let consumed = match buf.iter().rposition(|&b| b == b'\n') {
            Some(idx) => idx + 1,
            None => {
                self.offset = read_position;
                trace!(path = %self.path.display(), "Only a partial line is available");
                return Ok(Vec::new());
            }
        };

        let lines: Vec<String> = String::from_utf8_lossy(&buf[..consumed])
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        self.offset = read_position + consumed as u64;

        if !lines.is_empty() {
            debug!(
                path = %self.path.display(),
                line_count = lines.len(),
                offset = self.offset,
                "Read new lines from log"
            );
        }

        Ok(lines)
    }
}
