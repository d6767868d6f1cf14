/// Relocation of annotated files into label folders.
///
/// This module resolves where a record's file lives and where it should go,
/// performs the move, and keeps a history of performed moves so a run can be
/// undone. It is the only part of the crate that mutates the filesystem during
/// a relocation run.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the move history file kept in the destination root.
pub const HISTORY_FILE_NAME: &str = ".labelsort_history.json";

/// Source and destination of one file, derived from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl PathPair {
    /// Computes the paths for `filename` relocated into `folder`.
    ///
    /// `prefix` is prepended to the filename on the source side only, for
    /// tables whose stored names omit a leading part of the on-disk name.
    ///
    /// # Examples
    ///
    /// ```
    /// use labelsort::relocator::PathPair;
    /// use std::path::Path;
    ///
    /// let pair = PathPair::resolve(Path::new("/in"), Path::new("/out"), "Bus", "Y", "a.wav");
    /// assert_eq!(pair.source, Path::new("/in/Ya.wav"));
    /// assert_eq!(pair.destination, Path::new("/out/Bus/a.wav"));
    /// ```
    pub fn resolve(
        source_root: &Path,
        destination_root: &Path,
        folder: &str,
        prefix: &str,
        filename: &str,
    ) -> Self {
        Self {
            source: source_root.join(format!("{}{}", prefix, filename)),
            destination: destination_root.join(folder).join(filename),
        }
    }

    /// Directory the destination file lives in.
    pub fn destination_dir(&self) -> &Path {
        self.destination.parent().unwrap_or(Path::new(""))
    }
}

/// What to do when a file already exists at the destination path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave both files untouched and report a conflict.
    #[default]
    Skip,
    /// Replace the existing destination file.
    Overwrite,
}

/// Per-record result of a relocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// The file was moved (or, in a dry run, would be moved).
    Moved,
    /// No file exists at the source path; nothing was touched.
    SourceMissing,
    /// A file already exists at the destination and the policy is to skip.
    Conflict,
}

/// Errors that can occur while relocating a file.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The destination directory could not be created.
    #[error("Failed to create destination directory {}: {source}", .path.display())]
    DestinationDirectory { path: PathBuf, source: io::Error },

    /// The file exists but could not be moved.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Result type for relocation operations.
pub type RelocateResult<T> = Result<T, RelocateError>;

/// Moves files according to a [`ConflictPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Relocator {
    policy: ConflictPolicy,
    dry_run: bool,
}

impl Relocator {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            dry_run: false,
        }
    }

    /// A relocator that evaluates outcomes without touching the filesystem.
    pub fn dry_run(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            dry_run: true,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Relocates the file described by `pair`.
    ///
    /// The destination directory is created (recursively) before anything
    /// else; creating it is a no-op when it already exists. A missing source
    /// is reported as [`RelocationOutcome::SourceMissing`], never as an error.
    /// In dry-run mode nothing is created or moved and the outcome is the one
    /// a real run would report.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError::DestinationDirectory`] if the destination
    /// directory cannot be created, and [`RelocateError::MoveFailed`] if an
    /// existing source cannot be moved.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use labelsort::relocator::{ConflictPolicy, PathPair, Relocator};
    /// use std::path::Path;
    ///
    /// let pair = PathPair::resolve(Path::new("/data/raw"), Path::new("/data"), "Bus", "", "a.wav");
    /// match Relocator::new(ConflictPolicy::Skip).relocate(&pair) {
    ///     Ok(outcome) => println!("{:?}", outcome),
    ///     Err(e) => eprintln!("Relocation failed: {}", e),
    /// }
    /// ```
    pub fn relocate(&self, pair: &PathPair) -> RelocateResult<RelocationOutcome> {
        if !self.dry_run {
            let dir = pair.destination_dir();
            fs::create_dir_all(dir).map_err(|e| RelocateError::DestinationDirectory {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        if !pair.source.is_file() {
            debug!(source = %pair.source.display(), "source missing");
            return Ok(RelocationOutcome::SourceMissing);
        }

        if pair.destination.exists() {
            match self.policy {
                ConflictPolicy::Skip => {
                    warn!(destination = %pair.destination.display(), "destination exists, skipping");
                    return Ok(RelocationOutcome::Conflict);
                }
                ConflictPolicy::Overwrite => {
                    debug!(destination = %pair.destination.display(), "overwriting destination");
                }
            }
        }

        if !self.dry_run {
            move_file(&pair.source, &pair.destination)?;
        }

        Ok(RelocationOutcome::Moved)
    }
}

/// Moves a file, falling back to copy-and-delete across filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> RelocateResult<()> {
    let failed = |e: io::Error| RelocateError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), "rename crosses devices, copying instead");
            fs::copy(from, to).map_err(failed)?;
            fs::remove_file(from).map_err(failed)
        }
        Err(e) => Err(failed(e)),
    }
}

/// A single performed move, recorded for undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Where the file was before the move.
    pub source: PathBuf,
    /// Where the file was moved to.
    pub destination: PathBuf,
    /// The destination folder name.
    pub folder: String,
}

impl MoveRecord {
    pub fn new(pair: &PathPair, folder: &str) -> Self {
        Self {
            source: pair.source.clone(),
            destination: pair.destination.clone(),
            folder: folder.to_string(),
        }
    }
}

/// Errors reading or writing the move history file.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to read history file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid history file format in {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// All moves performed by one relocation run.
///
/// Persisted as JSON in the destination root to enable undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveHistory {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    /// Destination root of the run.
    pub destination_root: PathBuf,
    /// Moves in the order they were performed.
    pub moves: Vec<MoveRecord>,
}

impl MoveHistory {
    pub fn new(destination_root: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            destination_root,
            moves: Vec::new(),
        }
    }

    pub fn record(&mut self, record: MoveRecord) {
        self.moves.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Path of the history file for a destination root.
    pub fn file_path(destination_root: &Path) -> PathBuf {
        destination_root.join(HISTORY_FILE_NAME)
    }

    /// Writes this history into its destination root, replacing any previous one.
    pub fn save(&self) -> Result<(), HistoryError> {
        let path = Self::file_path(&self.destination_root);
        let json = serde_json::to_string_pretty(self).map_err(|e| HistoryError::Format {
            path: path.clone(),
            source: e,
        })?;

        fs::create_dir_all(&self.destination_root).map_err(|e| HistoryError::Write {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| HistoryError::Write { path, source: e })
    }

    /// Loads the history of the most recent run, if there is one.
    pub fn load(destination_root: &Path) -> Result<Option<Self>, HistoryError> {
        let path = Self::file_path(destination_root);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| HistoryError::Read {
            path: path.clone(),
            source: e,
        })?;

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| HistoryError::Format { path, source: e })
    }

    /// Deletes the history file for a destination root.
    pub fn delete(destination_root: &Path) -> Result<(), HistoryError> {
        let path = Self::file_path(destination_root);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| HistoryError::Write { path, source: e })?;
        }
        Ok(())
    }
}
