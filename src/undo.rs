/// Undo functionality for reverting a relocation run.
///
/// This module moves files back to where they were before the most recent
/// relocation run into a destination root, based on the move history that
/// run left behind.
use crate::relocator::{HistoryError, MoveHistory, MoveRecord, move_file};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that prevent an undo from starting.
#[derive(Debug, Error)]
pub enum UndoError {
    /// The destination root does not exist.
    #[error("Destination root does not exist: {}", .0.display())]
    InvalidDestinationRoot(PathBuf),

    /// There is no recorded run to undo.
    #[error("No previous relocation found to undo in {}", .0.display())]
    NoHistory(PathBuf),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Represents the result of an undo operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of files successfully restored.
    pub restored_files: usize,
    /// Files that could not be restored, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files that were skipped because they are no longer where the run put them.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Files that occupied an original location and were renamed out of the way.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    /// Returns the total number of moves processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every recorded move was reverted.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Why a single move could not be reverted.
enum RestoreFailure {
    /// The file is no longer at its relocated path.
    Gone,
    Failed(String),
}

/// Manages undo operations for relocation runs.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent relocation run into `destination_root`.
    ///
    /// Moves are reverted in reverse order. Moves that failed stay in the
    /// history file so running undo again retries exactly those; restored and
    /// vanished files are dropped from it. Once nothing is left to retry the
    /// history file is deleted.
    ///
    /// # Edge Cases Handled
    ///
    /// * **File gone**: skipped, with a note that the file could not be found
    /// * **Original location occupied**: the occupying file is renamed with a
    ///   timestamp suffix before the restore
    /// * **Permission denied**: recorded as a failure with the error reason
    /// * **Missing history**: returns [`UndoError::NoHistory`]
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use labelsort::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/data/sorted")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(destination_root: &Path) -> Result<UndoReport, UndoError> {
        if !destination_root.is_dir() {
            return Err(UndoError::InvalidDestinationRoot(
                destination_root.to_path_buf(),
            ));
        }

        let history = MoveHistory::load(destination_root)?
            .ok_or_else(|| UndoError::NoHistory(destination_root.to_path_buf()))?;
        info!(timestamp = %history.timestamp, moves = history.moves.len(), "undoing relocation run");

        let mut report = UndoReport::default();
        let mut remaining = Vec::new();
        for record in history.moves.iter().rev() {
            match Self::restore_file(record, &mut report.backups) {
                Ok(()) => report.restored_files += 1,
                Err(RestoreFailure::Gone) => report.skipped_files.push((
                    record.destination.clone(),
                    "File not found at expected location".to_string(),
                )),
                Err(RestoreFailure::Failed(reason)) => {
                    report.failed_restores.push((record.destination.clone(), reason));
                    remaining.push(record.clone());
                }
            }
        }

        if remaining.is_empty() {
            if let Err(e) = MoveHistory::delete(destination_root) {
                warn!("could not delete history file: {}", e);
            }
        } else {
            remaining.reverse();
            let retry = MoveHistory {
                destination_root: destination_root.to_path_buf(),
                moves: remaining,
                ..history
            };
            if let Err(e) = retry.save() {
                warn!("could not rewrite history file: {}", e);
            }
        }

        Ok(report)
    }

    /// Moves a single file back to its source location.
    fn restore_file(record: &MoveRecord, backups: &mut Vec<PathBuf>) -> Result<(), RestoreFailure> {
        if !record.destination.is_file() {
            return Err(RestoreFailure::Gone);
        }

        if record.source.exists() {
            let backup_path = Self::generate_backup_path(&record.source);
            fs::rename(&record.source, &backup_path).map_err(|e| {
                RestoreFailure::Failed(format!("Could not backup conflicting file: {}", e))
            })?;
            backups.push(backup_path);
        }

        if let Some(parent) = record.source.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RestoreFailure::Failed(format!("Could not recreate source directory: {}", e))
            })?;
        }

        move_file(&record.destination, &record.source)
            .map_err(|e| RestoreFailure::Failed(e.to_string()))
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `a.wav` becomes `a.wav.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        let backup_name = format!("{}.bak.{}", filename, timestamp);

        match original_path.parent() {
            Some(parent) => parent.join(backup_name),
            None => PathBuf::from(backup_name),
        }
    }
}
