//! Literal token substitution across the text files of a directory.
//!
//! Used to migrate generated label files after a dataset reorganization, for
//! example replacing a class name with its numeric index. Independent of
//! relocation.

use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default file name pattern for substitution.
pub const DEFAULT_PATTERN: &str = "*.txt";

/// Errors that can occur during substitution.
#[derive(Debug, Error)]
pub enum SubstituteError {
    #[error("Token to replace must not be empty")]
    EmptyToken,

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Error reading directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error rewriting {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A literal replacement applied to every matching file.
#[derive(Debug, Clone)]
pub struct Substitution {
    pattern: Pattern,
    from: String,
    to: String,
}

/// Outcome of a substitution pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    /// Files whose name matched the pattern.
    pub files_scanned: usize,
    /// Files rewritten because they contained the token.
    pub changed_files: Vec<PathBuf>,
    /// Total number of occurrences replaced.
    pub replacements: usize,
}

impl Substitution {
    /// Creates a substitution of `from` by `to` in files matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` is empty or `pattern` is not a valid glob.
    pub fn new(pattern: &str, from: &str, to: &str) -> Result<Self, SubstituteError> {
        if from.is_empty() {
            return Err(SubstituteError::EmptyToken);
        }
        let pattern = Pattern::new(pattern).map_err(|e| SubstituteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Applies the substitution to every regular file directly inside `dir`
    /// whose name matches the pattern. Subdirectories are not visited.
    ///
    /// Files are processed in name order and only written back if they
    /// contained the token.
    pub fn apply_to_dir(&self, dir: &Path) -> Result<SubstitutionReport, SubstituteError> {
        let entries = fs::read_dir(dir).map_err(|e| SubstituteError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SubstituteError::ReadDir {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let file_type = entry.file_type().map_err(|e| SubstituteError::File {
                path: entry.path(),
                source: e,
            })?;
            if file_type.is_file() && self.pattern.matches(&entry.file_name().to_string_lossy()) {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut report = SubstitutionReport::default();
        for path in paths {
            report.files_scanned += 1;
            let count = self.apply_to_file(&path)?;
            if count > 0 {
                report.replacements += count;
                report.changed_files.push(path);
            }
        }

        Ok(report)
    }

    /// Rewrites one file, returning the number of replacements made.
    pub fn apply_to_file(&self, path: &Path) -> Result<usize, SubstituteError> {
        let file_error = |e: std::io::Error| SubstituteError::File {
            path: path.to_path_buf(),
            source: e,
        };

        let content = fs::read_to_string(path).map_err(file_error)?;
        let count = content.matches(&self.from).count();
        if count == 0 {
            return Ok(0);
        }

        fs::write(path, content.replace(&self.from, &self.to)).map_err(file_error)?;
        debug!(path = %path.display(), count, "substituted");
        Ok(count)
    }
}
