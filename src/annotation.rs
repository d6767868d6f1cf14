//! Annotation table loading.
//!
//! An annotation table is a delimited text file with a header row. Two of its
//! columns matter: one holding the audio file's base name and one holding its
//! category label. Columns are looked up by header name, so their position in
//! the file is irrelevant and any extra columns are ignored.
//!
//! ```text
//! filename,label,onset
//! a.wav,Bus,0.0
//! b.wav,Truck,1.5
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// One row of the annotation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    /// Base name of the file, relative to the source root.
    pub filename: String,
    /// Category tag attached to the file.
    pub label: String,
}

impl AnnotationRecord {
    pub fn new(filename: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            label: label.into(),
        }
    }
}

/// Errors that prevent the annotation table from being loaded.
#[derive(Debug, Error)]
pub enum AnnotationLoadError {
    /// The annotation file does not exist.
    #[error("Annotation file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The annotation file exists but could not be opened or read.
    #[error("Failed to read annotation file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The header row lacks a column this tool needs.
    #[error("Annotation file {} has no '{column}' column (found: {})", .path.display(), .found.join(", "))]
    MissingColumn {
        path: PathBuf,
        column: String,
        found: Vec<String>,
    },

    /// A row could not be parsed as delimited text.
    #[error("Malformed annotation file {}: {source}", .path.display())]
    Malformed { path: PathBuf, source: csv::Error },

    /// A row names a file that cannot live directly under the source root.
    #[error("Invalid filename '{filename}' in data row {row}: {reason}")]
    InvalidFilename {
        row: usize,
        filename: String,
        reason: &'static str,
    },
}

/// Column layout of an annotation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Header name of the filename column.
    pub filename: String,
    /// Header name of the label column.
    pub label: String,
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            filename: "filename".to_string(),
            label: "label".to_string(),
            delimiter: b',',
        }
    }
}

/// Loads every record of the annotation table at `path`, in file order.
///
/// Fields are trimmed of surrounding whitespace. Rows must have the same
/// number of fields as the header.
///
/// # Errors
///
/// Returns an [`AnnotationLoadError`] if the file is absent or unreadable,
/// if a required column is missing from the header, if a row is malformed,
/// or if a row's filename is empty, `.`/`..`, or contains a path separator.
pub fn load_annotations(
    path: &Path,
    columns: &ColumnSpec,
) -> Result<Vec<AnnotationRecord>, AnnotationLoadError> {
    if !path.exists() {
        return Err(AnnotationLoadError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|e| AnnotationLoadError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(columns.delimiter)
        .trim(csv::Trim::All)
        .from_reader(file);

    let malformed = |e: csv::Error| AnnotationLoadError::Malformed {
        path: path.to_path_buf(),
        source: e,
    };

    let headers = reader.headers().map_err(malformed)?.clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnnotationLoadError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
                found: headers.iter().map(str::to_string).collect(),
            })
    };
    let filename_idx = column_index(&columns.filename)?;
    let label_idx = column_index(&columns.label)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(malformed)?;
        let filename = row.get(filename_idx).unwrap_or_default();
        let label = row.get(label_idx).unwrap_or_default();

        validate_filename(filename).map_err(|reason| AnnotationLoadError::InvalidFilename {
            row: i + 1,
            filename: filename.to_string(),
            reason,
        })?;

        records.push(AnnotationRecord::new(filename, label));
    }

    info!(path = %path.display(), records = records.len(), "loaded annotation table");
    debug!(filename_column = filename_idx, label_column = label_idx, "resolved columns");

    Ok(records)
}

/// Checks that a filename names an entry directly inside a directory.
fn validate_filename(filename: &str) -> Result<(), &'static str> {
    if filename.is_empty() {
        return Err("filename is empty");
    }
    if filename == "." || filename == ".." {
        return Err("filename refers to a directory");
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err("filename contains a path separator");
    }
    Ok(())
}
