//! labelsort - relocate annotated dataset files into label directories
//!
//! This library reads an annotation table mapping filenames to category
//! labels, selects the records whose label matches a configured selector, and
//! moves the corresponding files from a flat source directory into
//! label-specific folders under a destination root. Runs can be previewed
//! with a dry run and reverted with undo.

pub mod annotation;
pub mod batch;
pub mod cli;
pub mod config;
pub mod output;
pub mod relocator;
pub mod selector;
pub mod substitute;
pub mod undo;

pub use annotation::{AnnotationLoadError, AnnotationRecord, ColumnSpec, load_annotations};
pub use batch::{BatchDriver, BatchError, BatchReport, BatchState};
pub use config::{ConfigError, ConfigFile, RelocationConfig};
pub use relocator::{ConflictPolicy, PathPair, RelocationOutcome, Relocator};
pub use selector::{LabelSelector, Selection};
pub use undo::{UndoManager, UndoReport};

pub use cli::{CliError, Command, run_cli};
