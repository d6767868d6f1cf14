//! Batch driver: runs every annotation record through selection, path
//! resolution and relocation, in table order.

use crate::annotation::{AnnotationLoadError, AnnotationRecord, load_annotations};
use crate::config::RelocationConfig;
use crate::relocator::{
    MoveHistory, MoveRecord, PathPair, RelocateError, RelocationOutcome, Relocator,
};
use crate::selector::Selection;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    NotStarted,
    Loading,
    Processing,
    Done,
    /// The annotation table could not be loaded, or a relocation failed fatally.
    Failed,
}

/// Aggregate counts of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub moved: usize,
    pub missing: usize,
    pub skipped: usize,
    pub conflicts: usize,
}

impl BatchReport {
    /// Total number of records evaluated.
    pub fn total(&self) -> usize {
        self.moved + self.missing + self.skipped + self.conflicts
    }

    fn count(&mut self, outcome: RelocationOutcome) {
        match outcome {
            RelocationOutcome::Moved => self.moved += 1,
            RelocationOutcome::SourceMissing => self.missing += 1,
            RelocationOutcome::Conflict => self.conflicts += 1,
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "moved: {}, missing: {}, skipped: {}, conflicts: {}",
            self.moved, self.missing, self.skipped, self.conflicts
        )
    }
}

/// What happened to one record, passed to the batch observer.
#[derive(Debug, Clone, Copy)]
pub enum RecordEvent<'a> {
    /// The record's label was not selected.
    Skipped { record: &'a AnnotationRecord },
    /// The record was selected and relocation was attempted.
    Relocated {
        record: &'a AnnotationRecord,
        pair: &'a PathPair,
        outcome: RelocationOutcome,
    },
}

/// Fatal errors that stop a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Load(#[from] AnnotationLoadError),

    #[error(transparent)]
    Relocate(#[from] RelocateError),
}

/// Drives a relocation run for one configuration.
///
/// Records are processed one at a time, in the order they were loaded. A
/// missing source never stops the run; a failure to create a destination
/// directory or to move an existing file does, leaving the moves performed so
/// far in [`BatchDriver::history`].
///
/// In a dry run nothing moves on disk, so the driver remembers the sources of
/// earlier simulated moves; a later record naming one of them reports it
/// missing, as a real run would.
pub struct BatchDriver<'c> {
    config: &'c RelocationConfig,
    relocator: Relocator,
    state: BatchState,
    history: MoveHistory,
    claimed_sources: HashSet<PathBuf>,
}

impl<'c> BatchDriver<'c> {
    pub fn new(config: &'c RelocationConfig, relocator: Relocator) -> Self {
        Self {
            config,
            relocator,
            state: BatchState::NotStarted,
            history: MoveHistory::new(config.destination_root.clone()),
            claimed_sources: HashSet::new(),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Moves performed so far.
    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    /// Loads the configured annotation table.
    pub fn load(&mut self) -> Result<Vec<AnnotationRecord>, BatchError> {
        self.state = BatchState::Loading;
        match load_annotations(&self.config.annotation_file, &self.config.columns) {
            Ok(records) => Ok(records),
            Err(e) => {
                self.state = BatchState::Failed;
                Err(e.into())
            }
        }
    }

    /// Processes `records` in order, calling `observe` once per record.
    pub fn process<F>(
        &mut self,
        records: &[AnnotationRecord],
        mut observe: F,
    ) -> Result<BatchReport, BatchError>
    where
        F: FnMut(RecordEvent<'_>),
    {
        let config = self.config;
        self.state = BatchState::Processing;
        let mut report = BatchReport::default();

        for record in records {
            let folder = match config.selector.resolve(&record.label) {
                Selection::Skip => {
                    debug!(filename = %record.filename, label = %record.label, "skipped");
                    report.skipped += 1;
                    observe(RecordEvent::Skipped { record });
                    continue;
                }
                Selection::Include(folder) => folder,
            };

            let pair = PathPair::resolve(
                &config.source_root,
                &config.destination_root,
                folder,
                &config.filename_prefix,
                &record.filename,
            );

            let outcome = match self.relocator.relocate(&pair) {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.state = BatchState::Failed;
                    return Err(e.into());
                }
            };

            let outcome = if self.relocator.is_dry_run() {
                self.simulate(&pair, outcome)
            } else {
                if outcome == RelocationOutcome::Moved {
                    self.history.record(MoveRecord::new(&pair, folder));
                }
                outcome
            };

            debug!(filename = %record.filename, ?outcome, "relocated");
            report.count(outcome);
            observe(RecordEvent::Relocated {
                record,
                pair: &pair,
                outcome,
            });
        }

        self.state = BatchState::Done;
        info!(%report, "batch complete");
        Ok(report)
    }

    /// Adjusts a dry-run outcome for the moves simulated earlier in the run.
    fn simulate(&mut self, pair: &PathPair, outcome: RelocationOutcome) -> RelocationOutcome {
        if self.claimed_sources.contains(&pair.source) {
            return RelocationOutcome::SourceMissing;
        }
        if outcome == RelocationOutcome::Moved {
            self.claimed_sources.insert(pair.source.clone());
        }
        outcome
    }

    /// Loads the annotation table and processes every record.
    pub fn run<F>(&mut self, observe: F) -> Result<BatchReport, BatchError>
    where
        F: FnMut(RecordEvent<'_>),
    {
        let records = self.load()?;
        self.process(&records, observe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ColumnSpec;
    use crate::relocator::ConflictPolicy;
    use crate::selector::LabelSelector;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_for(root: &Path, selector: LabelSelector) -> RelocationConfig {
        RelocationConfig {
            annotation_file: root.join("annotations.csv"),
            source_root: root.join("raw"),
            destination_root: root.join("sorted"),
            selector,
            filename_prefix: String::new(),
            columns: ColumnSpec::default(),
            on_conflict: ConflictPolicy::Skip,
        }
    }

    fn records() -> Vec<AnnotationRecord> {
        vec![
            AnnotationRecord::new("a.wav", "Bus"),
            AnnotationRecord::new("b.wav", "Truck"),
            AnnotationRecord::new("c.wav", "Bus"),
        ]
    }

    #[test]
    fn test_process_counts_and_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = config_for(temp_dir.path(), LabelSelector::exact("Bus"));
        fs::create_dir(&config.source_root).unwrap();
        fs::write(config.source_root.join("a.wav"), "a").unwrap();
        fs::write(config.source_root.join("b.wav"), "b").unwrap();

        let mut driver = BatchDriver::new(&config, Relocator::new(ConflictPolicy::Skip));
        let mut events = Vec::new();
        let report = driver
            .process(&records(), |event| {
                events.push(match event {
                    RecordEvent::Skipped { record } => (record.filename.clone(), None),
                    RecordEvent::Relocated {
                        record, outcome, ..
                    } => (record.filename.clone(), Some(outcome)),
                })
            })
            .unwrap();

        assert_eq!(
            report,
            BatchReport {
                moved: 1,
                missing: 1,
                skipped: 1,
                conflicts: 0
            }
        );
        assert_eq!(
            events,
            vec![
                ("a.wav".to_string(), Some(RelocationOutcome::Moved)),
                ("b.wav".to_string(), None),
                ("c.wav".to_string(), Some(RelocationOutcome::SourceMissing)),
            ]
        );
        assert_eq!(driver.state(), BatchState::Done);
        assert_eq!(driver.history().moves.len(), 1);
        // Skipped record is never touched even though it exists
        assert!(config.source_root.join("b.wav").exists());
    }

    #[test]
    fn test_run_fails_on_missing_annotation_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = config_for(temp_dir.path(), LabelSelector::exact("Bus"));

        let mut driver = BatchDriver::new(&config, Relocator::new(ConflictPolicy::Skip));
        let result = driver.run(|_| {});

        assert!(matches!(result, Err(BatchError::Load(_))));
        assert_eq!(driver.state(), BatchState::Failed);
    }

    #[test]
    fn test_process_aborts_on_destination_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = config_for(temp_dir.path(), LabelSelector::exact("Bus"));
        fs::create_dir(&config.source_root).unwrap();
        fs::write(&config.destination_root, "a file, not a directory").unwrap();
        fs::write(config.source_root.join("a.wav"), "a").unwrap();

        let mut driver = BatchDriver::new(&config, Relocator::new(ConflictPolicy::Skip));
        let result = driver.process(&records(), |_| {});

        assert!(matches!(result, Err(BatchError::Relocate(_))));
        assert_eq!(driver.state(), BatchState::Failed);
        assert!(driver.history().is_empty());
    }

    #[test]
    fn test_dry_run_records_no_history() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = config_for(temp_dir.path(), LabelSelector::exact("Bus"));
        fs::create_dir(&config.source_root).unwrap();
        fs::write(config.source_root.join("a.wav"), "a").unwrap();

        let mut driver = BatchDriver::new(&config, Relocator::dry_run(ConflictPolicy::Skip));
        let report = driver.process(&records(), |_| {}).unwrap();

        assert_eq!(report.moved, 1);
        assert!(driver.history().is_empty());
        assert!(config.source_root.join("a.wav").exists());
    }

    #[test]
    fn test_dry_run_matches_real_run_on_repeated_rows() {
        let table = vec![
            AnnotationRecord::new("a.wav", "Bus"),
            AnnotationRecord::new("a.wav", "Bus"),
        ];

        let dry_dir = TempDir::new().expect("Failed to create temp directory");
        let dry_config = config_for(dry_dir.path(), LabelSelector::exact("Bus"));
        fs::create_dir(&dry_config.source_root).unwrap();
        fs::write(dry_config.source_root.join("a.wav"), "a").unwrap();
        let mut dry = BatchDriver::new(&dry_config, Relocator::dry_run(ConflictPolicy::Skip));
        let dry_report = dry.process(&table, |_| {}).unwrap();

        let real_dir = TempDir::new().expect("Failed to create temp directory");
        let real_config = config_for(real_dir.path(), LabelSelector::exact("Bus"));
        fs::create_dir(&real_config.source_root).unwrap();
        fs::write(real_config.source_root.join("a.wav"), "a").unwrap();
        let mut real = BatchDriver::new(&real_config, Relocator::new(ConflictPolicy::Skip));
        let real_report = real.process(&table, |_| {}).unwrap();

        assert_eq!(dry_report, real_report);
        assert_eq!(dry_report.moved, 1);
        assert_eq!(dry_report.missing, 1);
        assert!(dry_config.source_root.join("a.wav").exists());
    }

    #[test]
    fn test_report_display_and_total() {
        let report = BatchReport {
            moved: 2,
            missing: 1,
            skipped: 3,
            conflicts: 0,
        };
        assert_eq!(report.total(), 6);
        assert_eq!(
            report.to_string(),
            "moved: 2, missing: 1, skipped: 3, conflicts: 0"
        );
    }
}
