//! Command-line interface module for labelsort.
//!
//! This module handles command orchestration:
//! - Relocation runs (real and dry-run) with per-record reporting
//! - Move history persistence
//! - Undo of the last relocation run
//! - Token substitution in text files

use crate::batch::{BatchDriver, BatchError, BatchReport};
use crate::config::{ConfigError, RelocationConfig};
use crate::output::OutputFormatter;
use crate::relocator::{HistoryError, Relocator};
use crate::substitute::{SubstituteError, Substitution, SubstitutionReport};
use crate::undo::{UndoError, UndoManager, UndoReport};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that end a command unsuccessfully.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error(transparent)]
    Substitute(#[from] SubstituteError),
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone)]
pub enum Command {
    /// Relocate the files selected by the configuration.
    Relocate {
        config: RelocationConfig,
        /// If true, report what would happen without making changes.
        dry_run: bool,
    },
    /// Undo the previous relocation into a destination root.
    Undo { destination_root: PathBuf },
    /// Replace a literal token in the matching files of a directory.
    Substitute {
        dir: PathBuf,
        pattern: String,
        from: String,
        to: String,
    },
}

/// Runs the given command.
///
/// # Examples
///
/// ```no_run
/// use labelsort::cli::{run_cli, Command};
/// use std::path::PathBuf;
///
/// let result = run_cli(Command::Undo { destination_root: PathBuf::from("/data/sorted") });
/// if let Err(e) = result {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: Command) -> Result<(), CliError> {
    match command {
        Command::Relocate { config, dry_run } => relocate(&config, dry_run).map(|_| ()),
        Command::Undo { destination_root } => undo_relocation(&destination_root).map(|_| ()),
        Command::Substitute {
            dir,
            pattern,
            from,
            to,
        } => substitute(&dir, &pattern, &from, &to).map(|_| ()),
    }
}

/// Relocates every selected record of the configured annotation table.
///
/// This function:
/// 1. Checks that the source root exists
/// 2. Loads the annotation table (fatal on failure)
/// 3. Runs each record through selection, path resolution and relocation,
///    printing one line per selected record
/// 4. Saves the move history if anything moved, even if the run aborted
/// 5. Prints the summary
///
/// Missing source files and conflicts are reported but never fail the run.
pub fn relocate(config: &RelocationConfig, dry_run: bool) -> Result<BatchReport, CliError> {
    config.check_roots()?;

    if dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }
    OutputFormatter::info(&format!(
        "Relocating {} from {} into {}",
        config.selector,
        config.source_root.display(),
        config.destination_root.display()
    ));

    let relocator = if dry_run {
        Relocator::dry_run(config.on_conflict)
    } else {
        Relocator::new(config.on_conflict)
    };
    let mut driver = BatchDriver::new(config, relocator);

    let records = driver.load()?;
    let pb = OutputFormatter::create_progress_bar(records.len() as u64);
    let result = driver.process(&records, |event| {
        if let Some(line) = OutputFormatter::styled_record_line(&event, dry_run) {
            pb.suspend(|| println!("{}", line));
        }
        pb.inc(1);
    });
    pb.finish_and_clear();

    let history = driver.history();
    if !history.is_empty() {
        match history.save() {
            Ok(()) => OutputFormatter::info(&format!(
                "History saved. Use 'labelsort undo --dest {}' to revert changes.",
                config.destination_root.display()
            )),
            Err(e) => {
                warn!("could not save move history: {}", e);
                OutputFormatter::warning(&format!("Could not save history: {}", e));
            }
        }
    }

    let report = result?;
    OutputFormatter::summary_table(&report, dry_run);

    if report.missing > 0 {
        OutputFormatter::warning(&format!(
            "{} selected {} not found in the source root.",
            report.missing,
            if report.missing == 1 { "file was" } else { "files were" }
        ));
    }
    if report.conflicts > 0 {
        OutputFormatter::warning(&format!(
            "{} {} left in place because the destination already exists.",
            report.conflicts,
            if report.conflicts == 1 { "file was" } else { "files were" }
        ));
    }
    if dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    } else {
        OutputFormatter::success("Relocation complete!");
    }

    Ok(report)
}

/// Undoes the previous relocation into `destination_root`.
///
/// This function:
/// 1. Loads the move history from the destination root
/// 2. Reverses all recorded moves
/// 3. Reports on any skipped or failed restorations; failed ones stay in the
///    history for the next undo
pub fn undo_relocation(destination_root: &Path) -> Result<UndoReport, CliError> {
    OutputFormatter::info("Undoing previous relocation...");

    let report = UndoManager::undo(destination_root)?;
    OutputFormatter::success("Undo complete!");
    println!("  Processed: {}", report.total_processed());
    println!("  Restored: {}", report.restored_files);

    for backup in &report.backups {
        println!("  Backed up existing file to {}", backup.display());
    }

    if !report.skipped_files.is_empty() {
        println!("  Skipped: {}", report.skipped_files.len());
        for (path, reason) in &report.skipped_files {
            println!("    - {}: {}", path.display(), reason);
        }
    }

    if !report.failed_restores.is_empty() {
        println!("  Failed: {}", report.failed_restores.len());
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("{}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::warning(&format!(
            "{} failed {} kept in the history. Run undo again to retry.",
            report.failed_restores.len(),
            if report.failed_restores.len() == 1 { "move is" } else { "moves are" }
        ));
    }

    Ok(report)
}

/// Replaces `from` by `to` in the files of `dir` matching `pattern`.
pub fn substitute(
    dir: &Path,
    pattern: &str,
    from: &str,
    to: &str,
) -> Result<SubstitutionReport, CliError> {
    let substitution = Substitution::new(pattern, from, to)?;
    OutputFormatter::info(&format!(
        "Replacing '{}' with '{}' in {}/{}",
        from,
        to,
        dir.display(),
        pattern
    ));

    let report = substitution.apply_to_dir(dir)?;
    for path in &report.changed_files {
        println!(" - {}", path.display());
    }
    OutputFormatter::success(&format!(
        "{} replacements in {} of {} files.",
        report.replacements,
        report.changed_files.len(),
        report.files_scanned
    ));

    Ok(report)
}
