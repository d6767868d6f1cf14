//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: per-record report
//! lines, colored status messages, the record progress bar and the final
//! summary table.

use crate::batch::{BatchReport, RecordEvent};
use crate::relocator::RelocationOutcome;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use labelsort::output::OutputFormatter;
    /// OutputFormatter::error("Annotation file not found: labels.csv");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar over `total` annotation records.
    ///
    /// The bar is hidden when stdout is not a terminal.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Formats the report line for one record, or `None` for skipped records.
    ///
    /// ```
    /// use labelsort::annotation::AnnotationRecord;
    /// use labelsort::batch::RecordEvent;
    /// use labelsort::output::OutputFormatter;
    /// use labelsort::relocator::{PathPair, RelocationOutcome};
    /// use std::path::Path;
    ///
    /// let record = AnnotationRecord::new("a.wav", "Bus");
    /// let pair = PathPair::resolve(Path::new("in"), Path::new("out"), "Bus", "", "a.wav");
    /// let line = OutputFormatter::record_line(
    ///     &RecordEvent::Relocated { record: &record, pair: &pair, outcome: RelocationOutcome::SourceMissing },
    ///     false,
    /// );
    /// assert_eq!(line.as_deref(), Some("File not found: in/a.wav"));
    /// ```
    pub fn record_line(event: &RecordEvent<'_>, dry_run: bool) -> Option<String> {
        let RecordEvent::Relocated { pair, outcome, .. } = event else {
            return None;
        };

        let line = match (outcome, dry_run) {
            (RelocationOutcome::Moved, false) => format!(
                "Moved {} -> {}",
                pair.source.display(),
                pair.destination.display()
            ),
            (RelocationOutcome::Moved, true) => format!(
                "Would move {} -> {}",
                pair.source.display(),
                pair.destination.display()
            ),
            (RelocationOutcome::SourceMissing, _) => {
                format!("File not found: {}", pair.source.display())
            }
            (RelocationOutcome::Conflict, _) => {
                format!("Conflict: {} already exists", pair.destination.display())
            }
        };
        Some(line)
    }

    /// Colors a record line according to its outcome.
    pub fn styled_record_line(event: &RecordEvent<'_>, dry_run: bool) -> Option<String> {
        let line = Self::record_line(event, dry_run)?;
        let styled = match event {
            RecordEvent::Relocated {
                outcome: RelocationOutcome::Moved,
                ..
            } => line.green(),
            RecordEvent::Relocated {
                outcome: RelocationOutcome::SourceMissing,
                ..
            } => line.yellow(),
            _ => line.red(),
        };
        Some(styled.to_string())
    }

    /// Prints the summary table of a batch run.
    pub fn summary_table(report: &BatchReport, dry_run: bool) {
        Self::header(if dry_run { "DRY RUN SUMMARY" } else { "SUMMARY" });

        let moved_label = if dry_run { "Would move" } else { "Moved" };
        let rows = [
            (moved_label, report.moved.to_string().green()),
            ("Missing", report.missing.to_string().yellow()),
            ("Skipped", report.skipped.to_string().normal()),
            ("Conflicts", report.conflicts.to_string().red()),
        ];

        let width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(7); // At least "Records" width

        for (name, count) in &rows {
            println!("{:<width$} | {}", name, count, width = width);
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {}",
            "Records".bold(),
            report.total().to_string().bold(),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationRecord;
    use crate::relocator::PathPair;
    use std::path::Path;

    fn pair() -> PathPair {
        PathPair::resolve(Path::new("in"), Path::new("out"), "Bus", "", "a.wav")
    }

    #[test]
    fn test_record_line_moved() {
        let record = AnnotationRecord::new("a.wav", "Bus");
        let pair = pair();
        let event = RecordEvent::Relocated {
            record: &record,
            pair: &pair,
            outcome: RelocationOutcome::Moved,
        };

        let expected_dst = Path::new("out").join("Bus").join("a.wav");
        assert_eq!(
            OutputFormatter::record_line(&event, false),
            Some(format!(
                "Moved {} -> {}",
                Path::new("in").join("a.wav").display(),
                expected_dst.display()
            ))
        );
        assert!(
            OutputFormatter::record_line(&event, true)
                .unwrap()
                .starts_with("Would move ")
        );
    }

    #[test]
    fn test_record_line_conflict() {
        let record = AnnotationRecord::new("a.wav", "Bus");
        let pair = pair();
        let event = RecordEvent::Relocated {
            record: &record,
            pair: &pair,
            outcome: RelocationOutcome::Conflict,
        };

        assert!(
            OutputFormatter::record_line(&event, false)
                .unwrap()
                .ends_with("already exists")
        );
    }

    #[test]
    fn test_skipped_records_have_no_line() {
        let record = AnnotationRecord::new("b.wav", "Truck");
        let event = RecordEvent::Skipped { record: &record };
        assert_eq!(OutputFormatter::record_line(&event, false), None);
        assert_eq!(OutputFormatter::styled_record_line(&event, false), None);
    }
}
