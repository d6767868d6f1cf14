use clap::{ArgAction, Args, Parser, Subcommand};
use labelsort::cli::{CliError, Command, run_cli};
use labelsort::config::{ColumnsConfig, ConfigError, ConfigFile, SelectorConfig, parse_mapping_pair};
use labelsort::output::OutputFormatter;
use labelsort::relocator::ConflictPolicy;
use labelsort::substitute::DEFAULT_PATTERN;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "labelsort", version)]
#[command(about = "Move annotated audio files into label directories", long_about = None)]
struct Cli {
    /// Configuration file (defaults to .labelsort.toml, then ~/.config/labelsort/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move the files whose label is selected into label folders
    Relocate(RelocateArgs),

    /// Revert the last relocation into a destination root
    Undo {
        /// Destination root of the run to revert
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Replace a literal token in the text files of a directory
    Substitute {
        /// Directory whose files are rewritten
        dir: PathBuf,

        /// Token to replace
        #[arg(long)]
        from: String,

        /// Replacement text
        #[arg(long)]
        to: String,

        /// File name glob selecting the files to rewrite
        #[arg(long, default_value = DEFAULT_PATTERN)]
        pattern: String,
    },
}

#[derive(Args)]
struct RelocateArgs {
    /// Annotation table (CSV with a header row)
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Directory holding the files to relocate
    #[arg(long)]
    source: Option<PathBuf>,

    /// Directory under which label folders are created
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Relocate records with exactly this label
    #[arg(long, conflicts_with = "map")]
    label: Option<String>,

    /// Destination folder for --label (defaults to the label)
    #[arg(long)]
    folder: Option<String>,

    /// Relocate records labelled LABEL into FOLDER (repeatable)
    #[arg(long, value_name = "LABEL=FOLDER")]
    map: Vec<String>,

    /// Prefix prepended to table filenames when looking them up in the source
    #[arg(long)]
    prefix: Option<String>,

    /// Replace files already present at the destination
    #[arg(long)]
    overwrite: bool,

    /// Field delimiter of the annotation table
    #[arg(long)]
    delimiter: Option<String>,

    /// Header of the filename column
    #[arg(long)]
    filename_column: Option<String>,

    /// Header of the label column
    #[arg(long)]
    label_column: Option<String>,

    /// Show what would be moved without moving anything
    #[arg(long)]
    dry_run: bool,
}

impl RelocateArgs {
    /// Collects the flags given on the command line as configuration overrides.
    fn into_overrides(self) -> Result<ConfigFile, ConfigError> {
        let mapping = if self.map.is_empty() {
            None
        } else {
            Some(
                self.map
                    .iter()
                    .map(|arg| parse_mapping_pair(arg))
                    .collect::<Result<BTreeMap<_, _>, _>>()?,
            )
        };

        Ok(ConfigFile {
            annotation_file: self.annotations,
            source_root: self.source,
            destination_root: self.dest,
            filename_prefix: self.prefix,
            on_conflict: self.overwrite.then_some(ConflictPolicy::Overwrite),
            columns: ColumnsConfig {
                filename: self.filename_column,
                label: self.label_column,
                delimiter: self.delimiter,
            },
            selector: SelectorConfig {
                label: self.label,
                folder: self.folder,
                mapping,
            },
        })
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "labelsort=warn",
        1 => "labelsort=info",
        _ => "labelsort=debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_command(cli: Cli) -> Result<Command, CliError> {
    let command = match cli.command {
        Commands::Relocate(args) => {
            let dry_run = args.dry_run;
            let overrides = args.into_overrides()?;
            let config = ConfigFile::load(cli.config.as_deref())?
                .merge(overrides)
                .resolve()?;
            Command::Relocate { config, dry_run }
        }
        Commands::Undo { dest } => {
            let destination_root = match dest {
                Some(dest) => dest,
                None => ConfigFile::load(cli.config.as_deref())?
                    .destination_root
                    .ok_or(ConfigError::MissingSetting("destination_root"))?,
            };
            Command::Undo { destination_root }
        }
        Commands::Substitute {
            dir,
            from,
            to,
            pattern,
        } => Command::Substitute {
            dir,
            pattern,
            from,
            to,
        },
    };
    Ok(command)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = build_command(cli).and_then(run_cli) {
        OutputFormatter::error(&e.to_string());
        std::process::exit(1);
    }
}
