//! zepp-fit CLI - Command-line interface for zepp-fit
//!
//! Commands:
//! - generate-all: convert every downloaded activity
//! - generate-single: convert one activity by track id
//! - generate-sport: convert every activity of one sport
//! - decode: print the per-second container of one activity
//! - stats: count downloaded activities per sport category

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use zepp_fit::schema::ExportAdapter;
use zepp_fit::{
    category_counts, decode, BatchReport, ConvertError, Converter, ConverterConfig,
    ExportDirectory, JsonDocumentSink, SportCategory, UnsupportedPolicy, VERSION,
};

/// zepp-fit - Rebuild Zepp sport exports as FIT activity messages
#[derive(Parser)]
#[command(name = "zepp-fit")]
#[command(version = VERSION)]
#[command(about = "Convert downloaded Zepp activities into FIT activity messages", long_about = None)]
struct Cli {
    /// Converter configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fail activities with an unsupported sport type instead of skipping them
    #[arg(long, global = true)]
    report_unsupported: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every activity listed in summaries.json
    GenerateAll {
        /// Download directory (summaries.json plus <trackid>.json files)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert a single activity
    GenerateSingle {
        /// Download directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Track id of the activity
        #[arg(long)]
        id: i64,
    },

    /// Convert every activity of one sport
    GenerateSport {
        /// Download directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Sport to convert
        #[arg(short, long, value_enum)]
        sport: SportArg,
    },

    /// Print the decoded per-second container of one activity as JSON
    Decode {
        /// Summary file path (use - for stdin)
        #[arg(long)]
        summary: PathBuf,

        /// Detail file path
        #[arg(long)]
        detail: PathBuf,
    },

    /// Count downloaded activities per sport category
    Stats {
        /// Download directory
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SportArg {
    Running,
    Walking,
    Cycling,
    IndoorSwimming,
}

impl From<SportArg> for SportCategory {
    fn from(arg: SportArg) -> Self {
        match arg {
            SportArg::Running => SportCategory::Running,
            SportArg::Walking => SportCategory::Walking,
            SportArg::Cycling => SportCategory::Cycling,
            SportArg::IndoorSwimming => SportCategory::IndoorSwimming,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    let config = load_config(cli.config.as_deref(), cli.report_unsupported)?;

    match cli.command {
        Commands::GenerateAll { input, output } => {
            cmd_generate(config, &input, &output, |_| true)
        }
        Commands::GenerateSingle { input, output, id } => {
            let directory = ExportDirectory::new(&input);
            if !directory.summaries()?.iter().any(|s| s.trackid == Some(id)) {
                return Err(CliFailure::TrackNotFound(id));
            }
            cmd_generate(config, &input, &output, |s| s.trackid == Some(id))
        }
        Commands::GenerateSport {
            input,
            output,
            sport,
        } => {
            let category = SportCategory::from(sport);
            cmd_generate(config, &input, &output, |s| {
                SportCategory::from_code(s.sport_type) == category
            })
        }
        Commands::Decode { summary, detail } => cmd_decode(&summary, &detail),
        Commands::Stats { input } => cmd_stats(&input),
    }
}

fn load_config(path: Option<&Path>, report_unsupported: bool) -> Result<ConverterConfig, CliFailure> {
    let config = match path {
        Some(path) => ConverterConfig::load(path)?,
        None => ConverterConfig::default(),
    };
    debug!(?config, "configuration loaded");

    Ok(if report_unsupported {
        config.with_unsupported_policy(UnsupportedPolicy::Report)
    } else {
        config
    })
}

fn cmd_generate<F>(
    config: ConverterConfig,
    input: &Path,
    output: &Path,
    filter: F,
) -> Result<(), CliFailure>
where
    F: Fn(&zepp_fit::RawActivitySummary) -> bool,
{
    let directory = ExportDirectory::new(input);
    let mut sink = JsonDocumentSink::new(output);
    let report = Converter::new(config).convert_directory(&directory, filter, &mut sink)?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliFailure::PartialFailure(report))
    }
}

fn cmd_decode(summary: &Path, detail: &Path) -> Result<(), CliFailure> {
    let summary_json = if summary.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading summary from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(summary)?
    };

    let summary = ExportAdapter::parse_summary(&summary_json)?;
    let detail = ExportAdapter::parse_detail(&fs::read_to_string(detail)?)?;
    let container = decode(&summary, &detail)?;

    println!("{}", serde_json::to_string_pretty(&container)?);
    Ok(())
}

fn cmd_stats(input: &Path) -> Result<(), CliFailure> {
    let summaries = ExportDirectory::new(input).summaries()?;

    #[derive(serde::Serialize)]
    struct Stats {
        total: usize,
        categories: std::collections::BTreeMap<String, usize>,
    }

    let stats = Stats {
        total: summaries.len(),
        categories: category_counts(&summaries),
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Convert(ConvertError),
    Json(serde_json::Error),
    TrackNotFound(i64),
    PartialFailure(BatchReport),
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<ConvertError> for CliFailure {
    fn from(e: ConvertError) -> Self {
        CliFailure::Convert(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Convert(ConvertError::MissingData(field)) => CliError {
                code: "MISSING_DATA".to_string(),
                message: format!("Missing required data: {field}"),
                hint: Some("Point --input at the directory written by the download step".to_string()),
            },
            CliFailure::Convert(e @ ConvertError::UnsupportedSport { .. }) => CliError {
                code: "UNSUPPORTED_SPORT".to_string(),
                message: e.to_string(),
                hint: Some("Drop --report-unsupported to skip these activities".to_string()),
            },
            CliFailure::Convert(e) => CliError {
                code: "CONVERT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check that summary and detail belong to the same activity".to_string()),
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::TrackNotFound(id) => CliError {
                code: "TRACK_NOT_FOUND".to_string(),
                message: format!("No activity with track id {id} in summaries.json"),
                hint: Some("Run 'zepp-fit stats' to list what was downloaded".to_string()),
            },
            CliFailure::PartialFailure(report) => CliError {
                code: "PARTIAL_FAILURE".to_string(),
                message: format!(
                    "{} of {} activities failed",
                    report.failed.len(),
                    report.total()
                ),
                hint: Some("See the batch report and log output for each failure".to_string()),
            },
        }
    }
}
