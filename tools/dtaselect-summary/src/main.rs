//! Summarise one or more DTASelect reports

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use context_error::{BoxedError, Context, CreateError};
use dtaselect::{
    AccessionMode, DtaSelectError, DtaSelectErrorKind, DtaSelectParser, DtaSelectReport,
    ParserSettings, ReportMetadata,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// The command line interface arguments
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// The reports to read, these are combined into one summary
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// A JSON file with the parser settings
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Discard proteins with an accession matching this regex
    #[arg(long)]
    decoy: Option<String>,
    /// Merge PSMs that only differ in charge
    #[arg(long)]
    charge_insensitive: bool,
    /// Ignore peptides that are not found in the sequence index
    #[arg(long)]
    ignore_not_found: bool,
    /// Extract the accession from FASTA style loci
    #[arg(long)]
    parse_accessions: bool,
    /// Write the summary as JSON
    #[arg(long)]
    json: bool,
    /// Show progress information, `RUST_LOG` takes precedence
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    metadata: &'a ReportMetadata,
    proteins: usize,
    accessions: usize,
    psms: usize,
    peptides: usize,
    groups: usize,
}

impl<'a> Summary<'a> {
    fn new(report: &'a DtaSelectReport) -> Self {
        Self {
            metadata: report.metadata(),
            proteins: report.number_of_proteins(),
            accessions: report.accessions().len(),
            psms: report.number_of_psms(),
            peptides: report.sequences().len(),
            groups: report.number_of_groups(),
        }
    }
}

impl std::fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |value: Option<&String>| value.map_or("-", String::as_str).to_string();
        let metadata = self.metadata;
        writeln!(f, "Format version:  {}", show(metadata.format_version.as_ref()))?;
        writeln!(f, "Run path:        {}", show(metadata.run_path.as_ref()))?;
        writeln!(f, "Database:        {}", show(metadata.database_path.as_ref()))?;
        writeln!(
            f,
            "Search engines:  {} ({})",
            metadata
                .search_engines
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            show(metadata.search_engine_version.as_ref())
        )?;
        writeln!(f, "Inputs:          {}", metadata.inputs.len())?;
        writeln!(f, "Proteins:        {}", self.proteins)?;
        writeln!(f, "Accessions:      {}", self.accessions)?;
        writeln!(f, "PSMs:            {}", self.psms)?;
        writeln!(f, "Peptides:        {}", self.peptides)?;
        writeln!(f, "Protein groups:  {}", self.groups)?;
        writeln!(f, "Decoys removed:  {}", metadata.decoys_discarded)?;
        write!(
            f,
            "Raw files:       {}",
            metadata
                .raw_file_names
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

fn settings(args: &Cli) -> Result<ParserSettings, DtaSelectError> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                BoxedError::new(
                    DtaSelectErrorKind::Io,
                    "Could not open settings file",
                    e.to_string(),
                    Context::none().source(path.to_string_lossy()).to_owned(),
                )
            })?;
            serde_json::from_str(&text).map_err(|e| {
                BoxedError::new(
                    DtaSelectErrorKind::Settings,
                    "Invalid settings file",
                    e.to_string(),
                    Context::none()
                        .source(path.to_string_lossy())
                        .line_index(e.line().saturating_sub(1) as u32)
                        .to_owned(),
                )
            })?
        }
        None => ParserSettings::default(),
    };
    if let Some(decoy) = &args.decoy {
        settings = settings.with_decoy_pattern(decoy);
    }
    if args.charge_insensitive {
        settings = settings.with_charge_sensitive(false);
    }
    if args.ignore_not_found {
        settings = settings.with_ignore_not_found(true);
    }
    if args.parse_accessions {
        settings = settings.with_accession_mode(AccessionMode::Parsed);
    }
    debug!(?settings, "Using settings");
    Ok(settings)
}

fn run(args: &Cli) -> Result<(), DtaSelectError> {
    let report = DtaSelectParser::new(settings(args)?)?.parse_files(&args.inputs)?;
    let summary = Summary::new(&report);
    if args.json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| {
            BoxedError::new(
                DtaSelectErrorKind::Io,
                "Could not write summary",
                e.to_string(),
                Context::none(),
            )
        })?;
        println!("{json}");
    } else {
        println!("{summary}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
