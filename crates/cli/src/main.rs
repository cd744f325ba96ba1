use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vrmsort::apply::{self, SortOptions, SortSummary};
use vrmsort_core::config::{self, AppConfig, ReportFormat, TransferMode};
use vrmsort_core::mapping::{self, MappingFile};
use vrmsort_core::models::Warning;
use vrmsort_core::output::Destination;
use vrmsort_core::{pipeline, report, scanner};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser)]
#[command(name = "vrmsort")]
#[command(about = "Read VRM license metadata, report it and sort models into folders", long_about = None)]
struct Cli {
    /// Path to config file (TOML, JSON, YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Exit with status 2 when any file produced a warning
    #[arg(long, global = true)]
    strict: bool,

    /// Debug logging (wins over --quiet)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the license terms of each model
    Report {
        /// Files, folders or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Output format (defaults to report.format from config)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the raw embedded glTF JSON of each model
    Dump {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[arg(long)]
        compact: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a mapping template with one entry per distinct set of license terms
    Prepare {
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Mapping file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Move models into the folders a completed mapping file assigns
    Sort {
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Completed mapping file
        #[arg(short, long)]
        mapping: PathBuf,
        /// Copy instead of move
        #[arg(long)]
        copy: bool,
        /// Show what would happen without touching any file
        #[arg(long)]
        dry_run: bool,
        /// Print per-file outcomes as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
    Text,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Text => ReportFormat::Text,
        }
    }
}

/// Logs go to stderr so stdout stays a clean report channel.
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = if verbose || quiet {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<u8> {
    let mut cfg = config::load(cli.config.as_deref()).context("loading configuration")?;
    cfg.strict |= cli.strict;

    let warnings = match cli.command {
        Commands::Report {
            inputs,
            format,
            compact,
            output,
        } => {
            if let Some(f) = format {
                cfg.report.format = f.into();
            }
            cfg.report.compact |= compact;
            run_report(&cfg, &inputs, output)?
        }
        Commands::Dump {
            inputs,
            compact,
            output,
        } => run_dump(&cfg, &inputs, compact || cfg.report.compact, output)?,
        Commands::Prepare { inputs, output } => run_prepare(&cfg, &inputs, output)?,
        Commands::Sort {
            inputs,
            mapping,
            copy,
            dry_run,
            json,
        } => {
            if copy {
                cfg.sort.mode = TransferMode::Copy;
            }
            cfg.sort.dry_run |= dry_run;
            run_sort(&cfg, &inputs, &mapping, json)?
        }
    };

    Ok(finish(&warnings, cfg.strict))
}

fn expand(cfg: &AppConfig, inputs: &[String]) -> Result<Vec<PathBuf>> {
    let paths = scanner::expand_inputs(inputs, &cfg.scan).context("expanding inputs")?;
    if paths.is_empty() {
        warn!("no model files matched {}", inputs.join(" "));
    }
    Ok(paths)
}

fn run_report(cfg: &AppConfig, inputs: &[String], output: Option<PathBuf>) -> Result<Vec<Warning>> {
    let paths = expand(cfg, inputs)?;
    let batch = pipeline::read_records(&paths)?;
    let body = report::render(&batch.items, &cfg.report).context("rendering report")?;
    Destination::from_option(output).emit(&body)?;
    Ok(batch.warnings)
}

fn run_dump(
    cfg: &AppConfig,
    inputs: &[String],
    compact: bool,
    output: Option<PathBuf>,
) -> Result<Vec<Warning>> {
    let paths = expand(cfg, inputs)?;
    let batch = pipeline::read_documents(&paths)?;
    let body = report::raw_dump(&batch.items, compact).context("rendering dump")?;
    Destination::from_option(output).emit(&body)?;
    Ok(batch.warnings)
}

fn run_prepare(cfg: &AppConfig, inputs: &[String], output: PathBuf) -> Result<Vec<Warning>> {
    let paths = expand(cfg, inputs)?;
    let batch = mapping::prepare(&paths, &output)?;
    println!(
        "wrote {} with {} entries; fill in each \"directory\" before sorting",
        output.display(),
        batch.items.entries.len()
    );
    Ok(batch.warnings)
}

fn run_sort(
    cfg: &AppConfig,
    inputs: &[String],
    mapping_path: &Path,
    json: bool,
) -> Result<Vec<Warning>> {
    // A broken mapping aborts before any file is touched.
    let mapping = MappingFile::load(mapping_path)?;
    let paths = expand(cfg, inputs)?;
    let opts = SortOptions::from(&cfg.sort);
    let batch = apply::sort_by_mapping(&paths, &mapping, &opts)?;

    if json {
        let body = report::to_json(&batch.items, false)?;
        Destination::Stdout.emit(&body)?;
    } else {
        let s = SortSummary::from_views(&batch.items);
        println!(
            "sort summary: processed={}, moved={}, copied={}, planned={}, in_place={}, unmatched={}, collided={}, decode_failed={}, failed={}, dry_run={}",
            batch.items.len(),
            s.moved,
            s.copied,
            s.planned,
            s.already_in_place,
            s.unmatched,
            s.collided,
            s.decode_failed,
            s.failed,
            opts.dry_run
        );
    }
    Ok(batch.warnings)
}

/// Logs the collected warnings once, after the primary output, and picks the exit status.
fn finish(warnings: &[Warning], strict: bool) -> u8 {
    if warnings.is_empty() {
        return 0;
    }
    for w in warnings {
        warn!("{w}");
    }
    info!("{} warning(s)", warnings.len());
    if strict {
        2
    } else {
        0
    }
}
