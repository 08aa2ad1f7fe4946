// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bindwerk — merge an ordered folder of images into one PDF or PPTX deck.
//
// Entry point. Initialises logging, loads settings, and runs the `scan` or
// `convert` command against a `Session`.

mod services;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use bindwerk_core::AppConfig;
use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::human_errors::{HumanError, humanize_error, humanize_failure};
use bindwerk_core::types::{ConversionOutcome, CoreEvent, DeckLayout, OutputFormat, PagedMode, ScanFilter};

use services::session::Session;

/// Merge a folder of images into one PDF or PPTX.
#[derive(Parser, Debug)]
#[command(name = "bindwerk", version, about, arg_required_else_help = true)]
struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/bindwerk/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the images a folder contributes, in merge order.
    Scan(ScanArgs),
    /// Merge the images of a folder into one document.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Folder to scan (subfolders are ignored).
    dir: PathBuf,

    /// Only admit some image types.
    #[arg(long, value_enum)]
    filter: Option<FilterArg>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Folder to scan (subfolders are ignored).
    dir: PathBuf,

    /// Only admit some image types.
    #[arg(long, value_enum)]
    filter: Option<FilterArg>,

    /// Output format; otherwise taken from the output extension, then settings.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Output file (default: <first image>_merged.<ext> next to the images).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// PDF embedding: lossless, medium, high, or a JPEG quality 1-100.
    #[arg(long, value_parser = parse_quality)]
    quality: Option<QualityArg>,

    /// Slide placement for PPTX output.
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Positions (as printed by `scan`) to move one place up. Applied first.
    #[arg(long, value_delimiter = ',', value_name = "N")]
    move_up: Vec<usize>,

    /// Positions to move one place down, after --move-up.
    #[arg(long, value_delimiter = ',', value_name = "N")]
    move_down: Vec<usize>,

    /// Positions to drop, after both moves.
    #[arg(long, value_delimiter = ',', value_name = "N")]
    remove: Vec<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    PngJpg,
    Tif,
    Bmp,
}

impl From<FilterArg> for ScanFilter {
    fn from(v: FilterArg) -> Self {
        match v {
            FilterArg::All => ScanFilter::All,
            FilterArg::PngJpg => ScanFilter::PngJpg,
            FilterArg::Tif => ScanFilter::Tif,
            FilterArg::Bmp => ScanFilter::Bmp,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Pdf,
    Pptx,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => OutputFormat::PagedDocument,
            FormatArg::Pptx => OutputFormat::SlideDeck,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Blank,
    Centered,
    Fit,
}

impl From<LayoutArg> for DeckLayout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Blank => DeckLayout::Blank,
            LayoutArg::Centered => DeckLayout::Centered,
            LayoutArg::Fit => DeckLayout::FullBleedFit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityArg {
    Lossless,
    Medium,
    High,
    Custom(u8),
}

impl QualityArg {
    fn mode(self, config: &AppConfig) -> PagedMode {
        match self {
            Self::Lossless => PagedMode::Lossless,
            Self::Medium => config.medium(),
            Self::High => config.high_compression(),
            Self::Custom(quality) => PagedMode::Recompress { quality },
        }
    }
}

fn parse_quality(value: &str) -> std::result::Result<QualityArg, String> {
    match value.to_ascii_lowercase().as_str() {
        "lossless" => Ok(QualityArg::Lossless),
        "medium" => Ok(QualityArg::Medium),
        "high" => Ok(QualityArg::High),
        other => match other.parse::<u8>() {
            Ok(quality) if (1..=100).contains(&quality) => Ok(QualityArg::Custom(quality)),
            _ => Err(format!("expected lossless, medium, high or 1-100, got `{value}`")),
        },
    }
}

/// 1-based positions to 0-based indices; 0 is not a position.
fn to_indices(positions: &[usize]) -> Vec<usize> {
    positions.iter().filter_map(|p| p.checked_sub(1)).collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Bindwerk starting");

    let config = match services::config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return report(&humanize_error(&err)),
    };

    let result = match cli.command {
        Command::Scan(args) => run_scan(config, args),
        Command::Convert(args) => run_convert(config, args).await,
    };
    result.unwrap_or_else(|err| {
        tracing::error!(%err, "command failed");
        report(&humanize_error(&err))
    })
}

fn run_scan(config: AppConfig, args: ScanArgs) -> Result<ExitCode> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(config, tx);
    let filter = args.filter.map(ScanFilter::from).unwrap_or(session.config().default_filter);

    session.request_scan(&args.dir, filter);
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Log(line) = event {
            eprintln!("{line}");
        }
    }

    for label in session.catalog().display_labels() {
        println!("{label}");
    }
    println!("{}", session.view_state(&[]).count_label);
    Ok(ExitCode::SUCCESS)
}

async fn run_convert(config: AppConfig, args: ConvertArgs) -> Result<ExitCode> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(config, tx);
    let filter = args.filter.map(ScanFilter::from).unwrap_or(session.config().default_filter);

    session.request_scan(&args.dir, filter);
    if !args.move_up.is_empty() {
        let selection = to_indices(&args.move_up);
        if session.view_state(&selection).move_enabled {
            session.request_move_up(&selection)?;
        } else {
            ignored_positions("--move-up", session.catalog().len());
        }
    }
    if !args.move_down.is_empty() {
        let selection = to_indices(&args.move_down);
        if session.view_state(&selection).move_enabled {
            session.request_move_down(&selection)?;
        } else {
            ignored_positions("--move-down", session.catalog().len());
        }
    }
    if !args.remove.is_empty() {
        let selection = to_indices(&args.remove);
        if session.view_state(&selection).remove_enabled {
            session.request_remove(&selection)?;
        } else {
            ignored_positions("--remove", session.catalog().len());
        }
    }
    if !session.view_state(&[]).convert_enabled {
        return Err(BindwerkError::EmptyCatalog);
    }

    let format = args
        .format
        .map(OutputFormat::from)
        .or_else(|| args.output.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or(session.config().default_format);
    let mode = args
        .quality
        .map(|q| q.mode(session.config()))
        .unwrap_or(session.config().default_paged_mode);
    let layout = args.layout.map(DeckLayout::from).unwrap_or(session.config().default_layout);

    let run = session.request_export(format, args.output, mode, layout)?;
    tracing::debug!(run = %run.id, "conversion running");

    let bar = progress_bar(session.catalog().len());
    while let Some(event) = rx.recv().await {
        match event {
            CoreEvent::Progress(progress) => {
                bar.set_position((progress.index + 1) as u64);
                bar.set_message(progress.label);
            }
            CoreEvent::Log(line) => bar.println(line),
            CoreEvent::CatalogUpdated(_) => {}
            CoreEvent::Finished(_) => break,
        }
    }
    let outcome = run.wait().await;
    bar.finish_and_clear();

    let code = match &outcome {
        ConversionOutcome::Succeeded(_) => {
            println!("{}", session.view_state(&[]).status_line);
            ExitCode::SUCCESS
        }
        ConversionOutcome::Failed { cause, class } => report(&humanize_failure(cause, *class)),
    };
    session.acknowledge();
    Ok(code)
}

fn ignored_positions(flag: &str, count: usize) {
    tracing::warn!(flag, count, "no listed position is in the catalog");
    eprintln!("warning: {flag} ignored: no position between 1 and {count}");
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len}  {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    bar.set_style(style);
    bar.set_prefix("Converting");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn report(human: &HumanError) -> ExitCode {
    eprintln!("error: {}", human.message);
    eprintln!("  {}", human.suggestion);
    ExitCode::FAILURE
}
