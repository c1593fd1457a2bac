#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `timesheet`: extracts attendance records from vendor timesheet PDFs.
//!
//! Prints one JSON document per input file. A file that fails to parse
//! gets an error report and the batch carries on. Ctrl-C cancels the
//! in-flight parse and skips the remaining files.

mod report;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use timesheet_cli_utils::{IndicatifProgress, MultiProgress};
use timesheet_pdf::{CancellationFlag, parse_attendance_file, parse_metadata_file};
use timesheet_vendor::registry::{all_presets, resolve_preset};
use timesheet_vendor::{PresetOverrides, VendorPreset};

use crate::report::{MetadataReport, ParseReport, to_json};

#[derive(Parser)]
#[command(name = "timesheet", about = "Timesheet PDF attendance parser")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract date / check-in / check-out rows from PDFs
    Parse {
        /// PDF files to parse
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        preset: PresetArgs,
        /// Collapse rows sharing a date, keeping the last one
        #[arg(long)]
        dedupe: bool,
        /// Indent JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Extract employee ID and name from PDF page headers
    Metadata {
        /// PDF files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Vendor preset ID (see `timesheet vendors`)
        #[arg(long)]
        vendor: Option<String>,
        /// Indent JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List the built-in vendor presets
    Vendors,
}

/// Preset selection and per-field overrides.
#[derive(Args, Debug, Default)]
struct PresetArgs {
    /// Vendor preset ID (see `timesheet vendors`). Unknown IDs fall back
    /// to the default preset.
    #[arg(long)]
    vendor: Option<String>,
    /// Max vertical distance (PDF units) for fragments to share a row
    #[arg(long)]
    y_tolerance: Option<f64>,
    /// Max horizontal distance (PDF units) for a cell to sit under a header
    #[arg(long)]
    x_tolerance: Option<f64>,
    /// Rows searched below a header candidate for a date before accepting it
    #[arg(long)]
    header_lookahead: Option<usize>,
    /// Date column header label (repeatable, replaces the preset's)
    #[arg(long = "date-label")]
    date_labels: Vec<String>,
    /// Check-in column header label (repeatable, replaces the preset's)
    #[arg(long = "checkin-label")]
    checkin_labels: Vec<String>,
    /// Check-out column header label (repeatable, replaces the preset's)
    #[arg(long = "checkout-label")]
    checkout_labels: Vec<String>,
}

fn non_empty(labels: &[String]) -> Option<Vec<String>> {
    (!labels.is_empty()).then(|| labels.to_vec())
}

impl PresetArgs {
    fn overrides(&self) -> PresetOverrides {
        PresetOverrides {
            date_labels: non_empty(&self.date_labels),
            checkin_labels: non_empty(&self.checkin_labels),
            checkout_labels: non_empty(&self.checkout_labels),
            exclusion_terms: None,
            y_tolerance: self.y_tolerance,
            x_tolerance: self.x_tolerance,
            header_lookahead: self.header_lookahead,
        }
    }

    fn resolve(&self) -> VendorPreset {
        resolve_preset(self.vendor.as_deref(), &self.overrides())
    }
}

/// Cancels `flag` on the first Ctrl-C.
fn cancel_on_ctrl_c(flag: &CancellationFlag) {
    let flag = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            flag.cancel();
        }
    });
}

fn emit(multi: &MultiProgress, json: &str) {
    multi.suspend(|| println!("{json}"));
}

async fn run_parse(
    multi: &MultiProgress,
    files: &[PathBuf],
    preset: &VendorPreset,
    dedupe: bool,
    pretty: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let cancel = CancellationFlag::new();
    cancel_on_ctrl_c(&cancel);

    let files_bar = IndicatifProgress::files_bar(multi, files.len() as u64);
    let mut failures = 0;

    for file in files {
        if cancel.is_cancelled() {
            log::warn!("Skipping {} and later files", file.display());
            break;
        }

        let name = file.display().to_string();
        let pages_bar = IndicatifProgress::pages_bar(multi, &name);
        let result =
            parse_attendance_file(file, preset.clone(), cancel.clone(), pages_bar.clone()).await;
        if let Err(e) = &result {
            log::error!("{name}: {e}");
            pages_bar.finish("failed".to_owned());
        }

        let report = ParseReport::new(file, result, dedupe);
        if report.is_error() {
            failures += 1;
        }
        emit(multi, &to_json(&report, pretty)?);
        files_bar.inc(1);
    }

    files_bar.finish(format!("Parsed {} files", files.len()));
    Ok(failures)
}

async fn run_metadata(
    multi: &MultiProgress,
    files: &[PathBuf],
    preset: &VendorPreset,
    pretty: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut failures = 0;

    for file in files {
        let result = parse_metadata_file(file, preset.clone()).await;
        if let Err(e) = &result {
            log::error!("{}: {e}", file.display());
        }

        let report = MetadataReport::new(file, result);
        if report.is_error() {
            failures += 1;
        }
        emit(multi, &to_json(&report, pretty)?);
    }

    Ok(failures)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = timesheet_cli_utils::init_logger();
    let cli = Cli::parse();

    let (failures, total) = match cli.command {
        Commands::Parse {
            files,
            preset,
            dedupe,
            pretty,
        } => {
            let start = Instant::now();
            let preset = preset.resolve();
            let failures = run_parse(&multi, &files, &preset, dedupe, pretty).await?;
            log::info!(
                "Parsed {} files in {:.1}s",
                files.len(),
                start.elapsed().as_secs_f64()
            );
            (failures, files.len())
        }
        Commands::Metadata {
            files,
            vendor,
            pretty,
        } => {
            let preset = resolve_preset(vendor.as_deref(), &PresetOverrides::default());
            let failures = run_metadata(&multi, &files, &preset, pretty).await?;
            (failures, files.len())
        }
        Commands::Vendors => {
            println!("{:<14} {:>6} {:>6}  NAME", "ID", "Y-TOL", "X-TOL");
            println!("{}", "-".repeat(50));
            for preset in all_presets() {
                println!(
                    "{:<14} {:>6.1} {:>6.1}  {}",
                    preset.id, preset.y_tolerance, preset.x_tolerance, preset.name
                );
            }
            return Ok(());
        }
    };

    if failures > 0 {
        return Err(format!("{failures} of {total} files failed").into());
    }

    Ok(())
}
