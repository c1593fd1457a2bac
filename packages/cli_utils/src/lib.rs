#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `timesheet` binary.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so log lines are printed above the progress bars
//! instead of tearing them. [`IndicatifProgress`] renders the parser's
//! page progress.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use timesheet_pdf::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once the page count is known.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// A per-document bar. Spins while the PDF is loaded and becomes a
    /// page counter once [`ProgressCallback::set_total()`] is called.
    #[must_use]
    pub fn pages_bar(multi: &MultiProgress, file_name: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(file_name.to_string());

        let bar_style =
            ProgressStyle::with_template("  {prefix} {wide_bar:.cyan/dim} page {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }

    /// A batch bar over all input files. The total is known up front.
    #[must_use]
    pub fn files_bar(multi: &MultiProgress, total: u64) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} {wide_bar:.green/dim} {pos}/{len} files [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        bar.set_message("Parsing");

        let bar_style = bar.style();

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, pages: u64) {
        self.bar.set_length(pages);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, pages: u64) {
        self.bar.inc(pages);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// The level comes from `RUST_LOG`. Returns the [`MultiProgress`] that
/// every progress bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set in tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bars_accept_progress() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let pages = IndicatifProgress::pages_bar(&multi, "march.pdf");
        pages.set_total(3);
        pages.inc(2);
        pages.set_message("12 records".to_owned());
        pages.finish("2 records".to_owned());

        let files = IndicatifProgress::files_bar(&multi, 1);
        files.inc(1);
        files.finish("done".to_owned());
    }
}
