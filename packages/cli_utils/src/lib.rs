#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the accident map toolchain.
//!
//! [`IndicatifProgress`] renders loader events through the
//! [`LoadProgress`] trait, and [`init_logger`] sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while progress bars redraw. The `prompt_*` helpers wrap `dialoguer` for
//! the interactive menu.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use accident_map_loader::{LoadProgress, LoadReport};
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`LoadProgress`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once the feature count is known.
    bar_style: ProgressStyle,
    skipped: AtomicU64,
}

impl IndicatifProgress {
    /// Progress for reading and parsing a dataset. Starts as a spinner
    /// while the file is read and becomes a feature-count bar once
    /// parsing begins.
    #[must_use]
    pub fn load_bar(multi: &MultiProgress, message: &str) -> Self {
        Self::spinner_then_bar(multi, message, "cyan")
    }

    /// Spinner for whole-file scans such as `check` and `metrics`.
    #[must_use]
    pub fn scan_bar(multi: &MultiProgress, message: &str) -> Self {
        Self::spinner_then_bar(multi, message, "yellow")
    }

    fn spinner_then_bar(multi: &MultiProgress, message: &str, color: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template(&format!("{{spinner:.{color}}} {{msg}}"))
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(&format!(
            "  {{msg}} {{wide_bar:.{color}/dim}} {{pos}}/{{len}} {{percent}}% [{{eta}}]"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self {
            bar,
            bar_style,
            skipped: AtomicU64::new(0),
        }
    }

    /// Removes the indicator from the terminal.
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Features skipped so far.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl LoadProgress for IndicatifProgress {
    fn reading(&self, path: &Path) {
        self.bar.set_message(format!("Reading {}", path.display()));
    }

    fn parsing(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
        self.bar.set_message("Parsing accidents");
    }

    fn feature(&self, kept: bool) {
        if !kept {
            let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
            self.bar
                .set_message(format!("Parsing accidents ({skipped} skipped)"));
        }
        self.bar.inc(1);
    }

    fn finished(&self, report: &LoadReport) {
        self.bar.finish_with_message(format!(
            "Loaded {} of {} features",
            report.loaded, report.features
        ));
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when called twice, e.g. from tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

/// Shows a selection menu. `None` when the prompt is aborted or the
/// terminal is not interactive.
#[must_use]
pub fn prompt_select(prompt: &str, items: &[&str]) -> Option<usize> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()
        .ok()
        .flatten()
}

/// Asks for a line of text. An empty answer (or a failed prompt) is
/// `None`.
#[must_use]
pub fn prompt_optional(prompt: &str) -> Option<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
