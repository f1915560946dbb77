#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `rd_backbone` binary.
//!
//! [`IndicatifProgress`] renders pipeline progress with `indicatif`, and
//! [`init_logger`] routes `log` output through the same [`MultiProgress`]
//! so log lines never tear a bar mid-redraw.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rd_backbone_pipeline::{Stage, StageProgress};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] over pipeline stages.
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    /// Starts as a spinner showing `message` and switches to a bar once
    /// the plan is known.
    #[must_use]
    pub fn stages_bar(multi: &MultiProgress, message: &str) -> Arc<dyn StageProgress> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        Arc::new(Self { bar })
    }
}

impl StageProgress for IndicatifProgress {
    fn planned(&self, stages: &[Stage]) {
        self.bar.set_length(stages.len() as u64);
        self.bar.set_position(0);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{msg:<40} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
    }

    fn started(&self, stage: Stage) {
        self.bar.set_message(stage.label());
    }

    fn completed(&self, _stage: Stage) {
        self.bar.inc(1);
    }

    fn finished(&self, out_dir: &Path) {
        self.bar
            .finish_with_message(format!("Wrote outputs to {}", out_dir.display()));
    }
}

/// Initializes `pretty_env_logger` (filtered by `RUST_LOG`) wrapped in
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Fails only when a logger is already installed.
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
    fn hidden_bar_tracks_stage_progress() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = IndicatifProgress::stages_bar(&multi, "Loading");

        let plan = Stage::plan(&[Stage::Qa]);
        progress.planned(&plan);
        for &stage in &plan {
            progress.started(stage);
            progress.completed(stage);
        }
        progress.finished(Path::new("out"));
    }

    #[test]
    fn init_logger_is_repeatable() {
        let _first = init_logger();
        let _second = init_logger();
    }
}
