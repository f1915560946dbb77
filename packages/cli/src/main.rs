#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `rd_backbone`: links historical registration districts to the 1851
//! parish backbone.
//!
//! Each subcommand runs one pipeline stage together with the stages it
//! depends on. Without a subcommand an interactive menu picks the stage.
//! Logging goes through [`rd_backbone_cli_utils::init_logger`] so log
//! lines and the stage bar share the terminal cleanly.

mod interactive;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rd_backbone_cli_utils::{IndicatifProgress, MultiProgress};
use rd_backbone_pipeline::{PipelineConfig, Stage};

#[derive(Parser)]
#[command(
    name = "rd_backbone",
    about = "Registration district to 1851 parish backbone pipeline"
)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Overrides for the configured paths.
#[derive(Args, Default)]
struct PathArgs {
    /// TOML configuration file (defaults to the built-in configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Reference parish CSV (`id`, `name`, `geometry`)
    #[arg(long, global = true)]
    parishes: Option<PathBuf>,
    /// Membership CSV (`parish`, `district`, `from_year`, `to_year`)
    #[arg(long, global = true)]
    source: Option<PathBuf>,
    /// Official district centroid CSV (`district`, `year`, `x`, `y`)
    #[arg(long, global = true)]
    official_centroids: Option<PathBuf>,
    /// Directory of cleaned death-register extracts, one CSV per year
    #[arg(long, global = true)]
    deaths_dir: Option<PathBuf>,
    /// Directory all outputs are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Match membership records to reference parishes
    Match,
    /// Aggregate per district-year backbone coverage
    Coverage,
    /// Dissolve district geometries for each census year
    Construct,
    /// Impute locations for districts without backbone geometry
    Impute {
        /// Borrow centroids from this census year's layer instead of the
        /// row's own year
        #[arg(long)]
        target_year: Option<i32>,
    },
    /// Report near misses for unmatched place names
    Diagnose {
        /// Largest edit distance reported as a near miss
        #[arg(long)]
        max_distance: Option<usize>,
    },
    /// Integrity and trend checks over the coverage table
    Qa,
    /// Link death-register districts to coverage, year by year
    Deaths {
        /// Only read files whose name starts with this prefix
        #[arg(long)]
        file_prefix: Option<String>,
    },
    /// Run every stage
    All,
}

impl PathArgs {
    fn load(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(path) = &self.parishes {
            config.paths.parishes.clone_from(path);
        }
        if let Some(path) = &self.source {
            config.paths.source.clone_from(path);
        }
        if let Some(path) = &self.official_centroids {
            config.paths.official_centroids = Some(path.clone());
        }
        if let Some(path) = &self.deaths_dir {
            config.paths.deaths_dir = Some(path.clone());
        }
        if let Some(path) = &self.output_dir {
            config.paths.output_dir.clone_from(path);
        }

        Ok(config)
    }
}

/// Runs `targets` behind a stage progress bar.
fn run_stages(
    multi: &MultiProgress,
    config: &PipelineConfig,
    targets: &[Stage],
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::stages_bar(multi, "Loading inputs");
    let ran = rd_backbone_pipeline::run(config, targets, &progress)?;

    let names: Vec<&str> = ran.iter().map(AsRef::as_ref).collect();
    log::info!(
        "Completed {} ({})",
        names.join(", "),
        config.paths.output_dir.display()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = rd_backbone_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi, &cli.paths);
    };

    let mut config = cli.paths.load()?;

    let targets: &[Stage] = match command {
        Commands::Match => &[Stage::Match],
        Commands::Coverage => &[Stage::Coverage],
        Commands::Construct => &[Stage::Construct],
        Commands::Impute { target_year } => {
            if let Some(year) = target_year {
                config.imputation.target_year = Some(year);
            }
            &[Stage::Impute]
        }
        Commands::Diagnose { max_distance } => {
            if let Some(max_distance) = max_distance {
                config.diagnostics.max_distance = max_distance;
            }
            &[Stage::Diagnose]
        }
        Commands::Qa => &[Stage::Qa],
        Commands::Deaths { file_prefix } => {
            if let Some(prefix) = file_prefix {
                config.deaths.file_prefix = prefix;
            }
            &[Stage::Deaths]
        }
        Commands::All => Stage::ALL,
    };

    config.validate()?;
    run_stages(&multi, &config, targets)
}
