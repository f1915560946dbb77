//! Interactive stage selection.
//!
//! Lets users pick a stage and adjust the output directory without
//! memorizing flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use rd_backbone_cli_utils::MultiProgress;
use rd_backbone_pipeline::Stage;

use crate::{PathArgs, run_stages};

/// Prompts for a stage and runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails, the configuration is invalid, or
/// the pipeline fails.
pub fn run(multi: &MultiProgress, paths: &PathArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Registration District Backbone");
    println!();

    let mut config = paths.load()?;

    let mut labels = vec!["Run every stage"];
    labels.extend(Stage::ALL.iter().map(Stage::label));

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let targets: &[Stage] = if idx == 0 {
        Stage::ALL
    } else {
        std::slice::from_ref(&Stage::ALL[idx - 1])
    };

    let output_dir: String = Input::new()
        .with_prompt("Output directory")
        .default(config.paths.output_dir.display().to_string())
        .interact_text()?;
    config.paths.output_dir = PathBuf::from(output_dir.trim());

    if targets.contains(&Stage::Impute) {
        let pin = Confirm::new()
            .with_prompt("Pin imputation targets to a single census year?")
            .default(config.imputation.target_year.is_some())
            .interact()?;

        config.imputation.target_year = if pin {
            let years: Vec<String> = config
                .years
                .census_years
                .iter()
                .map(ToString::to_string)
                .collect();
            let year_idx = Select::new()
                .with_prompt("Target census year")
                .items(&years)
                .default(0)
                .interact()?;
            config.years.census_years.get(year_idx).copied()
        } else {
            None
        };
    }

    config.validate()?;
    run_stages(multi, &config, targets)
}
