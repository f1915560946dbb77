#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch pipeline linking registration districts to the 1851 parish
//! backbone.
//!
//! Stages run in a fixed order (match, diagnose, coverage, QA, deaths,
//! construct, impute). Requesting one stage runs everything it depends on in memory
//! and writes the outputs of every stage that ran.

pub mod config;
pub mod progress;
pub mod stages;

use std::sync::Arc;

use strum_macros::{AsRefStr, Display, EnumString};

pub use config::{ConfigError, PipelineConfig};
pub use progress::{NullProgress, StageProgress, null_progress};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An input or output table failed.
    #[error(transparent)]
    Table(#[from] rd_backbone_tables::TableError),

    /// The reference parish table produced no usable parishes.
    #[error("no reference parishes could be loaded from {0}")]
    NoReferenceParishes(String),
}

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Resolve membership records against the parish index.
    Match,
    /// Near-miss report over unmatched names.
    Diagnose,
    /// Expand intervals and aggregate per district-year.
    Coverage,
    /// Integrity and trend checks over the coverage table.
    Qa,
    /// Link death-register districts to coverage.
    Deaths,
    /// Dissolve district geometries per census year.
    Construct,
    /// Impute locations and write the final district-year summary.
    Impute,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: &[Self] = &[
        Self::Match,
        Self::Diagnose,
        Self::Coverage,
        Self::Qa,
        Self::Deaths,
        Self::Construct,
        Self::Impute,
    ];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Match => "Match parishes to the 1851 backbone",
            Self::Diagnose => "Diagnose unmatched names",
            Self::Coverage => "Aggregate district-year coverage",
            Self::Qa => "Coverage QA report",
            Self::Deaths => "Link death registers to coverage",
            Self::Construct => "Construct district geometries",
            Self::Impute => "Impute missing district locations",
        }
    }

    /// Stages this one reads the results of.
    #[must_use]
    pub const fn depends_on(&self) -> &'static [Self] {
        match self {
            Self::Match => &[],
            Self::Diagnose | Self::Coverage => &[Self::Match],
            Self::Qa | Self::Deaths | Self::Construct => &[Self::Coverage],
            Self::Impute => &[Self::Construct],
        }
    }

    /// `targets` plus everything they depend on, in execution order.
    #[must_use]
    pub fn plan(targets: &[Self]) -> Vec<Self> {
        let mut needed: Vec<Self> = Vec::new();
        let mut pending: Vec<Self> = targets.to_vec();
        while let Some(stage) = pending.pop() {
            if !needed.contains(&stage) {
                needed.push(stage);
                pending.extend_from_slice(stage.depends_on());
            }
        }
        needed.sort_unstable();
        needed
    }
}

/// Loads the inputs and runs `targets` with their dependencies.
///
/// Returns the stages that ran, in order.
///
/// # Errors
///
/// Returns an error if an input table is missing or malformed, or an output
/// cannot be written.
pub fn run(
    config: &PipelineConfig,
    targets: &[Stage],
    progress: &Arc<dyn StageProgress>,
) -> Result<Vec<Stage>, PipelineError> {
    let plan = Stage::plan(targets);
    progress.planned(&plan);

    let inputs = stages::load_inputs(config)?;
    let out_dir = config.paths.output_dir.as_path();
    std::fs::create_dir_all(out_dir).map_err(rd_backbone_tables::TableError::from)?;

    let mut matched = None;
    let mut coverage = None;
    let mut constructed = None;

    for &stage in &plan {
        progress.started(stage);
        log::info!("Stage {stage}: {}", stage.label());

        match stage {
            Stage::Match => {
                let output = stages::match_stage(config, &inputs);
                stages::write_match(out_dir, &output)?;
                matched = Some(output);
            }
            Stage::Diagnose => {
                if let Some(m) = &matched {
                    let diagnostics = stages::diagnose_stage(config, m);
                    rd_backbone_tables::output::write_unmatched_diagnostics(
                        &out_dir.join(stages::DIAGNOSTICS_DIR),
                        &diagnostics,
                    )?;
                }
            }
            Stage::Coverage => {
                if let Some(m) = &matched {
                    let output = stages::coverage_stage(config, &inputs, &m.concordance);
                    rd_backbone_tables::output::write_coverage(
                        &out_dir.join(stages::COVERAGE_CSV),
                        &output.coverage,
                    )?;
                    coverage = Some(output);
                }
            }
            Stage::Qa => {
                if let Some(c) = &coverage {
                    let report = rd_backbone_coverage::qa::report(&c.coverage);
                    rd_backbone_tables::output::write_qa_report(
                        &out_dir.join(stages::QA_DIR),
                        &report,
                    )?;
                }
            }
            Stage::Deaths => {
                if let Some(c) = &coverage
                    && let Some(output) = stages::deaths_stage(config, &c.coverage)?
                {
                    stages::write_deaths(out_dir, &output)?;
                }
            }
            Stage::Construct => {
                if let Some(c) = &coverage {
                    let output = stages::construct_stage(config, &inputs, &c.activity);
                    stages::write_construct(out_dir, &output)?;
                    constructed = Some(output);
                }
            }
            Stage::Impute => {
                if let (Some(c), Some(g)) = (&coverage, &constructed) {
                    let summary = stages::impute_stage(config, &inputs, &c.coverage, g)?;
                    rd_backbone_tables::output::write_district_year_summary(
                        &out_dir.join(stages::SUMMARY_CSV),
                        &summary,
                    )?;
                }
            }
        }

        progress.completed(stage);
    }

    progress.finished(out_dir);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::str::FromStr as _;
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn plan_pulls_in_dependencies_in_order() {
        assert_eq!(
            Stage::plan(&[Stage::Impute]),
            vec![Stage::Match, Stage::Coverage, Stage::Construct, Stage::Impute]
        );
        assert_eq!(
            Stage::plan(&[Stage::Qa, Stage::Diagnose]),
            vec![Stage::Match, Stage::Diagnose, Stage::Coverage, Stage::Qa]
        );
        assert_eq!(Stage::plan(Stage::ALL), Stage::ALL.to_vec());
        assert_eq!(
            Stage::plan(&[Stage::Deaths]),
            vec![Stage::Match, Stage::Coverage, Stage::Deaths]
        );
        assert!(Stage::plan(&[]).is_empty());
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl StageProgress for Recorder {
        fn planned(&self, stages: &[Stage]) {
            self.push(format!("plan {}", stages.len()));
        }
        fn started(&self, stage: Stage) {
            self.push(format!("start {stage}"));
        }
        fn completed(&self, stage: Stage) {
            self.push(format!("done {stage}"));
        }
        fn finished(&self, out_dir: &Path) {
            self.push(format!("finished {}", out_dir.display()));
        }
    }

    #[test]
    fn run_reports_stage_events_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("parishes.csv"),
            "id,name,geometry\n1,DOVER,\"{\"\"type\"\":\"\"Polygon\"\",\"\"coordinates\"\":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("source.csv"),
            "parish,district,from_year,to_year\nDover,Dover,,\n",
        )
        .unwrap();

        let mut config = PipelineConfig::default();
        config.paths.parishes = dir.path().join("parishes.csv");
        config.paths.source = dir.path().join("source.csv");
        config.paths.official_centroids = None;
        config.paths.deaths_dir = None;
        config.paths.output_dir = dir.path().join("out");

        let recorder = Arc::new(Recorder::default());
        let progress: Arc<dyn StageProgress> = recorder.clone();
        run(&config, &[Stage::Coverage], &progress).unwrap();

        let out: PathBuf = dir.path().join("out");
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "plan 2".to_string(),
                "start match".to_string(),
                "done match".to_string(),
                "start coverage".to_string(),
                "done coverage".to_string(),
                format!("finished {}", out.display()),
            ]
        );
    }

    #[test]
    fn stage_names_parse() {
        assert_eq!(Stage::from_str("construct").unwrap(), Stage::Construct);
        assert_eq!(Stage::Qa.to_string(), "qa");
    }
}
