//! TOML pipeline configuration.
//!
//! A default configuration is embedded at compile time; a user file only
//! needs the keys it changes, everything else falls back to the defaults
//! below.

use std::path::{Path, PathBuf};

use rd_backbone_deaths::DEATH_FILE_PREFIX;
use rd_backbone_impute::ImputeOptions;
use rd_backbone_matching::{MatchOptions, SubstringPolicy};
use rd_backbone_registration_models::{YearDefaults, YearWindow};
use serde::Deserialize;

/// The embedded default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors from loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading the config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has wrongly typed keys.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Values parse but contradict each other.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Reference parish table.
    pub parishes: PathBuf,
    /// Membership source table.
    pub source: PathBuf,
    /// Official district centroids. Optional; a missing file disables the
    /// centroid diagnostic and name-based imputation source points.
    pub official_centroids: Option<PathBuf>,
    /// Directory of cleaned death-register extracts, one file per year.
    pub deaths_dir: Option<PathBuf>,
    /// Directory every output is written under.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            parishes: PathBuf::from("data/raw/parishes_1851.csv"),
            source: PathBuf::from("data/raw/rd_membership.csv"),
            official_centroids: Some(PathBuf::from("data/raw/official_rd_centroids.csv")),
            deaths_dir: Some(PathBuf::from("data/raw/freebmd_deaths")),
            output_dir: PathBuf::from("data/analysis"),
        }
    }
}

/// Year constants.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct YearsConfig {
    pub reference_year: i32,
    pub window_start: i32,
    pub window_end: i32,
    /// Substituted for a missing `from_year`.
    pub open_start_year: i32,
    /// Substituted for a missing `to_year`.
    pub open_end_year: i32,
    pub census_years: Vec<i32>,
}

impl Default for YearsConfig {
    fn default() -> Self {
        let defaults = YearDefaults::default();
        Self {
            reference_year: 1851,
            window_start: 1851,
            window_end: 1990,
            open_start_year: defaults.open_start,
            open_end_year: defaults.open_end,
            census_years: vec![1851, 1861, 1871, 1881, 1891, 1901, 1911],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub substring_min_len: usize,
    pub substring_max_gap: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let policy = SubstringPolicy::default();
        Self {
            substring_min_len: policy.min_len,
            substring_max_gap: policy.max_gap,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImputationConfig {
    /// Pin nearest-neighbor targets to this census year's layer.
    pub target_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Largest edit distance reported as a near miss.
    pub max_distance: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { max_distance: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeathsConfig {
    /// Only files whose name starts with this are read.
    pub file_prefix: String,
}

impl Default for DeathsConfig {
    fn default() -> Self {
        Self {
            file_prefix: DEATH_FILE_PREFIX.to_string(),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub years: YearsConfig,
    pub matching: MatchingConfig,
    pub imputation: ImputationConfig,
    pub diagnostics: DiagnosticsConfig,
    pub deaths: DeathsConfig,
}

impl PipelineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the values are
    /// inconsistent.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the embedded default when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(path)?)
            }
            None => Self::from_toml_str(DEFAULT_CONFIG),
        }
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let y = &self.years;
        if y.window_start > y.window_end {
            return Err(ConfigError::Invalid(format!(
                "window_start {} is after window_end {}",
                y.window_start, y.window_end
            )));
        }
        if y.open_start_year > y.open_end_year {
            return Err(ConfigError::Invalid(format!(
                "open_start_year {} is after open_end_year {}",
                y.open_start_year, y.open_end_year
            )));
        }
        if let Some(year) = y.census_years.iter().find(|&&c| !self.window().contains(c)) {
            return Err(ConfigError::Invalid(format!(
                "census year {year} is outside the window [{}, {}]",
                y.window_start, y.window_end
            )));
        }
        if self.matching.substring_min_len == 0 {
            return Err(ConfigError::Invalid(
                "substring_min_len must be at least 1".to_string(),
            ));
        }
        if let Some(target) = self.imputation.target_year
            && !y.census_years.contains(&target)
        {
            return Err(ConfigError::Invalid(format!(
                "imputation target_year {target} is not a census year"
            )));
        }
        Ok(())
    }

    /// The expansion window.
    #[must_use]
    pub const fn window(&self) -> YearWindow {
        YearWindow::new(self.years.window_start, self.years.window_end)
    }

    #[must_use]
    pub const fn year_defaults(&self) -> YearDefaults {
        YearDefaults {
            open_start: self.years.open_start_year,
            open_end: self.years.open_end_year,
        }
    }

    #[must_use]
    pub const fn match_options(&self) -> MatchOptions {
        MatchOptions {
            reference_year: self.years.reference_year,
            year_defaults: self.year_defaults(),
            substring: SubstringPolicy {
                min_len: self.matching.substring_min_len,
                max_gap: self.matching.substring_max_gap,
            },
        }
    }

    #[must_use]
    pub const fn impute_options(&self) -> ImputeOptions {
        ImputeOptions {
            target_year: self.imputation.target_year,
        }
    }
}
