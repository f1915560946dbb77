//! Individual pipeline stages.
//!
//! Each stage is a pure function over the previous stages' results plus a
//! writer for its own outputs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rd_backbone_coverage::{ParishAreas, activity_rows, aggregate_with_areas};
use rd_backbone_deaths::{
    UnlinkedDistrict, YearLinkage, decade_rates, link_year, replace_years, year_from_file_name,
};
use rd_backbone_impute::{DistrictYearSummary, impute, summarize};
use rd_backbone_matching::diagnostics::{UnmatchedDiagnostic, diagnose_unmatched};
use rd_backbone_matching::{ParishKeyIndex, build_concordance, summary};
use rd_backbone_registration_models::{
    ConcordanceRow, ConstructedDistrictGeometry, DistrictYearCoverage, OfficialCentroid,
    ReferenceParish, SourceRecord, YearActivityRow,
};
use rd_backbone_spatial::{CentroidDiagnostic, ParishPolygons, area_km2, centroid_diagnostic, construct_years};
use rd_backbone_tables::{TableError, output};

use crate::{PipelineConfig, PipelineError};

pub const CONCORDANCE_CSV: &str = "concordance.csv";
pub const UNMATCHED_CSV: &str = "unmatched.csv";
pub const DISTRICT_MATCH_CSV: &str = "match_summary_by_district.csv";
pub const MATCH_SUMMARY_JSON: &str = "match_summary.json";
pub const COVERAGE_CSV: &str = "coverage.csv";
pub const CONSTRUCTED_DIR: &str = "constructed";
pub const CENTROID_DIAGNOSTIC_CSV: &str = "centroid_diagnostic.csv";
pub const SUMMARY_CSV: &str = "district_year_summary.csv";
pub const QA_DIR: &str = "qa";
pub const DIAGNOSTICS_DIR: &str = "diagnostics";
pub const DEATHS_DIR: &str = "deaths";
pub const LINKAGE_SUMMARY_CSV: &str = "linkage_summary_all_years.csv";
pub const UNLINKED_DISTRICTS_CSV: &str = "unlinked_districts_all_years.csv";

/// Loaded input tables.
pub struct Inputs {
    pub parishes: Vec<ReferenceParish>,
    pub records: Vec<SourceRecord>,
    pub official: Vec<OfficialCentroid>,
}

/// Reads every configured input table.
///
/// A configured official-centroid file that does not exist is logged and
/// treated as empty.
///
/// # Errors
///
/// Returns an error if a required table is missing or malformed, or no
/// reference parish survives loading.
pub fn load_inputs(config: &PipelineConfig) -> Result<Inputs, PipelineError> {
    let paths = &config.paths;

    let parishes = rd_backbone_tables::read_parishes(&paths.parishes)?;
    if parishes.is_empty() {
        return Err(PipelineError::NoReferenceParishes(
            paths.parishes.display().to_string(),
        ));
    }
    let records = rd_backbone_tables::read_source_records(&paths.source)?;

    let official = match &paths.official_centroids {
        Some(path) if path.exists() => rd_backbone_tables::read_official_centroids(path)?,
        Some(path) => {
            log::warn!(
                "Official centroid table {} not found; continuing without it",
                path.display()
            );
            Vec::new()
        }
        None => Vec::new(),
    };

    Ok(Inputs {
        parishes,
        records,
        official,
    })
}

/// Index plus concordance.
pub struct MatchOutput {
    pub index: ParishKeyIndex,
    pub concordance: Vec<ConcordanceRow>,
}

/// Builds the key index and resolves every eligible record.
#[must_use]
pub fn match_stage(config: &PipelineConfig, inputs: &Inputs) -> MatchOutput {
    let index = ParishKeyIndex::build(&inputs.parishes);
    let concordance = build_concordance(inputs.records.clone(), &index, &config.match_options());

    let totals = summary::totals(&concordance);
    log::info!(
        "Matched {}/{} eligible rows ({} total, {} unmatched eligible)",
        totals.matched,
        totals.eligible,
        totals.total_rows,
        totals.unmatched_eligible()
    );
    for (method, count) in summary::method_breakdown(&concordance) {
        log::info!("  {method}: {count}");
    }

    MatchOutput { index, concordance }
}

/// Writes the concordance, the unmatched residue, and match summaries.
///
/// # Errors
///
/// Returns an error if any output cannot be written.
pub fn write_match(out_dir: &Path, output: &MatchOutput) -> Result<(), TableError> {
    let rows = &output.concordance;
    output::write_concordance(&out_dir.join(CONCORDANCE_CSV), rows)?;
    output::write_concordance(
        &out_dir.join(UNMATCHED_CSV),
        summary::unmatched_eligible(rows),
    )?;
    output::write_district_match_summary(
        &out_dir.join(DISTRICT_MATCH_CSV),
        &summary::district_summaries(rows),
    )?;
    output::write_match_summary(
        &out_dir.join(MATCH_SUMMARY_JSON),
        &summary::totals(rows),
        &summary::method_breakdown(rows),
    )
}

/// Near misses for every unmatched eligible name.
#[must_use]
pub fn diagnose_stage(config: &PipelineConfig, matched: &MatchOutput) -> Vec<UnmatchedDiagnostic> {
    diagnose_unmatched(
        &matched.concordance,
        &matched.index,
        config.diagnostics.max_distance,
    )
}

/// Per-year activity and the coverage table built from it.
pub struct CoverageOutput {
    pub activity: Vec<YearActivityRow>,
    pub coverage: Vec<DistrictYearCoverage>,
}

/// Expands the concordance over the window and aggregates it, with
/// dominant parishes taken from the reference polygon areas.
#[must_use]
pub fn coverage_stage(
    config: &PipelineConfig,
    inputs: &Inputs,
    concordance: &[ConcordanceRow],
) -> CoverageOutput {
    let activity = activity_rows(concordance, config.window());
    let areas = ParishAreas::new(
        inputs
            .parishes
            .iter()
            .map(|p| (p.id, p.name.clone(), area_km2(&p.polygon))),
    );
    let coverage = aggregate_with_areas(&activity, Some(&areas));

    CoverageOutput { activity, coverage }
}

/// Constructed layers per census year and their centroid diagnostics.
pub struct ConstructOutput {
    pub layers: BTreeMap<i32, Vec<ConstructedDistrictGeometry>>,
    pub diagnostics: Vec<CentroidDiagnostic>,
}

/// Dissolves every configured census year and compares the centroids with
/// the official set when one was loaded.
#[must_use]
pub fn construct_stage(
    config: &PipelineConfig,
    inputs: &Inputs,
    activity: &[YearActivityRow],
) -> ConstructOutput {
    let polygons = ParishPolygons::new(&inputs.parishes);
    let layers = construct_years(&config.years.census_years, activity, &polygons);

    let diagnostics = if inputs.official.is_empty() {
        Vec::new()
    } else {
        layers
            .iter()
            .flat_map(|(&year, geometries)| centroid_diagnostic(year, geometries, &inputs.official))
            .collect()
    };

    ConstructOutput {
        layers,
        diagnostics,
    }
}

/// Writes one layer per census year and the centroid diagnostic.
///
/// # Errors
///
/// Returns an error if any output cannot be written.
pub fn write_construct(out_dir: &Path, output: &ConstructOutput) -> Result<(), TableError> {
    let dir = out_dir.join(CONSTRUCTED_DIR);
    for (&year, geometries) in &output.layers {
        rd_backbone_tables::write_layer(&dir, year, geometries)?;
    }
    output::write_centroid_diagnostic(
        &out_dir.join(CENTROID_DIAGNOSTIC_CSV),
        &output.diagnostics,
    )?;
    Ok(())
}

/// Imputes locations for unusable census-year rows and merges everything
/// into the final summary.
///
/// Imputations from an earlier summary in the output directory are kept.
///
/// # Errors
///
/// Returns an error if an existing summary cannot be read.
pub fn impute_stage(
    config: &PipelineConfig,
    inputs: &Inputs,
    coverage: &[DistrictYearCoverage],
    constructed: &ConstructOutput,
) -> Result<Vec<DistrictYearSummary>, PipelineError> {
    let prior =
        rd_backbone_tables::read_prior_imputations(&config.paths.output_dir.join(SUMMARY_CSV))?;

    let imputed = impute(
        coverage,
        &constructed.layers,
        &inputs.official,
        &prior,
        &config.impute_options(),
    );

    Ok(summarize(
        coverage,
        &constructed.layers,
        &constructed.diagnostics,
        &imputed,
    ))
}

/// Linkage results for the death files processed in one run.
pub struct DeathsOutput {
    pub summaries: Vec<YearLinkage>,
    pub unlinked: Vec<UnlinkedDistrict>,
}

/// Links every death-register extract in the configured directory to the
/// coverage rows of its year.
///
/// Returns `None` when no directory is configured, it does not exist, or it
/// holds no matching files. Files whose name carries no year are skipped.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or a death file is
/// malformed.
pub fn deaths_stage(
    config: &PipelineConfig,
    coverage: &[DistrictYearCoverage],
) -> Result<Option<DeathsOutput>, PipelineError> {
    let Some(dir) = config.paths.deaths_dir.as_deref() else {
        log::info!("No death-register directory configured; skipping");
        return Ok(None);
    };
    if !dir.is_dir() {
        log::warn!("Death-register directory {} not found; skipping", dir.display());
        return Ok(None);
    }

    let files = rd_backbone_tables::list_death_files(dir, &config.deaths.file_prefix)?;
    if files.is_empty() {
        log::warn!(
            "No {}*.csv files in {}; skipping",
            config.deaths.file_prefix,
            dir.display()
        );
        return Ok(None);
    }

    let mut summaries = Vec::new();
    let mut unlinked = Vec::new();
    for path in files {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let Some(year) = year_from_file_name(stem) else {
            log::warn!("No year in death file name {}; skipping", path.display());
            continue;
        };

        let districts = rd_backbone_tables::read_death_districts(&path)?;
        let report = link_year(year, &districts, coverage);
        log::info!(
            "{year}: linked {}/{} deaths ({:.1}%), {:.1}% of linked on a usable backbone",
            report.summary.linked_deaths,
            report.summary.total_deaths,
            report.summary.link_rate * 100.0,
            report.summary.usable_rate_of_linked * 100.0
        );

        summaries.push(report.summary);
        unlinked.extend(report.unlinked);
    }

    Ok(Some(DeathsOutput {
        summaries,
        unlinked,
    }))
}

/// Merges this run's years into the cumulative linkage tables and writes
/// them. Rows of years processed now replace earlier ones; other years are
/// kept.
///
/// # Errors
///
/// Returns an error if an existing table cannot be read or an output cannot
/// be written.
pub fn write_deaths(out_dir: &Path, output: &DeathsOutput) -> Result<(), TableError> {
    let dir = out_dir.join(DEATHS_DIR);
    let summary_path = dir.join(LINKAGE_SUMMARY_CSV);
    let unlinked_path = dir.join(UNLINKED_DISTRICTS_CSV);
    let processed: BTreeSet<i32> = output.summaries.iter().map(|s| s.year).collect();

    let summaries = replace_years(
        rd_backbone_tables::read_linkage_summary(&summary_path)?,
        output.summaries.clone(),
        &processed,
        |s| s.year,
    );
    let unlinked = replace_years(
        rd_backbone_tables::read_unlinked_districts(&unlinked_path)?,
        output.unlinked.clone(),
        &processed,
        |u| u.year,
    );

    output::write_linkage_summary(&summary_path, &summaries)?;
    output::write_unlinked_districts(&unlinked_path, &unlinked)?;

    for decade in decade_rates(&summaries) {
        match decade.usable_rate {
            Some(rate) => log::info!(
                "{}s: {}/{} linked deaths on a usable backbone ({:.1}%)",
                decade.decade,
                decade.usable_backbone,
                decade.linked_deaths,
                rate * 100.0
            ),
            None => log::info!("{}s: no linked deaths", decade.decade),
        }
    }
    Ok(())
}
