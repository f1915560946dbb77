//! CSV and JSON output tables.
//!
//! Each table has a flat, serializable row type borrowed from the pipeline
//! results. Optional values are written as empty cells.

use std::collections::BTreeMap;
use std::path::Path;

use rd_backbone_coverage::qa::{IntegritySummary, QaReport, YearSummary};
use rd_backbone_deaths::{UnlinkedDistrict, YearLinkage};
use rd_backbone_impute::DistrictYearSummary;
use rd_backbone_matching::diagnostics::UnmatchedDiagnostic;
use rd_backbone_matching::summary::{DistrictMatchSummary, MatchTotals};
use rd_backbone_registration_models::{ConcordanceRow, DistrictYearCoverage, MatchMethod, ParishId};
use rd_backbone_spatial::CentroidDiagnostic;
use serde::Serialize;

use crate::{TableError, ensure_parent};

/// Serializes `rows` to a CSV file with a header row.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a row fails to
/// serialize.
pub fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, TableError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    log::debug!("Wrote {count} rows to {}", path.display());
    Ok(count)
}

#[derive(Serialize)]
struct ConcordanceCsvRow<'a> {
    parish: &'a str,
    district: &'a str,
    from_year: i32,
    to_year: i32,
    from_year_defaulted: bool,
    to_year_defaulted: bool,
    eligible: bool,
    matched: bool,
    matched_parish_id: Option<ParishId>,
    matched_parish_name: Option<&'a str>,
    match_method: Option<&'a str>,
}

impl<'a> From<&'a ConcordanceRow> for ConcordanceCsvRow<'a> {
    fn from(row: &'a ConcordanceRow) -> Self {
        Self {
            parish: &row.record.place_name,
            district: &row.record.district,
            from_year: row.interval.from_year,
            to_year: row.interval.to_year,
            from_year_defaulted: row.interval.from_defaulted,
            to_year_defaulted: row.interval.to_defaulted,
            eligible: row.eligible,
            matched: row.matched(),
            matched_parish_id: row.matched_parish_id(),
            matched_parish_name: row.matched_parish_name.as_deref(),
            match_method: row.result.as_ref().map(|r| r.match_method.as_ref()),
        }
    }
}

/// Writes concordance rows (the full table or a subset such as the
/// unmatched residue).
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_concordance<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a ConcordanceRow>,
) -> Result<usize, TableError> {
    write_rows(path, rows.into_iter().map(ConcordanceCsvRow::from))
}

#[derive(Serialize)]
struct DistrictMatchCsvRow<'a> {
    district: &'a str,
    total_eligible: usize,
    matched: usize,
    match_rate: f64,
}

/// Writes the per-district match rates.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_district_match_summary(
    path: &Path,
    rows: &[DistrictMatchSummary],
) -> Result<usize, TableError> {
    write_rows(
        path,
        rows.iter().map(|r| DistrictMatchCsvRow {
            district: &r.district,
            total_eligible: r.total_eligible,
            matched: r.matched,
            match_rate: r.match_rate,
        }),
    )
}

#[derive(Serialize)]
struct MatchSummaryJson<'a> {
    total_rows: usize,
    eligible: usize,
    matched: usize,
    unmatched_eligible: usize,
    match_rate: Option<f64>,
    methods: BTreeMap<&'a str, usize>,
}

/// Writes run-level match totals and the method breakdown as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_match_summary(
    path: &Path,
    totals: &MatchTotals,
    methods: &BTreeMap<MatchMethod, usize>,
) -> Result<(), TableError> {
    ensure_parent(path)?;
    let summary = MatchSummaryJson {
        total_rows: totals.total_rows,
        eligible: totals.eligible,
        matched: totals.matched,
        unmatched_eligible: totals.unmatched_eligible(),
        match_rate: totals.match_rate(),
        methods: methods.iter().map(|(m, n)| (m.as_ref(), *n)).collect(),
    };
    std::fs::write(path, serde_json::to_string_pretty(&summary)?)?;
    Ok(())
}

#[derive(Serialize)]
struct CoverageCsvRow<'a> {
    year: i32,
    district: &'a str,
    active_parish_rows: u32,
    matched_parish_rows: u32,
    active_unique_parishes: u32,
    matched_unique_parishes: u32,
    matched_share: f64,
    usable_backbone: bool,
    dominant_parish_id: Option<ParishId>,
    dominant_parish_name: Option<&'a str>,
    dominant_area_km2: Option<f64>,
    total_matched_area_km2: Option<f64>,
    dominant_area_share: Option<f64>,
}

impl<'a> From<&'a DistrictYearCoverage> for CoverageCsvRow<'a> {
    fn from(row: &'a DistrictYearCoverage) -> Self {
        let dominant = row.dominant.as_ref();
        Self {
            year: row.year,
            district: &row.district,
            active_parish_rows: row.active_parish_rows,
            matched_parish_rows: row.matched_parish_rows,
            active_unique_parishes: row.active_unique_parishes,
            matched_unique_parishes: row.matched_unique_parishes,
            matched_share: row.matched_share,
            usable_backbone: row.usable_backbone,
            dominant_parish_id: dominant.map(|d| d.parish_id),
            dominant_parish_name: dominant.and_then(|d| d.parish_name.as_deref()),
            dominant_area_km2: dominant.map(|d| d.area_km2),
            total_matched_area_km2: dominant.map(|d| d.total_area_km2),
            dominant_area_share: dominant.map(|d| d.area_share),
        }
    }
}

/// Writes district-year coverage rows.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_coverage<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a DistrictYearCoverage>,
) -> Result<usize, TableError> {
    write_rows(path, rows.into_iter().map(CoverageCsvRow::from))
}

#[derive(Serialize)]
struct CentroidDiagnosticCsvRow<'a> {
    year: i32,
    constructed_district: &'a str,
    official_district: &'a str,
    matched_via: &'a str,
    constructed_x: f64,
    constructed_y: f64,
    official_x: f64,
    official_y: f64,
    centroid_distance_km: f64,
}

/// Writes constructed-versus-official centroid distances.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_centroid_diagnostic(
    path: &Path,
    rows: &[CentroidDiagnostic],
) -> Result<usize, TableError> {
    write_rows(
        path,
        rows.iter().map(|d| CentroidDiagnosticCsvRow {
            year: d.year,
            constructed_district: &d.constructed_district,
            official_district: &d.official_district,
            matched_via: d.matched_via.as_ref(),
            constructed_x: d.constructed_x,
            constructed_y: d.constructed_y,
            official_x: d.official_x,
            official_y: d.official_y,
            centroid_distance_km: d.centroid_distance_km,
        }),
    )
}

#[derive(Serialize)]
struct SummaryCsvRow<'a> {
    year: i32,
    district: &'a str,
    active_parish_rows: u32,
    matched_parish_rows: u32,
    matched_share: f64,
    usable_backbone: bool,
    dominant_parish_id: Option<ParishId>,
    dominant_parish_name: Option<&'a str>,
    dominant_area_share: Option<f64>,
    n_parishes_matched: Option<usize>,
    centroid_x: Option<f64>,
    centroid_y: Option<f64>,
    centroid_distance_km: Option<f64>,
    location_imputed: bool,
    imputation_failed: bool,
    imputed_from_district: Option<&'a str>,
    imputed_distance_km: Option<f64>,
    imputation_source_point: Option<&'a str>,
    geometry_source: &'a str,
}

/// Writes the final per-census-year district table.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_district_year_summary(
    path: &Path,
    rows: &[DistrictYearSummary],
) -> Result<usize, TableError> {
    write_rows(
        path,
        rows.iter().map(|s| {
            let dominant = s.coverage.dominant.as_ref();
            let imputation = s.imputation.as_ref();
            SummaryCsvRow {
                year: s.coverage.year,
                district: &s.coverage.district,
                active_parish_rows: s.coverage.active_parish_rows,
                matched_parish_rows: s.coverage.matched_parish_rows,
                matched_share: s.coverage.matched_share,
                usable_backbone: s.coverage.usable_backbone,
                dominant_parish_id: dominant.map(|d| d.parish_id),
                dominant_parish_name: dominant.and_then(|d| d.parish_name.as_deref()),
                dominant_area_share: dominant.map(|d| d.area_share),
                n_parishes_matched: s.n_parishes_matched,
                centroid_x: s.centroid_x,
                centroid_y: s.centroid_y,
                centroid_distance_km: s.centroid_distance_km,
                location_imputed: imputation.is_some_and(|i| i.location_imputed),
                imputation_failed: imputation.is_some_and(|i| i.imputation_failed),
                imputed_from_district: imputation.and_then(|i| i.imputed_from_district.as_deref()),
                imputed_distance_km: imputation.and_then(|i| i.imputed_distance_km),
                imputation_source_point: imputation
                    .and_then(|i| i.imputation_source_point.as_ref())
                    .map(AsRef::as_ref),
                geometry_source: s.geometry_source.as_ref(),
            }
        }),
    )
}

#[derive(Serialize)]
struct YearSummaryCsvRow {
    year: i32,
    n_districts: usize,
    total_active_rows: u64,
    share_usable: f64,
    median_matched_share: f64,
    p10_matched_share: f64,
    p90_matched_share: f64,
    d_share_usable: Option<f64>,
    d_n_districts: Option<i64>,
}

impl From<&YearSummary> for YearSummaryCsvRow {
    fn from(y: &YearSummary) -> Self {
        Self {
            year: y.year,
            n_districts: y.n_districts,
            total_active_rows: y.total_active_rows,
            share_usable: y.share_usable,
            median_matched_share: y.median_matched_share,
            p10_matched_share: y.p10_matched_share,
            p90_matched_share: y.p90_matched_share,
            d_share_usable: y.d_share_usable,
            d_n_districts: y.d_n_districts,
        }
    }
}

#[derive(Serialize)]
struct IntegrityCsvRow {
    year_min: Option<i32>,
    year_max: Option<i32>,
    n_rows: usize,
    n_districts: usize,
    duplicate_year_district: usize,
    rows_violating_constraints: usize,
    usable_but_matched0: usize,
}

impl From<&IntegritySummary> for IntegrityCsvRow {
    fn from(s: &IntegritySummary) -> Self {
        Self {
            year_min: s.year_min,
            year_max: s.year_max,
            n_rows: s.n_rows,
            n_districts: s.n_districts,
            duplicate_year_district: s.duplicate_year_district,
            rows_violating_constraints: s.rows_violating_constraints,
            usable_but_matched0: s.usable_but_matched0,
        }
    }
}

#[derive(Serialize)]
struct DistrictCsvRow<'a> {
    district: &'a str,
}

/// Writes every table of a QA report into `dir`.
///
/// # Errors
///
/// Returns an error if any file cannot be written.
pub fn write_qa_report(dir: &Path, report: &QaReport) -> Result<(), TableError> {
    write_rows(
        &dir.join("integrity_summary.csv"),
        [IntegrityCsvRow::from(&report.integrity)],
    )?;
    write_rows(
        &dir.join("year_summary.csv"),
        report.years.iter().map(YearSummaryCsvRow::from),
    )?;
    write_coverage(&dir.join("constraint_violations.csv"), &report.violations)?;
    write_coverage(&dir.join("usable_inconsistent.csv"), &report.inconsistent_usable)?;
    write_rows(
        &dir.join("never_usable_districts.csv"),
        report
            .never_usable
            .iter()
            .map(|district| DistrictCsvRow { district }),
    )?;
    write_coverage(
        &dir.join("lowest_matched_share.csv"),
        &report.lowest_matched_share,
    )?;

    let outliers = &report.outliers;
    for (name, years) in [
        ("biggest_drops_share_usable.csv", &outliers.drops_share_usable),
        ("biggest_increases_share_usable.csv", &outliers.increases_share_usable),
        ("biggest_drops_n_districts.csv", &outliers.drops_n_districts),
        ("biggest_increases_n_districts.csv", &outliers.increases_n_districts),
    ] {
        write_rows(&dir.join(name), years.iter().map(YearSummaryCsvRow::from))?;
    }

    log::info!("Wrote QA report to {}", dir.display());
    Ok(())
}

#[derive(Serialize)]
struct NearMissCsvRow<'a> {
    place_name: &'a str,
    rank: usize,
    parish_id: ParishId,
    parish_name: Option<&'a str>,
    key: &'a str,
    distance: usize,
}

#[derive(Serialize)]
struct UnmatchedFrequencyCsvRow<'a> {
    place_name: &'a str,
    occurrences: usize,
    n_districts: usize,
    districts: String,
    flags: String,
    best_distance: Option<usize>,
}

/// Writes `near_misses.csv` and `unmatched_frequency.csv` into `dir`.
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn write_unmatched_diagnostics(
    dir: &Path,
    diagnostics: &[UnmatchedDiagnostic],
) -> Result<(), TableError> {
    write_rows(
        &dir.join("near_misses.csv"),
        diagnostics.iter().flat_map(|d| {
            d.near_misses
                .iter()
                .enumerate()
                .map(|(i, m)| NearMissCsvRow {
                    place_name: &d.place_name,
                    rank: i + 1,
                    parish_id: m.parish_id,
                    parish_name: m.parish_name.as_deref(),
                    key: &m.key,
                    distance: m.distance,
                })
        }),
    )?;
    write_rows(
        &dir.join("unmatched_frequency.csv"),
        diagnostics.iter().map(|d| UnmatchedFrequencyCsvRow {
            place_name: &d.place_name,
            occurrences: d.occurrences,
            n_districts: d.districts.len(),
            districts: d.districts.join("; "),
            flags: d.flags.labels().join("; "),
            best_distance: d.near_misses.first().map(|m| m.distance),
        }),
    )?;

    log::info!(
        "Wrote diagnostics for {} unmatched names to {}",
        diagnostics.len(),
        dir.display()
    );
    Ok(())
}

/// Writes the per-year death linkage summary.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_linkage_summary(path: &Path, years: &[YearLinkage]) -> Result<usize, TableError> {
    write_rows(path, years)
}

/// Writes death districts that found no coverage row.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_unlinked_districts(
    path: &Path,
    districts: &[UnlinkedDistrict],
) -> Result<usize, TableError> {
    write_rows(path, districts)
}
