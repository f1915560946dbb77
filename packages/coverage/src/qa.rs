//! Integrity checks and year-level trend summaries for a coverage table.

use std::collections::{BTreeMap, BTreeSet};

use rd_backbone_registration_models::DistrictYearCoverage;

/// Rows kept in the lowest-matched-share report.
pub const LOWEST_SHARE_LIMIT: usize = 200;

/// Years kept in each outlier table.
pub const OUTLIER_LIMIT: usize = 15;

/// Whole-table integrity counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegritySummary {
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub n_rows: usize,
    pub n_districts: usize,
    /// Rows repeating an earlier `(year, district)` key.
    pub duplicate_year_district: usize,
    /// Rows breaking the active/matched/share bounds.
    pub rows_violating_constraints: usize,
    /// Rows flagged usable with no matched rows.
    pub usable_but_matched0: usize,
}

/// Per-year coverage statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    pub year: i32,
    pub n_districts: usize,
    pub total_active_rows: u64,
    /// Fraction of the year's districts with a usable backbone.
    pub share_usable: f64,
    pub median_matched_share: f64,
    pub p10_matched_share: f64,
    pub p90_matched_share: f64,
    /// Change in `share_usable` from the previous year in the table.
    pub d_share_usable: Option<f64>,
    /// Change in `n_districts` from the previous year in the table.
    pub d_n_districts: Option<i64>,
}

/// Years with the largest year-over-year swings. Years without a delta
/// (the first year in the table) are never ranked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearOutliers {
    /// Most negative `d_share_usable` first.
    pub drops_share_usable: Vec<YearSummary>,
    /// Most positive `d_share_usable` first.
    pub increases_share_usable: Vec<YearSummary>,
    /// Most negative `d_n_districts` first.
    pub drops_n_districts: Vec<YearSummary>,
    /// Most positive `d_n_districts` first.
    pub increases_n_districts: Vec<YearSummary>,
}

/// The full QA report.
#[derive(Debug, Clone, PartialEq)]
pub struct QaReport {
    pub integrity: IntegritySummary,
    pub violations: Vec<DistrictYearCoverage>,
    pub inconsistent_usable: Vec<DistrictYearCoverage>,
    pub years: Vec<YearSummary>,
    pub outliers: YearOutliers,
    /// Districts with no usable year, sorted.
    pub never_usable: Vec<String>,
    /// Usable rows with the smallest matched share, lowest first.
    pub lowest_matched_share: Vec<DistrictYearCoverage>,
}

fn violates_bounds(row: &DistrictYearCoverage) -> bool {
    row.active_parish_rows == 0
        || row.matched_parish_rows > row.active_parish_rows
        || !(0.0..=1.0).contains(&row.matched_share)
}

/// Builds the QA report for a coverage table.
#[must_use]
pub fn report(rows: &[DistrictYearCoverage]) -> QaReport {
    let mut seen = BTreeSet::new();
    let duplicate_year_district = rows
        .iter()
        .filter(|r| !seen.insert((r.year, r.district.as_str())))
        .count();

    let violations: Vec<_> = rows.iter().filter(|r| violates_bounds(r)).cloned().collect();
    let inconsistent_usable: Vec<_> = rows
        .iter()
        .filter(|r| r.usable_backbone && r.matched_parish_rows == 0)
        .cloned()
        .collect();

    let integrity = IntegritySummary {
        year_min: rows.iter().map(|r| r.year).min(),
        year_max: rows.iter().map(|r| r.year).max(),
        n_rows: rows.len(),
        n_districts: rows
            .iter()
            .map(|r| r.district.as_str())
            .collect::<BTreeSet<_>>()
            .len(),
        duplicate_year_district,
        rows_violating_constraints: violations.len(),
        usable_but_matched0: inconsistent_usable.len(),
    };

    if integrity.rows_violating_constraints > 0 || integrity.duplicate_year_district > 0 {
        log::warn!(
            "Coverage QA: {} rows violate bounds, {} duplicate (year, district) keys",
            integrity.rows_violating_constraints,
            integrity.duplicate_year_district
        );
    }

    let years = year_summaries(rows);
    let outliers = year_outliers(&years, OUTLIER_LIMIT);

    QaReport {
        integrity,
        violations,
        inconsistent_usable,
        years,
        outliers,
        never_usable: never_usable(rows),
        lowest_matched_share: lowest_matched_share(rows, LOWEST_SHARE_LIMIT),
    }
}

/// One summary per year, ascending, with deltas against the previous year.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn year_summaries(rows: &[DistrictYearCoverage]) -> Vec<YearSummary> {
    let mut by_year: BTreeMap<i32, Vec<&DistrictYearCoverage>> = BTreeMap::new();
    for row in rows {
        by_year.entry(row.year).or_default().push(row);
    }

    let mut out: Vec<YearSummary> = Vec::with_capacity(by_year.len());
    for (year, group) in by_year {
        let n_districts = group
            .iter()
            .map(|r| r.district.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        let usable = group.iter().filter(|r| r.usable_backbone).count();
        let mut shares: Vec<f64> = group.iter().map(|r| r.matched_share).collect();
        shares.sort_by(f64::total_cmp);

        let share_usable = usable as f64 / group.len() as f64;
        let previous = out.last();
        let d_share_usable = previous.map(|p| share_usable - p.share_usable);
        let d_n_districts = previous.map(|p| n_districts as i64 - p.n_districts as i64);

        out.push(YearSummary {
            year,
            n_districts,
            total_active_rows: group.iter().map(|r| u64::from(r.active_parish_rows)).sum(),
            share_usable,
            median_matched_share: quantile(&shares, 0.5),
            p10_matched_share: quantile(&shares, 0.1),
            p90_matched_share: quantile(&shares, 0.9),
            d_share_usable,
            d_n_districts,
        });
    }
    out
}

/// Ranks the year summaries by their deltas, at most `limit` per table.
///
/// Ties keep ascending year order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn year_outliers(years: &[YearSummary], limit: usize) -> YearOutliers {
    let share = |y: &YearSummary| y.d_share_usable;
    let districts = |y: &YearSummary| y.d_n_districts.map(|d| d as f64);

    YearOutliers {
        drops_share_usable: ranked(years, share, false, limit),
        increases_share_usable: ranked(years, share, true, limit),
        drops_n_districts: ranked(years, districts, false, limit),
        increases_n_districts: ranked(years, districts, true, limit),
    }
}

fn ranked(
    years: &[YearSummary],
    delta: impl Fn(&YearSummary) -> Option<f64>,
    largest_first: bool,
    limit: usize,
) -> Vec<YearSummary> {
    let mut with_delta: Vec<(f64, &YearSummary)> =
        years.iter().filter_map(|y| delta(y).map(|d| (d, y))).collect();
    with_delta.sort_by(|(a, _), (b, _)| {
        if largest_first {
            b.total_cmp(a)
        } else {
            a.total_cmp(b)
        }
    });
    with_delta
        .into_iter()
        .take(limit)
        .map(|(_, y)| y.clone())
        .collect()
}

/// Linear-interpolated quantile of an ascending slice; `NaN` when empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - pos.floor();
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Districts that never have a usable backbone in any year.
#[must_use]
pub fn never_usable(rows: &[DistrictYearCoverage]) -> Vec<String> {
    let usable = rows.iter().fold(BTreeMap::<&str, bool>::new(), |mut acc, r| {
        *acc.entry(r.district.as_str()).or_default() |= r.usable_backbone;
        acc
    });
    usable
        .into_iter()
        .filter(|(_, ever)| !ever)
        .map(|(district, _)| district.to_string())
        .collect()
}

/// Usable rows ordered by ascending matched share, at most `limit`.
#[must_use]
pub fn lowest_matched_share(rows: &[DistrictYearCoverage], limit: usize) -> Vec<DistrictYearCoverage> {
    let mut usable: Vec<&DistrictYearCoverage> =
        rows.iter().filter(|r| r.usable_backbone).collect();
    usable.sort_by(|a, b| {
        a.matched_share
            .total_cmp(&b.matched_share)
            .then_with(|| a.year.cmp(&b.year))
            .then_with(|| a.district.cmp(&b.district))
    });
    usable.into_iter().take(limit).cloned().collect()
}
