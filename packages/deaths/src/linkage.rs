//! Year-by-year join of death districts to district coverage.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rd_backbone_coverage::qa::quantile;
use rd_backbone_normalize::death_district_key;
use rd_backbone_registration_models::DistrictYearCoverage;
use serde::{Deserialize, Serialize};

/// Link statistics for one registration year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearLinkage {
    pub year: i32,
    pub total_deaths: usize,
    /// Deaths whose district has a coverage row that year.
    pub linked_deaths: usize,
    pub unlinked_deaths: usize,
    /// `linked / total`, zero without deaths.
    pub link_rate: f64,
    /// Linked deaths in districts with a usable backbone.
    #[serde(rename = "usable_1851_backbone")]
    pub usable_backbone: usize,
    #[serde(rename = "non_usable_1851_backbone")]
    pub non_usable_backbone: usize,
    /// `usable / linked`, zero without linked deaths.
    pub usable_rate_of_linked: f64,
    /// Matched-share statistics over linked deaths (one value per death).
    pub mean_matched_share: Option<f64>,
    pub median_matched_share: Option<f64>,
    pub p10_matched_share: Option<f64>,
    pub p90_matched_share: Option<f64>,
}

/// A death district with no coverage row in its year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkedDistrict {
    pub year: i32,
    /// The join key, not the raw register spelling.
    pub district: String,
    pub death_count: usize,
}

/// Everything [`link_year`] reports for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct YearLinkageReport {
    pub summary: YearLinkage,
    /// Most deaths first, ties by key.
    pub unlinked: Vec<UnlinkedDistrict>,
}

/// Links the raw district names of one year's deaths to that year's
/// coverage rows.
///
/// When two coverage districts share a key the first row wins. Deaths with
/// a blank district count as unlinked but are not listed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn link_year(
    year: i32,
    districts: &[String],
    coverage: &[DistrictYearCoverage],
) -> YearLinkageReport {
    let mut by_key: HashMap<String, &DistrictYearCoverage> = HashMap::new();
    for row in coverage.iter().filter(|r| r.year == year) {
        if let Some(key) = death_district_key(&row.district) {
            by_key.entry(key).or_insert(row);
        }
    }

    let mut shares = Vec::new();
    let mut usable = 0usize;
    let mut unlinked_total = 0usize;
    let mut unlinked: BTreeMap<String, usize> = BTreeMap::new();

    for raw in districts {
        let key = death_district_key(raw);
        let row = key.as_deref().and_then(|k| by_key.get(k)).copied();
        match row {
            Some(row) => {
                shares.push(row.matched_share);
                usable += usize::from(row.usable_backbone);
            }
            None => {
                unlinked_total += 1;
                if let Some(key) = key {
                    *unlinked.entry(key).or_default() += 1;
                }
            }
        }
    }

    let total = districts.len();
    let linked = shares.len();
    shares.sort_by(f64::total_cmp);
    let stat = |f: fn(&[f64]) -> f64| (!shares.is_empty()).then(|| f(&shares));

    let summary = YearLinkage {
        year,
        total_deaths: total,
        linked_deaths: linked,
        unlinked_deaths: unlinked_total,
        link_rate: ratio(linked, total),
        usable_backbone: usable,
        non_usable_backbone: linked - usable,
        usable_rate_of_linked: ratio(usable, linked),
        mean_matched_share: stat(|s| s.iter().sum::<f64>() / s.len() as f64),
        median_matched_share: stat(|s| quantile(s, 0.5)),
        p10_matched_share: stat(|s| quantile(s, 0.1)),
        p90_matched_share: stat(|s| quantile(s, 0.9)),
    };

    let mut unlinked: Vec<UnlinkedDistrict> = unlinked
        .into_iter()
        .map(|(district, death_count)| UnlinkedDistrict {
            year,
            district,
            death_count,
        })
        .collect();
    unlinked.sort_by(|a, b| b.death_count.cmp(&a.death_count));

    log::debug!(
        "{year}: {linked}/{total} deaths linked, {} unlinked districts",
        unlinked.len()
    );

    YearLinkageReport { summary, unlinked }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Replaces the rows of every year in `processed` with `fresh`, keeping
/// rows of other years from `existing`. The result is stably sorted by
/// year.
#[must_use]
pub fn replace_years<T>(
    existing: Vec<T>,
    fresh: Vec<T>,
    processed: &BTreeSet<i32>,
    year: impl Fn(&T) -> i32,
) -> Vec<T> {
    let mut rows: Vec<T> = existing
        .into_iter()
        .filter(|row| !processed.contains(&year(row)))
        .chain(fresh)
        .collect();
    rows.sort_by_key(&year);
    rows
}

/// Usable share of linked deaths for one decade.
#[derive(Debug, Clone, PartialEq)]
pub struct DecadeRate {
    pub decade: i32,
    pub total_deaths: usize,
    pub linked_deaths: usize,
    pub usable_backbone: usize,
    /// `None` when no death of the decade linked.
    pub usable_rate: Option<f64>,
}

/// Rolls yearly linkage up into decades, ascending.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decade_rates(years: &[YearLinkage]) -> Vec<DecadeRate> {
    let totals = years.iter().fold(
        BTreeMap::<i32, (usize, usize, usize)>::new(),
        |mut acc, y| {
            let entry = acc.entry(y.year.div_euclid(10) * 10).or_default();
            entry.0 += y.total_deaths;
            entry.1 += y.linked_deaths;
            entry.2 += y.usable_backbone;
            acc
        },
    );

    totals
        .into_iter()
        .map(|(decade, (total, linked, usable))| DecadeRate {
            decade,
            total_deaths: total,
            linked_deaths: linked,
            usable_backbone: usable,
            usable_rate: (linked > 0).then(|| usable as f64 / linked as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(year: i32, district: &str, active: u32, matched: u32) -> DistrictYearCoverage {
        DistrictYearCoverage::from_counts(year, district.to_string(), active, matched, active, matched)
            .unwrap()
    }

    fn deaths(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn table() -> Vec<DistrictYearCoverage> {
        vec![
            coverage(1851, "Ashton-under-Lyne", 4, 3),
            coverage(1851, "Bala", 2, 0),
            coverage(1851, "Dover", 4, 4),
            coverage(1861, "Atlantis", 1, 1),
        ]
    }

    #[test]
    fn reports_link_and_usable_rates() {
        let report = link_year(
            1851,
            &deaths(&[
                "Ashton under Lyne (1837-1937)",
                "ASHTON-UNDER-LYNE",
                "Bala",
                "Dover",
                "Atlantis",
                "",
            ]),
            &table(),
        );
        let s = &report.summary;

        assert_eq!(s.total_deaths, 6);
        assert_eq!(s.linked_deaths, 4);
        assert_eq!(s.unlinked_deaths, 2);
        assert!((s.link_rate - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(s.usable_backbone, 3);
        assert_eq!(s.non_usable_backbone, 1);
        assert!((s.usable_rate_of_linked - 0.75).abs() < 1e-12);

        // Shares per linked death: 0.0, 0.75, 0.75, 1.0
        assert!((s.mean_matched_share.unwrap() - 0.625).abs() < 1e-12);
        assert!((s.median_matched_share.unwrap() - 0.75).abs() < 1e-12);
        assert!((s.p10_matched_share.unwrap() - 0.225).abs() < 1e-12);
        assert!((s.p90_matched_share.unwrap() - 0.925).abs() < 1e-12);
    }

    #[test]
    fn lists_unlinked_districts_by_frequency() {
        let report = link_year(
            1851,
            &deaths(&["Atlantis", "Lyonesse", "Atlantis", "  ", "Dover", "Lyonesse", "Atlantis"]),
            &table(),
        );

        assert_eq!(report.summary.unlinked_deaths, 6);
        assert_eq!(
            report.unlinked,
            vec![
                UnlinkedDistrict {
                    year: 1851,
                    district: "atlantis".to_string(),
                    death_count: 3,
                },
                UnlinkedDistrict {
                    year: 1851,
                    district: "lyonesse".to_string(),
                    death_count: 2,
                },
            ]
        );
    }

    #[test]
    fn joins_only_the_same_year() {
        // Atlantis has coverage in 1861 only.
        let report = link_year(1851, &deaths(&["Atlantis"]), &table());
        assert_eq!(report.summary.linked_deaths, 0);
        assert_eq!(report.summary.usable_rate_of_linked, 0.0);
        assert_eq!(report.summary.mean_matched_share, None);

        let report = link_year(1861, &deaths(&["Atlantis"]), &table());
        assert_eq!(report.summary.linked_deaths, 1);
        assert!(report.unlinked.is_empty());
    }

    #[test]
    fn empty_year_has_zero_rates() {
        let report = link_year(1851, &[], &table());
        assert_eq!(report.summary.total_deaths, 0);
        assert_eq!(report.summary.link_rate, 0.0);
        assert_eq!(report.summary.p90_matched_share, None);
    }

    #[test]
    fn replaces_reprocessed_years_only() {
        let existing = vec![(1841, "old"), (1851, "stale"), (1851, "stale")];
        let fresh = vec![(1851, "new"), (1846, "new")];
        let processed = BTreeSet::from([1846, 1851]);

        let merged = replace_years(existing, fresh, &processed, |row| row.0);
        assert_eq!(merged, vec![(1841, "old"), (1846, "new"), (1851, "new")]);
    }

    #[test]
    fn rolls_years_into_decades() {
        let year = |year, total, linked, usable| YearLinkage {
            year,
            total_deaths: total,
            linked_deaths: linked,
            unlinked_deaths: total - linked,
            link_rate: 0.0,
            usable_backbone: usable,
            non_usable_backbone: linked - usable,
            usable_rate_of_linked: 0.0,
            mean_matched_share: None,
            median_matched_share: None,
            p10_matched_share: None,
            p90_matched_share: None,
        };
        let decades = decade_rates(&[year(1851, 10, 8, 6), year(1859, 10, 2, 2), year(1861, 5, 0, 0)]);

        assert_eq!(decades.len(), 2);
        assert_eq!(decades[0].decade, 1850);
        assert_eq!(decades[0].linked_deaths, 10);
        assert_eq!(decades[0].usable_rate, Some(0.8));
        assert_eq!(decades[1].decade, 1860);
        assert_eq!(decades[1].usable_rate, None);
    }
}
