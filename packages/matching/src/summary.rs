//! Match statistics computed as folds over a finished concordance.

use std::collections::{BTreeMap, HashMap};

use rd_backbone_registration_models::{ConcordanceRow, MatchMethod};

/// Run-level match counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchTotals {
    /// All membership rows.
    pub total_rows: usize,
    /// Rows whose interval covers the reference year.
    pub eligible: usize,
    /// Eligible rows with a matched parish.
    pub matched: usize,
}

impl MatchTotals {
    /// Eligible rows with no match.
    #[must_use]
    pub const fn unmatched_eligible(&self) -> usize {
        self.eligible - self.matched
    }

    /// `matched / eligible`, `None` when nothing was eligible.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn match_rate(&self) -> Option<f64> {
        (self.eligible > 0).then(|| self.matched as f64 / self.eligible as f64)
    }
}

/// Totals over the whole concordance.
#[must_use]
pub fn totals(rows: &[ConcordanceRow]) -> MatchTotals {
    rows.iter().fold(MatchTotals::default(), |acc, row| MatchTotals {
        total_rows: acc.total_rows + 1,
        eligible: acc.eligible + usize::from(row.eligible),
        matched: acc.matched + usize::from(row.eligible && row.matched()),
    })
}

/// Matched eligible rows per method.
#[must_use]
pub fn method_breakdown(rows: &[ConcordanceRow]) -> BTreeMap<MatchMethod, usize> {
    rows.iter()
        .filter(|row| row.eligible && row.matched())
        .filter_map(ConcordanceRow::match_method)
        .fold(BTreeMap::new(), |mut acc, method| {
            *acc.entry(method).or_insert(0) += 1;
            acc
        })
}

/// Match rate of one district's eligible rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictMatchSummary {
    /// Registration district.
    pub district: String,
    /// Eligible membership rows.
    pub total_eligible: usize,
    /// Of which matched.
    pub matched: usize,
    /// `matched / total_eligible`.
    pub match_rate: f64,
}

/// Per-district match rates, worst first (ties by district name).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn district_summaries(rows: &[ConcordanceRow]) -> Vec<DistrictMatchSummary> {
    let counts = rows.iter().filter(|row| row.eligible).fold(
        HashMap::<&str, (usize, usize)>::new(),
        |mut acc, row| {
            let entry = acc.entry(row.record.district.as_str()).or_default();
            entry.0 += 1;
            entry.1 += usize::from(row.matched());
            acc
        },
    );

    let mut out: Vec<DistrictMatchSummary> = counts
        .into_iter()
        .map(|(district, (total, matched))| DistrictMatchSummary {
            district: district.to_string(),
            total_eligible: total,
            matched,
            match_rate: matched as f64 / total as f64,
        })
        .collect();

    out.sort_by(|a, b| {
        a.match_rate
            .total_cmp(&b.match_rate)
            .then_with(|| a.district.cmp(&b.district))
    });
    out
}

/// Eligible rows that found no parish, for manual follow-up.
#[must_use]
pub fn unmatched_eligible(rows: &[ConcordanceRow]) -> Vec<&ConcordanceRow> {
    rows.iter()
        .filter(|row| row.eligible && !row.matched())
        .collect()
}

#[cfg(test)]
mod tests {
    use rd_backbone_registration_models::{MatchResult, MembershipInterval, SourceRecord};

    use super::*;

    fn row(district: &str, eligible: bool, result: Option<MatchResult>) -> ConcordanceRow {
        ConcordanceRow {
            record: SourceRecord {
                place_name: "x".to_string(),
                district: district.to_string(),
                from_year: Some(1840),
                to_year: Some(1860),
            },
            interval: MembershipInterval {
                from_year: 1840,
                to_year: 1860,
                from_defaulted: false,
                to_defaulted: false,
            },
            eligible,
            result,
            matched_parish_name: None,
        }
    }

    fn sample() -> Vec<ConcordanceRow> {
        vec![
            row("Dover", true, Some(MatchResult::found(1, MatchMethod::Exact))),
            row("Dover", true, Some(MatchResult::unmatched())),
            row("Bala", true, Some(MatchResult::found(2, MatchMethod::WelshVariant))),
            row("Bala", true, Some(MatchResult::found(3, MatchMethod::Exact))),
            row("Bala", false, None),
        ]
    }

    #[test]
    fn totals_fold_over_rows() {
        let totals = totals(&sample());
        assert_eq!(totals.total_rows, 5);
        assert_eq!(totals.eligible, 4);
        assert_eq!(totals.matched, 3);
        assert_eq!(totals.unmatched_eligible(), 1);
        assert!((totals.match_rate().unwrap() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_totals_have_no_rate() {
        assert_eq!(totals(&[]).match_rate(), None);
    }

    #[test]
    fn breaks_down_by_method() {
        let breakdown = method_breakdown(&sample());
        assert_eq!(breakdown.get(&MatchMethod::Exact), Some(&2));
        assert_eq!(breakdown.get(&MatchMethod::WelshVariant), Some(&1));
        assert_eq!(breakdown.get(&MatchMethod::Unmatched), None);
    }

    #[test]
    fn district_summaries_sort_worst_first() {
        let summaries = district_summaries(&sample());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].district, "Dover");
        assert_eq!(summaries[0].total_eligible, 2);
        assert!((summaries[0].match_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(summaries[1].district, "Bala");
        assert_eq!(summaries[1].total_eligible, 2);
    }

    #[test]
    fn lists_unmatched_eligible_rows() {
        let rows = sample();
        let unmatched = unmatched_eligible(&rows);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].record.district, "Dover");
    }
}
