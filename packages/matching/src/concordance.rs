//! Builds the parish → reference-parish concordance for a batch of
//! membership records.
//!
//! Only records whose interval covers the reference year are submitted to
//! the resolver. Each distinct place name is resolved once (in parallel)
//! and the result is shared by every eligible record carrying that name.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use rd_backbone_registration_models::{ConcordanceRow, MatchResult, SourceRecord, YearDefaults};

use crate::index::ParishKeyIndex;
use crate::resolve::{SubstringPolicy, resolve};

/// Settings for a matching run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Year the reference parishes describe.
    pub reference_year: i32,
    /// Sentinels for missing interval ends.
    pub year_defaults: YearDefaults,
    /// Substring fallback bounds.
    pub substring: SubstringPolicy,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            reference_year: 1851,
            year_defaults: YearDefaults::default(),
            substring: SubstringPolicy::default(),
        }
    }
}

/// Resolves every eligible record and returns one concordance row per
/// input record, in input order.
#[must_use]
pub fn build_concordance(
    records: Vec<SourceRecord>,
    index: &ParishKeyIndex,
    options: &MatchOptions,
) -> Vec<ConcordanceRow> {
    let intervals: Vec<_> = records
        .iter()
        .map(|r| r.interval(options.year_defaults))
        .collect();

    let eligible_names: BTreeSet<&str> = records
        .iter()
        .zip(&intervals)
        .filter(|(_, interval)| interval.overlaps(options.reference_year))
        .map(|(record, _)| record.place_name.as_str())
        .collect();

    log::info!(
        "Resolving {} distinct eligible place names from {} records",
        eligible_names.len(),
        records.len()
    );

    let resolved: HashMap<&str, MatchResult> = eligible_names
        .into_par_iter()
        .map(|name| (name, resolve(name, index, &options.substring)))
        .collect();

    let rows: Vec<ConcordanceRow> = records
        .iter()
        .zip(intervals)
        .map(|(record, interval)| {
            let eligible = interval.overlaps(options.reference_year);
            let result = if eligible {
                resolved.get(record.place_name.as_str()).copied()
            } else {
                None
            };
            let matched_parish_name = result
                .and_then(|r| r.matched_parish_id)
                .and_then(|id| index.parish_name(id))
                .map(ToString::to_string);

            ConcordanceRow {
                record: record.clone(),
                interval,
                eligible,
                result,
                matched_parish_name,
            }
        })
        .collect();

    rows
}
