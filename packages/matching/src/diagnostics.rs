//! Review aids for eligible records that stayed unmatched.
//!
//! Nothing here feeds back into the concordance. Near misses are edit
//! distance candidates for a human to confirm or reject.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use rd_backbone_normalize::normalize;
use rd_backbone_normalize::variants::no_spaces;
use rd_backbone_registration_models::{ConcordanceRow, ParishId};

use crate::index::{KeyOrigin, ParishKeyIndex};

/// Candidates kept per unmatched name.
const MAX_CANDIDATES: usize = 3;

const SHORT_NAME_LEN: usize = 4;
const LONG_NAME_LEN: usize = 40;

/// Surface features of a raw unmatched name.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    pub has_with: bool,
    pub has_on: bool,
    pub has_nigh: bool,
    pub has_ampersand: bool,
    pub has_saint: bool,
    pub starts_lower_upper: bool,
    pub has_accents: bool,
    pub has_digit: bool,
    /// Four characters or fewer once spaces are removed.
    pub very_short: bool,
    /// More than forty characters.
    pub very_long: bool,
    /// Welsh `llan` prefix somewhere in the name.
    pub welsh_llan: bool,
}

impl PatternFlags {
    /// Flags for a raw source name.
    #[must_use]
    pub fn of(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        let compact_len = lower.chars().filter(|c| !c.is_whitespace()).count();

        Self {
            has_with: lower.contains(" with ") || lower.starts_with("with "),
            has_on: lower.contains(" on "),
            has_nigh: lower.contains(" nigh "),
            has_ampersand: lower.contains('&'),
            has_saint: lower.contains("saint")
                || lower.contains(" st ")
                || lower.contains(" st. ")
                || lower.starts_with("st ")
                || lower.starts_with("st. "),
            starts_lower_upper: lower.starts_with("lower ") || lower.starts_with("upper "),
            has_accents: !lower.is_ascii(),
            has_digit: lower.chars().any(|c| c.is_ascii_digit()),
            very_short: compact_len <= SHORT_NAME_LEN,
            very_long: lower.chars().count() > LONG_NAME_LEN,
            welsh_llan: lower.contains("llan"),
        }
    }

    /// Names of the raised flags, for tabular output.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.has_with, "has_with"),
            (self.has_on, "has_on"),
            (self.has_nigh, "has_nigh"),
            (self.has_ampersand, "has_ampersand"),
            (self.has_saint, "has_saint"),
            (self.starts_lower_upper, "starts_lower_upper"),
            (self.has_accents, "has_accents"),
            (self.has_digit, "has_digit"),
            (self.very_short, "very_short"),
            (self.very_long, "very_long"),
            (self.welsh_llan, "welsh_llan"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

/// A reference parish within edit distance of an unmatched name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearMiss {
    pub parish_id: ParishId,
    pub parish_name: Option<String>,
    /// The space-free reference key that came closest.
    pub key: String,
    /// Levenshtein distance between the space-free forms.
    pub distance: usize,
}

/// Everything known about one unmatched place name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedDiagnostic {
    pub place_name: String,
    /// Eligible rows carrying the name.
    pub occurrences: usize,
    /// Districts the name appears under, sorted.
    pub districts: Vec<String>,
    pub flags: PatternFlags,
    /// Closest reference parishes, nearest first.
    pub near_misses: Vec<NearMiss>,
}

/// Builds diagnostics for every distinct unmatched eligible name, most
/// frequent first.
#[must_use]
pub fn diagnose_unmatched(
    rows: &[ConcordanceRow],
    index: &ParishKeyIndex,
    max_distance: usize,
) -> Vec<UnmatchedDiagnostic> {
    let mut grouped: BTreeMap<&str, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.eligible && !r.matched()) {
        let entry = grouped.entry(row.record.place_name.as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(row.record.district.as_str());
    }

    log::info!(
        "Diagnosing {} distinct unmatched names (max distance {max_distance})",
        grouped.len()
    );

    let candidates = candidate_keys(index);

    let mut out: Vec<UnmatchedDiagnostic> = grouped
        .into_par_iter()
        .map(|(name, (occurrences, districts))| UnmatchedDiagnostic {
            place_name: name.to_string(),
            occurrences,
            districts: districts.into_iter().map(ToString::to_string).collect(),
            flags: PatternFlags::of(name),
            near_misses: near_misses(name, &candidates, index, max_distance),
        })
        .collect();

    out.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.place_name.cmp(&b.place_name))
    });
    out
}

/// Space-free canonical keys, one list entry per distinct key.
fn candidate_keys(index: &ParishKeyIndex) -> Vec<(String, ParishId)> {
    let mut seen = HashMap::new();
    for entry in index
        .keys()
        .filter(|e| matches!(e.origin, KeyOrigin::Canonical | KeyOrigin::NoSpaces))
    {
        seen.entry(no_spaces(&entry.key)).or_insert(entry.parish_id);
    }
    let mut keys: Vec<_> = seen.into_iter().collect();
    keys.sort();
    keys
}

fn near_misses(
    name: &str,
    candidates: &[(String, ParishId)],
    index: &ParishKeyIndex,
    max_distance: usize,
) -> Vec<NearMiss> {
    let needle = no_spaces(&normalize(name));
    if needle.is_empty() {
        return Vec::new();
    }
    let needle_len = needle.chars().count();

    let mut best: HashMap<ParishId, (usize, &str)> = HashMap::new();
    for (key, parish_id) in candidates {
        if key.chars().count().abs_diff(needle_len) > max_distance {
            continue;
        }
        let distance = strsim::levenshtein(&needle, key);
        if distance == 0 || distance > max_distance {
            continue;
        }
        best.entry(*parish_id)
            .and_modify(|current| {
                if (distance, key.as_str()) < *current {
                    *current = (distance, key.as_str());
                }
            })
            .or_insert((distance, key.as_str()));
    }

    let mut misses: Vec<NearMiss> = best
        .into_iter()
        .map(|(parish_id, (distance, key))| NearMiss {
            parish_id,
            parish_name: index.parish_name(parish_id).map(ToString::to_string),
            key: key.to_string(),
            distance,
        })
        .collect();
    misses.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| a.parish_id.cmp(&b.parish_id))
    });
    misses.truncate(MAX_CANDIDATES);
    misses
}

#[cfg(test)]
mod tests {
    use rd_backbone_registration_models::{
        MatchMethod, MatchResult, MembershipInterval, SourceRecord,
    };

    use super::*;

    fn unmatched_row(place: &str, district: &str) -> ConcordanceRow {
        ConcordanceRow {
            record: SourceRecord {
                place_name: place.to_string(),
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
            eligible: true,
            result: Some(MatchResult::unmatched()),
            matched_parish_name: None,
        }
    }

    #[test]
    fn flags_surface_patterns() {
        let flags = PatternFlags::of("Lower Llanfihangel with Bettws & St. Mary");
        assert!(flags.has_with);
        assert!(flags.has_ampersand);
        assert!(flags.starts_lower_upper);
        assert!(flags.welsh_llan);
        assert!(flags.has_saint);
        assert!(!flags.has_digit);
        assert!(flags.very_long);

        let flags = PatternFlags::of("Hôo");
        assert!(flags.has_accents);
        assert!(flags.very_short);
        assert_eq!(flags.labels(), vec!["has_accents", "very_short"]);
    }

    #[test]
    fn finds_near_misses_within_distance() {
        let index = ParishKeyIndex::from_names([(1, "Ashford"), (2, "Ashwell"), (3, "Dover")]);
        let rows = vec![unmatched_row("Ashfrod", "West Ashford")];

        let diagnostics = diagnose_unmatched(&rows, &index, 2);
        assert_eq!(diagnostics.len(), 1);
        let misses = &diagnostics[0].near_misses;
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].parish_id, 1);
        assert_eq!(misses[0].distance, 2);
        assert_eq!(misses[0].parish_name.as_deref(), Some("Ashford"));
    }

    #[test]
    fn keeps_one_candidate_per_parish() {
        let index = ParishKeyIndex::from_names([(1, "Bessels Leigh")]);
        let rows = vec![unmatched_row("Besselsleig", "Abingdon")];

        let misses = &diagnose_unmatched(&rows, &index, 2)[0].near_misses;
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].key, "besselsleigh");
        assert_eq!(misses[0].distance, 1);
    }

    #[test]
    fn orders_by_frequency_and_groups_districts() {
        let index = ParishKeyIndex::from_names([(1, "Ashford")]);
        let rows = vec![
            unmatched_row("Zeal", "Okehampton"),
            unmatched_row("Yarm", "Stockton"),
            unmatched_row("Yarm", "Northallerton"),
        ];

        let diagnostics = diagnose_unmatched(&rows, &index, 2);
        assert_eq!(diagnostics[0].place_name, "Yarm");
        assert_eq!(diagnostics[0].occurrences, 2);
        assert_eq!(diagnostics[0].districts, vec!["Northallerton", "Stockton"]);
        assert_eq!(diagnostics[1].place_name, "Zeal");
        assert!(diagnostics[1].near_misses.is_empty());
    }

    #[test]
    fn ignores_matched_and_ineligible_rows() {
        let index = ParishKeyIndex::from_names([(1, "Ashford")]);
        let mut matched = unmatched_row("Ashford", "A");
        matched.result = Some(MatchResult::found(1, MatchMethod::Exact));
        let mut ineligible = unmatched_row("Nowhere", "B");
        ineligible.eligible = false;
        ineligible.result = None;

        assert!(diagnose_unmatched(&[matched, ineligible], &index, 2).is_empty());
    }
}
