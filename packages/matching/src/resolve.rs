//! Staged match cascade for a single place name.
//!
//! 1. **Declared variants**: look up the index with an ordered list of keys
//!    derived from the name ([`candidate_keys`]); the first hit wins.
//! 2. **Substring**: if nothing hit, look for a reference key that contains
//!    the space-free name, subject to a minimum name length and a maximum
//!    length gap.
//! 3. **Unmatched**.
//!
//! No edit-distance matching happens here. Near misses are reported by
//! [`crate::diagnostics`] for manual review only.

use rd_backbone_normalize::normalize;
use rd_backbone_normalize::variants::{
    no_spaces, strip_lower_prefix, strip_nigh_clause, strip_on_clause, strip_upper_prefix,
    strip_with_clause, vowel_variants, welsh_variants,
};
use rd_backbone_registration_models::{MatchMethod, MatchResult};

use crate::index::ParishKeyIndex;

/// Bounds on the substring fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstringPolicy {
    /// Space-free names shorter than this never reach the scan.
    pub min_len: usize,
    /// Largest allowed `reference key length - name length`, in characters.
    pub max_gap: usize,
}

impl Default for SubstringPolicy {
    fn default() -> Self {
        Self {
            min_len: 5,
            max_gap: 15,
        }
    }
}

/// A key to look up and the method credited if it hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    /// Normalized candidate key.
    pub key: String,
    /// Method recorded on a hit.
    pub method: MatchMethod,
}

#[derive(Default)]
struct Candidates(Vec<CandidateKey>);

impl Candidates {
    fn push(&mut self, key: String, method: MatchMethod) {
        if !key.is_empty() {
            self.0.push(CandidateKey { key, method });
        }
    }

    fn extend(&mut self, keys: Vec<String>, method: MatchMethod) {
        for key in keys {
            self.push(key, method);
        }
    }
}

/// Ordered candidate keys for the declared-variants stage.
///
/// Order: base key, Welsh variants, vowel variants, space-free form (then
/// its Welsh and vowel variants), `with`-stripped (then space-free),
/// `on`-stripped, `nigh`-stripped, and finally `lower`- or `upper`-stripped
/// (then space-free, then Welsh variants of the space-free form).
///
/// Sub-variants are credited to their group: a Welsh variant of the
/// space-free form counts as [`MatchMethod::NoSpaces`], a space-free
/// `with`-stripped key as [`MatchMethod::WithoutWith`].
#[must_use]
pub fn candidate_keys(place_name: &str) -> Vec<CandidateKey> {
    let base = normalize(place_name);
    let mut candidates = Candidates::default();

    candidates.push(base.clone(), MatchMethod::Exact);
    candidates.extend(welsh_variants(&base), MatchMethod::WelshVariant);
    candidates.extend(vowel_variants(&base), MatchMethod::VowelVariant);

    let compact = no_spaces(&base);
    if compact != base {
        let welsh = welsh_variants(&compact);
        let vowel = vowel_variants(&compact);
        candidates.push(compact, MatchMethod::NoSpaces);
        candidates.extend(welsh, MatchMethod::NoSpaces);
        candidates.extend(vowel, MatchMethod::NoSpaces);
    }

    if let Some(stripped) = strip_with_clause(&base) {
        let compact = no_spaces(&stripped);
        candidates.push(stripped, MatchMethod::WithoutWith);
        candidates.push(compact, MatchMethod::WithoutWith);
    }
    if let Some(stripped) = strip_on_clause(&base) {
        candidates.push(stripped, MatchMethod::WithoutOn);
    }
    if let Some(stripped) = strip_nigh_clause(&base) {
        candidates.push(stripped, MatchMethod::WithoutNigh);
    }

    let affix = strip_lower_prefix(&base)
        .map(|rest| (rest, MatchMethod::WithoutLower))
        .or_else(|| strip_upper_prefix(&base).map(|rest| (rest, MatchMethod::WithoutUpper)));
    if let Some((rest, method)) = affix {
        let compact = no_spaces(&rest);
        let welsh = welsh_variants(&compact);
        candidates.push(rest, method);
        candidates.push(compact, method);
        candidates.extend(welsh, method);
    }

    candidates.0
}

/// Resolves a place name against the index.
///
/// Pure: the same name and index always give the same result.
///
/// An unmodified name that lands on a variant key of a reference parish is
/// credited with that variant's method (`"Llanvair"` hitting the Welsh
/// variant of `"Llanfair"` is a [`MatchMethod::WelshVariant`] match).
///
/// The substring stage is a linear scan over every reference key, so the
/// worst case for a batch is `O(names × reference keys)`. It is only
/// reached by names the declared variants could not place.
#[must_use]
pub fn resolve(place_name: &str, index: &ParishKeyIndex, policy: &SubstringPolicy) -> MatchResult {
    for candidate in candidate_keys(place_name) {
        if let Some(entry) = index.entry(&candidate.key) {
            let method = if candidate.method == MatchMethod::Exact {
                entry.origin.method()
            } else {
                candidate.method
            };
            return MatchResult::found(entry.parish_id, method);
        }
    }

    substring_match(place_name, index, policy).unwrap_or_else(MatchResult::unmatched)
}

fn substring_match(
    place_name: &str,
    index: &ParishKeyIndex,
    policy: &SubstringPolicy,
) -> Option<MatchResult> {
    let needle = no_spaces(&normalize(place_name));
    let needle_len = needle.chars().count();
    if needle_len < policy.min_len {
        return None;
    }

    index
        .keys()
        .find(|entry| {
            entry.char_len >= needle_len
                && entry.char_len - needle_len <= policy.max_gap
                && entry.key != needle
                && entry.key.contains(&needle)
        })
        .map(|entry| MatchResult::found(entry.parish_id, MatchMethod::Substring))
}
