//! Alternative keys for an already-normalized name.
//!
//! Every generator takes a key produced by [`crate::normalize`] and returns
//! candidates without touching the input. Substitutions are applied one at
//! a time (never combined) so each generator yields at most a handful of
//! keys.

use std::sync::LazyLock;

use regex::Regex;

/// `" with X"` to the end of the key.
static WITH_CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+with\s+.*$").expect("valid regex"));

/// `" on X"` / `" on the X"` to the end of the key.
static ON_CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+on\s+(?:the\s+)?.*$").expect("valid regex"));

/// `" nigh X"` to the end of the key.
static NIGH_CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+nigh\s+.*$").expect("valid regex"));

/// Gazetteer subdivision suffixes: `upper division`, `lower division`,
/// `citra and ultra divisions`.
static DIVISION_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+(?:(?:upper|lower|citra|ultra)\s+(?:and\s+)?)+divisions?\s*$")
        .expect("valid regex")
});

/// Welsh orthographic drift, each pair tried in both directions.
const WELSH_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("v", "f"),
    ("f", "v"),
    ("i", "y"),
    ("y", "i"),
    ("ch", "gh"),
    ("gh", "ch"),
];

/// Welsh spelling variants (`llanvair` ↔ `llanfair`, `dihewid` ↔
/// `dihewyd`, `clarach` ↔ `claragh`).
///
/// Each substitution replaces every occurrence of its pattern and is
/// applied independently of the others.
#[must_use]
pub fn welsh_variants(key: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (from, to) in WELSH_SUBSTITUTIONS {
        if key.contains(from) {
            push_distinct(&mut out, key, key.replace(from, to));
        }
    }
    out
}

/// Vowel interchange variants (`courtenay` ↔ `courteney`, `tedworth` ↔
/// `tidworth`).
///
/// `e → a` is only tried when the key has no `a`, so a key is never
/// rewritten back into something `a → e` already produced.
#[must_use]
pub fn vowel_variants(key: &str) -> Vec<String> {
    let mut out = Vec::new();
    let has_a = key.contains('a');
    let has_e = key.contains('e');

    if has_a {
        push_distinct(&mut out, key, key.replace('a', "e"));
    }
    if has_e && !has_a {
        push_distinct(&mut out, key, key.replace('e', "a"));
    }
    if has_e {
        push_distinct(&mut out, key, key.replace('e', "i"));
    }
    if key.contains('i') {
        push_distinct(&mut out, key, key.replace('i', "e"));
    }
    out
}

/// Removes every space (`bessels leigh` → `besselsleigh`).
#[must_use]
pub fn no_spaces(key: &str) -> String {
    key.replace(' ', "")
}

/// Drops a trailing `with X` clause.
#[must_use]
pub fn strip_with_clause(key: &str) -> Option<String> {
    strip_clause(key, " with ", &WITH_CLAUSE_RE)
}

/// Drops a trailing `on X` / `on the X` clause.
#[must_use]
pub fn strip_on_clause(key: &str) -> Option<String> {
    strip_clause(key, " on ", &ON_CLAUSE_RE)
}

/// Drops a trailing `nigh X` clause.
#[must_use]
pub fn strip_nigh_clause(key: &str) -> Option<String> {
    strip_clause(key, " nigh ", &NIGH_CLAUSE_RE)
}

fn strip_clause(key: &str, marker: &str, re: &Regex) -> Option<String> {
    if !key.contains(marker) {
        return None;
    }
    let stripped = re.replace(key, "");
    let stripped = stripped.trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Drops a leading `lower ` token.
#[must_use]
pub fn strip_lower_prefix(key: &str) -> Option<String> {
    strip_prefix_token(key, "lower ")
}

/// Drops a leading `upper ` token.
#[must_use]
pub fn strip_upper_prefix(key: &str) -> Option<String> {
    strip_prefix_token(key, "upper ")
}

fn strip_prefix_token(key: &str, prefix: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Drops gazetteer subdivision suffixes such as `upper division` or
/// `citra and ultra divisions`. Only applied to reference names.
#[must_use]
pub fn strip_division_suffix(key: &str) -> String {
    DIVISION_SUFFIX_RE.replace(key, "").trim().to_string()
}

fn push_distinct(out: &mut Vec<String>, base: &str, candidate: String) {
    if candidate != base && !out.contains(&candidate) {
        out.push(candidate);
    }
}
