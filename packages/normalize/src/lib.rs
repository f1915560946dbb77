#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place-name normalization for historical parish and district names.
//!
//! Provides a deterministic canonicalization pipeline applied symmetrically
//! to the 1851 reference gazetteer and to scraped membership rows, so that
//! `"St. Mary & St. John (part)"` and `"Saint Mary and Saint John"` produce
//! the same key. The [`variants`] module derives alternative keys for
//! orthographic drift (Welsh spellings, vowel interchange, run-together
//! words, qualifying clauses) without ever altering the canonical key.

pub mod variants;

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;

/// `[...]` annotation spans.
static SQUARE_BRACKETS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

/// `(...)` annotation spans.
static PARENTHESES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));

/// `st`, `st.` and `st..` as whole words.
static SAINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bst\.*\b").expect("valid regex"));

/// Latin `cum` ("with") as a whole word.
static CUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bcum\b").expect("valid regex"));

/// Everything that is not a word character or whitespace.
static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Same as [`PUNCTUATION_RE`] but lets commas through.
static PUNCTUATION_KEEP_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s,]").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A trailing parenthetical such as `"Dover (Kent)"`.
static TRAILING_PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));

/// A dated span such as `"(1837-1934)"`, with its leading whitespace.
static DATED_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d{4}[^)]*\)").expect("valid regex"));

static NON_ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

/// Normalizes a place name into its comparison key.
///
/// The pipeline, in order:
/// 1. Lowercase and trim
/// 2. Strip combining diacritics (`ô` → `o`, `ŵ` → `w`)
/// 3. Remove `[...]` and `(...)` annotations
/// 4. Canonicalize `St` / `St.` / `Saint` to `saint`
/// 5. `&` → `and`, `cum` → `with`
/// 6. Hyphens and slashes → spaces
/// 7. Strip remaining punctuation
/// 8. Collapse whitespace and trim
///
/// Total: any input, including an empty one, yields a (possibly empty) key.
/// Applying it twice yields the same key as applying it once.
#[must_use]
pub fn normalize(raw: &str) -> String {
    normalize_with(raw, false)
}

/// Like [`normalize`], but keeps commas so that administrative tails
/// (`"Dover, St James"` → `"dover, saint james"`) survive.
#[must_use]
pub fn normalize_keep_comma(raw: &str) -> String {
    normalize_with(raw, true)
}

fn normalize_with(raw: &str, keep_comma: bool) -> String {
    let lower = raw.to_lowercase();
    let unaccented = strip_accents(lower.trim());

    let no_brackets = SQUARE_BRACKETS_RE.replace_all(&unaccented, " ");
    let no_brackets = PARENTHESES_RE.replace_all(&no_brackets, " ");

    let saint = SAINT_RE.replace_all(&no_brackets, "saint");
    let conjunctions = saint.replace('&', " and ");
    let conjunctions = CUM_RE.replace_all(&conjunctions, " with ");
    let separated = conjunctions.replace(['-', '/'], " ");

    let punctuation = if keep_comma {
        &*PUNCTUATION_KEEP_COMMA_RE
    } else {
        &*PUNCTUATION_RE
    };
    let stripped = punctuation.replace_all(&separated, " ");

    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Removes combining marks after canonical decomposition.
#[must_use]
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Standardizes a registration district name for lookups against official
/// boundary sets.
///
/// Lowercases, drops a single trailing parenthetical (`"Dover (Kent)"`),
/// replaces anything outside `[a-z0-9]` with spaces and collapses
/// whitespace. Deliberately looser than [`normalize`]: no saint or
/// conjunction rewriting, since official district names are already clean.
#[must_use]
pub fn standardize_district(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let no_tail = TRAILING_PARENTHETICAL_RE.replace(&lower, "");
    let alnum = NON_ALPHANUMERIC_RE.replace_all(&no_tail, " ");
    WHITESPACE_RE.replace_all(&alnum, " ").trim().to_string()
}

/// Join key between death-register districts and coverage districts.
///
/// Lowercases and trims, drops dated spans like `"(1837-1934)"`, spells
/// out `&`, turns hyphens into spaces and collapses whitespace. Blank
/// names have no key.
#[must_use]
pub fn death_district_key(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    let undated = DATED_SPAN_RE.replace_all(&lower, "");
    let spelled = undated.replace('&', "and").replace('-', " ");
    let key = WHITESPACE_RE.replace_all(&spelled, " ").trim().to_string();
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  ASHFORD  "), "ashford");
    }

    #[test]
    fn strips_welsh_accents() {
        assert_eq!(normalize("Ynys Môn"), "ynys mon");
        assert_eq!(normalize("Llanfihangel-y-Pennant Ŵ ŷ â ê î û"), "llanfihangel y pennant w y a e i u");
    }

    #[test]
    fn removes_bracketed_annotations() {
        assert_eq!(normalize("Builth [Llanfair-ym-Muallt]"), "builth");
        assert_eq!(normalize("Hove (part of)"), "hove");
    }

    #[test]
    fn canonicalizes_saint() {
        assert_eq!(normalize("St. Mary"), "saint mary");
        assert_eq!(normalize("ST MARY"), "saint mary");
        assert_eq!(normalize("Saint Mary"), "saint mary");
        assert_eq!(normalize("Stoke St Gregory"), "stoke saint gregory");
    }

    #[test]
    fn rewrites_conjunctions() {
        assert_eq!(normalize("Rushall & Ford"), "rushall and ford");
        assert_eq!(normalize("Ashby cum Fenby"), "ashby with fenby");
        assert_eq!(normalize("Cumberworth"), "cumberworth");
    }

    #[test]
    fn separates_hyphenated_and_slashed_words() {
        assert_eq!(normalize("Stow-on-the-Wold"), "stow on the wold");
        assert_eq!(normalize("Acton/Turville"), "acton turville");
    }

    #[test]
    fn keeps_commas_only_when_asked() {
        assert_eq!(normalize_keep_comma("Dover, St James"), "dover, saint james");
        assert_eq!(normalize("Dover, St James"), "dover saint james");
    }

    #[test]
    fn garbage_input_yields_minimal_key() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  ()[]  "), "");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "St. Mary's & St. John (part)",
            "Llanfair-ym-Muallt [Builth Wells]",
            "Dover, St James",
            "Ashby cum Fenby",
            "  Stow-on-the-Wold / Broadwell ",
            "Ynys Môn",
            "st..",
            "",
            "İstanbul",
            "Bessels Leigh",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "normalize not idempotent for {s:?}");

            let once = normalize_keep_comma(s);
            assert_eq!(
                normalize_keep_comma(&once),
                once,
                "normalize_keep_comma not idempotent for {s:?}"
            );
        }
    }

    #[test]
    fn standardizes_district_names() {
        assert_eq!(standardize_district("Dover (Kent)"), "dover");
        assert_eq!(standardize_district("  St. Saviour, Southwark "), "st saviour southwark");
        assert_eq!(standardize_district("Ashton-under-Lyne"), "ashton under lyne");
    }

    #[test]
    fn keys_death_register_districts() {
        assert_eq!(
            death_district_key("Ashton-under-Lyne (1837-1937)").as_deref(),
            Some("ashton under lyne")
        );
        assert_eq!(
            death_district_key("  Stow &  Bucknell ").as_deref(),
            Some("stow and bucknell")
        );
        assert_eq!(death_district_key("Dover (Kent)").as_deref(), Some("dover (kent)"));
        assert_eq!(death_district_key("   "), None);
        assert_eq!(death_district_key("(1837-1852)"), None);
    }
}
