//! Multi-key lookup over the 1851 reference parishes.
//!
//! Each parish is registered under several normalized keys: its full name
//! (commas kept), the comma-free name, the name without gazetteer
//! subdivision suffixes, the space-free form of each, and the Welsh and
//! vowel variants of all of those.
//!
//! **First write wins.** Parishes are visited in input order and, within a
//! parish, keys in generation order; a key already claimed is never
//! overwritten. Reproducible concordances depend on this, so callers must
//! feed parishes in a fixed order.

use std::collections::{BTreeMap, HashMap};

use rd_backbone_normalize::variants::{
    no_spaces, strip_division_suffix, vowel_variants, welsh_variants,
};
use rd_backbone_normalize::{normalize, normalize_keep_comma};
use rd_backbone_registration_models::{MatchMethod, ParishId, ReferenceParish};

/// How a key was derived from its reference name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOrigin {
    /// The normalized name itself (full, comma-free, or suffix-free).
    Canonical,
    /// A space-free form.
    NoSpaces,
    /// A Welsh spelling variant.
    WelshVariant,
    /// A vowel-interchange variant.
    VowelVariant,
}

impl KeyOrigin {
    /// The match method reported when an unmodified place name lands on a
    /// key of this origin.
    #[must_use]
    pub const fn method(self) -> MatchMethod {
        match self {
            Self::Canonical => MatchMethod::Exact,
            Self::NoSpaces => MatchMethod::NoSpaces,
            Self::WelshVariant => MatchMethod::WelshVariant,
            Self::VowelVariant => MatchMethod::VowelVariant,
        }
    }
}

/// A registered key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedKey {
    /// The normalized key.
    pub key: String,
    /// The parish that claimed it first.
    pub parish_id: ParishId,
    /// How the key was derived.
    pub origin: KeyOrigin,
    /// Length of `key` in characters.
    pub char_len: usize,
}

/// Immutable key → parish index. Safe to share across threads.
#[derive(Debug, Default)]
pub struct ParishKeyIndex {
    keys: Vec<IndexedKey>,
    by_key: HashMap<String, usize>,
    names: BTreeMap<ParishId, String>,
}

impl ParishKeyIndex {
    /// Builds the index from the reference parishes, in input order.
    #[must_use]
    pub fn build(parishes: &[ReferenceParish]) -> Self {
        Self::from_names(parishes.iter().map(|p| (p.id, p.name.as_str())))
    }

    /// Builds the index from `(id, name)` pairs, in iteration order.
    #[must_use]
    pub fn from_names<'a>(parishes: impl IntoIterator<Item = (ParishId, &'a str)>) -> Self {
        let mut index = Self::default();

        for (id, name) in parishes {
            index.names.entry(id).or_insert_with(|| name.to_string());

            for (key, origin) in reference_keys(name) {
                index.insert(key, id, origin);
            }
        }

        log::debug!(
            "Built parish key index: {} keys over {} parishes",
            index.keys.len(),
            index.names.len()
        );

        index
    }

    fn insert(&mut self, key: String, parish_id: ParishId, origin: KeyOrigin) {
        if key.is_empty() || self.by_key.contains_key(&key) {
            return;
        }
        self.by_key.insert(key.clone(), self.keys.len());
        self.keys.push(IndexedKey {
            char_len: key.chars().count(),
            key,
            parish_id,
            origin,
        });
    }

    /// Looks up the parish registered under `key`.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<ParishId> {
        self.entry(key).map(|e| e.parish_id)
    }

    /// Looks up the full entry registered under `key`.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&IndexedKey> {
        self.by_key.get(key).map(|&i| &self.keys[i])
    }

    /// All keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &IndexedKey> {
        self.keys.iter()
    }

    /// Canonical display name of a parish.
    #[must_use]
    pub fn parish_name(&self, id: ParishId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of distinct parishes seen at build time.
    #[must_use]
    pub fn parish_count(&self) -> usize {
        self.names.len()
    }
}

/// Keys for one reference name, in registration order.
fn reference_keys(name: &str) -> Vec<(String, KeyOrigin)> {
    let no_comma = normalize(name);
    let no_suffix = strip_division_suffix(&no_comma);
    let bases = [normalize_keep_comma(name), no_comma, no_suffix];

    let mut forms: Vec<(String, KeyOrigin)> = bases
        .iter()
        .map(|k| (k.clone(), KeyOrigin::Canonical))
        .collect();
    forms.extend(
        bases
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| (no_spaces(k), KeyOrigin::NoSpaces)),
    );

    let mut out = Vec::new();
    for (key, origin) in forms {
        if key.is_empty() {
            continue;
        }
        let welsh = welsh_variants(&key);
        let vowel = vowel_variants(&key);
        out.push((key, origin));
        out.extend(welsh.into_iter().map(|k| (k, KeyOrigin::WelshVariant)));
        out.extend(vowel.into_iter().map(|k| (k, KeyOrigin::VowelVariant)));
    }
    out
}
