#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types for linking registration districts to the 1851 parish
//! backbone.
//!
//! Registration districts (RDs) changed shape and membership throughout
//! 1837-1990. These types describe the fixed 1851 reference parishes, the
//! time-varying parish-to-district membership rows scraped from
//! administrative histories, and every derived table the pipeline produces
//! from them: the match concordance, per-year district coverage,
//! constructed district geometry, and imputed district locations.

pub mod year;

use std::sync::Arc;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use year::{MembershipInterval, YearDefaults, YearWindow, parse_year};

/// Identifier of a reference parish (the `ID` column of the 1851 gazetteer).
pub type ParishId = i64;

/// A parish polygon from the 1851 reference gazetteer.
///
/// Loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceParish {
    /// Unique parish identifier.
    pub id: ParishId,
    /// Display name as loaded (e.g. `"DOVER, ST JAMES"`).
    pub name: String,
    /// Parish boundary in the fixed projected CRS (metres).
    pub polygon: MultiPolygon<f64>,
}

/// One parish-to-district membership period from the administrative
/// history source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Parish or place name as written in the source.
    pub place_name: String,
    /// Registration district the place belonged to.
    pub district: String,
    /// First year of membership, if the source gave a parseable one.
    pub from_year: Option<i32>,
    /// Last year of membership, if the source gave a parseable one.
    pub to_year: Option<i32>,
}

impl SourceRecord {
    /// Resolves the membership interval with the given sentinels.
    #[must_use]
    pub fn interval(&self, defaults: YearDefaults) -> MembershipInterval {
        MembershipInterval::resolve(self.from_year, self.to_year, defaults)
    }
}

/// Which stage of the match cascade produced a match.
///
/// Closed so that the cascade can be checked exhaustively.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMethod {
    /// Normalized name found as-is.
    Exact,
    /// Welsh orthographic substitution (v/f, i/y, ch/gh).
    WelshVariant,
    /// Vowel interchange (a/e, e/i).
    VowelVariant,
    /// Internal spaces removed.
    NoSpaces,
    /// Trailing `with X` clause dropped.
    WithoutWith,
    /// Trailing `on [the] X` clause dropped.
    WithoutOn,
    /// Trailing `nigh X` clause dropped.
    WithoutNigh,
    /// Leading `lower` dropped.
    WithoutLower,
    /// Leading `upper` dropped.
    WithoutUpper,
    /// Name is a bounded substring of a reference key.
    Substring,
    /// Nothing matched.
    Unmatched,
}

impl MatchMethod {
    /// Every method, in cascade order.
    pub const ALL: &[Self] = &[
        Self::Exact,
        Self::WelshVariant,
        Self::VowelVariant,
        Self::NoSpaces,
        Self::WithoutWith,
        Self::WithoutOn,
        Self::WithoutNigh,
        Self::WithoutLower,
        Self::WithoutUpper,
        Self::Substring,
        Self::Unmatched,
    ];
}

/// Outcome of resolving one place name against the reference index.
///
/// `matched()` is derived from the parish id, so a result can never claim
/// a match without naming the parish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The reference parish the name resolved to.
    pub matched_parish_id: Option<ParishId>,
    /// The cascade stage that produced the result.
    pub match_method: MatchMethod,
}

impl MatchResult {
    /// A successful match.
    #[must_use]
    pub fn found(parish_id: ParishId, method: MatchMethod) -> Self {
        debug_assert_ne!(method, MatchMethod::Unmatched);
        Self {
            matched_parish_id: Some(parish_id),
            match_method: method,
        }
    }

    /// No candidate in any stage.
    #[must_use]
    pub const fn unmatched() -> Self {
        Self {
            matched_parish_id: None,
            match_method: MatchMethod::Unmatched,
        }
    }

    /// Whether a reference parish was found.
    #[must_use]
    pub const fn matched(&self) -> bool {
        self.matched_parish_id.is_some()
    }
}

/// A source record with its resolved interval, eligibility, and match.
///
/// Ineligible records (interval does not cover the reference year) carry no
/// match attempt at all.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcordanceRow {
    /// The membership record as read.
    pub record: SourceRecord,
    /// Interval with sentinels applied.
    pub interval: MembershipInterval,
    /// Whether the interval overlaps the reference year.
    pub eligible: bool,
    /// Match outcome, `None` when the record was not eligible.
    pub result: Option<MatchResult>,
    /// Canonical name of the matched reference parish.
    pub matched_parish_name: Option<String>,
}

impl ConcordanceRow {
    /// The matched parish id, if any.
    #[must_use]
    pub fn matched_parish_id(&self) -> Option<ParishId> {
        self.result.and_then(|r| r.matched_parish_id)
    }

    /// Whether the record matched a reference parish.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.matched_parish_id().is_some()
    }

    /// The match method, `None` for ineligible records.
    #[must_use]
    pub fn match_method(&self) -> Option<MatchMethod> {
        self.result.map(|r| r.match_method)
    }
}

/// One year of a district's membership for one parish row.
///
/// Derived from the concordance by interval expansion and recomputed on
/// every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearActivityRow {
    /// Registration district.
    pub district: Arc<str>,
    /// Calendar year.
    pub year: i32,
    /// Source place name (distinguishes unmatched parish rows).
    pub place_name: Arc<str>,
    /// Matched reference parish.
    pub parish_id: Option<ParishId>,
}

impl YearActivityRow {
    /// Whether the row's parish is on the backbone.
    #[must_use]
    pub const fn matched(&self) -> bool {
        self.parish_id.is_some()
    }
}

/// The largest matched parish of a district-year, by 1851 polygon area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantParish {
    /// Parish identifier.
    pub parish_id: ParishId,
    /// Canonical parish name.
    pub parish_name: Option<String>,
    /// Parish area in square kilometres.
    pub area_km2: f64,
    /// Summed area of every matched parish in the district-year.
    pub total_area_km2: f64,
    /// `area_km2 / total_area_km2`.
    pub area_share: f64,
}

/// Per (district, year) backbone coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictYearCoverage {
    /// Calendar year.
    pub year: i32,
    /// Registration district.
    pub district: String,
    /// Active membership rows (always > 0).
    pub active_parish_rows: u32,
    /// Active rows with a matched parish.
    pub matched_parish_rows: u32,
    /// Distinct active place names.
    pub active_unique_parishes: u32,
    /// Distinct matched parish ids.
    pub matched_unique_parishes: u32,
    /// `matched_parish_rows / active_parish_rows`.
    pub matched_share: f64,
    /// At least one active row is on the backbone.
    pub usable_backbone: bool,
    /// Dominant matched parish, when parish areas were supplied.
    pub dominant: Option<DominantParish>,
}

impl DistrictYearCoverage {
    /// Builds a coverage row from its counts.
    ///
    /// Returns `None` when `active_parish_rows` is zero or fewer rows are
    /// active than matched.
    #[must_use]
    pub fn from_counts(
        year: i32,
        district: String,
        active_parish_rows: u32,
        matched_parish_rows: u32,
        active_unique_parishes: u32,
        matched_unique_parishes: u32,
    ) -> Option<Self> {
        if active_parish_rows == 0 || matched_parish_rows > active_parish_rows {
            return None;
        }

        Some(Self {
            year,
            district,
            active_parish_rows,
            matched_parish_rows,
            active_unique_parishes,
            matched_unique_parishes,
            matched_share: f64::from(matched_parish_rows) / f64::from(active_parish_rows),
            usable_backbone: matched_parish_rows > 0,
            dominant: None,
        })
    }
}

/// A district's shape in one census year, dissolved from its matched
/// 1851 parishes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructedDistrictGeometry {
    /// Registration district.
    pub district: String,
    /// Census year the membership was taken from.
    pub census_year: i32,
    /// Union of the contributing parish polygons.
    pub polygon: MultiPolygon<f64>,
    /// Distinct contributing parish ids.
    pub n_parishes_matched: usize,
    /// Centroid of `polygon`.
    pub centroid: Point<f64>,
}

/// District centroid from an official (external) boundary set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficialCentroid {
    /// District name as written in the official set.
    pub district: String,
    /// Census year of the official boundaries.
    pub year: i32,
    /// Easting (metres).
    pub x: f64,
    /// Northing (metres).
    pub y: f64,
}

/// Where the source point for a nearest-neighbor imputation came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImputationSourcePoint {
    /// A centroid already present on the row.
    FromExistingXy,
    /// The official centroid found by standardized district name.
    FromOfficialName,
}

/// Approximate location for a district-year without backbone geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputedLocation {
    /// Registration district.
    pub district: String,
    /// Census year.
    pub year: i32,
    /// Imputed easting (the nearest constructed centroid).
    pub centroid_x: Option<f64>,
    /// Imputed northing.
    pub centroid_y: Option<f64>,
    /// A location was assigned.
    pub location_imputed: bool,
    /// No source point was available; no location was assigned.
    pub imputation_failed: bool,
    /// Constructed district whose centroid was borrowed.
    pub imputed_from_district: Option<String>,
    /// Distance from the source point to the borrowed centroid.
    pub imputed_distance_km: Option<f64>,
    /// Provenance of the source point.
    pub imputation_source_point: Option<ImputationSourcePoint>,
}

impl ImputedLocation {
    /// A failed imputation: no source point, no location.
    #[must_use]
    pub const fn failed(district: String, year: i32) -> Self {
        Self {
            district,
            year,
            centroid_x: None,
            centroid_y: None,
            location_imputed: false,
            imputation_failed: true,
            imputed_from_district: None,
            imputed_distance_km: None,
            imputation_source_point: None,
        }
    }
}

/// How a district-year's location in the final summary was obtained.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeometrySource {
    /// Dissolved from matched 1851 parishes.
    ParishReconstruction,
    /// No backbone geometry and no imputation attempted.
    NotRepresentable,
    /// Borrowed from the nearest constructed district centroid.
    CentroidImputedNearest,
    /// Imputation had no source point.
    ImputationFailedNoSourcePoint,
}
