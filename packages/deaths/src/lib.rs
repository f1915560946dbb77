#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Places death-register records on the backbone.
//!
//! Each death file covers one registration year. Its district names are
//! keyed with [`rd_backbone_normalize::death_district_key`] and joined to
//! the coverage rows of the same year, giving link and usable rates per
//! year plus the districts that found no coverage row.

pub mod linkage;

use std::sync::LazyLock;

use regex::Regex;

pub use linkage::{
    DecadeRate, UnlinkedDistrict, YearLinkage, YearLinkageReport, decade_rates, link_year,
    replace_years,
};

/// File-name prefix of cleaned death-register extracts.
pub const DEATH_FILE_PREFIX: &str = "cleaned_freebmd_deaths_";

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("valid regex"));

/// The registration year named in a death file's stem: its first run of
/// four digits.
#[must_use]
pub fn year_from_file_name(stem: &str) -> Option<i32> {
    YEAR_RE.find(stem).and_then(|m| m.as_str().parse().ok())
}
