#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Approximate locations for district-years without backbone geometry, and
//! the merged per-census-year summary table.
//!
//! Imputation only ever fills gaps: a district-year with a usable backbone
//! is never given an imputed location.

pub mod imputer;
pub mod summary;

pub use imputer::{ImputeOptions, impute};
pub use summary::{DistrictYearSummary, summarize};
