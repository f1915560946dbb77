#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns the membership concordance into per-year district coverage.
//!
//! [`expand`] clips each membership interval to the study window and emits
//! one activity row per active year. [`aggregate`] groups those rows by
//! `(year, district)` into [`DistrictYearCoverage`] rows, and [`qa`]
//! produces integrity and trend reports over the result.
//!
//! [`DistrictYearCoverage`]: rd_backbone_registration_models::DistrictYearCoverage

pub mod aggregate;
pub mod expand;
pub mod qa;

pub use aggregate::{ParishAreas, aggregate, aggregate_with_areas};
pub use expand::{activity_rows, expand};
