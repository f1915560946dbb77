#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Matches historical parish names to the 1851 reference parishes.
//!
//! The [`index::ParishKeyIndex`] is built once from the reference set and
//! then shared read-only. [`resolve::resolve`] runs the staged cascade for a
//! single name, and [`concordance::build_concordance`] applies it to a
//! batch of membership records, resolving each distinct name once.

pub mod concordance;
pub mod diagnostics;
pub mod index;
pub mod resolve;
pub mod summary;

pub use concordance::{MatchOptions, build_concordance};
pub use index::{IndexedKey, KeyOrigin, ParishKeyIndex};
pub use resolve::{CandidateKey, SubstringPolicy, candidate_keys, resolve};
