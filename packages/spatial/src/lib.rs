#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial side of the 1851 backbone.
//!
//! Dissolves matched parish polygons into per-census-year district shapes,
//! builds R-tree indexes over district centroids for nearest-neighbor
//! lookups, and compares constructed centroids with an official boundary
//! set. All coordinates are planar metres in a single projected CRS.

pub mod centroids;
pub mod construct;
pub mod diagnostic;

use geo::{Area, MultiPolygon};
use geojson::GeoJson;

pub use centroids::{CentroidIndex, NearestCentroid};
pub use construct::{ParishPolygons, construct, construct_years};
pub use diagnostic::{CentroidDiagnostic, MatchedVia, centroid_diagnostic};

/// Square metres per square kilometre.
const M2_PER_KM2: f64 = 1_000_000.0;

/// Parse a `GeoJSON` geometry string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

/// Planar area of a polygon set in km².
#[must_use]
pub fn area_km2(mp: &MultiPolygon<f64>) -> f64 {
    mp.unsigned_area() / M2_PER_KM2
}
