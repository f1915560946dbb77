//! Final per-census-year district table: coverage, geometry, centroid
//! diagnostics and imputation merged on `(district, year)`.

use std::collections::{BTreeMap, HashMap};

use rd_backbone_registration_models::{
    ConstructedDistrictGeometry, DistrictYearCoverage, GeometrySource, ImputedLocation,
};
use rd_backbone_spatial::CentroidDiagnostic;

/// One district in one census year.
#[derive(Debug, Clone, PartialEq)]
pub struct DistrictYearSummary {
    pub coverage: DistrictYearCoverage,
    /// Contributing parishes of the constructed geometry, if any.
    pub n_parishes_matched: Option<usize>,
    /// Constructed or imputed centroid.
    pub centroid_x: Option<f64>,
    pub centroid_y: Option<f64>,
    /// Distance to the official centroid, for constructed rows.
    pub centroid_distance_km: Option<f64>,
    pub imputation: Option<ImputedLocation>,
    pub geometry_source: GeometrySource,
}

/// Merges the per-stage tables for every coverage row in a census year
/// present in `constructed`. Output follows the coverage order.
#[must_use]
pub fn summarize(
    coverage: &[DistrictYearCoverage],
    constructed: &BTreeMap<i32, Vec<ConstructedDistrictGeometry>>,
    diagnostics: &[CentroidDiagnostic],
    imputed: &[ImputedLocation],
) -> Vec<DistrictYearSummary> {
    let geometries: HashMap<(&str, i32), &ConstructedDistrictGeometry> = constructed
        .values()
        .flatten()
        .map(|g| ((g.district.as_str(), g.census_year), g))
        .collect();
    let distances: HashMap<(&str, i32), f64> = diagnostics
        .iter()
        .map(|d| ((d.constructed_district.as_str(), d.year), d.centroid_distance_km))
        .collect();
    let imputations: HashMap<(&str, i32), &ImputedLocation> = imputed
        .iter()
        .map(|i| ((i.district.as_str(), i.year), i))
        .collect();

    coverage
        .iter()
        .filter(|row| constructed.contains_key(&row.year))
        .map(|row| {
            let key = (row.district.as_str(), row.year);
            let geometry = geometries.get(&key).copied();
            // Imputation never applies where a backbone exists.
            let imputation = imputations
                .get(&key)
                .filter(|_| !row.usable_backbone)
                .map(|&i| i.clone());

            let (centroid_x, centroid_y) = match (geometry, &imputation) {
                (Some(g), _) => (Some(g.centroid.x()), Some(g.centroid.y())),
                (None, Some(i)) if i.location_imputed => (i.centroid_x, i.centroid_y),
                _ => (None, None),
            };

            DistrictYearSummary {
                coverage: row.clone(),
                n_parishes_matched: geometry.map(|g| g.n_parishes_matched),
                centroid_x,
                centroid_y,
                centroid_distance_km: geometry.and_then(|_| distances.get(&key).copied()),
                geometry_source: geometry_source(geometry.is_some(), imputation.as_ref()),
                imputation,
            }
        })
        .collect()
}

fn geometry_source(has_geometry: bool, imputation: Option<&ImputedLocation>) -> GeometrySource {
    match imputation {
        _ if has_geometry => GeometrySource::ParishReconstruction,
        Some(i) if i.location_imputed => GeometrySource::CentroidImputedNearest,
        Some(i) if i.imputation_failed => GeometrySource::ImputationFailedNoSourcePoint,
        _ => GeometrySource::NotRepresentable,
    }
}
