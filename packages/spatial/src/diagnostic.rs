//! Distance between constructed and official district centroids.

use std::collections::HashMap;

use rd_backbone_normalize::standardize_district;
use rd_backbone_registration_models::{ConstructedDistrictGeometry, OfficialCentroid};
use strum_macros::{AsRefStr, Display};

use crate::centroids::CentroidIndex;

const M_PER_KM: f64 = 1000.0;

/// How the official counterpart of a constructed district was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MatchedVia {
    /// Same standardized district name.
    Name,
    /// No name match; the closest official centroid.
    Nearest,
}

/// One constructed district-year compared with its official counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidDiagnostic {
    pub year: i32,
    pub constructed_district: String,
    pub official_district: String,
    pub matched_via: MatchedVia,
    pub constructed_x: f64,
    pub constructed_y: f64,
    pub official_x: f64,
    pub official_y: f64,
    pub centroid_distance_km: f64,
}

/// Compares every constructed geometry of `year` with the official
/// centroids of the same year.
///
/// Geometries get no row when the year has no official centroids at all.
#[must_use]
pub fn centroid_diagnostic(
    year: i32,
    constructed: &[ConstructedDistrictGeometry],
    official: &[OfficialCentroid],
) -> Vec<CentroidDiagnostic> {
    let same_year: Vec<&OfficialCentroid> = official.iter().filter(|o| o.year == year).collect();

    let mut by_name: HashMap<String, &OfficialCentroid> = HashMap::new();
    for &o in &same_year {
        by_name.entry(standardize_district(&o.district)).or_insert(o);
    }
    let nearest_index = CentroidIndex::new(
        same_year
            .iter()
            .map(|o| (o.district.clone(), o.x, o.y)),
    );

    let out: Vec<CentroidDiagnostic> = constructed
        .iter()
        .filter(|g| g.census_year == year)
        .filter_map(|g| {
            let (cx, cy) = (g.centroid.x(), g.centroid.y());
            let (official_district, ox, oy, via) =
                if let Some(o) = by_name.get(&standardize_district(&g.district)) {
                    (o.district.clone(), o.x, o.y, MatchedVia::Name)
                } else {
                    let n = nearest_index.nearest(cx, cy)?;
                    (n.district.to_string(), n.x, n.y, MatchedVia::Nearest)
                };

            Some(CentroidDiagnostic {
                year,
                constructed_district: g.district.clone(),
                official_district,
                matched_via: via,
                constructed_x: cx,
                constructed_y: cy,
                official_x: ox,
                official_y: oy,
                centroid_distance_km: (cx - ox).hypot(cy - oy) / M_PER_KM,
            })
        })
        .collect();

    log::info!(
        "Centroid diagnostic {year}: {} constructed districts compared ({} by name)",
        out.len(),
        out.iter().filter(|d| d.matched_via == MatchedVia::Name).count()
    );

    out
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, Point};

    use super::*;

    fn constructed(district: &str, year: i32, x: f64, y: f64) -> ConstructedDistrictGeometry {
        ConstructedDistrictGeometry {
            district: district.to_string(),
            census_year: year,
            polygon: MultiPolygon(vec![]),
            n_parishes_matched: 1,
            centroid: Point::new(x, y),
        }
    }

    fn official(district: &str, year: i32, x: f64, y: f64) -> OfficialCentroid {
        OfficialCentroid {
            district: district.to_string(),
            year,
            x,
            y,
        }
    }

    #[test]
    fn matches_by_standardized_name_first() {
        let rows = centroid_diagnostic(
            1851,
            &[constructed("Dover", 1851, 0.0, 0.0)],
            &[
                official("Folkestone", 1851, 100.0, 0.0),
                official("DOVER (Kent)", 1851, 3000.0, 4000.0),
            ],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].matched_via, MatchedVia::Name);
        assert_eq!(rows[0].official_district, "DOVER (Kent)");
        assert!((rows[0].centroid_distance_km - 5.0).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_nearest_official_centroid() {
        let rows = centroid_diagnostic(
            1861,
            &[constructed("Newtown", 1861, 0.0, 0.0)],
            &[
                official("Montgomery", 1861, 2000.0, 0.0),
                official("Machynlleth", 1861, 9000.0, 0.0),
                official("Newtown", 1851, 0.0, 0.0),
            ],
        );

        assert_eq!(rows[0].matched_via, MatchedVia::Nearest);
        assert_eq!(rows[0].official_district, "Montgomery");
        assert!((rows[0].centroid_distance_km - 2.0).abs() < 1e-9);
        assert_eq!(MatchedVia::Nearest.as_ref(), "nearest");
    }

    #[test]
    fn no_official_centroids_gives_no_rows() {
        assert!(centroid_diagnostic(1871, &[constructed("Dover", 1871, 0.0, 0.0)], &[]).is_empty());
    }
}
