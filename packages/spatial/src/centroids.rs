//! R-tree over named district centroids.

use rd_backbone_registration_models::ConstructedDistrictGeometry;
use rstar::RTree;
use rstar::primitives::GeomWithData;

type CentroidEntry = GeomWithData<[f64; 2], usize>;

/// Metres per kilometre.
const M_PER_KM: f64 = 1000.0;

/// Nearest-neighbor index over district centroids.
///
/// Built once per target layer and only read afterwards.
pub struct CentroidIndex {
    tree: RTree<CentroidEntry>,
    districts: Vec<String>,
}

/// Result of a nearest-centroid query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestCentroid<'a> {
    pub district: &'a str,
    pub x: f64,
    pub y: f64,
    /// Planar distance from the query point, in metres.
    pub distance_m: f64,
}

impl NearestCentroid<'_> {
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.distance_m / M_PER_KM
    }
}

impl CentroidIndex {
    /// Builds the index from `(district, x, y)` points.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = (String, f64, f64)>) -> Self {
        let mut districts = Vec::new();
        let mut entries = Vec::new();

        for (district, x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                log::warn!("Skipping non-finite centroid for {district}");
                continue;
            }
            entries.push(CentroidEntry::new([x, y], districts.len()));
            districts.push(district);
        }

        Self {
            tree: RTree::bulk_load(entries),
            districts,
        }
    }

    /// Indexes the centroids of a constructed geometry layer.
    #[must_use]
    pub fn from_geometries(geometries: &[ConstructedDistrictGeometry]) -> Self {
        Self::new(
            geometries
                .iter()
                .map(|g| (g.district.clone(), g.centroid.x(), g.centroid.y())),
        )
    }

    /// The centroid closest to `(x, y)`.
    ///
    /// Equidistant candidates resolve to the lexicographically smallest
    /// district name.
    #[must_use]
    pub fn nearest(&self, x: f64, y: f64) -> Option<NearestCentroid<'_>> {
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&[x, y]);
        let (first, best_d2) = candidates.next()?;

        let mut best = first;
        for (entry, d2) in candidates {
            if d2 > best_d2 {
                break;
            }
            if self.districts[entry.data] < self.districts[best.data] {
                best = entry;
            }
        }

        let [cx, cy] = *best.geom();
        Some(NearestCentroid {
            district: &self.districts[best.data],
            x: cx,
            y: cy,
            distance_m: best_d2.sqrt(),
        })
    }

    /// Number of indexed centroids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> CentroidIndex {
        CentroidIndex::new([
            ("Dover".to_string(), 0.0, 0.0),
            ("Bala".to_string(), 10_000.0, 0.0),
            ("Anglesey".to_string(), 0.0, 20_000.0),
        ])
    }

    #[test]
    fn finds_nearest_centroid() {
        let index = index();
        let nearest = index.nearest(9_000.0, 0.0).unwrap();
        assert_eq!(nearest.district, "Bala");
        assert!((nearest.distance_m - 1_000.0).abs() < 1e-9);
        assert!((nearest.distance_km() - 1.0).abs() < 1e-12);
        assert!((nearest.x - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_go_to_smallest_name() {
        let index = CentroidIndex::new([
            ("Zeal".to_string(), -5.0, 0.0),
            ("Acton".to_string(), 5.0, 0.0),
            ("Mold".to_string(), 0.0, 100.0),
        ]);
        assert_eq!(index.nearest(0.0, 0.0).unwrap().district, "Acton");
    }

    #[test]
    fn empty_index_has_no_neighbor() {
        let index = CentroidIndex::new(std::iter::empty());
        assert!(index.is_empty());
        assert!(index.nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn skips_non_finite_points() {
        let index = CentroidIndex::new([
            ("Nowhere".to_string(), f64::NAN, 0.0),
            ("Dover".to_string(), 1.0, 1.0),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.nearest(100.0, 100.0).unwrap().district, "Dover");
    }
}
