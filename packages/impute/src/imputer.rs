//! Nearest constructed-centroid imputation.
//!
//! For each unusable district-year the imputer looks for a source point
//! (a centroid already on the row, then the official centroid found by
//! standardized name) and borrows the centroid of the nearest constructed
//! district. Rows without a source point are flagged, never guessed.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use rd_backbone_normalize::standardize_district;
use rd_backbone_registration_models::{
    ConstructedDistrictGeometry, DistrictYearCoverage, ImputationSourcePoint, ImputedLocation,
    OfficialCentroid,
};
use rd_backbone_spatial::CentroidIndex;

/// Imputation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImputeOptions {
    /// Borrow centroids from this census year's layer instead of the row's
    /// own year.
    pub target_year: Option<i32>,
}

type Key<'a> = (&'a str, i32);

/// Official centroids by `(standardized name, year)`; first row wins.
struct OfficialByName {
    points: HashMap<(String, i32), (f64, f64)>,
}

impl OfficialByName {
    fn new(official: &[OfficialCentroid]) -> Self {
        let mut points = HashMap::new();
        for o in official {
            points
                .entry((standardize_district(&o.district), o.year))
                .or_insert((o.x, o.y));
        }
        Self { points }
    }

    fn get(&self, district: &str, year: i32) -> Option<(f64, f64)> {
        self.points
            .get(&(standardize_district(district), year))
            .copied()
    }
}

/// Imputes locations for every unusable coverage row in a census year
/// present in `constructed`.
///
/// `prior` holds rows from an earlier run. A prior row that was already
/// imputed is returned unchanged; a prior row carrying coordinates without
/// having been imputed supplies a [`ImputationSourcePoint::FromExistingXy`]
/// source point. Output is ordered by year then district.
#[must_use]
pub fn impute(
    coverage: &[DistrictYearCoverage],
    constructed: &BTreeMap<i32, Vec<ConstructedDistrictGeometry>>,
    official: &[OfficialCentroid],
    prior: &[ImputedLocation],
    options: &ImputeOptions,
) -> Vec<ImputedLocation> {
    let official = OfficialByName::new(official);
    let prior: HashMap<Key<'_>, &ImputedLocation> = prior
        .iter()
        .map(|p| ((p.district.as_str(), p.year), p))
        .collect();

    let targets: BTreeMap<i32, CentroidIndex> = constructed
        .keys()
        .map(|&year| {
            let layer = options.target_year.unwrap_or(year);
            let geometries = constructed.get(&layer).map_or(&[][..], Vec::as_slice);
            (year, CentroidIndex::from_geometries(geometries))
        })
        .collect();

    let mut needs: Vec<&DistrictYearCoverage> = coverage
        .iter()
        .filter(|row| !row.usable_backbone && targets.contains_key(&row.year))
        .collect();
    needs.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.district.cmp(&b.district)));

    let out: Vec<ImputedLocation> = needs
        .par_iter()
        .map(|row| {
            let earlier = prior.get(&(row.district.as_str(), row.year)).copied();
            impute_row(row, earlier, &official, &targets[&row.year])
        })
        .collect();

    let counts = out.iter().fold(BTreeMap::<i32, (usize, usize)>::new(), |mut acc, r| {
        let entry = acc.entry(r.year).or_default();
        entry.0 += usize::from(r.location_imputed);
        entry.1 += usize::from(r.imputation_failed);
        acc
    });
    for (year, (imputed, failed)) in counts {
        log::info!("Imputation {year}: {imputed} imputed, {failed} failed");
    }

    out
}

fn impute_row(
    row: &DistrictYearCoverage,
    prior: Option<&ImputedLocation>,
    official: &OfficialByName,
    targets: &CentroidIndex,
) -> ImputedLocation {
    debug_assert!(!row.usable_backbone);

    if let Some(prior) = prior.filter(|p| p.location_imputed) {
        return prior.clone();
    }

    let existing = prior.and_then(|p| p.centroid_x.zip(p.centroid_y));
    let source = existing
        .map(|xy| (xy, ImputationSourcePoint::FromExistingXy))
        .or_else(|| {
            official
                .get(&row.district, row.year)
                .map(|xy| (xy, ImputationSourcePoint::FromOfficialName))
        });

    let Some(((x, y), source_point)) = source else {
        log::debug!("{} ({}): no source point for imputation", row.district, row.year);
        return ImputedLocation::failed(row.district.clone(), row.year);
    };

    let Some(nearest) = targets.nearest(x, y) else {
        log::warn!(
            "{} ({}): no constructed centroids to impute from",
            row.district,
            row.year
        );
        return ImputedLocation {
            imputation_source_point: Some(source_point),
            ..ImputedLocation::failed(row.district.clone(), row.year)
        };
    };

    ImputedLocation {
        district: row.district.clone(),
        year: row.year,
        centroid_x: Some(nearest.x),
        centroid_y: Some(nearest.y),
        location_imputed: true,
        imputation_failed: false,
        imputed_from_district: Some(nearest.district.to_string()),
        imputed_distance_km: Some(nearest.distance_km()),
        imputation_source_point: Some(source_point),
    }
}
