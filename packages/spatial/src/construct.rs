//! Per-census-year district geometry, dissolved from matched parishes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::{Area, Centroid, MultiPolygon, Polygon, unary_union};
use rayon::prelude::*;
use rd_backbone_registration_models::{
    ConstructedDistrictGeometry, ParishId, ReferenceParish, YearActivityRow,
};

/// Reference parish polygons keyed by id. The first parish with an id wins.
#[derive(Debug, Default)]
pub struct ParishPolygons<'a> {
    by_id: HashMap<ParishId, &'a MultiPolygon<f64>>,
}

impl<'a> ParishPolygons<'a> {
    #[must_use]
    pub fn new(parishes: &'a [ReferenceParish]) -> Self {
        let mut by_id = HashMap::with_capacity(parishes.len());
        for parish in parishes {
            by_id.entry(parish.id).or_insert(&parish.polygon);
        }
        Self { by_id }
    }

    #[must_use]
    pub fn get(&self, id: ParishId) -> Option<&'a MultiPolygon<f64>> {
        self.by_id.get(&id).copied()
    }
}

/// Dissolves each district's matched parishes active in `census_year`.
///
/// Districts with no locatable parish, or whose union has no area, get no
/// row at all. Output is ordered by district name.
#[must_use]
pub fn construct(
    census_year: i32,
    rows: &[YearActivityRow],
    parishes: &ParishPolygons<'_>,
) -> Vec<ConstructedDistrictGeometry> {
    let mut members: BTreeMap<&str, BTreeSet<ParishId>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.year == census_year) {
        if let Some(id) = row.parish_id {
            members.entry(&*row.district).or_default().insert(id);
        }
    }

    let out: Vec<ConstructedDistrictGeometry> = members
        .into_par_iter()
        .filter_map(|(district, ids)| dissolve(census_year, district, &ids, parishes))
        .collect();

    log::info!(
        "Constructed {} district geometries for census year {census_year}",
        out.len()
    );

    out
}

/// Runs [`construct`] independently for each census year.
#[must_use]
pub fn construct_years(
    census_years: &[i32],
    rows: &[YearActivityRow],
    parishes: &ParishPolygons<'_>,
) -> BTreeMap<i32, Vec<ConstructedDistrictGeometry>> {
    census_years
        .par_iter()
        .map(|&year| (year, construct(year, rows, parishes)))
        .collect()
}

fn dissolve(
    census_year: i32,
    district: &str,
    ids: &BTreeSet<ParishId>,
    parishes: &ParishPolygons<'_>,
) -> Option<ConstructedDistrictGeometry> {
    let located: Vec<(ParishId, &MultiPolygon<f64>)> = ids
        .iter()
        .filter_map(|&id| parishes.get(id).map(|mp| (id, mp)))
        .collect();

    if located.len() < ids.len() {
        log::debug!(
            "{district} ({census_year}): {} matched parishes have no reference polygon",
            ids.len() - located.len()
        );
    }
    if located.is_empty() {
        return None;
    }

    let parts: Vec<&Polygon<f64>> = located.iter().flat_map(|(_, mp)| mp.0.iter()).collect();
    let polygon = unary_union(parts);

    if polygon.0.is_empty() || polygon.unsigned_area() <= 0.0 {
        log::warn!("{district} ({census_year}): parish union has no area, skipping");
        return None;
    }
    let Some(centroid) = polygon.centroid() else {
        log::warn!("{district} ({census_year}): no centroid for dissolved geometry");
        return None;
    };

    Some(ConstructedDistrictGeometry {
        district: district.to_string(),
        census_year,
        polygon,
        n_parishes_matched: located.len(),
        centroid,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geo::{Rect, coord};

    use super::*;

    fn square(id: ParishId, x: f64, y: f64, size: f64) -> ReferenceParish {
        let rect = Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size });
        ReferenceParish {
            id,
            name: format!("P{id}"),
            polygon: MultiPolygon(vec![rect.to_polygon()]),
        }
    }

    fn active(district: &str, year: i32, parish: Option<ParishId>) -> YearActivityRow {
        YearActivityRow {
            district: Arc::from(district),
            year,
            place_name: Arc::from(format!("{parish:?}").as_str()),
            parish_id: parish,
        }
    }

    #[test]
    fn dissolves_adjacent_parishes() {
        let parishes = vec![square(1, 0.0, 0.0, 1000.0), square(2, 1000.0, 0.0, 1000.0)];
        let polygons = ParishPolygons::new(&parishes);
        let rows = vec![
            active("Dover", 1851, Some(1)),
            active("Dover", 1851, Some(2)),
            active("Dover", 1851, Some(2)),
            active("Dover", 1851, None),
        ];

        let out = construct(1851, &rows, &polygons);
        assert_eq!(out.len(), 1);
        let dover = &out[0];
        assert_eq!(dover.n_parishes_matched, 2);
        assert!((dover.polygon.unsigned_area() - 2_000_000.0).abs() < 1e-3);
        assert!((dover.centroid.x() - 1000.0).abs() < 1e-6);
        assert!((dover.centroid.y() - 500.0).abs() < 1e-6);
    }

    #[test]
    fn union_equals_contributing_parishes_only() {
        let parishes = vec![
            square(1, 0.0, 0.0, 10.0),
            square(2, 100.0, 0.0, 10.0),
            square(3, 200.0, 0.0, 10.0),
        ];
        let polygons = ParishPolygons::new(&parishes);
        let rows = vec![
            active("A", 1861, Some(1)),
            active("A", 1861, Some(3)),
            active("A", 1851, Some(2)),
            active("B", 1861, Some(2)),
        ];

        let out = construct(1861, &rows, &polygons);
        assert_eq!(out.len(), 2);
        let a = &out[0];
        assert_eq!(a.district, "A");
        assert_eq!(a.n_parishes_matched, 2);
        assert!((a.polygon.unsigned_area() - 200.0).abs() < 1e-6);
        assert_eq!(a.polygon.0.len(), 2);
    }

    #[test]
    fn districts_without_matches_are_absent() {
        let parishes = vec![square(1, 0.0, 0.0, 10.0)];
        let polygons = ParishPolygons::new(&parishes);
        let rows = vec![
            active("Unmatched", 1851, None),
            active("Missing", 1851, Some(99)),
            active("Dover", 1851, Some(1)),
        ];

        let out = construct(1851, &rows, &polygons);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].district, "Dover");
    }

    #[test]
    fn builds_each_census_year_independently() {
        let parishes = vec![square(1, 0.0, 0.0, 10.0), square(2, 10.0, 0.0, 10.0)];
        let polygons = ParishPolygons::new(&parishes);
        let rows = vec![
            active("Dover", 1851, Some(1)),
            active("Dover", 1861, Some(1)),
            active("Dover", 1861, Some(2)),
        ];

        let by_year = construct_years(&[1851, 1861, 1871], &rows, &polygons);
        assert_eq!(by_year[&1851][0].n_parishes_matched, 1);
        assert_eq!(by_year[&1861][0].n_parishes_matched, 2);
        assert!(by_year[&1871].is_empty());
    }
}
