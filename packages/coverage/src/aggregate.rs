//! `(year, district)` coverage aggregation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rd_backbone_registration_models::{
    DistrictYearCoverage, DominantParish, ParishId, YearActivityRow,
};

/// Reference-parish areas (km²) and names for dominant-parish selection.
#[derive(Debug, Clone, Default)]
pub struct ParishAreas {
    areas: HashMap<ParishId, f64>,
    names: HashMap<ParishId, String>,
}

impl ParishAreas {
    /// Builds the lookup from `(id, name, area_km2)` triples. The first
    /// entry for an id wins.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (ParishId, String, f64)>) -> Self {
        let mut lookup = Self::default();
        for (id, name, area) in entries {
            lookup.areas.entry(id).or_insert(area);
            lookup.names.entry(id).or_insert(name);
        }
        lookup
    }

    /// Area of a parish in km².
    #[must_use]
    pub fn area(&self, id: ParishId) -> Option<f64> {
        self.areas.get(&id).copied()
    }

    #[must_use]
    pub fn name(&self, id: ParishId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}

#[derive(Default)]
struct Group<'a> {
    active_rows: u32,
    matched_rows: u32,
    places: BTreeSet<&'a str>,
    parishes: BTreeSet<ParishId>,
}

/// Aggregates activity rows without dominant-parish enrichment.
#[must_use]
pub fn aggregate(rows: &[YearActivityRow]) -> Vec<DistrictYearCoverage> {
    aggregate_with_areas(rows, None)
}

/// Aggregates activity rows into one coverage row per `(year, district)`,
/// ordered by year then district.
///
/// With `areas`, each usable row also gets its dominant parish: the matched
/// parish with the largest area, ties going to the lowest parish id.
#[must_use]
pub fn aggregate_with_areas(
    rows: &[YearActivityRow],
    areas: Option<&ParishAreas>,
) -> Vec<DistrictYearCoverage> {
    let groups = rows.iter().fold(
        BTreeMap::<(i32, &Arc<str>), Group>::new(),
        |mut acc, row| {
            let group = acc.entry((row.year, &row.district)).or_default();
            group.active_rows += 1;
            group.places.insert(&*row.place_name);
            if let Some(id) = row.parish_id {
                group.matched_rows += 1;
                group.parishes.insert(id);
            }
            acc
        },
    );

    let out: Vec<DistrictYearCoverage> = groups
        .into_iter()
        .filter_map(|((year, district), group)| {
            debug_assert!(group.active_rows > 0);
            let mut coverage = DistrictYearCoverage::from_counts(
                year,
                district.to_string(),
                group.active_rows,
                group.matched_rows,
                count(group.places.len()),
                count(group.parishes.len()),
            )?;
            coverage.dominant = areas.and_then(|a| dominant_parish(&group.parishes, a));
            Some(coverage)
        })
        .collect();

    log::info!(
        "Aggregated {} activity rows into {} district-year coverage rows",
        rows.len(),
        out.len()
    );

    out
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn dominant_parish(parishes: &BTreeSet<ParishId>, areas: &ParishAreas) -> Option<DominantParish> {
    let sized: Vec<(ParishId, f64)> = parishes
        .iter()
        .filter_map(|&id| areas.area(id).map(|a| (id, a)))
        .collect();

    let total: f64 = sized.iter().map(|(_, a)| a).sum();

    // Ascending ids, so a strict comparison keeps the lowest id on ties.
    let (id, area) = sized.iter().copied().fold(None, |best, (id, area)| match best {
        Some((_, best_area)) if area <= best_area => best,
        _ => Some((id, area)),
    })?;

    Some(DominantParish {
        parish_id: id,
        parish_name: areas.name(id).map(ToString::to_string),
        area_km2: area,
        total_area_km2: total,
        area_share: if total > 0.0 { area / total } else { 0.0 },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(district: &str, year: i32, place: &str, parish: Option<ParishId>) -> YearActivityRow {
        YearActivityRow {
            district: Arc::from(district),
            year,
            place_name: Arc::from(place),
            parish_id: parish,
        }
    }

    #[test]
    fn counts_rows_and_unique_parishes() {
        let rows = vec![
            activity("Dover", 1851, "Buckland", Some(1)),
            activity("Dover", 1851, "Buckland", Some(1)),
            activity("Dover", 1851, "Charlton", Some(2)),
            activity("Dover", 1851, "Westcliff", None),
            activity("Dover", 1852, "Buckland", Some(1)),
            activity("Bala", 1851, "Llanycil", None),
        ];
        let coverage = aggregate(&rows);

        assert_eq!(coverage.len(), 3);
        let dover = &coverage[1];
        assert_eq!((dover.year, dover.district.as_str()), (1851, "Dover"));
        assert_eq!(dover.active_parish_rows, 4);
        assert_eq!(dover.matched_parish_rows, 3);
        assert_eq!(dover.active_unique_parishes, 3);
        assert_eq!(dover.matched_unique_parishes, 2);
        assert!((dover.matched_share - 0.75).abs() < f64::EPSILON);
        assert!(dover.usable_backbone);

        let bala = &coverage[0];
        assert_eq!(bala.district, "Bala");
        assert_eq!(bala.active_parish_rows, 1);
        assert_eq!(bala.matched_parish_rows, 0);
        assert!(!bala.usable_backbone);
        assert!(bala.dominant.is_none());
    }

    #[test]
    fn coverage_rows_respect_bounds() {
        let rows: Vec<YearActivityRow> = (0..50)
            .map(|i| {
                activity(
                    if i % 3 == 0 { "A" } else { "B" },
                    1851 + i % 4,
                    &format!("p{i}"),
                    (i % 2 == 0).then_some(i64::from(i)),
                )
            })
            .collect();

        for row in aggregate(&rows) {
            assert!(row.active_parish_rows > 0);
            assert!(row.matched_parish_rows <= row.active_parish_rows);
            assert!((0.0..=1.0).contains(&row.matched_share));
            assert_eq!(row.usable_backbone, row.matched_parish_rows > 0);
        }
    }

    #[test]
    fn unmatched_rows_count_as_active_only() {
        let coverage = aggregate(&[
            activity("Southend", 1900, "Westcliff on Sea Urban", None),
            activity("Southend", 1900, "Prittlewell", Some(8)),
        ]);
        assert_eq!(coverage[0].active_parish_rows, 2);
        assert_eq!(coverage[0].matched_parish_rows, 1);
    }

    #[test]
    fn picks_dominant_parish_by_area() {
        let areas = ParishAreas::new([
            (1, "Buckland".to_string(), 2.0),
            (2, "Charlton".to_string(), 6.0),
            (3, "Hougham".to_string(), 2.0),
        ]);
        let rows = vec![
            activity("Dover", 1851, "Buckland", Some(1)),
            activity("Dover", 1851, "Charlton", Some(2)),
            activity("Dover", 1851, "Hougham", Some(3)),
            activity("Dover", 1851, "Elsewhere", None),
        ];
        let coverage = aggregate_with_areas(&rows, Some(&areas));
        let dominant = coverage[0].dominant.as_ref().unwrap();

        assert_eq!(dominant.parish_id, 2);
        assert_eq!(dominant.parish_name.as_deref(), Some("Charlton"));
        assert!((dominant.total_area_km2 - 10.0).abs() < 1e-9);
        assert!((dominant.area_share - 0.6).abs() < 1e-9);
    }

    #[test]
    fn dominant_parish_tie_breaks_to_lowest_id() {
        let areas = ParishAreas::new([
            (9, "Later".to_string(), 4.0),
            (4, "Earlier".to_string(), 4.0),
        ]);
        let rows = vec![
            activity("Dover", 1851, "Later", Some(9)),
            activity("Dover", 1851, "Earlier", Some(4)),
        ];
        let coverage = aggregate_with_areas(&rows, Some(&areas));
        assert_eq!(coverage[0].dominant.as_ref().unwrap().parish_id, 4);
    }
}
