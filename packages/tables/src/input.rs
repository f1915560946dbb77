//! Input table readers.

use std::path::{Path, PathBuf};

use rd_backbone_deaths::{UnlinkedDistrict, YearLinkage};
use rd_backbone_registration_models::{
    ImputationSourcePoint, ImputedLocation, OfficialCentroid, ParishId, ReferenceParish,
    SourceRecord, parse_year,
};
use rd_backbone_spatial::parse_geojson_to_multipolygon;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{TableError, require_columns};

const PARISH_COLUMNS: &[&str] = &["id", "name", "geometry"];
const SOURCE_COLUMNS: &[&str] = &["parish", "district", "from_year", "to_year"];
const OFFICIAL_COLUMNS: &[&str] = &["district", "year", "x", "y"];
const PRIOR_COLUMNS: &[&str] = &["district", "year", "centroid_x", "centroid_y", "location_imputed"];
const DEATH_COLUMNS: &[&str] = &["district"];
const LINKAGE_COLUMNS: &[&str] = &["year", "total_deaths", "linked_deaths"];
const UNLINKED_COLUMNS: &[&str] = &["year", "district", "death_count"];

#[derive(Deserialize)]
struct ParishRow {
    id: ParishId,
    name: String,
    geometry: String,
}

#[derive(Deserialize)]
struct SourceRow {
    parish: String,
    district: String,
    #[serde(default)]
    from_year: String,
    #[serde(default)]
    to_year: String,
}

#[derive(Deserialize)]
struct PriorRow {
    district: String,
    year: i32,
    centroid_x: Option<f64>,
    centroid_y: Option<f64>,
    location_imputed: Option<bool>,
    #[serde(default)]
    imputation_failed: Option<bool>,
    #[serde(default)]
    imputed_from_district: Option<String>,
    #[serde(default)]
    imputed_distance_km: Option<f64>,
    #[serde(default)]
    imputation_source_point: Option<ImputationSourcePoint>,
}

#[derive(Deserialize)]
struct DeathRow {
    #[serde(default)]
    district: String,
}

fn open(table: &str, path: &Path, required: &[&str]) -> Result<csv::Reader<std::fs::File>, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;
    require_columns(table, reader.headers()?, required)?;
    Ok(reader)
}

/// Reads the 1851 reference parishes. The `geometry` column holds a
/// `GeoJSON` `Polygon` or `MultiPolygon` object.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a required column.
pub fn read_parishes(path: &Path) -> Result<Vec<ReferenceParish>, TableError> {
    let mut reader = open("parishes", path, PARISH_COLUMNS)?;

    let mut parishes = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<ParishRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping malformed parish row: {e}");
                skipped += 1;
                continue;
            }
        };

        let Some(polygon) = parse_geojson_to_multipolygon(&row.geometry) else {
            log::warn!("Skipping parish {} ({}): unparseable geometry", row.id, row.name);
            skipped += 1;
            continue;
        };

        parishes.push(ReferenceParish {
            id: row.id,
            name: row.name,
            polygon,
        });
    }

    log::info!(
        "Loaded {} reference parishes from {} ({skipped} skipped)",
        parishes.len(),
        path.display()
    );
    Ok(parishes)
}

/// Reads the parish-to-district membership rows.
///
/// Year cells are parsed leniently; a non-blank cell that still does not
/// parse is logged and treated as missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a required column.
pub fn read_source_records(path: &Path) -> Result<Vec<SourceRecord>, TableError> {
    let mut reader = open("source", path, SOURCE_COLUMNS)?;

    let mut records = Vec::new();
    let mut unparseable = 0usize;
    for result in reader.deserialize::<SourceRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping malformed source row: {e}");
                continue;
            }
        };

        let mut year = |cell: &str| {
            let parsed = parse_year(cell);
            if parsed.is_none() && !cell.trim().is_empty() {
                log::debug!("{} ({}): unparseable year {cell:?}", row.parish, row.district);
                unparseable += 1;
            }
            parsed
        };
        let from_year = year(&row.from_year);
        let to_year = year(&row.to_year);

        records.push(SourceRecord {
            place_name: row.parish.trim().to_string(),
            district: row.district.trim().to_string(),
            from_year,
            to_year,
        });
    }

    if unparseable > 0 {
        log::warn!("{unparseable} year cells could not be parsed and were treated as missing");
    }
    log::info!("Loaded {} membership rows from {}", records.len(), path.display());
    Ok(records)
}

/// Reads official district centroids.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a required column.
pub fn read_official_centroids(path: &Path) -> Result<Vec<OfficialCentroid>, TableError> {
    let mut reader = open("official centroids", path, OFFICIAL_COLUMNS)?;

    let centroids: Vec<OfficialCentroid> = reader
        .deserialize::<OfficialCentroid>()
        .filter_map(|result| {
            result
                .map_err(|e| log::warn!("Skipping malformed official centroid row: {e}"))
                .ok()
        })
        .collect();

    log::info!("Loaded {} official centroids from {}", centroids.len(), path.display());
    Ok(centroids)
}

/// Reads the location columns of a previous run's district-year summary.
///
/// Returns an empty list when the file does not exist yet.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or lacks a required
/// column.
pub fn read_prior_imputations(path: &Path) -> Result<Vec<ImputedLocation>, TableError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = open("prior summary", path, PRIOR_COLUMNS)?;

    let rows: Vec<ImputedLocation> = reader
        .deserialize::<PriorRow>()
        .filter_map(|result| {
            result
                .map_err(|e| log::warn!("Skipping malformed prior summary row: {e}"))
                .ok()
        })
        .map(|row| ImputedLocation {
            district: row.district,
            year: row.year,
            centroid_x: row.centroid_x,
            centroid_y: row.centroid_y,
            location_imputed: row.location_imputed.unwrap_or(false),
            imputation_failed: row.imputation_failed.unwrap_or(false),
            imputed_from_district: row.imputed_from_district,
            imputed_distance_km: row.imputed_distance_km,
            imputation_source_point: row.imputation_source_point,
        })
        .collect();

    log::info!("Loaded {} prior location rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Death-register extracts in `dir` whose file name starts with `prefix`
/// and ends in `.csv`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn list_death_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, TableError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_extract = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".csv"));
        if is_extract && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads the `district` column of one death-register extract, one entry per
/// death. Blank cells stay as empty strings.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a `district`
/// column.
pub fn read_death_districts(path: &Path) -> Result<Vec<String>, TableError> {
    let mut reader = open("deaths", path, DEATH_COLUMNS)?;

    let districts: Vec<String> = reader
        .deserialize::<DeathRow>()
        .filter_map(|result| {
            result
                .map_err(|e| log::warn!("Skipping malformed death row: {e}"))
                .ok()
        })
        .map(|row| row.district)
        .collect();

    log::debug!("Read {} deaths from {}", districts.len(), path.display());
    Ok(districts)
}

fn read_existing<T: DeserializeOwned>(
    table: &str,
    path: &Path,
    required: &[&str],
) -> Result<Vec<T>, TableError> {
    // A table written with no rows has no header either.
    if !path.exists() || std::fs::metadata(path)?.len() == 0 {
        return Ok(Vec::new());
    }
    let mut reader = open(table, path, required)?;
    let rows: Vec<T> = reader
        .deserialize::<T>()
        .filter_map(|result| {
            result
                .map_err(|e| log::warn!("Skipping malformed {table} row: {e}"))
                .ok()
        })
        .collect();
    Ok(rows)
}

/// Reads an earlier linkage summary; empty when the file does not exist or
/// holds no rows.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or lacks a required
/// column.
pub fn read_linkage_summary(path: &Path) -> Result<Vec<YearLinkage>, TableError> {
    read_existing("linkage summary", path, LINKAGE_COLUMNS)
}

/// Reads an earlier unlinked-district table; empty when the file does not
/// exist.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or lacks a required
/// column.
pub fn read_unlinked_districts(path: &Path) -> Result<Vec<UnlinkedDistrict>, TableError> {
    read_existing("unlinked districts", path, UNLINKED_COLUMNS)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_parishes_and_skips_bad_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "parishes.csv",
            concat!(
                "id,name,geometry\n",
                "1,DOVER,\"{\"\"type\"\":\"\"Polygon\"\",\"\"coordinates\"\":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}\"\n",
                "2,BROKEN,not a geometry\n",
            ),
        );

        let parishes = read_parishes(&path).unwrap();
        assert_eq!(parishes.len(), 1);
        assert_eq!(parishes[0].id, 1);
        assert_eq!(parishes[0].name, "DOVER");
        assert_eq!(parishes[0].polygon.0.len(), 1);
    }

    #[test]
    fn reads_source_with_lenient_years() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "source.csv",
            "parish,district,from_year,to_year\nLlanvair ,Bala,1837.0,\nDover,Dover,c.1840,1901\n",
        );

        let records = read_source_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].place_name, "Llanvair");
        assert_eq!(records[0].from_year, Some(1837));
        assert_eq!(records[0].to_year, None);
        assert_eq!(records[1].from_year, None);
        assert_eq!(records[1].to_year, Some(1901));
    }

    #[test]
    fn missing_source_columns_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "source.csv", "parish,from_year\nDover,1851\n");

        let err = read_source_records(&path).unwrap_err();
        assert!(matches!(
            err,
            TableError::MissingColumns { ref columns, .. } if columns == &["district", "to_year"]
        ));
    }

    #[test]
    fn reads_official_centroids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "official.csv",
            "district,year,x,y\nDover,1851,631000.5,141000\nBad,year,0,0\n",
        );

        let centroids = read_official_centroids(&path).unwrap();
        assert_eq!(centroids.len(), 1);
        assert_eq!(centroids[0].district, "Dover");
        assert!((centroids[0].x - 631_000.5).abs() < f64::EPSILON);
    }

    #[test]
    fn prior_imputations_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows = read_prior_imputations(&dir.path().join("missing.csv")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn reads_prior_imputations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "summary.csv",
            concat!(
                "district,year,centroid_x,centroid_y,location_imputed,imputation_failed,",
                "imputed_from_district,imputed_distance_km,imputation_source_point\n",
                "Folkestone,1851,0,0,true,false,Dover,5,from_official_name\n",
                "Nowhere,1851,,,false,true,,,\n",
            ),
        );

        let rows = read_prior_imputations(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].location_imputed);
        assert_eq!(
            rows[0].imputation_source_point,
            Some(ImputationSourcePoint::FromOfficialName)
        );
        assert_eq!(rows[1], ImputedLocation::failed("Nowhere".to_string(), 1851));
    }

    #[test]
    fn lists_and_reads_death_extracts() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "cleaned_freebmd_deaths_1861.csv", "surname,district\nJONES,Bala\n");
        write_file(
            &dir,
            "cleaned_freebmd_deaths_1851.csv",
            "surname,district,age\nJONES,Bala,40\nEVANS,,3\nSMITH,Dover (1837-1934),61\n",
        );
        write_file(&dir, "notes.csv", "district\nBala\n");
        write_file(&dir, "cleaned_freebmd_deaths_1871.txt", "district\nBala\n");

        let files = list_death_files(dir.path(), "cleaned_freebmd_deaths_").unwrap();
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["cleaned_freebmd_deaths_1851.csv", "cleaned_freebmd_deaths_1861.csv"]
        );

        let districts = read_death_districts(&files[0]).unwrap();
        assert_eq!(districts, vec!["Bala", "", "Dover (1837-1934)"]);
    }

    #[test]
    fn death_extract_requires_district_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "cleaned_freebmd_deaths_1851.csv", "surname,registration\nJONES,Bala\n");
        assert!(matches!(
            read_death_districts(&path),
            Err(TableError::MissingColumns { .. })
        ));
    }

    #[test]
    fn missing_linkage_tables_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_linkage_summary(&dir.path().join("none.csv")).unwrap().is_empty());
        assert!(read_unlinked_districts(&dir.path().join("none.csv")).unwrap().is_empty());

        let blank = write_file(&dir, "unlinked_districts_all_years.csv", "");
        assert!(read_unlinked_districts(&blank).unwrap().is_empty());
    }
}
