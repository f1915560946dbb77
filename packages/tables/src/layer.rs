//! Constructed district layers as `GeoJSON` `FeatureCollection` files.

use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use rd_backbone_registration_models::ConstructedDistrictGeometry;

use crate::{TableError, ensure_parent};

/// Path of the layer for `year` under `dir`.
#[must_use]
pub fn layer_path(dir: &Path, year: i32) -> PathBuf {
    dir.join(format!("rd_{year}_constructed.geojson"))
}

fn to_feature(g: &ConstructedDistrictGeometry) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("district".to_string(), JsonValue::from(g.district.clone()));
    properties.insert("census_year".to_string(), JsonValue::from(g.census_year));
    properties.insert(
        "n_parishes_matched".to_string(),
        JsonValue::from(g.n_parishes_matched),
    );
    properties.insert("centroid_x".to_string(), JsonValue::from(g.centroid.x()));
    properties.insert("centroid_y".to_string(), JsonValue::from(g.centroid.y()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&g.polygon))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Writes one census year's constructed geometries to
/// [`layer_path`]`(dir, year)` and returns the path written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_layer(
    dir: &Path,
    year: i32,
    geometries: &[ConstructedDistrictGeometry],
) -> Result<PathBuf, TableError> {
    let path = layer_path(dir, year);
    ensure_parent(&path)?;

    let collection = FeatureCollection {
        bbox: None,
        features: geometries.iter().map(to_feature).collect(),
        foreign_members: None,
    };

    std::fs::write(&path, collection.to_string())?;
    log::info!(
        "Wrote {} constructed districts to {}",
        geometries.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, Point, polygon};
    use geojson::GeoJson;

    use super::*;

    #[test]
    fn writes_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = ConstructedDistrictGeometry {
            district: "Dover".to_string(),
            census_year: 1851,
            polygon: MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
            ]]),
            n_parishes_matched: 3,
            centroid: Point::new(5.0, 5.0),
        };

        let path = write_layer(&dir.path().join("constructed"), 1851, &[geometry]).unwrap();
        assert!(path.ends_with("constructed/rd_1851_constructed.geojson"));

        let parsed: GeoJson = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        let GeoJson::FeatureCollection(collection) = parsed else {
            panic!("expected a feature collection");
        };
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(
            feature.property("district").and_then(JsonValue::as_str),
            Some("Dover")
        );
        assert_eq!(
            feature.property("n_parishes_matched").and_then(JsonValue::as_u64),
            Some(3)
        );
        assert!(matches!(
            feature.geometry.as_ref().map(|g| &g.value),
            Some(geojson::Value::MultiPolygon(_))
        ));
    }
}
