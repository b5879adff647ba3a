//! GeoJSON export.
//!
//! Serializes a feature set as a FeatureCollection, mapping pixel-corner
//! rings to world coordinates through the export's affine transform.
//! Positions are strictly two-dimensional; no Z or M values are written.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use harvest_common::{GeoTransform, HarvestError, HarvestResult};

use crate::features::{FeatureSet, Value};
use crate::geometry::Ring;

#[derive(Debug, Serialize)]
pub struct GeoJsonFeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<GeoJsonCrs>,
    pub features: Vec<GeoJsonFeature>,
}

/// Legacy named-CRS member, kept so consumers see the projection the
/// extract was defined in.
#[derive(Debug, Serialize)]
pub struct GeoJsonCrs {
    #[serde(rename = "type")]
    pub crs_type: &'static str,
    pub properties: GeoJsonCrsProperties,
}

#[derive(Debug, Serialize)]
pub struct GeoJsonCrsProperties {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct GeoJsonFeature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    pub geometry: GeoJsonGeometry,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

/// Build a FeatureCollection from `set`, positioning vertices with
/// `transform`.
pub fn to_feature_collection(
    set: &FeatureSet,
    transform: &GeoTransform,
) -> GeoJsonFeatureCollection {
    let features = set
        .features
        .iter()
        .map(|feature| {
            let polygons: Vec<Vec<Vec<[f64; 2]>>> = feature
                .geometry
                .parts
                .iter()
                .map(|part| part.rings().map(|r| close_ring(r, transform)).collect())
                .collect();

            let geometry = if polygons.len() == 1 {
                GeoJsonGeometry::Polygon {
                    coordinates: polygons.into_iter().next().unwrap(),
                }
            } else {
                GeoJsonGeometry::MultiPolygon {
                    coordinates: polygons,
                }
            };

            let mut properties = serde_json::Map::new();
            for (name, value) in &feature.attributes {
                properties.insert(name.clone(), attribute_to_json(value));
            }

            GeoJsonFeature {
                feature_type: "Feature",
                geometry,
                properties,
            }
        })
        .collect();

    GeoJsonFeatureCollection {
        collection_type: "FeatureCollection",
        crs: set.crs.as_ref().map(|code| GeoJsonCrs {
            crs_type: "name",
            properties: GeoJsonCrsProperties {
                name: code.to_urn(),
            },
        }),
        features,
    }
}

/// Serialize and write the collection. `formatted` pretty-prints.
pub fn write_geojson(
    path: &Path,
    collection: &GeoJsonFeatureCollection,
    formatted: bool,
) -> HarvestResult<()> {
    let json = if formatted {
        serde_json::to_string_pretty(collection)?
    } else {
        serde_json::to_string(collection)?
    };
    fs::write(path, json).map_err(|e| HarvestError::DocumentWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    info!(
        path = %path.display(),
        features = collection.features.len(),
        "Wrote GeoJSON extract"
    );
    Ok(())
}

/// Map a pixel ring to closed world coordinates. Pixel rings wind with
/// the interior on the right in y-down space; reversing them after the
/// world transform's y-flip leaves exteriors counterclockwise and holes
/// clockwise, the GeoJSON right-hand rule.
fn close_ring(ring: &Ring, transform: &GeoTransform) -> Vec<[f64; 2]> {
    let mut coords: Vec<[f64; 2]> = ring
        .points
        .iter()
        .rev()
        .map(|&(x, y)| {
            let (wx, wy) = transform.corner_to_world(x as f64, y as f64);
            [wx, wy]
        })
        .collect();
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    coords
}

fn attribute_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Int(v) => serde_json::Value::Number((*v).into()),
        Value::Float(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FeatureSet, FieldDef};
    use crate::geometry::{MultiPolygon, PolygonGeometry, Ring};
    use harvest_common::{BoundingBox, CrsCode};

    fn pixel_square() -> PolygonGeometry {
        PolygonGeometry {
            outer: Ring::new(vec![(0, 0), (1, 0), (1, 1), (0, 1)]),
            holes: Vec::new(),
        }
    }

    fn identity_like_transform() -> GeoTransform {
        // 10x10 raster over a 0..10 world box: one pixel per world unit.
        GeoTransform::for_export(&BoundingBox::new(0.0, 0.0, 10.0, 10.0), 10, 10)
    }

    fn sample_set() -> FeatureSet {
        let mut set = FeatureSet::new(vec![FieldDef::float("VERTICES")]);
        let mut feature = Feature::new(MultiPolygon::single(pixel_square()));
        feature
            .attributes
            .insert("VERTICES".to_string(), Value::Float(4.0));
        set.features.push(feature);
        set
    }

    #[test]
    fn singlepart_exports_as_polygon() {
        let fc = to_feature_collection(&sample_set(), &identity_like_transform());
        let json = serde_json::to_value(&fc).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(json["features"][0]["properties"]["VERTICES"], 4.0);
    }

    #[test]
    fn rings_are_closed_and_y_flipped() {
        let fc = to_feature_collection(&sample_set(), &identity_like_transform());
        let json = serde_json::to_value(&fc).unwrap();

        let ring = &json["features"][0]["geometry"]["coordinates"][0];
        let coords = ring.as_array().unwrap();
        assert_eq!(coords.len(), 5);
        assert_eq!(coords.first(), coords.last());
        // Pixel corner (0, 1) maps to world (0, 9); the exported exterior
        // runs counterclockwise: right, up, left, down.
        assert_eq!(coords[0], serde_json::json!([0.0, 9.0]));
        assert_eq!(coords[1], serde_json::json!([1.0, 9.0]));
        assert_eq!(coords[2], serde_json::json!([1.0, 10.0]));
        assert_eq!(coords[3], serde_json::json!([0.0, 10.0]));
    }

    #[test]
    fn positions_have_no_z() {
        let fc = to_feature_collection(&sample_set(), &identity_like_transform());
        let json = serde_json::to_value(&fc).unwrap();

        let ring = json["features"][0]["geometry"]["coordinates"][0]
            .as_array()
            .unwrap();
        assert!(ring.iter().all(|pos| pos.as_array().unwrap().len() == 2));
    }

    #[test]
    fn multipart_exports_as_multipolygon() {
        let mut set = sample_set();
        set.features[0].geometry.parts.push(PolygonGeometry {
            outer: Ring::new(vec![(3, 3), (4, 3), (4, 4), (3, 4)]),
            holes: Vec::new(),
        });

        let fc = to_feature_collection(&set, &identity_like_transform());
        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["features"][0]["geometry"]["type"], "MultiPolygon");
    }

    #[test]
    fn crs_member_present_once_defined() {
        let mut set = sample_set();
        let fc = to_feature_collection(&set, &identity_like_transform());
        assert!(fc.crs.is_none());

        set.define_projection(CrsCode::wgs84());
        let fc = to_feature_collection(&set, &identity_like_transform());
        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(
            json["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::4326"
        );
    }

    #[test]
    fn write_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.geojson");

        let mut set = sample_set();
        set.define_projection(CrsCode::wgs84());
        let fc = to_feature_collection(&set, &identity_like_transform());
        write_geojson(&path, &fc, true).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["features"].as_array().unwrap().len(), 1);
        // Pretty printing was requested.
        assert!(body.contains('\n'));
    }
}
