//! Vector operations over harvested rasters.
//!
//! Converts an exported map raster into polygon features and carries them
//! through the attribute/geometry operations the pipeline needs: selection,
//! field calculation, dissolve, multipart explosion, vertex metrics, and
//! GeoJSON export.

pub mod features;
pub mod geojson;
pub mod geometry;
pub mod grid;
pub mod ops;
pub mod trace;

pub use features::{Feature, FeatureSet, FieldDef, FieldType, Value};
pub use geojson::{to_feature_collection, write_geojson, GeoJsonFeatureCollection};
pub use geometry::{MultiPolygon, PolygonGeometry, Ring};
pub use grid::GridcodeRaster;
pub use ops::{dissolve, explode};
pub use trace::trace_polygons;
