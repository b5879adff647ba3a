//! The sequential harvest pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use harvest_common::{GeoTransform, HarvestError};
use map_doc::map_document::DEFAULT_FRAME_NAME;
use map_doc::{LayerEntry, LayerFile, MapDocument, WorldFile};
use vector_ops::trace::GRIDCODE_FIELD;
use vector_ops::{
    dissolve, explode, to_feature_collection, trace_polygons, write_geojson, FeatureSet, FieldDef,
    GridcodeRaster, Value,
};
use wms_client::{find_layer, ClientConfig, GetMapRequest, WmsCapabilities, WmsClient};

use crate::catalog::{ArtifactKind, Catalog};
use crate::config::RunConfig;
use crate::lockscan;

/// Text field dissolved on; every polygon gets the same value so the
/// dissolve collapses the selection into one multipart feature.
pub const MERGE_FIELD: &str = "MERGE";

/// Float field holding each polygon's vertex count.
pub const VERTICES_FIELD: &str = "VERTICES";

/// Where each run artifact lives under the run directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub layer_file: PathBuf,
    pub map_document: PathBuf,
    pub map_composed: PathBuf,
    pub map_visible: PathBuf,
    pub raster: PathBuf,
    pub world_file: PathBuf,
    pub geojson: PathBuf,
    pub catalog: PathBuf,
}

impl RunPaths {
    pub fn new(run_dir: &Path, frame_name: &str) -> Self {
        Self {
            layer_file: run_dir.join("layers.lyr.json"),
            map_document: run_dir.join("map.mxd.json"),
            map_composed: run_dir.join("map_composed.mxd.json"),
            map_visible: run_dir.join("map_visible.mxd.json"),
            raster: run_dir.join(format!("{}.tif", frame_name)),
            world_file: run_dir.join(format!("{}.tfw", frame_name)),
            geojson: run_dir.join("extract.geojson"),
            catalog: run_dir.join("catalog.json"),
        }
    }
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub layers_found: usize,
    pub layers_missing: usize,
    pub polygon_count: usize,
    pub locked_files: usize,
    pub geojson_path: PathBuf,
}

/// Execute the full pipeline.
pub async fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    fs::create_dir_all(&config.run_dir)
        .with_context(|| format!("Failed to create run directory {}", config.run_dir.display()))?;

    let paths = RunPaths::new(&config.run_dir, DEFAULT_FRAME_NAME);
    let mut catalog = Catalog::new();

    // Connect and group the requested layers into a layer file.
    let client = WmsClient::new(config.wms_url.as_str(), ClientConfig::default())
        .context("Failed to build WMS client")?;
    let caps = client
        .get_capabilities()
        .await
        .context("Failed to connect to WMS endpoint")?;

    let (layer_file, missing) = build_group_layer(&caps, config)?;
    layer_file.save(&paths.layer_file)?;
    catalog.add(
        "layers",
        ArtifactKind::LayerFile,
        paths.layer_file.display().to_string(),
        config.wms_url.as_str(),
    );

    // Compose the map document: insert the group at the bottom, then a
    // second copy with every layer turned visible.
    let mut doc = MapDocument::create(&paths.map_document)?;
    doc.add_layer_file_bottom(DEFAULT_FRAME_NAME, &layer_file)?;
    let mut composed = doc.save_a_copy(&paths.map_composed)?;

    for layer in composed.list_layers() {
        info!(layer = %layer.name, title = %layer.title, "Map layer");
    }
    composed.set_all_visible();
    let visible_doc = composed.save_a_copy(&paths.map_visible)?;
    catalog.add(
        "map_visible",
        ArtifactKind::MapDocument,
        paths.map_visible.display().to_string(),
        config.wms_url.as_str(),
    );

    // Export a georeferenced raster of the composed frame.
    let frame = visible_doc
        .data_frame(DEFAULT_FRAME_NAME)
        .ok_or_else(|| HarvestError::DataFrameNotFound(DEFAULT_FRAME_NAME.to_string()))?;
    let spatial_reference = frame.spatial_reference.clone();
    let extent = frame
        .export_extent()
        .context("No extent advertised for the harvested layers; cannot export")?;

    let mut request = GetMapRequest::new(
        frame.layers.iter().map(|l| l.name.clone()).collect(),
        spatial_reference.clone(),
        extent,
        config.width,
        config.height,
    );
    request.transparent = config.transparent;
    if caps.version.starts_with("1.1") {
        request.version = caps.version.clone();
    }

    let bytes = client
        .fetch_map(&request)
        .await
        .context("GetMap request failed")?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| HarvestError::RasterDecode(e.to_string()))?;

    let rgb = image::DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.save(&paths.raster)
        .with_context(|| format!("Failed to write raster {}", paths.raster.display()))?;

    let transform = GeoTransform::for_export(&extent, config.width, config.height);
    WorldFile::from_transform(&transform).write(&paths.world_file)?;
    info!(
        raster = %paths.raster.display(),
        width = config.width,
        height = config.height,
        "Exported georeferenced raster"
    );
    catalog.add(
        DEFAULT_FRAME_NAME,
        ArtifactKind::Raster,
        paths.raster.display().to_string(),
        config.wms_url.as_str(),
    );

    // Vectorize and reduce.
    let raster = GridcodeRaster::from_image(&image)?;
    let final_set = reduce_polygons(&raster, spatial_reference)?;
    info!(count = final_set.len(), "Counted polygons");

    // GeoJSON extract.
    let collection = to_feature_collection(&final_set, &transform);
    write_geojson(&paths.geojson, &collection, config.formatted_json)?;
    catalog.add(
        "extract",
        ArtifactKind::GeoJson,
        paths.geojson.display().to_string(),
        config.wms_url.as_str(),
    );
    catalog.save(&paths.catalog)?;

    // Locked-file scan over everything the run touched.
    let locked = lockscan::scan_locked(&config.run_dir);

    if config.cleanup {
        cleanup_intermediates(&paths);
    }

    Ok(RunSummary {
        layers_found: layer_file.layers.len(),
        layers_missing: missing,
        polygon_count: final_set.len(),
        locked_files: locked.len(),
        geojson_path: paths.geojson,
    })
}

/// Look up the requested layer names and collect them into a layer file.
///
/// A name the service does not advertise is warned about and skipped, not
/// fatal. No requested names means every advertised data layer. Returns
/// the layer file and how many names were missing.
pub fn build_group_layer(
    caps: &WmsCapabilities,
    config: &RunConfig,
) -> Result<(LayerFile, usize)> {
    let mut entries = Vec::new();
    let mut missing = 0usize;

    if config.layers.is_empty() {
        for leaf in caps.root.leaves() {
            entries.push(layer_entry(leaf.name.clone(), leaf.title.clone(), leaf.bbox, caps, config));
        }
    } else {
        for name in &config.layers {
            match find_layer(&caps.root, name) {
                Some(leaf) => {
                    entries.push(layer_entry(leaf.name.clone(), leaf.title.clone(), leaf.bbox, caps, config));
                }
                None => {
                    warn!(layer = %name, "Unable to find layer");
                    missing += 1;
                }
            }
        }
    }

    if entries.is_empty() {
        return Err(HarvestError::NoLayersSelected(format!(
            "none of the requested layers are advertised by {}",
            config.wms_url
        ))
        .into());
    }

    let mut layer_file = LayerFile::new(config.wms_url.as_str());
    layer_file.replace_contents(entries);
    Ok((layer_file, missing))
}

fn layer_entry(
    name: String,
    title: String,
    bbox: Option<harvest_common::BoundingBox>,
    caps: &WmsCapabilities,
    config: &RunConfig,
) -> LayerEntry {
    LayerEntry {
        name,
        title,
        source_url: config.wms_url.clone(),
        // Leaves without their own extent inherit the service root's.
        bbox: bbox.or(caps.root.bbox),
        visible: config.visible,
    }
}

/// Raster to final polygon set: trace, drop no-data, dissolve the rest
/// into one multipart feature, explode it back to singleparts, and stamp
/// vertex counts and the projection.
pub fn reduce_polygons(
    raster: &GridcodeRaster,
    spatial_reference: harvest_common::CrsCode,
) -> Result<FeatureSet> {
    let traced = trace_polygons(raster)?;
    info!(features = traced.len(), "Raster converted to polygons");

    let no_data = Value::Int(GridcodeRaster::NO_DATA as i64);
    let mut selected = traced.select(|f| f.attribute(GRIDCODE_FIELD) != Some(&no_data));
    info!(features = selected.len(), "Selected data polygons");

    selected.add_field(FieldDef::text(MERGE_FIELD, 5))?;
    selected.calculate_field(MERGE_FIELD, |_| Value::Text("1".to_string()))?;

    let dissolved = dissolve(&selected, MERGE_FIELD)?;
    let mut exploded = explode(&dissolved);

    exploded.add_field(FieldDef::float(VERTICES_FIELD))?;
    exploded.calculate_field(VERTICES_FIELD, |f| {
        Value::Float(f.geometry.vertex_count() as f64)
    })?;

    exploded.define_projection(spatial_reference);
    Ok(exploded)
}

/// Delete the intermediate artifacts, keeping the layer file, the GeoJSON
/// extract, and the catalog.
fn cleanup_intermediates(paths: &RunPaths) {
    for path in [
        &paths.map_document,
        &paths.map_composed,
        &paths.map_visible,
        &paths.raster,
        &paths.world_file,
    ] {
        match fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "Deleted intermediate artifact"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete artifact"),
        }
    }
}
