//! Map document: named data frames composing layers.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use harvest_common::{BoundingBox, CrsCode, HarvestError, HarvestResult};

use crate::layer_file::{LayerEntry, LayerFile};

/// Current map document schema version.
pub const MAP_DOCUMENT_VERSION: u32 = 1;

/// Name of the data frame a fresh document starts with.
pub const DEFAULT_FRAME_NAME: &str = "Map";

/// One map frame: a spatial reference plus an ordered set of layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFrame {
    pub name: String,

    /// Spatial reference used for exports from this frame.
    pub spatial_reference: CrsCode,

    /// Extent to render. Defaults to the union of layer extents when unset.
    pub extent: Option<BoundingBox>,

    /// Bottom-to-top draw order.
    pub layers: Vec<LayerEntry>,
}

impl DataFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spatial_reference: CrsCode::wgs84(),
            extent: None,
            layers: Vec::new(),
        }
    }

    /// Extent to export: the explicit one, else the layer union.
    pub fn export_extent(&self) -> Option<BoundingBox> {
        self.extent.or_else(|| {
            self.layers
                .iter()
                .filter_map(|l| l.bbox)
                .reduce(|acc, b| acc.union(&b))
        })
    }
}

/// A map composition document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDocument {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub data_frames: Vec<DataFrame>,
}

impl MapDocument {
    /// A new document with the default "Map" data frame, saved to `path`.
    pub fn create(path: &Path) -> HarvestResult<Self> {
        let doc = Self {
            format_version: MAP_DOCUMENT_VERSION,
            created_at: Utc::now(),
            data_frames: vec![DataFrame::new(DEFAULT_FRAME_NAME)],
        };
        doc.save(path)?;
        Ok(doc)
    }

    pub fn data_frame(&self, name: &str) -> Option<&DataFrame> {
        self.data_frames.iter().find(|f| f.name == name)
    }

    pub fn data_frame_mut(&mut self, name: &str) -> Option<&mut DataFrame> {
        self.data_frames.iter_mut().find(|f| f.name == name)
    }

    /// Insert the layer file's contents at the bottom of `frame`'s draw
    /// order and adopt its extent when the frame has none.
    pub fn add_layer_file_bottom(&mut self, frame: &str, layer_file: &LayerFile) -> HarvestResult<()> {
        let extent = layer_file.extent();
        let frame = self
            .data_frame_mut(frame)
            .ok_or_else(|| HarvestError::DataFrameNotFound(frame.to_string()))?;

        for (i, entry) in layer_file.layers.iter().enumerate() {
            frame.layers.insert(i, entry.clone());
        }
        if frame.extent.is_none() {
            frame.extent = extent;
        }
        Ok(())
    }

    /// All layers across frames, frame order then bottom-to-top.
    pub fn list_layers(&self) -> Vec<&LayerEntry> {
        self.data_frames.iter().flat_map(|f| f.layers.iter()).collect()
    }

    /// Turn every layer's visibility on.
    pub fn set_all_visible(&mut self) {
        for frame in &mut self.data_frames {
            for layer in &mut frame.layers {
                layer.visible = true;
            }
        }
    }

    pub fn save(&self, path: &Path) -> HarvestResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| HarvestError::DocumentWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "Saved map document");
        Ok(())
    }

    /// Save to a new path, returning the freshly loaded copy.
    pub fn save_a_copy(&self, path: &Path) -> HarvestResult<Self> {
        self.save(path)?;
        Self::load(path)
    }

    pub fn load(path: &Path) -> HarvestResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| HarvestError::DocumentRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let doc: Self = serde_json::from_str(&json)?;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_file() -> LayerFile {
        let mut file = LayerFile::new("https://example.com/wms?");
        file.replace_contents(vec![
            LayerEntry {
                name: "roads".to_string(),
                title: "Roads".to_string(),
                source_url: "https://example.com/wms?".to_string(),
                bbox: Some(BoundingBox::new(-10.0, -5.0, 10.0, 5.0)),
                visible: false,
            },
            LayerEntry {
                name: "water".to_string(),
                title: "Water".to_string(),
                source_url: "https://example.com/wms?".to_string(),
                bbox: None,
                visible: false,
            },
        ]);
        file
    }

    #[test]
    fn create_starts_with_map_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.mxd.json");

        let doc = MapDocument::create(&path).unwrap();
        assert!(doc.data_frame(DEFAULT_FRAME_NAME).is_some());
        assert!(path.exists());
    }

    #[test]
    fn layers_insert_at_bottom_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = MapDocument::create(&dir.path().join("doc.mxd.json")).unwrap();

        // Pre-existing layer should end up above the inserted group.
        doc.data_frame_mut("Map").unwrap().layers.push(LayerEntry {
            name: "existing".to_string(),
            title: "Existing".to_string(),
            source_url: "u".to_string(),
            bbox: None,
            visible: true,
        });

        doc.add_layer_file_bottom("Map", &layer_file()).unwrap();

        let names: Vec<&str> = doc.list_layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["roads", "water", "existing"]);
    }

    #[test]
    fn frame_adopts_layer_extent() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = MapDocument::create(&dir.path().join("doc.mxd.json")).unwrap();
        doc.add_layer_file_bottom("Map", &layer_file()).unwrap();

        let extent = doc.data_frame("Map").unwrap().export_extent().unwrap();
        assert_eq!(extent, BoundingBox::new(-10.0, -5.0, 10.0, 5.0));
    }

    #[test]
    fn unknown_frame_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = MapDocument::create(&dir.path().join("doc.mxd.json")).unwrap();
        let err = doc.add_layer_file_bottom("Nope", &layer_file()).unwrap_err();
        assert!(matches!(err, HarvestError::DataFrameNotFound(_)));
    }

    #[test]
    fn set_all_visible_flips_every_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = MapDocument::create(&dir.path().join("doc.mxd.json")).unwrap();
        doc.add_layer_file_bottom("Map", &layer_file()).unwrap();

        assert!(doc.list_layers().iter().any(|l| !l.visible));
        doc.set_all_visible();
        assert!(doc.list_layers().iter().all(|l| l.visible));
    }

    #[test]
    fn save_a_copy_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = MapDocument::create(&dir.path().join("doc1.mxd.json")).unwrap();
        doc.add_layer_file_bottom("Map", &layer_file()).unwrap();

        let copy = doc.save_a_copy(&dir.path().join("doc2.mxd.json")).unwrap();
        assert_eq!(copy.list_layers().len(), doc.list_layers().len());
    }
}
