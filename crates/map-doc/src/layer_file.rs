//! Layer file: a persisted group of service layers.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use harvest_common::{BoundingBox, HarvestError, HarvestResult};

/// Current layer file schema version.
pub const LAYER_FILE_VERSION: u32 = 1;

/// One layer inside a layer file or data frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Machine name, as advertised by the service.
    pub name: String,

    /// Human-readable title.
    pub title: String,

    /// Endpoint the layer is served from.
    pub source_url: String,

    /// Advertised extent, if the service published one.
    pub bbox: Option<BoundingBox>,

    /// Draw visibility.
    pub visible: bool,
}

/// A saved group of layers from one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerFile {
    pub format_version: u32,
    pub service_url: String,
    pub created_at: DateTime<Utc>,
    /// Bottom-to-top draw order.
    pub layers: Vec<LayerEntry>,
}

impl LayerFile {
    /// An empty layer file for `service_url`.
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            format_version: LAYER_FILE_VERSION,
            service_url: service_url.into(),
            created_at: Utc::now(),
            layers: Vec::new(),
        }
    }

    /// Replace the stored group with `layers`.
    pub fn replace_contents(&mut self, layers: Vec<LayerEntry>) {
        self.layers = layers;
    }

    /// Union of the entries' advertised extents.
    pub fn extent(&self) -> Option<BoundingBox> {
        self.layers
            .iter()
            .filter_map(|l| l.bbox)
            .reduce(|acc, b| acc.union(&b))
    }

    pub fn save(&self, path: &Path) -> HarvestResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| HarvestError::DocumentWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), layers = self.layers.len(), "Saved layer file");
        Ok(())
    }

    pub fn load(path: &Path) -> HarvestResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| HarvestError::DocumentRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file: Self = serde_json::from_str(&json)?;
        Ok(file)
    }
}
