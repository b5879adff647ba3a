//! Harvest catalog table.
//!
//! A small table recording what a run produced and where it came from,
//! persisted as JSON rows next to the artifacts. Column names mirror the
//! legacy scrape table this replaces.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use harvest_common::{HarvestError, HarvestResult};

/// Artifact kinds recorded in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    LayerFile,
    MapDocument,
    Raster,
    GeoJson,
}

/// One catalog row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "FILEID")]
    pub file_id: String,

    #[serde(rename = "TYPE")]
    pub kind: ArtifactKind,

    #[serde(rename = "URL")]
    pub url: String,

    #[serde(rename = "URLSERV")]
    pub service_url: String,
}

/// The run's catalog table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub created_at: DateTime<Utc>,
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Record an artifact. `file_id` is usually the file stem.
    pub fn add(
        &mut self,
        file_id: impl Into<String>,
        kind: ArtifactKind,
        url: impl Into<String>,
        service_url: impl Into<String>,
    ) {
        self.entries.push(CatalogEntry {
            file_id: file_id.into(),
            kind,
            url: url.into(),
            service_url: service_url.into(),
        });
    }

    pub fn save(&self, path: &Path) -> HarvestResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| HarvestError::DocumentWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), rows = self.entries.len(), "Saved harvest catalog");
        Ok(())
    }

    pub fn load(path: &Path) -> HarvestResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| HarvestError::DocumentRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog: Self = serde_json::from_str(&json)?;
        Ok(catalog)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
