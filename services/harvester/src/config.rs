//! Run configuration.
//!
//! Every path and knob is explicit per run: CLI flags win over the
//! optional YAML run-config file, which wins over defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Optional YAML overlay for a run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub wms_url: Option<String>,
    #[serde(default)]
    pub layers: Vec<String>,
    pub run_dir: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crs: Option<String>,
    pub visible: Option<bool>,
    pub transparent: Option<bool>,
    pub formatted_json: Option<bool>,
    pub cleanup: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&body)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded run config file");
        Ok(config)
    }
}

/// Fully resolved configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// WMS endpoint, as configured (may end in '?').
    pub wms_url: String,

    /// Layer names to harvest. Empty means every advertised data layer.
    pub layers: Vec<String>,

    /// Directory all run artifacts are written under.
    pub run_dir: PathBuf,

    /// Export width in pixels.
    pub width: u32,

    /// Export height in pixels.
    pub height: u32,

    /// Initial layer visibility in the layer file.
    pub visible: bool,

    /// Request a transparent map background.
    pub transparent: bool,

    /// Pretty-print the GeoJSON extract.
    pub formatted_json: bool,

    /// Delete intermediate artifacts after the run.
    pub cleanup: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            wms_url: String::new(),
            layers: Vec::new(),
            run_dir: PathBuf::from("harvest-output"),
            width: 3200,
            height: 1700,
            visible: true,
            transparent: false,
            formatted_json: true,
            cleanup: false,
        }
    }
}

impl RunConfig {
    /// Layer the file overlay onto defaults. CLI flags are applied by the
    /// caller afterwards, so they take precedence.
    pub fn from_file(file: FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            wms_url: file.wms_url.unwrap_or(defaults.wms_url),
            layers: file.layers,
            run_dir: file.run_dir.unwrap_or(defaults.run_dir),
            width: file.width.unwrap_or(defaults.width),
            height: file.height.unwrap_or(defaults.height),
            visible: file.visible.unwrap_or(defaults.visible),
            transparent: file.transparent.unwrap_or(defaults.transparent),
            formatted_json: file.formatted_json.unwrap_or(defaults.formatted_json),
            cleanup: file.cleanup.unwrap_or(defaults.cleanup),
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.wms_url.is_empty(), "No WMS endpoint configured");
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "Export size must be non-zero, got {}x{}",
            self.width,
            self.height
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overlay_fills_defaults() {
        let yaml = r#"
wms_url: "https://example.com/wms?"
layers:
  - roads
  - water
width: 800
cleanup: true
"#;
        let file: FileConfig = serde_yaml::from_str(yaml).unwrap();
        let config = RunConfig::from_file(file);

        assert_eq!(config.wms_url, "https://example.com/wms?");
        assert_eq!(config.layers, vec!["roads", "water"]);
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 1700); // default retained
        assert!(config.cleanup);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = RunConfig::from_file(FileConfig::default());
        assert_eq!(config.width, 3200);
        assert_eq!(config.height, 1700);
        assert!(config.formatted_json);
        assert!(!config.cleanup);
    }

    #[test]
    fn validation_requires_endpoint() {
        let config = RunConfig::default();
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.wms_url = "https://example.com/wms?".to_string();
        assert!(config.validate().is_ok());
    }
}
