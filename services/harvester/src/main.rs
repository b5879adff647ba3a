//! WMS harvest pipeline binary.
//!
//! Connects to a WMS endpoint, saves the requested layers as a layer
//! file, composes them into a map document, exports a georeferenced
//! raster, vectorizes it, and writes a GeoJSON extract.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use harvester::config::{FileConfig, RunConfig};
use harvester::pipeline;

#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(about = "Harvest WMS layers into a GeoJSON extract")]
struct Args {
    /// WMS endpoint URL
    #[arg(long, env = "WMS_URL")]
    url: Option<String>,

    /// Layer name to harvest (repeatable; default: all advertised layers)
    #[arg(short, long = "layer")]
    layers: Vec<String>,

    /// Directory for run artifacts
    #[arg(long, env = "RUN_DIR")]
    run_dir: Option<PathBuf>,

    /// Export width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Export height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Leave harvested layers hidden in the layer file
    #[arg(long)]
    hidden: bool,

    /// Request a transparent map background
    #[arg(long)]
    transparent: bool,

    /// Write compact GeoJSON instead of formatted
    #[arg(long)]
    compact_json: bool,

    /// Delete intermediate artifacts after the run
    #[arg(long)]
    cleanup: bool,

    /// Optional YAML run-config file
    #[arg(long, env = "HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Resolve the run configuration: defaults, then the config file,
    /// then CLI flags on top.
    fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(FileConfig::load(path)?),
            None => RunConfig::default(),
        };

        if let Some(url) = self.url {
            config.wms_url = url;
        }
        if !self.layers.is_empty() {
            config.layers = self.layers;
        }
        if let Some(run_dir) = self.run_dir {
            config.run_dir = run_dir;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if self.hidden {
            config.visible = false;
        }
        if self.transparent {
            config.transparent = true;
        }
        if self.compact_json {
            config.formatted_json = false;
        }
        if self.cleanup {
            config.cleanup = true;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.into_config()?;
    info!(url = %config.wms_url, run_dir = %config.run_dir.display(), "Starting WMS harvest");

    let summary = pipeline::run(&config).await?;

    info!(
        layers_found = summary.layers_found,
        layers_missing = summary.layers_missing,
        polygons = summary.polygon_count,
        locked_files = summary.locked_files,
        extract = %summary.geojson_path.display(),
        "Harvest complete"
    );

    Ok(())
}
