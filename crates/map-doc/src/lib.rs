//! Persisted map artifacts.
//!
//! The harvester writes three kinds of sidecar documents: a layer file
//! (a saved group of service layers), a map document (named data frames
//! composing layer files), and the world file georeferencing an exported
//! raster. Layer files and map documents are versioned JSON.

pub mod layer_file;
pub mod map_document;
pub mod world_file;

pub use layer_file::{LayerEntry, LayerFile};
pub use map_document::{DataFrame, MapDocument};
pub use world_file::WorldFile;
