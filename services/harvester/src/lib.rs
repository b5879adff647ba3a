//! WMS harvesting pipeline.
//!
//! One-shot, sequential run: connect to a WMS endpoint, group the
//! requested layers into a layer file, compose a map document, export a
//! georeferenced raster, vectorize it, reduce the polygons, and emit a
//! GeoJSON extract. Finishes with a locked-file scan and optional cleanup
//! of intermediate artifacts.

pub mod catalog;
pub mod config;
pub mod lockscan;
pub mod pipeline;
