//! Common types shared across the wms-harvest workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod transform;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{HarvestError, HarvestResult};
pub use transform::GeoTransform;
