//! WMS client for harvesting remote map services.
//!
//! Supports:
//! - GetCapabilities against WMS 1.1.1 and 1.3.0 endpoints
//! - Layer lookup over the advertised layer hierarchy
//! - GetMap image retrieval

pub mod capabilities;
pub mod client;
pub mod exceptions;
pub mod getmap;
pub mod tree;

pub use capabilities::{parse_capabilities, WmsCapabilities};
pub use client::{ClientConfig, WmsClient};
pub use getmap::GetMapRequest;
pub use tree::{find_layer, ServiceDescription};
