//! Error types for the wms-harvest pipeline.

use thiserror::Error;

/// Result type alias using HarvestError.
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Primary error type for harvest operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    // === WMS Client Errors ===
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("WMS service exception [{code}]: {message}")]
    ServiceException { code: String, message: String },

    #[error("Failed to parse capabilities document: {0}")]
    CapabilitiesParse(String),

    #[error("Unexpected response content type: {0}")]
    UnexpectedContentType(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    // === Document Errors ===
    #[error("Failed to read document {path}: {message}")]
    DocumentRead { path: String, message: String },

    #[error("Failed to write document {path}: {message}")]
    DocumentWrite { path: String, message: String },

    // === Raster / Geometry Errors ===
    #[error("Failed to decode raster image: {0}")]
    RasterDecode(String),

    #[error("Raster has zero extent")]
    EmptyRaster,

    #[error("Field already exists: {0}")]
    FieldExists(String),

    #[error("Field not found: {0}")]
    FieldMissing(String),

    // === Pipeline Errors ===
    #[error("No layers selected: {0}")]
    NoLayersSelected(String),

    #[error("Data frame not found: {0}")]
    DataFrameNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Serialization(err.to_string())
    }
}

impl From<crate::bbox::BboxParseError> for HarvestError {
    fn from(err: crate::bbox::BboxParseError) -> Self {
        HarvestError::InvalidBbox(err.to_string())
    }
}

impl From<crate::crs::CrsParseError> for HarvestError {
    fn from(err: crate::crs::CrsParseError) -> Self {
        HarvestError::InvalidCrs(err.to_string())
    }
}
