//! Coordinate Reference System identifiers.
//!
//! A harvesting client has to accept whatever codes a remote service
//! advertises, so this is a normalized code rather than a closed set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized CRS identifier, e.g. "EPSG:4326".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrsCode(String);

impl CrsCode {
    /// WGS84 geographic, the default spatial reference for new map documents.
    pub fn wgs84() -> Self {
        Self("EPSG:4326".to_string())
    }

    /// Parse a CRS string from a capabilities document or WMS parameter.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:4326"
    /// - "CRS:84" (equivalent to EPSG:4326 with lon/lat axis order)
    pub fn from_wms_string(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(CrsParseError::Empty);
        }
        if normalized == "CRS:84" {
            return Ok(Self::wgs84());
        }
        if !normalized.contains(':') {
            return Err(CrsParseError::InvalidFormat(s.to_string()));
        }

        Ok(Self(normalized))
    }

    /// The normalized "AUTHORITY:CODE" string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is a geographic (lat/lon degree) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self.0.as_str(), "EPSG:4326" | "EPSG:4269")
    }

    /// URN form used by GeoJSON named-CRS members,
    /// e.g. "urn:ogc:def:crs:EPSG::4326".
    pub fn to_urn(&self) -> String {
        match self.0.split_once(':') {
            Some((authority, code)) => format!("urn:ogc:def:crs:{}::{}", authority, code),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Empty CRS identifier")]
    Empty,

    #[error("Invalid CRS identifier: {0}. Expected 'AUTHORITY:CODE'")]
    InvalidFormat(String),
}
