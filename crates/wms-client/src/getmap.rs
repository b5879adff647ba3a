//! GetMap request construction.

use harvest_common::{BoundingBox, CrsCode};

/// GetMap request parameters.
#[derive(Debug, Clone)]
pub struct GetMapRequest {
    /// Layer names, bottom-to-top draw order.
    pub layers: Vec<String>,

    /// Style names, parallel to `layers`. Empty entries request the default.
    pub styles: Vec<String>,

    /// Coordinate reference system for `bbox` and the output image.
    pub crs: CrsCode,

    /// Requested extent.
    pub bbox: BoundingBox,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Output format (e.g., "image/png").
    pub format: String,

    /// Request a transparent background where the format supports it.
    pub transparent: bool,

    /// WMS protocol version ("1.1.1" or "1.3.0").
    pub version: String,
}

impl GetMapRequest {
    /// A 1.3.0 PNG request for `layers` over `bbox`.
    pub fn new(layers: Vec<String>, crs: CrsCode, bbox: BoundingBox, width: u32, height: u32) -> Self {
        let styles = vec![String::new(); layers.len()];
        Self {
            layers,
            styles,
            crs,
            bbox,
            width,
            height,
            format: "image/png".to_string(),
            transparent: false,
            version: "1.3.0".to_string(),
        }
    }

    /// Render the request as a KVP query URL against `base_url`.
    ///
    /// WMS 1.3.0 uses the CRS's natural axis order, so geographic requests
    /// carry BBOX as miny,minx,maxy,maxx. 1.1.1 is always x,y.
    pub fn to_query_url(&self, base_url: &str) -> String {
        let crs_param = if self.version.starts_with("1.1") {
            "SRS"
        } else {
            "CRS"
        };

        let bbox = if !self.version.starts_with("1.1") && self.crs.is_geographic() {
            format!(
                "{},{},{},{}",
                self.bbox.min_y, self.bbox.min_x, self.bbox.max_y, self.bbox.max_x
            )
        } else {
            self.bbox.to_wms_string()
        };

        let query = format!(
            "SERVICE=WMS&VERSION={version}&REQUEST=GetMap&LAYERS={layers}&STYLES={styles}&{crs_param}={crs}&BBOX={bbox}&WIDTH={width}&HEIGHT={height}&FORMAT={format}&TRANSPARENT={transparent}",
            version = self.version,
            layers = join_encoded(&self.layers),
            styles = join_encoded(&self.styles),
            crs_param = crs_param,
            crs = self.crs,
            bbox = bbox,
            width = self.width,
            height = self.height,
            format = encode_component(&self.format),
            transparent = if self.transparent { "TRUE" } else { "FALSE" },
        );

        append_query(base_url, &query)
    }
}

/// Append a query string to a base URL that may already end in '?' or
/// carry parameters (harvest endpoints are often configured with a
/// trailing '?', e.g. ".../MapServer/WMSServer?").
pub(crate) fn append_query(base_url: &str, query: &str) -> String {
    if base_url.ends_with('?') || base_url.ends_with('&') {
        format!("{}{}", base_url, query)
    } else if base_url.contains('?') {
        format!("{}&{}", base_url, query)
    } else {
        format!("{}?{}", base_url, query)
    }
}

fn join_encoded(values: &[String]) -> String {
    values
        .iter()
        .map(|v| encode_component(v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Percent-encode the characters that would break a KVP value. Layer names
/// with spaces are common in harvested services.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b' ' => out.push_str("%20"),
            b'%' => out.push_str("%25"),
            b'&' => out.push_str("%26"),
            b'+' => out.push_str("%2B"),
            b',' => out.push_str("%2C"),
            b'=' => out.push_str("%3D"),
            b'?' => out.push_str("%3F"),
            b'#' => out.push_str("%23"),
            _ => out.push(b as char),
        }
    }
    out
}
