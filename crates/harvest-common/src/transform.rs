//! Pixel-to-world affine mapping for exported rasters.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Affine mapping from raster pixel space to world coordinates.
///
/// Origin is the world position of the top-left corner of pixel (0, 0).
/// `pixel_height` is negative: row indices grow downward while world Y
/// grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transform covering `bbox` with a raster of `width` x `height` pixels.
    pub fn for_export(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        Self {
            origin_x: bbox.min_x,
            origin_y: bbox.max_y,
            pixel_width: bbox.width() / width as f64,
            pixel_height: -bbox.height() / height as f64,
        }
    }

    /// World coordinates of the pixel corner at column `col`, row `row`.
    ///
    /// Corner (0, 0) is the top-left of the raster; corner (width, height)
    /// is the bottom-right.
    pub fn corner_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// World coordinates of the center of pixel (col, row).
    pub fn center_to_world(&self, col: u32, row: u32) -> (f64, f64) {
        self.corner_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_match_bbox() {
        let bbox = BoundingBox::new(-120.0, 30.0, -100.0, 40.0);
        let t = GeoTransform::for_export(&bbox, 200, 100);

        assert_eq!(t.corner_to_world(0.0, 0.0), (-120.0, 40.0));
        assert_eq!(t.corner_to_world(200.0, 100.0), (-100.0, 30.0));
    }

    #[test]
    fn test_pixel_center() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let t = GeoTransform::for_export(&bbox, 10, 10);

        // First pixel center sits half a pixel in from the top-left corner.
        assert_eq!(t.center_to_world(0, 0), (0.5, 9.5));
    }
}
