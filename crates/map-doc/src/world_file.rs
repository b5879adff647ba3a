//! World file sidecars for exported rasters.
//!
//! The six-line ESRI world file layout: x pixel size, row rotation, column
//! rotation, y pixel size (negative), then the world coordinates of the
//! CENTER of the upper-left pixel.

use std::fs;
use std::path::Path;

use harvest_common::{GeoTransform, HarvestError, HarvestResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    pub x_pixel_size: f64,
    pub row_rotation: f64,
    pub column_rotation: f64,
    pub y_pixel_size: f64,
    pub upper_left_x: f64,
    pub upper_left_y: f64,
}

impl WorldFile {
    /// Build from an export transform. North-up exports carry no rotation.
    pub fn from_transform(transform: &GeoTransform) -> Self {
        let (center_x, center_y) = transform.center_to_world(0, 0);
        Self {
            x_pixel_size: transform.pixel_width,
            row_rotation: 0.0,
            column_rotation: 0.0,
            y_pixel_size: transform.pixel_height,
            upper_left_x: center_x,
            upper_left_y: center_y,
        }
    }

    pub fn to_transform(&self) -> GeoTransform {
        GeoTransform {
            origin_x: self.upper_left_x - self.x_pixel_size / 2.0,
            origin_y: self.upper_left_y - self.y_pixel_size / 2.0,
            pixel_width: self.x_pixel_size,
            pixel_height: self.y_pixel_size,
        }
    }

    pub fn write(&self, path: &Path) -> HarvestResult<()> {
        let body = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n",
            self.x_pixel_size,
            self.row_rotation,
            self.column_rotation,
            self.y_pixel_size,
            self.upper_left_x,
            self.upper_left_y
        );
        fs::write(path, body).map_err(|e| HarvestError::DocumentWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn read(path: &Path) -> HarvestResult<Self> {
        let body = fs::read_to_string(path).map_err(|e| HarvestError::DocumentRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let values: Vec<f64> = body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| HarvestError::DocumentRead {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if values.len() != 6 {
            return Err(HarvestError::DocumentRead {
                path: path.display().to_string(),
                message: format!("expected 6 coefficients, found {}", values.len()),
            });
        }

        Ok(Self {
            x_pixel_size: values[0],
            row_rotation: values[1],
            column_rotation: values[2],
            y_pixel_size: values[3],
            upper_left_x: values[4],
            upper_left_y: values[5],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_common::BoundingBox;

    #[test]
    fn coefficients_reproduce_export_bbox() {
        let bbox = BoundingBox::new(-120.0, 30.0, -100.0, 40.0);
        let transform = GeoTransform::for_export(&bbox, 3200, 1700);
        let world = WorldFile::from_transform(&transform);

        // Upper-left pixel center sits half a pixel inside the bbox corner.
        assert!((world.upper_left_x - (-120.0 + world.x_pixel_size / 2.0)).abs() < 1e-12);
        assert!((world.upper_left_y - (40.0 + world.y_pixel_size / 2.0)).abs() < 1e-12);
        assert!(world.y_pixel_size < 0.0);

        let back = world.to_transform();
        assert_eq!(back.corner_to_world(0.0, 0.0), (-120.0, 40.0));
    }

    #[test]
    fn write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Map.tfw");

        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let world = WorldFile::from_transform(&GeoTransform::for_export(&bbox, 100, 100));
        world.write(&path).unwrap();

        let loaded = WorldFile::read(&path).unwrap();
        assert_eq!(loaded, world);
    }

    #[test]
    fn short_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tfw");
        fs::write(&path, "1.0\n2.0\n").unwrap();
        assert!(WorldFile::read(&path).is_err());
    }
}
