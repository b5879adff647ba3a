//! Gridcode raster built from an exported map image.

use image::DynamicImage;
use tracing::debug;

use harvest_common::{HarvestError, HarvestResult};

/// A raster of 8-bit gridcodes in row-major order.
///
/// The gridcode of a rendered map pixel is its 8-bit luma value; 255 is
/// the no-data code WMS servers render as white background.
#[derive(Debug, Clone)]
pub struct GridcodeRaster {
    width: u32,
    height: u32,
    codes: Vec<u8>,
}

impl GridcodeRaster {
    /// Gridcode rendered for pixels carrying no data.
    pub const NO_DATA: u8 = 255;

    /// Build from raw row-major codes.
    pub fn from_codes(width: u32, height: u32, codes: Vec<u8>) -> HarvestResult<Self> {
        if width == 0 || height == 0 {
            return Err(HarvestError::EmptyRaster);
        }
        if codes.len() != (width as usize) * (height as usize) {
            return Err(HarvestError::RasterDecode(format!(
                "expected {} codes for {}x{}, found {}",
                (width as usize) * (height as usize),
                width,
                height,
                codes.len()
            )));
        }
        Ok(Self {
            width,
            height,
            codes,
        })
    }

    /// Quantize a decoded image to gridcodes.
    pub fn from_image(image: &DynamicImage) -> HarvestResult<Self> {
        let luma = image.to_luma8();
        debug!(
            width = luma.width(),
            height = luma.height(),
            "Quantized raster to gridcodes"
        );
        Self::from_codes(luma.width(), luma.height(), luma.into_raw())
    }

    /// Decode encoded image bytes (PNG, TIFF, ...) into gridcodes.
    pub fn from_image_bytes(bytes: &[u8]) -> HarvestResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| HarvestError::RasterDecode(e.to_string()))?;
        Self::from_image(&image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.codes[y as usize * self.width as usize + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_codes_validates_dimensions() {
        assert!(GridcodeRaster::from_codes(2, 2, vec![0, 1, 2, 3]).is_ok());
        assert!(matches!(
            GridcodeRaster::from_codes(0, 2, vec![]),
            Err(HarvestError::EmptyRaster)
        ));
        assert!(matches!(
            GridcodeRaster::from_codes(2, 2, vec![0, 1]),
            Err(HarvestError::RasterDecode(_))
        ));
    }

    #[test]
    fn row_major_indexing() {
        let raster = GridcodeRaster::from_codes(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(raster.get(0, 0), 0);
        assert_eq!(raster.get(2, 0), 2);
        assert_eq!(raster.get(0, 1), 3);
        assert_eq!(raster.get(2, 1), 5);
    }

    #[test]
    fn image_quantization_uses_luma() {
        let mut img = image::GrayImage::new(2, 1);
        img.put_pixel(0, 0, image::Luma([40u8]));
        img.put_pixel(1, 0, image::Luma([255u8]));

        let raster = GridcodeRaster::from_image(&DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(raster.get(0, 0), 40);
        assert_eq!(raster.get(1, 0), GridcodeRaster::NO_DATA);
    }
}
