//! Zone cropping and pre-recognition enhancement.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use tracing::trace;

use crate::error::{GeometryError, VlozyError};
use crate::models::config::RegionConfig;
use crate::zone::Zone;

/// Crops zones out of canonical images and prepares them for recognition.
#[derive(Debug, Clone)]
pub struct RegionExtractor {
    padding: u32,
    upscale: u32,
    filter: FilterType,
}

impl RegionExtractor {
    /// Create an extractor; the upscale factor must be 2 or 3.
    pub fn new(config: &RegionConfig) -> Result<Self, VlozyError> {
        config.validate()?;
        Ok(Self {
            padding: config.padding,
            upscale: config.upscale,
            filter: config.filter.into(),
        })
    }

    pub fn upscale(&self) -> u32 {
        self.upscale
    }

    /// Crop `zone` from `image`, pad, convert to grayscale and upscale.
    ///
    /// The rectangle is clipped to the image; a zone with no visible area
    /// is a [`GeometryError::OutsideImage`]. `image` is never modified.
    pub fn extract(&self, image: &RgbImage, zone: &Zone) -> Result<GrayImage, GeometryError> {
        let (x, y, width, height) = zone.clip_to(image.width(), image.height())?;
        if (width, height) != (zone.width(), zone.height()) {
            trace!(
                "Zone '{}' clipped from {}x{} to {}x{}",
                zone.name(),
                zone.width(),
                zone.height(),
                width,
                height
            );
        }

        let cropped = imageops::crop_imm(image, x, y, width, height).to_image();
        let gray = pad(&imageops::grayscale(&cropped), self.padding);

        let (target_w, target_h) = (gray.width() * self.upscale, gray.height() * self.upscale);
        Ok(imageops::resize(&gray, target_w, target_h, self.filter))
    }
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self {
            padding: 10,
            upscale: 2,
            filter: FilterType::CatmullRom,
        }
    }
}

fn pad(image: &GrayImage, border: u32) -> GrayImage {
    if border == 0 {
        return image.clone();
    }
    let mut padded = GrayImage::from_pixel(
        image.width() + 2 * border,
        image.height() + 2 * border,
        Luma([255]),
    );
    imageops::replace(&mut padded, image, border as i64, border as i64);
    padded
}
