use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use overlay_engine::RgbaImage;
use std::path::Path;
use viewer_core::{PageSource, SourceError};

/// One page raster decoded from disk, scaled on demand.
#[derive(Debug)]
pub struct ImagePageSource {
    page_index: usize,
    image: RgbaImage,
}

impl ImagePageSource {
    pub fn new(page_index: usize, image: RgbaImage) -> Self {
        Self { page_index, image }
    }

    pub fn open(page_index: usize, path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to read image: {}", path.display()))?
            .to_rgba8();
        Ok(Self::new(page_index, image))
    }
}

impl PageSource for ImagePageSource {
    fn rasterize(&self, page_index: usize, zoom: f64) -> Result<RgbaImage, SourceError> {
        if page_index != self.page_index {
            return Err(format!("no image supplied for page {}", page_index + 1).into());
        }

        if (zoom - 1.0).abs() < f64::EPSILON {
            return Ok(self.image.clone());
        }

        let width = (f64::from(self.image.width()) * zoom).round().max(1.0) as u32;
        let height = (f64::from(self.image.height()) * zoom).round().max(1.0) as u32;
        Ok(imageops::resize(&self.image, width, height, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn scales_by_zoom() {
        let source = ImagePageSource::new(0, RgbaImage::from_pixel(40, 30, Rgba([255; 4])));

        assert_eq!(source.rasterize(0, 1.0).expect("nominal").dimensions(), (40, 30));
        assert_eq!(source.rasterize(0, 2.5).expect("zoomed").dimensions(), (100, 75));
    }

    #[test]
    fn other_pages_are_unavailable() {
        let source = ImagePageSource::new(1, RgbaImage::new(4, 4));
        let error = source.rasterize(0, 1.0).expect_err("only page 2 is supplied");

        assert_eq!(error.to_string(), "no image supplied for page 1");
    }
}
