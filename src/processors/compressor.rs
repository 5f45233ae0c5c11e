// shrinkray/src/processors/compressor.rs
use crate::core::{Result, ShrinkrayError, TargetFormat};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use oxipng::{optimize_from_memory, Options};
use std::io::Cursor;

/// AVIF encode speed, 0 (slow) to 10; 6 trades size for tolerable encode
/// times on batch workloads.
const AVIF_SPEED: u8 = 6;

pub struct Compressor {
    optimize_png: bool,
    progressive: bool,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            optimize_png: true,
            progressive: false,
        }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    pub fn with_progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    /// Encode to the target format at the given quality. Quality is ignored
    /// by lossless formats.
    pub fn encode(
        &self,
        image: &DynamicImage,
        format: TargetFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        log::debug!(
            "Encoding {:?} at quality {} ({}x{})",
            format,
            quality,
            image.width(),
            image.height()
        );

        match format {
            TargetFormat::Jpeg => self.encode_jpeg(image, quality),
            TargetFormat::Png => self.encode_png(image),
            TargetFormat::WebP => self.encode_webp(image, quality),
            TargetFormat::Avif => self.encode_avif(image, quality),
            TargetFormat::Gif => self.encode_generic(image, ImageFormat::Gif),
            TargetFormat::Bmp => self.encode_generic(image, ImageFormat::Bmp),
            TargetFormat::Tiff => self.encode_generic(image, ImageFormat::Tiff),
            TargetFormat::SameAsInput => Err(ShrinkrayError::ProcessingError(
                "Target format must be resolved before encoding".to_string(),
            )),
        }
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        if self.progressive {
            // The image crate's JPEG encoder emits baseline scans only; the
            // request is accepted, not an error.
            log::debug!("Progressive encoding requested but encoder emits baseline JPEG");
        }

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)?;
        Ok(buffer.into_inner())
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;

        if !self.optimize_png {
            return Ok(buffer.into_inner());
        }

        optimize_from_memory(&buffer.into_inner(), &Options::default())
            .map_err(|e| ShrinkrayError::ProcessingError(format!("PNG optimization failed: {e}")))
    }

    fn encode_webp(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        // webp::Encoder only accepts 8-bit RGB/RGBA buffers.
        let normalized = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };

        let encoder = webp::Encoder::from_image(&normalized)
            .map_err(|e| ShrinkrayError::ProcessingError(format!("WebP encoding failed: {e}")))?;
        Ok(encoder.encode(quality as f32).to_vec())
    }

    fn encode_avif(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let normalized = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };

        let mut buffer = Cursor::new(Vec::new());
        let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, AVIF_SPEED, quality);
        normalized.write_with_encoder(encoder)?;
        Ok(buffer.into_inner())
    }

    fn encode_generic(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        // GIF rejects plain RGB8 frames; everything here is happy with RGBA8.
        let normalized = if format == ImageFormat::Gif {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            image.clone()
        };

        let mut buffer = Cursor::new(Vec::new());
        normalized.write_to(&mut buffer, format)?;
        Ok(buffer.into_inner())
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
