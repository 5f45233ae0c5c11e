// shrinkray/src/processors/loader.rs
use crate::core::{Result, ShrinkrayError, MAX_DIMENSION};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

#[derive(Clone)]
pub struct Loader {
    max_dimensions: (u32, u32),
}

impl Loader {
    pub fn new() -> Self {
        Self {
            max_dimensions: (MAX_DIMENSION, MAX_DIMENSION),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = (width, height);
        self
    }

    /// Decode an image from an in-memory buffer, sniffing the actual format
    /// rather than trusting the extension.
    pub fn decode(&self, data: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>)> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader.format();

        let image = reader.decode().map_err(|e| {
            ShrinkrayError::ProcessingError(format!("Failed to decode image: {e}"))
        })?;

        let (width, height) = image.dimensions();
        let (max_w, max_h) = self.max_dimensions;
        if width > max_w || height > max_h {
            return Err(ShrinkrayError::ProcessingError(format!(
                "Image dimensions {width}x{height} exceed maximum {max_w}x{max_h}"
            )));
        }

        log::debug!(
            "Decoded image: {}x{} pixels, color {:?}, container {:?}",
            width,
            height,
            image.color(),
            format
        );

        Ok((image, format))
    }

    pub fn load(&self, path: &Path) -> Result<(DynamicImage, Option<ImageFormat>)> {
        log::debug!("Loading image from: {}", path.display());
        let data = std::fs::read(path)?;
        if data.is_empty() {
            return Err(ShrinkrayError::InvalidParameter(format!(
                "File is empty: {}",
                path.display()
            )));
        }
        self.decode(&data)
    }

    /// Dimensions and container format without a full decode.
    pub fn probe(&self, path: &Path) -> Result<(u32, u32, String)> {
        let file = std::fs::File::open(path)?;
        let reader = ImageReader::new(std::io::BufReader::new(file)).with_guessed_format()?;

        let format = reader
            .format()
            .map(crate::utils::image_format_to_string)
            .unwrap_or_else(|| "Unknown".to_string());

        let dimensions = reader.into_dimensions()?;

        Ok((dimensions.0, dimensions.1, format))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
