// shrinkray/src/processors/metadata.rs
use crate::core::{Result, ShrinkrayError, TargetFormat};
use exif::{Exif, In, Reader, Tag};
use image::DynamicImage;
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, ImageEXIF};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

pub struct MetadataProcessor;

impl MetadataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// EXIF orientation value (1..=8) from raw source bytes. Absent or
    /// unreadable EXIF means identity.
    pub fn orientation(&self, data: &[u8]) -> Option<u32> {
        let exif = match Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return None,
            Err(e) => {
                log::debug!("EXIF parse failed, treating orientation as identity: {e}");
                return None;
            }
        };

        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|v| (1..=8).contains(v))
    }

    /// Rotate/flip per the EXIF orientation tag.
    pub fn apply_orientation(&self, image: DynamicImage, orientation: u32) -> DynamicImage {
        match orientation {
            2 => image.fliph(),
            3 => image.rotate180(),
            4 => image.flipv(),
            5 => image.rotate90().fliph(),
            6 => image.rotate90(),
            7 => image.rotate270().fliph(),
            8 => image.rotate270(),
            _ => image,
        }
    }

    /// Raw EXIF payload from the source container, for later re-attachment.
    pub fn raw_exif(&self, data: &[u8], format: Option<image::ImageFormat>) -> Option<Vec<u8>> {
        let payload = match format? {
            image::ImageFormat::Jpeg => Jpeg::from_bytes(data.to_vec().into())
                .ok()?
                .exif()
                .map(|e| e.to_vec()),
            image::ImageFormat::Png => Png::from_bytes(data.to_vec().into())
                .ok()?
                .exif()
                .map(|e| e.to_vec()),
            image::ImageFormat::WebP => WebP::from_bytes(data.to_vec().into())
                .ok()?
                .exif()
                .map(|e| e.to_vec()),
            _ => None,
        };

        if payload.is_some() {
            log::debug!("Captured EXIF block from source");
        }
        payload
    }

    /// Re-attach an EXIF payload to encoded output. Formats without EXIF
    /// support return the bytes untouched.
    pub fn embed(
        &self,
        encoded: &[u8],
        format: TargetFormat,
        exif_data: &[u8],
    ) -> Result<Vec<u8>> {
        match format {
            TargetFormat::Jpeg => {
                let mut jpeg = Jpeg::from_bytes(encoded.to_vec().into()).map_err(|e| {
                    ShrinkrayError::ProcessingError(format!("Failed to parse encoded JPEG: {e}"))
                })?;
                jpeg.set_exif(Some(exif_data.to_vec().into()));
                let mut output = Vec::new();
                jpeg.encoder().write_to(&mut output).map_err(|e| {
                    ShrinkrayError::ProcessingError(format!("Failed to write JPEG with EXIF: {e}"))
                })?;
                Ok(output)
            }
            TargetFormat::Png => {
                let mut png = Png::from_bytes(encoded.to_vec().into()).map_err(|e| {
                    ShrinkrayError::ProcessingError(format!("Failed to parse encoded PNG: {e}"))
                })?;
                png.set_exif(Some(exif_data.to_vec().into()));
                let mut output = Vec::new();
                png.encoder().write_to(&mut output).map_err(|e| {
                    ShrinkrayError::ProcessingError(format!("Failed to write PNG with EXIF: {e}"))
                })?;
                Ok(output)
            }
            TargetFormat::WebP => {
                let mut webp = WebP::from_bytes(encoded.to_vec().into()).map_err(|e| {
                    ShrinkrayError::ProcessingError(format!("Failed to parse encoded WebP: {e}"))
                })?;
                webp.set_exif(Some(exif_data.to_vec().into()));
                let mut output = Vec::new();
                webp.encoder().write_to(&mut output).map_err(|e| {
                    ShrinkrayError::ProcessingError(format!("Failed to write WebP with EXIF: {e}"))
                })?;
                Ok(output)
            }
            _ => Ok(encoded.to_vec()),
        }
    }

    /// Parsed EXIF from a file, for the `info` command.
    pub fn read_metadata(&self, path: &Path) -> Result<Option<Exif>> {
        let file = File::open(path)?;
        let mut bufreader = BufReader::new(&file);

        match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => {
                log::debug!("Found EXIF data in {}", path.display());
                Ok(Some(exif))
            }
            Err(exif::Error::NotFound(_)) => {
                log::debug!("No EXIF data found in {}", path.display());
                Ok(None)
            }
            Err(e) => {
                log::warn!("Failed to read EXIF from {}: {}", path.display(), e);
                Err(ShrinkrayError::ProcessingError(format!(
                    "EXIF read error: {e}"
                )))
            }
        }
    }

    pub fn has_metadata(&self, path: &Path) -> Result<bool> {
        Ok(self.read_metadata(path)?.is_some())
    }
}

impl Default for MetadataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    /// Minimal little-endian TIFF blob with a single orientation entry.
    pub(crate) fn tiff_with_orientation(orientation: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"II");
        data.extend_from_slice(&42u16.to_le_bytes());
        data.extend_from_slice(&8u32.to_le_bytes()); // IFD offset
        data.extend_from_slice(&1u16.to_le_bytes()); // entry count
        data.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
        data.extend_from_slice(&3u16.to_le_bytes()); // SHORT
        data.extend_from_slice(&1u32.to_le_bytes()); // count
        data.extend_from_slice(&orientation.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes()); // value padding
        data.extend_from_slice(&0u32.to_le_bytes()); // next IFD
        data
    }

    fn jpeg_with_orientation(orientation: u16) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();

        let processor = MetadataProcessor::new();
        processor
            .embed(
                &buffer.into_inner(),
                TargetFormat::Jpeg,
                &tiff_with_orientation(orientation),
            )
            .unwrap()
    }

    #[test]
    fn orientation_absent_without_exif() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Jpeg).unwrap();

        let processor = MetadataProcessor::new();
        assert_eq!(processor.orientation(&buffer.into_inner()), None);
    }

    #[test]
    fn orientation_round_trips_through_container() {
        let processor = MetadataProcessor::new();
        let data = jpeg_with_orientation(6);
        assert_eq!(processor.orientation(&data), Some(6));
    }

    #[test]
    fn raw_exif_survives_re_embedding() {
        let processor = MetadataProcessor::new();
        let data = jpeg_with_orientation(3);
        let raw = processor
            .raw_exif(&data, Some(image::ImageFormat::Jpeg))
            .unwrap();
        assert_eq!(raw, tiff_with_orientation(3));
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let processor = MetadataProcessor::new();
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(6, 3));
        assert_eq!(processor.apply_orientation(img.clone(), 6).dimensions(), (3, 6));
        assert_eq!(processor.apply_orientation(img.clone(), 8).dimensions(), (3, 6));
        assert_eq!(processor.apply_orientation(img.clone(), 3).dimensions(), (6, 3));
        assert_eq!(processor.apply_orientation(img, 1).dimensions(), (6, 3));
    }

    #[test]
    fn embed_is_noop_for_formats_without_exif() {
        let processor = MetadataProcessor::new();
        let bytes = vec![1, 2, 3];
        let out = processor
            .embed(&bytes, TargetFormat::Bmp, &tiff_with_orientation(1))
            .unwrap();
        assert_eq!(out, bytes);
    }
}
