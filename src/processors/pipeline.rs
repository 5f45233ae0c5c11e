// shrinkray/src/processors/pipeline.rs
use crate::core::{
    ErrorKind, ProcessResult, ProcessingConfig, ShrinkrayError, SourceItem, TargetFormat,
};
use crate::processors::{Compressor, Loader, MetadataProcessor, QualitySelector, Resizer};
use crate::utils;
use image::DynamicImage;
use std::path::PathBuf;
use std::time::Instant;

/// 3x3 sharpen kernel. Grayscale runs first when both filters are requested.
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

struct StageError {
    kind: ErrorKind,
    error: ShrinkrayError,
}

fn stage(kind: ErrorKind) -> impl Fn(ShrinkrayError) -> StageError {
    move |error| StageError { kind, error }
}

/// Per-item transformation: decode, orient, resize, filter, quality
/// resolution, encode, EXIF re-attachment, collision-safe write. Every
/// failure is caught at this boundary and turned into a `Failure` result;
/// nothing propagates to the scheduler.
pub struct Pipeline<'a> {
    config: &'a ProcessingConfig,
    loader: Loader,
    resizer: Resizer,
    compressor: Compressor,
    metadata: MetadataProcessor,
    selector: QualitySelector,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self {
            config,
            loader: Loader::new(),
            resizer: Resizer::new(config.algorithm, config.allow_enlarge),
            compressor: Compressor::new().with_progressive(config.progressive),
            metadata: MetadataProcessor::new(),
            selector: QualitySelector::new(config.quality),
        }
    }

    pub fn process(&self, item: &SourceItem) -> ProcessResult {
        let started = Instant::now();

        match self.run(item) {
            Ok((output_path, bytes_after)) => {
                log::info!(
                    "Processed {} -> {} ({} -> {} bytes)",
                    item.path.display(),
                    output_path.display(),
                    item.size,
                    bytes_after
                );
                ProcessResult::Success {
                    path: item.path.clone(),
                    output_path,
                    bytes_before: item.size,
                    bytes_after,
                    elapsed: started.elapsed(),
                }
            }
            Err(StageError { kind, error }) => {
                log::warn!("Failed to process {} ({kind}): {error}", item.path.display());
                ProcessResult::Failure {
                    path: item.path.clone(),
                    kind,
                    message: error.to_string(),
                }
            }
        }
    }

    fn run(&self, item: &SourceItem) -> std::result::Result<(PathBuf, u64), StageError> {
        let data = std::fs::read(&item.path)
            .map_err(ShrinkrayError::from)
            .map_err(stage(ErrorKind::Decode))?;

        let (mut image, container) = self.loader.decode(&data).map_err(stage(ErrorKind::Decode))?;

        let raw_exif = if self.config.preserve_exif {
            self.metadata.raw_exif(&data, container)
        } else {
            None
        };

        if self.config.auto_orient {
            if let Some(orientation) = self.metadata.orientation(&data) {
                image = self.metadata.apply_orientation(image, orientation);
            }
        }

        image = self
            .resizer
            .resize(&image, self.config.resize)
            .map_err(stage(ErrorKind::Resize))?;

        if self.config.grayscale {
            image = to_grayscale(&image);
        }
        if self.config.sharpen {
            image = image.filter3x3(&SHARPEN_KERNEL);
        }

        let format = self
            .effective_format(container)
            .map_err(stage(ErrorKind::Encode))?;

        if image.color().has_alpha()
            && (!format.supports_alpha() || !self.config.preserve_transparency)
        {
            image = flatten_onto_white(&image);
        }

        let resolved = self
            .selector
            .resolve(&image, format, item.size, &self.compressor)
            .map_err(stage(ErrorKind::Encode))?;
        let mut encoded = resolved.bytes;

        if let Some(exif) = raw_exif {
            if format.carries_exif() {
                // ExifError is non-fatal: the item ships without metadata.
                match self.metadata.embed(&encoded, format, &exif) {
                    Ok(with_exif) => encoded = with_exif,
                    Err(e) => log::warn!(
                        "Keeping {} without EXIF: {e}",
                        item.path.display()
                    ),
                }
            }
        }

        let target = utils::build_output_path(
            &self.config.output_dir,
            self.config.organize_by_format,
            format,
            self.config.rename_prefix.as_deref(),
            &item.path,
        );
        let output_path = utils::write_unique(&target, &encoded).map_err(stage(ErrorKind::Write))?;

        Ok((output_path, encoded.len() as u64))
    }

    fn effective_format(
        &self,
        container: Option<image::ImageFormat>,
    ) -> crate::core::Result<TargetFormat> {
        match self.config.format {
            TargetFormat::SameAsInput => container
                .and_then(TargetFormat::from_image_format)
                .ok_or_else(|| {
                    ShrinkrayError::UnsupportedFormat(
                        "Source format has no matching output encoder".to_string(),
                    )
                }),
            format => Ok(format),
        }
    }
}

fn to_grayscale(image: &DynamicImage) -> DynamicImage {
    let had_alpha = image.color().has_alpha();
    let gray = image.grayscale();
    // Keep downstream encoders on RGB(A)8 buffers.
    if had_alpha {
        DynamicImage::ImageRgba8(gray.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(gray.to_rgb8())
    }
}

/// Composite over a white background, for targets that cannot carry alpha.
fn flatten_onto_white(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = image::RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blended = out.get_pixel_mut(x, y);
        for channel in 0..3 {
            blended[channel] =
                ((pixel[channel] as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }

    DynamicImage::ImageRgb8(out)
}
