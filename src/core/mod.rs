// shrinkray/src/core/mod.rs
mod coordinator;
mod report;

pub use coordinator::{BatchCoordinator, BatchHandle};
pub use report::{
    BatchReport, ErrorKind, FailureEntry, ProcessResult, ProgressSnapshot, SourceItem,
};

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

/// How output dimensions are derived from the source dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    None,
    /// New dims = round(orig * p / 100), at least 1px per side.
    Percentage(u32),
    /// Exact dimensions; with `preserve_aspect` the image is fit within the box.
    Fixed {
        width: u32,
        height: u32,
        preserve_aspect: bool,
    },
    /// Scale down to the given width, preserving aspect ratio. No-op when
    /// the source is already narrow enough.
    MaxWidth(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Bmp,
    Tiff,
    SameAsInput,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::WebP => "webp",
            TargetFormat::Avif => "avif",
            TargetFormat::Gif => "gif",
            TargetFormat::Bmp => "bmp",
            TargetFormat::Tiff => "tiff",
            TargetFormat::SameAsInput => "",
        }
    }

    /// Whether the encoder takes a quality parameter.
    pub fn lossy(&self) -> bool {
        matches!(
            self,
            TargetFormat::Jpeg | TargetFormat::WebP | TargetFormat::Avif
        )
    }

    pub fn supports_alpha(&self) -> bool {
        !matches!(self, TargetFormat::Jpeg)
    }

    /// Container formats an EXIF block can be re-attached to.
    pub fn carries_exif(&self) -> bool {
        matches!(
            self,
            TargetFormat::Jpeg | TargetFormat::Png | TargetFormat::WebP
        )
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(TargetFormat::Jpeg),
            image::ImageFormat::Png => Some(TargetFormat::Png),
            image::ImageFormat::WebP => Some(TargetFormat::WebP),
            image::ImageFormat::Avif => Some(TargetFormat::Avif),
            image::ImageFormat::Gif => Some(TargetFormat::Gif),
            image::ImageFormat::Bmp => Some(TargetFormat::Bmp),
            image::ImageFormat::Tiff => Some(TargetFormat::Tiff),
            _ => None,
        }
    }
}

/// Fixed encode quality, or a size-targeting search (see
/// `processors::QualitySelector`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Fixed(u8),
    Adaptive,
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("adaptive") {
            return Ok(Quality::Adaptive);
        }
        s.parse::<u8>()
            .map(Quality::Fixed)
            .map_err(|_| format!("quality must be a number in [10,100] or 'adaptive', got '{s}'"))
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub resize: ResizeMode,
    pub format: TargetFormat,
    pub quality: Quality,
    pub algorithm: ResizeAlgorithm,
    pub preserve_exif: bool,
    pub auto_orient: bool,
    pub progressive: bool,
    pub preserve_transparency: bool,
    pub grayscale: bool,
    pub sharpen: bool,
    pub allow_enlarge: bool,
    pub rename_prefix: Option<String>,
    pub organize_by_format: bool,
    pub output_dir: PathBuf,
    /// 0 means available parallelism.
    pub workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            resize: ResizeMode::None,
            format: TargetFormat::SameAsInput,
            quality: Quality::Fixed(85),
            algorithm: ResizeAlgorithm::Lanczos3,
            preserve_exif: false,
            auto_orient: false,
            progressive: false,
            preserve_transparency: true,
            grayscale: false,
            sharpen: false,
            allow_enlarge: false,
            rename_prefix: None,
            organize_by_format: false,
            output_dir: PathBuf::from("processed"),
            workers: 0,
        }
    }
}

pub const MAX_DIMENSION: u32 = 100_000;
pub const MAX_WORKERS: usize = 512;

impl ProcessingConfig {
    pub fn validate(&self) -> Result<()> {
        match self.resize {
            ResizeMode::Percentage(p) => {
                if p == 0 || p > 1000 {
                    return Err(ShrinkrayError::InvalidParameter(format!(
                        "Resize percentage must be in [1,1000], got {p}"
                    )));
                }
            }
            ResizeMode::Fixed { width, height, .. } => {
                if width == 0 || height == 0 {
                    return Err(ShrinkrayError::InvalidParameter(
                        "Fixed dimensions must be greater than zero".to_string(),
                    ));
                }
                if width > MAX_DIMENSION || height > MAX_DIMENSION {
                    return Err(ShrinkrayError::InvalidParameter(format!(
                        "Dimensions too large (max {MAX_DIMENSION} pixels)"
                    )));
                }
            }
            ResizeMode::MaxWidth(w) => {
                if w == 0 || w > MAX_DIMENSION {
                    return Err(ShrinkrayError::InvalidParameter(format!(
                        "Max width must be in [1,{MAX_DIMENSION}], got {w}"
                    )));
                }
            }
            ResizeMode::None => {}
        }

        if let Quality::Fixed(q) = self.quality {
            if !(10..=100).contains(&q) {
                return Err(ShrinkrayError::InvalidParameter(format!(
                    "Quality must be between 10 and 100, got {q}"
                )));
            }
        }

        if self.workers > MAX_WORKERS {
            return Err(ShrinkrayError::InvalidParameter(format!(
                "Worker count must be at most {MAX_WORKERS}, got {}",
                self.workers
            )));
        }

        if let Some(prefix) = &self.rename_prefix {
            if prefix.contains(['/', '\\']) {
                return Err(ShrinkrayError::InvalidParameter(
                    "Rename prefix must not contain path separators".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ShrinkrayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

pub type Result<T> = std::result::Result<T, ShrinkrayError>;

pub fn validate_config(config: &ProcessingConfig) -> Result<()> {
    config.validate()
}
