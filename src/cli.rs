// shrinkray/src/cli.rs
use crate::core::{
    ProcessingConfig, Quality, ResizeAlgorithm, ResizeMode, Result, TargetFormat,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser)]
#[command(
    name = "shrinkray",
    version,
    about = "Concurrent batch image converter and compressor"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert and compress a batch of images
    Run(RunArgs),
    /// Inspect a single image
    Info {
        input: PathBuf,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Input files and/or directories (directories are walked recursively)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "processed")]
    pub output: PathBuf,

    /// Resize to a percentage of the original dimensions
    #[arg(long, conflicts_with_all = ["width", "height", "max_width"])]
    pub scale: Option<u32>,

    /// Target width for fixed resize
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Target height for fixed resize
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Fit within the fixed box instead of stretching to it
    #[arg(long)]
    pub keep_aspect: bool,

    /// Downscale images wider than this, preserving aspect ratio
    #[arg(long, conflicts_with_all = ["width", "height"])]
    pub max_width: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Same)]
    pub format: FormatArg,

    /// Encode quality 10-100, or "adaptive" to target a size reduction
    #[arg(short, long, default_value = "85", value_parser = parse_quality)]
    pub quality: Quality,

    /// Resampling filter
    #[arg(long, value_enum, default_value_t = AlgorithmArg::Lanczos3)]
    pub algorithm: AlgorithmArg,

    /// Worker count (0 = available parallelism)
    #[arg(short = 'j', long, default_value_t = 0)]
    pub workers: usize,

    /// Copy the source EXIF block into the output
    #[arg(long)]
    pub preserve_exif: bool,

    /// Rotate/flip per the EXIF orientation tag
    #[arg(long)]
    pub auto_orient: bool,

    /// Request progressive encoding where the format supports it
    #[arg(long)]
    pub progressive: bool,

    /// Convert to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Apply a sharpening pass
    #[arg(long)]
    pub sharpen: bool,

    /// Allow percentage resize above 100%
    #[arg(long)]
    pub allow_enlarge: bool,

    /// Flatten transparency onto a white background even when the output
    /// format could carry it
    #[arg(long)]
    pub flatten: bool,

    /// Prefix prepended to output file names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Group outputs into per-format subfolders
    #[arg(long)]
    pub organize: bool,
}

impl RunArgs {
    pub fn to_config(&self) -> Result<ProcessingConfig> {
        let resize = if let Some(scale) = self.scale {
            ResizeMode::Percentage(scale)
        } else if let (Some(width), Some(height)) = (self.width, self.height) {
            ResizeMode::Fixed {
                width,
                height,
                preserve_aspect: self.keep_aspect,
            }
        } else if let Some(max_width) = self.max_width {
            ResizeMode::MaxWidth(max_width)
        } else {
            ResizeMode::None
        };

        let config = ProcessingConfig {
            resize,
            format: self.format.into(),
            quality: self.quality,
            algorithm: self.algorithm.into(),
            preserve_exif: self.preserve_exif,
            auto_orient: self.auto_orient,
            progressive: self.progressive,
            preserve_transparency: !self.flatten,
            grayscale: self.grayscale,
            sharpen: self.sharpen,
            allow_enlarge: self.allow_enlarge,
            rename_prefix: self.prefix.clone(),
            organize_by_format: self.organize,
            output_dir: self.output.clone(),
            workers: self.workers,
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Jpeg,
    Png,
    Webp,
    Avif,
    Gif,
    Bmp,
    Tiff,
    Same,
}

impl From<FormatArg> for TargetFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Jpeg => TargetFormat::Jpeg,
            FormatArg::Png => TargetFormat::Png,
            FormatArg::Webp => TargetFormat::WebP,
            FormatArg::Avif => TargetFormat::Avif,
            FormatArg::Gif => TargetFormat::Gif,
            FormatArg::Bmp => TargetFormat::Bmp,
            FormatArg::Tiff => TargetFormat::Tiff,
            FormatArg::Same => TargetFormat::SameAsInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<AlgorithmArg> for ResizeAlgorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Nearest => ResizeAlgorithm::Nearest,
            AlgorithmArg::Bilinear => ResizeAlgorithm::Bilinear,
            AlgorithmArg::Bicubic => ResizeAlgorithm::Bicubic,
            AlgorithmArg::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

fn parse_quality(s: &str) -> std::result::Result<Quality, String> {
    Quality::from_str(s)
}
