mod cli;
mod core;
mod processors;
mod utils;

pub use cli::{AlgorithmArg, Cli, Commands, FormatArg, RunArgs};
pub use core::{
    validate_config, BatchCoordinator, BatchHandle, BatchReport, ErrorKind, FailureEntry,
    ProcessResult, ProcessingConfig, ProgressSnapshot, Quality, ResizeAlgorithm, ResizeMode,
    Result, ShrinkrayError, SourceItem, TargetFormat,
};
pub use processors::{
    Aggregator, CancelToken, Compressor, Loader, MetadataProcessor, Pipeline, QualitySelector,
    Resizer, Scheduler,
};
pub use utils::{
    build_output_path, calculate_aspect_ratio, format_file_size, image_format_to_string,
    is_supported_format, write_unique,
};

pub mod prelude {
    pub use crate::{
        BatchCoordinator, BatchReport, CancelToken, Pipeline, ProcessResult, ProcessingConfig,
        ProgressSnapshot, Quality, ResizeMode, Scheduler, TargetFormat,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;
