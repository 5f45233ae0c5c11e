// shrinkray/src/processors/resizer.rs
use crate::core::{
    ResizeAlgorithm, ResizeMode, Result, ShrinkrayError, MAX_DIMENSION,
};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

pub struct Resizer {
    algorithm: ResizeAlgorithm,
    allow_enlarge: bool,
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm, allow_enlarge: bool) -> Self {
        Self {
            algorithm,
            allow_enlarge,
        }
    }

    pub fn resize(&self, image: &DynamicImage, mode: ResizeMode) -> Result<DynamicImage> {
        let (orig_w, orig_h) = image.dimensions();
        let (width, height) = self.calculate_dimensions(orig_w, orig_h, mode)?;

        if width == orig_w && height == orig_h {
            log::debug!("Image dimensions unchanged, skipping resize");
            return Ok(image.clone());
        }

        log::debug!(
            "Resizing image from {}x{} to {}x{}",
            orig_w,
            orig_h,
            width,
            height
        );

        Ok(image.resize_exact(width, height, self.filter_type()))
    }

    /// Target dimensions for `mode`, with the 1px-per-side floor and the
    /// enlargement guard applied.
    pub fn calculate_dimensions(
        &self,
        orig_w: u32,
        orig_h: u32,
        mode: ResizeMode,
    ) -> Result<(u32, u32)> {
        let dims = match mode {
            ResizeMode::None => (orig_w, orig_h),
            ResizeMode::Percentage(p) => {
                // Percentage is the only mode that can scale up; without
                // allow_enlarge anything above 100% degrades to a no-op.
                let p = if p > 100 && !self.allow_enlarge {
                    log::debug!("Enlargement disabled, clamping {p}% to 100%");
                    100
                } else {
                    p
                };
                let w = (orig_w as f64 * p as f64 / 100.0).round() as u32;
                let h = (orig_h as f64 * p as f64 / 100.0).round() as u32;
                (w.max(1), h.max(1))
            }
            ResizeMode::Fixed {
                width,
                height,
                preserve_aspect,
            } => {
                if preserve_aspect {
                    fit_within(orig_w, orig_h, width, height)
                } else {
                    (width, height)
                }
            }
            ResizeMode::MaxWidth(max_width) => {
                if orig_w <= max_width {
                    (orig_w, orig_h)
                } else {
                    let ratio = max_width as f64 / orig_w as f64;
                    let h = (orig_h as f64 * ratio).round() as u32;
                    (max_width, h.max(1))
                }
            }
        };

        if dims.0 > MAX_DIMENSION || dims.1 > MAX_DIMENSION {
            return Err(ShrinkrayError::InvalidParameter(format!(
                "Computed dimensions {}x{} exceed maximum {MAX_DIMENSION}",
                dims.0, dims.1
            )));
        }

        Ok(dims)
    }

    fn filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Largest dimensions with the original aspect ratio that fit inside the
/// target box.
fn fit_within(orig_w: u32, orig_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let ratio_w = target_w as f64 / orig_w as f64;
    let ratio_h = target_h as f64 / orig_h as f64;
    let ratio = ratio_w.min(ratio_h);

    let w = (orig_w as f64 * ratio).round() as u32;
    let h = (orig_h as f64 * ratio).round() as u32;

    (w.max(1), h.max(1))
}
