// shrinkray/src/processors/quality.rs
use crate::core::{Quality, Result, TargetFormat};
use crate::processors::Compressor;
use image::DynamicImage;

pub const ADAPTIVE_BASELINE: u8 = 85;
pub const ADAPTIVE_STEP: u8 = 10;
pub const ADAPTIVE_FLOOR: u8 = 10;
pub const ADAPTIVE_MAX_ATTEMPTS: usize = 8;
/// Adaptive search aims for output no larger than this share of the input.
pub const ADAPTIVE_TARGET_RATIO: f64 = 0.75;

/// Encode quality plus the bytes of the attempt that produced it, so the
/// pipeline never re-encodes the winning candidate.
#[derive(Debug)]
pub struct ResolvedEncode {
    pub quality: u8,
    pub bytes: Vec<u8>,
}

pub struct QualitySelector {
    quality: Quality,
}

impl QualitySelector {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    /// Resolve the effective quality for one image and encode at it.
    ///
    /// Fixed quality encodes once. Adaptive quality walks down from the
    /// baseline in fixed steps until the encoded size meets the byte target
    /// derived from `input_size`, the floor is reached, or the attempt bound
    /// runs out; the bound guarantees termination and the last attempt is
    /// returned rather than an error.
    pub fn resolve(
        &self,
        image: &DynamicImage,
        format: TargetFormat,
        input_size: u64,
        compressor: &Compressor,
    ) -> Result<ResolvedEncode> {
        match self.quality {
            Quality::Fixed(q) => {
                let bytes = compressor.encode(image, format, q)?;
                Ok(ResolvedEncode { quality: q, bytes })
            }
            Quality::Adaptive => {
                if !format.lossy() {
                    log::debug!(
                        "Adaptive quality on lossless {:?}, encoding once at baseline",
                        format
                    );
                    let bytes = compressor.encode(image, format, ADAPTIVE_BASELINE)?;
                    return Ok(ResolvedEncode {
                        quality: ADAPTIVE_BASELINE,
                        bytes,
                    });
                }

                let target = (input_size as f64 * ADAPTIVE_TARGET_RATIO) as u64;
                let mut quality = ADAPTIVE_BASELINE;

                for attempt in 1..=ADAPTIVE_MAX_ATTEMPTS {
                    let bytes = compressor.encode(image, format, quality)?;
                    let met = bytes.len() as u64 <= target;

                    log::debug!(
                        "Adaptive attempt {attempt}: quality {quality} -> {} bytes (target {target})",
                        bytes.len()
                    );

                    if met || quality <= ADAPTIVE_FLOOR || attempt == ADAPTIVE_MAX_ATTEMPTS {
                        return Ok(ResolvedEncode { quality, bytes });
                    }

                    quality = quality.saturating_sub(ADAPTIVE_STEP).max(ADAPTIVE_FLOOR);
                }

                unreachable!("adaptive search always returns within the attempt bound")
            }
        }
    }
}
