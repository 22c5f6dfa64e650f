//! Alpha blending math for watermark removal.
//!
//! The watermark is applied via forward alpha blending:
//! `watermarked = alpha * logo + (1 - alpha) * original`
//!
//! This module provides the reverse operation to recover original pixels, and
//! the forward operation for producing watermarked fixtures.

use image::RgbaImage;

use crate::alpha_map::AlphaMap;
use crate::error::{Error, Result};
use crate::geometry::Region;

/// Alpha threshold: ignore pixels with negligible watermark effect (noise).
pub const ALPHA_THRESHOLD: f32 = 0.002;

/// Maximum alpha: clamp to avoid division by near-zero in reverse blending.
pub const MAX_ALPHA: f32 = 0.99;

/// Logo color value (white).
pub const LOGO_VALUE: f32 = 255.0;

/// Calibration constants for reverse blending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    /// Pixels with alpha strictly below this are left untouched.
    pub alpha_threshold: f32,
    /// Upper clamp applied to alpha before dividing by `1 - alpha`.
    pub max_alpha: f32,
    /// Channel value of the logo that was blended in.
    pub logo_value: f32,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self {
            alpha_threshold: ALPHA_THRESHOLD,
            max_alpha: MAX_ALPHA,
            logo_value: LOGO_VALUE,
        }
    }
}

impl BlendParams {
    /// Check that the parameters keep the reverse formula finite.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.alpha_threshold) {
            return Err(Error::InvalidParams(format!(
                "alpha_threshold must be in [0, 1), got {}",
                self.alpha_threshold
            )));
        }
        if !(self.max_alpha > 0.0 && self.max_alpha < 1.0) {
            return Err(Error::InvalidParams(format!(
                "max_alpha must be in (0, 1), got {}",
                self.max_alpha
            )));
        }
        if self.alpha_threshold > self.max_alpha {
            return Err(Error::InvalidParams(format!(
                "alpha_threshold {} exceeds max_alpha {}",
                self.alpha_threshold, self.max_alpha
            )));
        }
        if !(0.0..=255.0).contains(&self.logo_value) {
            return Err(Error::InvalidParams(format!(
                "logo_value must be in [0, 255], got {}",
                self.logo_value
            )));
        }
        Ok(())
    }
}

/// Number of rows and columns of `region` that can be visited safely.
fn visible_extent(image: &RgbaImage, alpha_map: &AlphaMap, region: Region) -> (u32, u32) {
    let cols = region
        .width
        .min(alpha_map.size())
        .min(image.width().saturating_sub(region.x));
    let rows = region
        .height
        .min(alpha_map.size())
        .min(image.height().saturating_sub(region.y));
    (cols, rows)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Remove a watermark from `image` in place using reverse alpha blending.
///
/// Applies `original = (watermarked - alpha * logo_value) / (1 - alpha)` to the
/// RGB channels of every pixel in `region`, rounding to the nearest integer and
/// clamping to `[0, 255]`. The image's own alpha channel is never modified.
/// Pixels with alpha below `params.alpha_threshold` are skipped and alpha is
/// clamped to `params.max_alpha`. Map values are stored as `f32` but the
/// arithmetic runs in `f64`, which decides the `.5` ties.
///
/// The alpha map is indexed relative to the region's top-left corner. Parts of
/// the region outside the image (or the map) are ignored, pixels outside the
/// region are never touched.
pub fn reverse_alpha_blend(
    image: &mut RgbaImage,
    alpha_map: &AlphaMap,
    region: Region,
    params: &BlendParams,
) {
    debug_assert_eq!(region.width, alpha_map.size());
    debug_assert_eq!(region.height, alpha_map.size());

    let (cols, rows) = visible_extent(image, alpha_map, region);
    let stride = alpha_map.size() as usize;
    let values = alpha_map.values();

    for row in 0..rows {
        for col in 0..cols {
            let stored = values[row as usize * stride + col as usize];

            if stored < params.alpha_threshold {
                continue;
            }

            let alpha = f64::from(stored).min(f64::from(params.max_alpha));
            let inv_alpha = 1.0 - alpha;
            let logo_value = f64::from(params.logo_value);

            let px = image.get_pixel_mut(region.x + col, region.y + row);
            for ch in 0..3 {
                let watermarked = f64::from(px[ch]);
                let original = (watermarked - alpha * logo_value) / inv_alpha;
                px[ch] = to_channel(original);
            }
        }
    }
}

/// Composite the logo described by `alpha_map` onto `image` inside `region`.
///
/// Computes `round(alpha * logo_value + (1 - alpha) * original)` for the RGB
/// channels of every pixel in the region. Useful for producing watermarked
/// fixtures with a known original.
pub fn apply_alpha_blend(
    image: &mut RgbaImage,
    alpha_map: &AlphaMap,
    region: Region,
    logo_value: f32,
) {
    let (cols, rows) = visible_extent(image, alpha_map, region);
    let stride = alpha_map.size() as usize;
    let values = alpha_map.values();

    for row in 0..rows {
        for col in 0..cols {
            let alpha = f64::from(values[row as usize * stride + col as usize]);
            let px = image.get_pixel_mut(region.x + col, region.y + row);
            for ch in 0..3 {
                let original = f64::from(px[ch]);
                px[ch] = to_channel(alpha * f64::from(logo_value) + (1.0 - alpha) * original);
            }
        }
    }
}
