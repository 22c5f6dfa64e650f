//! Watermark size buckets and placement rules.
//!
//! The watermark always sits in the bottom-right corner. Its size and margin
//! depend only on the image dimensions:
//! - **Large** (96x96, 64px margin): both width AND height > 1024
//! - **Small** (48x48, 32px margin): otherwise (including 1024x1024)

use crate::error::{Error, Result};

/// Dimension above which (on both axes) the large watermark is used.
const LARGE_IMAGE_THRESHOLD: u32 = 1024;

/// Watermark size classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatermarkSize {
    /// 48x48 watermark, 32px margin.
    Small,
    /// 96x96 watermark, 64px margin.
    Large,
}

impl WatermarkSize {
    /// Select the bucket for an image of the given dimensions.
    #[must_use]
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if width > LARGE_IMAGE_THRESHOLD && height > LARGE_IMAGE_THRESHOLD {
            Self::Large
        } else {
            Self::Small
        }
    }

    /// Logo side length in pixels.
    #[must_use]
    pub fn logo_size(self) -> u32 {
        match self {
            Self::Small => 48,
            Self::Large => 96,
        }
    }

    /// Right and bottom margin in pixels.
    #[must_use]
    pub fn margin(self) -> u32 {
        match self {
            Self::Small => 32,
            Self::Large => 64,
        }
    }

    /// Full placement configuration for this bucket.
    #[must_use]
    pub fn config(self) -> WatermarkConfig {
        WatermarkConfig {
            logo_size: self.logo_size(),
            margin_right: self.margin(),
            margin_bottom: self.margin(),
        }
    }
}

/// Logo size and margins of a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatermarkConfig {
    /// Side length of the square logo.
    pub logo_size: u32,
    /// Distance from the logo's right edge to the image's right edge.
    pub margin_right: u32,
    /// Distance from the logo's bottom edge to the image's bottom edge.
    pub margin_bottom: u32,
}

impl WatermarkConfig {
    /// Compute the watermark rectangle for an image of the given dimensions.
    ///
    /// `x = width - margin_right - logo_size`, `y = height - margin_bottom - logo_size`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooSmall`] when the rectangle would start left of or
    /// above the image origin. The rectangle is never clamped.
    pub fn locate(&self, width: u32, height: u32) -> Result<Region> {
        let too_small = || Error::ImageTooSmall {
            width,
            height,
            wm_size: self.logo_size,
            margin: self.margin_right.max(self.margin_bottom),
        };

        let x = self
            .margin_right
            .checked_add(self.logo_size)
            .and_then(|extent| width.checked_sub(extent))
            .ok_or_else(too_small)?;
        let y = self
            .margin_bottom
            .checked_add(self.logo_size)
            .and_then(|extent| height.checked_sub(extent))
            .ok_or_else(too_small)?;

        Ok(Region {
            x,
            y,
            width: self.logo_size,
            height: self.logo_size,
        })
    }
}

/// Axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Whether the pixel `(px, py)` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && py >= self.y && px - self.x < self.width && py - self.y < self.height
    }
}

/// Where the watermark would be for a given image, for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkInfo {
    /// Selected bucket.
    pub size: WatermarkSize,
    /// Bucket configuration.
    pub config: WatermarkConfig,
    /// Watermark rectangle.
    pub region: Region,
}

impl std::fmt::Display for WatermarkInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{0}x{0} watermark at ({1}, {2})",
            self.config.logo_size, self.region.x, self.region.y
        )
    }
}
