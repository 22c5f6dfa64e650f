//! Derivation of per-pixel transparency maps from calibration captures.

use image::RgbaImage;

use crate::error::{Error, Result};

/// Normalized transparency values for one square watermark bucket.
///
/// Values are stored row-major, one per pixel, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMap {
    size: u32,
    values: Vec<f32>,
}

impl AlphaMap {
    /// Derive an alpha map from a calibration capture.
    ///
    /// The alpha at each pixel is `max(R, G, B) / 255.0`; the image's own alpha
    /// channel is ignored. The capture must already have passed
    /// [`check_reference`], so it is square.
    pub(crate) fn from_capture(capture: &RgbaImage) -> Self {
        let values = capture
            .pixels()
            .map(|px| {
                let max_val = px[0].max(px[1]).max(px[2]);
                f32::from(max_val) / 255.0
            })
            .collect();

        Self {
            size: capture.width(),
            values,
        }
    }

    /// Decode PNG bytes and derive the alpha map, checking the side length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceDecode`] if the bytes cannot be decoded and
    /// [`Error::ReferenceSize`] if the capture is not `expected x expected`.
    pub fn from_reference(png_bytes: &[u8], expected: u32) -> Result<Self> {
        let capture = decode_reference(png_bytes, expected)?;
        Ok(Self::from_capture(&capture))
    }

    /// Side length of the map in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Flat row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Alpha at `(col, row)`, or `None` outside the map.
    #[must_use]
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.size || row >= self.size {
            return None;
        }
        self.values.get((row * self.size + col) as usize).copied()
    }
}

/// Decode a calibration capture and verify it is `expected x expected`.
pub(crate) fn decode_reference(png_bytes: &[u8], expected: u32) -> Result<RgbaImage> {
    let capture = image::load_from_memory(png_bytes)
        .map_err(|source| Error::ReferenceDecode {
            size: expected,
            source,
        })?
        .to_rgba8();
    check_reference(&capture, expected)?;
    Ok(capture)
}

/// Verify a decoded capture has the calibration dimensions.
pub(crate) fn check_reference(capture: &RgbaImage, expected: u32) -> Result<()> {
    if capture.width() != expected || capture.height() != expected {
        return Err(Error::ReferenceSize {
            expected,
            width: capture.width(),
            height: capture.height(),
        });
    }
    Ok(())
}
