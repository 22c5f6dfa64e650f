//! Error types for the reverse-watermark crate.

/// Errors that can occur while loading calibration data or removing a watermark.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to decode a calibration capture.
    #[error("failed to decode {size}x{size} reference capture: {source}")]
    ReferenceDecode {
        /// Logo size the capture was expected to describe.
        size: u32,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// A calibration capture has the wrong dimensions.
    #[error("reference capture is {width}x{height}, expected {expected}x{expected}")]
    ReferenceSize {
        /// Expected side length in pixels.
        expected: u32,
        /// Actual width in pixels.
        width: u32,
        /// Actual height in pixels.
        height: u32,
    },

    /// The image is too small to contain a watermark at the expected position.
    #[error("image too small ({width}x{height}) for {wm_size}x{wm_size} watermark with {margin}px margin")]
    ImageTooSmall {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Expected watermark size in pixels.
        wm_size: u32,
        /// Expected right/bottom margin in pixels.
        margin: u32,
    },

    /// Blend parameters are outside their valid ranges.
    #[error("invalid blend parameters: {0}")]
    InvalidParams(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image processing (load, save, encode).
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
