//! Embedded calibration captures of the watermark logo.
//!
//! Each capture shows the white logo composited over a black backdrop, so the
//! brightness of every pixel equals the compositing alpha scaled to 0-255.

/// 48x48 capture used for the small watermark bucket.
pub(crate) const BG_48_PNG: &[u8] = include_bytes!("../assets/bg_48.png");

/// 96x96 capture used for the large watermark bucket.
pub(crate) const BG_96_PNG: &[u8] = include_bytes!("../assets/bg_96.png");
