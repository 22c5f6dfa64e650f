//! Remove semi-transparent corner watermarks via reverse alpha blending.
//!
//! The watermark is a white logo composited over the bottom-right corner of an
//! image with a fixed, per-pixel transparency pattern. Two calibration captures
//! (48x48 and 96x96) are embedded in the binary; from them the engine derives an
//! alpha map and solves the compositing equation for the original pixels.
//!
//! # Quick Start
//!
//! ```no_run
//! use reverse_watermark::WatermarkEngine;
//!
//! let engine = WatermarkEngine::new().expect("failed to init engine");
//! let img = image::open("photo.png").unwrap().to_rgba8();
//! let cleaned = engine.remove_watermark(&img).unwrap();
//! cleaned.save("cleaned.png").unwrap();
//! ```
//!
//! # Geometry
//!
//! Images with both dimensions above 1024 px carry the 96 px logo with 64 px
//! margins; everything else carries the 48 px logo with 32 px margins.
//!
//! ```
//! use reverse_watermark::WatermarkSize;
//!
//! let config = WatermarkSize::for_dimensions(2000, 1500).config();
//! let region = config.locate(2000, 1500).unwrap();
//! assert_eq!((region.x, region.y), (1840, 1340));
//! ```

#![deny(missing_docs)]

pub mod alpha_map;
mod assets;
pub mod blending;
mod engine;
pub mod error;
pub mod geometry;
mod io;

pub use alpha_map::AlphaMap;
pub use blending::BlendParams;
pub use engine::{ProcessOptions, ProcessResult, WatermarkEngine};
pub use error::{Error, Result};
pub use geometry::{Region, WatermarkConfig, WatermarkInfo, WatermarkSize};
pub use io::{default_output_path, find_images, is_supported_image, save_image};
