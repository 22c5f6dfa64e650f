//! Core watermark removal engine.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::alpha_map::{self, AlphaMap};
use crate::assets;
use crate::blending::{self, BlendParams};
use crate::error::{Error, Result};
use crate::geometry::{Region, WatermarkConfig, WatermarkInfo, WatermarkSize};
use crate::io::{find_images, save_image};

/// Largest input file accepted by [`WatermarkEngine::process_file`] by default.
const DEFAULT_MAX_INPUT_BYTES: u64 = 20 * 1024 * 1024;

/// Options controlling file processing behavior.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Force a specific watermark size instead of auto-detecting.
    pub force_size: Option<WatermarkSize>,
    /// Files larger than this are skipped. `None` disables the check.
    pub max_input_bytes: Option<u64>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            force_size: None,
            max_input_bytes: Some(DEFAULT_MAX_INPUT_BYTES),
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (too small or too large).
    pub skipped: bool,
    /// Region that was corrected, if any.
    pub region: Option<Region>,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            skipped: false,
            region: None,
            message: String::new(),
        }
    }

    fn failed(path: &Path, message: String) -> Self {
        Self {
            message,
            ..Self::new(path)
        }
    }

    fn skipped(path: &Path, message: String) -> Self {
        Self {
            success: true,
            skipped: true,
            message,
            ..Self::new(path)
        }
    }
}

/// The watermark engine holding the calibration captures and derived alpha maps.
///
/// Create once with [`WatermarkEngine::new()`] and reuse for multiple images.
/// Alpha maps are derived lazily on first use of each size and cached for the
/// lifetime of the engine. The engine is `Sync`; concurrent callers share the
/// cache and each size is derived at most once.
pub struct WatermarkEngine {
    capture_small: RgbaImage,
    capture_large: RgbaImage,
    alpha_small: OnceLock<AlphaMap>,
    alpha_large: OnceLock<AlphaMap>,
    builds: AtomicUsize,
    params: BlendParams,
}

impl std::fmt::Debug for WatermarkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkEngine")
            .field("alpha_small_ready", &self.alpha_small.get().is_some())
            .field("alpha_large_ready", &self.alpha_large.get().is_some())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl WatermarkEngine {
    /// Create a new engine from the embedded calibration captures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceDecode`] if an embedded capture cannot be
    /// decoded, or [`Error::ReferenceSize`] if it has unexpected dimensions.
    pub fn new() -> Result<Self> {
        let small = alpha_map::decode_reference(
            assets::BG_48_PNG,
            WatermarkSize::Small.logo_size(),
        )?;
        let large = alpha_map::decode_reference(
            assets::BG_96_PNG,
            WatermarkSize::Large.logo_size(),
        )?;
        Self::from_references(small, large)
    }

    /// Create an engine from already decoded 48x48 and 96x96 captures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceSize`] if either capture has the wrong dimensions.
    pub fn from_references(small: RgbaImage, large: RgbaImage) -> Result<Self> {
        alpha_map::check_reference(&small, WatermarkSize::Small.logo_size())?;
        alpha_map::check_reference(&large, WatermarkSize::Large.logo_size())?;

        debug!("calibration captures loaded");
        Ok(Self {
            capture_small: small,
            capture_large: large,
            alpha_small: OnceLock::new(),
            alpha_large: OnceLock::new(),
            builds: AtomicUsize::new(0),
            params: BlendParams::default(),
        })
    }

    /// Create an engine from calibration captures stored on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a file cannot be read, and the same errors as
    /// [`WatermarkEngine::new()`] for its contents.
    pub fn from_reference_files(small: &Path, large: &Path) -> Result<Self> {
        let small_bytes = std::fs::read(small)?;
        let large_bytes = std::fs::read(large)?;
        Self::from_references(
            alpha_map::decode_reference(&small_bytes, WatermarkSize::Small.logo_size())?,
            alpha_map::decode_reference(&large_bytes, WatermarkSize::Large.logo_size())?,
        )
    }

    /// Replace the blend calibration constants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if the parameters fail validation.
    pub fn with_params(mut self, params: BlendParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    /// Blend calibration constants in use.
    #[must_use]
    pub fn params(&self) -> &BlendParams {
        &self.params
    }

    /// Determine the watermark configuration for given image dimensions.
    #[must_use]
    #[allow(clippy::unused_self)] // method on `self` for API consistency
    pub fn detect(&self, width: u32, height: u32) -> WatermarkConfig {
        WatermarkSize::for_dimensions(width, height).config()
    }

    /// Calculate the watermark rectangle for given image dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooSmall`] if the rectangle does not fit.
    #[allow(clippy::unused_self)]
    pub fn locate(&self, width: u32, height: u32, config: &WatermarkConfig) -> Result<Region> {
        config.locate(width, height)
    }

    /// Alpha map for the given size, derived on first request and cached.
    #[must_use]
    pub fn alpha_map(&self, size: WatermarkSize) -> &AlphaMap {
        let (cell, capture) = match size {
            WatermarkSize::Small => (&self.alpha_small, &self.capture_small),
            WatermarkSize::Large => (&self.alpha_large, &self.capture_large),
        };
        cell.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            debug!(size = size.logo_size(), "deriving alpha map");
            AlphaMap::from_capture(capture)
        })
    }

    /// Number of alpha maps derived so far (at most one per size).
    #[must_use]
    pub fn alpha_map_builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Describe where the watermark would be for an image of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooSmall`] if the watermark does not fit.
    pub fn describe(&self, width: u32, height: u32) -> Result<WatermarkInfo> {
        self.describe_with(width, height, None)
    }

    /// Like [`WatermarkEngine::describe`], honoring a forced size the same way
    /// [`WatermarkEngine::remove_in_place`] does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooSmall`] if the watermark does not fit.
    pub fn describe_with(
        &self,
        width: u32,
        height: u32,
        force_size: Option<WatermarkSize>,
    ) -> Result<WatermarkInfo> {
        let size = force_size.unwrap_or_else(|| WatermarkSize::for_dimensions(width, height));
        let config = size.config();
        let region = self.locate(width, height, &config)?;
        Ok(WatermarkInfo {
            size,
            config,
            region,
        })
    }

    /// Remove the watermark, returning a new image and leaving `image` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooSmall`] if the watermark does not fit.
    pub fn remove_watermark(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let mut output = image.clone();
        self.remove_in_place(&mut output, None)?;
        Ok(output)
    }

    /// Remove the watermark from an image in-place.
    ///
    /// Applies reverse alpha blending at the expected watermark position and
    /// returns the corrected region. The `force_size` parameter overrides
    /// automatic size detection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageTooSmall`] if the watermark does not fit; the image
    /// is not modified in that case.
    pub fn remove_in_place(
        &self,
        image: &mut RgbaImage,
        force_size: Option<WatermarkSize>,
    ) -> Result<Region> {
        let (width, height) = image.dimensions();
        let size = force_size.unwrap_or_else(|| WatermarkSize::for_dimensions(width, height));
        let region = self.locate(width, height, &size.config())?;
        debug!(width, height, ?region, "removing watermark");

        let alpha_map = self.alpha_map(size);
        blending::reverse_alpha_blend(image, alpha_map, region, &self.params);
        Ok(region)
    }

    /// Process a single image file: load, remove, save.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    #[tracing::instrument(skip(self, input, opts), fields(input = %input.display()))]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        if let Some(limit) = opts.max_input_bytes {
            match std::fs::metadata(input) {
                Ok(meta) if meta.len() > limit => {
                    warn!(bytes = meta.len(), limit, "input too large, skipping");
                    return ProcessResult::skipped(
                        input,
                        format!("File too large ({} bytes, limit {limit})", meta.len()),
                    );
                }
                Ok(_) => {}
                Err(e) => return ProcessResult::failed(input, format!("Failed to read: {e}")),
            }
        }

        let mut img = match image::open(input) {
            Ok(img) => img.into_rgba8(),
            Err(e) => {
                warn!(error = %e, "failed to load");
                return ProcessResult::failed(input, format!("Failed to load: {e}"));
            }
        };

        let region = match self.remove_in_place(&mut img, opts.force_size) {
            Ok(region) => region,
            Err(e @ Error::ImageTooSmall { .. }) => {
                warn!("{e}, skipping");
                return ProcessResult::skipped(input, capitalize(&e.to_string()));
            }
            Err(e) => return ProcessResult::failed(input, e.to_string()),
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ProcessResult::failed(
                        input,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        match save_image(&img, output) {
            Ok(()) => {
                info!(output = %output.display(), "watermark removed");
                ProcessResult {
                    success: true,
                    region: Some(region),
                    message: "Watermark removed".to_string(),
                    ..ProcessResult::new(input)
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to save");
                ProcessResult::failed(input, format!("Failed to save: {e}"))
            }
        }
    }

    /// Process a list of image files into `output_dir`, keeping file names.
    ///
    /// Inputs sharing a file name get distinct outputs: the second `x.png`
    /// is written as `x_2.png`, the third as `x_3.png`, and so on.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// `on_complete` is called once per file with that file's own result, in
    /// completion order. Results are returned in input order.
    pub fn process_files<F>(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        opts: &ProcessOptions,
        on_complete: F,
    ) -> Vec<ProcessResult>
    where
        F: Fn(&ProcessResult) + Sync,
    {
        let jobs: Vec<_> = inputs.iter().zip(output_names(inputs)).collect();

        let run = |(input, name): &(&PathBuf, Option<OsString>)| {
            let result = match name {
                Some(name) => self.process_file(input, &output_dir.join(name), opts),
                None => ProcessResult::failed(input, "Path has no file name".to_string()),
            };
            on_complete(&result);
            result
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            jobs.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            jobs.iter().map(run).collect()
        }
    }

    /// Process all supported images in a directory.
    ///
    /// Returns a [`ProcessResult`] for each image found, sorted by path.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        self.process_directory_with(input_dir, output_dir, opts, |_| {})
    }

    /// Like [`WatermarkEngine::process_directory`], reporting each file as it
    /// completes through `on_complete`.
    pub fn process_directory_with<F>(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
        on_complete: F,
    ) -> Vec<ProcessResult>
    where
        F: Fn(&ProcessResult) + Sync,
    {
        let inputs = match find_images(input_dir) {
            Ok(inputs) => inputs,
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        info!(count = inputs.len(), dir = %input_dir.display(), "processing directory");
        self.process_files(&inputs, output_dir, opts, on_complete)
    }
}

/// Output file name for each input, suffixing `_N` to the stem on collision.
fn output_names(inputs: &[PathBuf]) -> Vec<Option<OsString>> {
    let mut taken: HashSet<OsString> = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let name = input.file_name()?.to_os_string();
            if taken.insert(name.clone()) {
                return Some(name);
            }
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            let ext = input
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            (2u32..)
                .map(|n| OsString::from(format!("{stem}_{n}{ext}")))
                .find(|candidate| taken.insert(candidate.clone()))
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
