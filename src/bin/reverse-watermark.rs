use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use tracing::Level;

use reverse_watermark::{
    default_output_path, find_images, BlendParams, ProcessOptions, ProcessResult, WatermarkEngine,
    WatermarkSize,
};

#[derive(Parser)]
#[command(
    name = "reverse-watermark",
    about = "Remove semi-transparent corner watermarks via reverse alpha blending",
    version,
    after_help = "Simple usage: reverse-watermark <image>  (writes <name>_unwatermarked.<ext>)\n\n\
                  NOTE: Only the VISIBLE corner logo is removed. Invisible or\n\
                  steganographic marks are left as they are."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: PathBuf,

    /// Output file or directory (default: {name}_unwatermarked.{ext})
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the watermark size and position without processing
    #[arg(long)]
    info: bool,

    /// Force 48x48 watermark size (for images <= 1024px)
    #[arg(long)]
    force_small: bool,

    /// Force 96x96 watermark size (for images > 1024px)
    #[arg(long)]
    force_large: bool,

    /// Alpha below which pixels are left untouched
    #[arg(long, default_value_t = reverse_watermark::blending::ALPHA_THRESHOLD)]
    alpha_threshold: f32,

    /// Upper clamp for alpha before inverting the blend
    #[arg(long, default_value_t = reverse_watermark::blending::MAX_ALPHA)]
    max_alpha: f32,

    /// 48x48 calibration capture to use instead of the embedded one
    #[arg(long, requires = "reference_large")]
    reference_small: Option<PathBuf>,

    /// 96x96 calibration capture to use instead of the embedded one
    #[arg(long, requires = "reference_small")]
    reference_large: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_engine(cli: &Cli) -> reverse_watermark::Result<WatermarkEngine> {
    let engine = match (&cli.reference_small, &cli.reference_large) {
        (Some(small), Some(large)) => WatermarkEngine::from_reference_files(small, large)?,
        _ => WatermarkEngine::new()?,
    };
    engine.with_params(BlendParams {
        alpha_threshold: cli.alpha_threshold,
        max_alpha: cli.max_alpha,
        ..BlendParams::default()
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.force_small && cli.force_large {
        eprintln!("Error: Cannot specify both --force-small and --force-large");
        process::exit(1);
    }

    let force_size = if cli.force_small {
        Some(WatermarkSize::Small)
    } else if cli.force_large {
        Some(WatermarkSize::Large)
    } else {
        None
    };

    let opts = ProcessOptions {
        force_size,
        ..ProcessOptions::default()
    };

    let engine = match build_engine(&cli) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Fatal: Failed to initialize engine: {e}");
            process::exit(1);
        }
    };
    tracing::debug!(params = ?engine.params(), "engine ready");

    let input_path = cli.input.as_path();
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", input_path.display());
        process::exit(1);
    }

    if cli.info {
        process::exit(print_info(&engine, input_path, force_size));
    }

    let results = if input_path.is_dir() {
        let Some(output_dir) = &cli.output else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: reverse-watermark <input_dir> -o <output_dir>");
            process::exit(1);
        };
        let done = AtomicUsize::new(0);
        engine.process_directory_with(input_path, output_dir, &opts, |r| {
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            print_result(r, &cli, Some(n));
        })
    } else {
        let output_path = match &cli.output {
            Some(o) => o.clone(),
            None => default_output_path(input_path),
        };
        let result = engine.process_file(input_path, &output_path, &opts);
        print_result(&result, &cli, None);
        vec![result]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

/// Print watermark geometry for a file, or for every image in a directory.
fn print_info(engine: &WatermarkEngine, input: &Path, force_size: Option<WatermarkSize>) -> i32 {
    let files: Vec<PathBuf> = if input.is_dir() {
        match find_images(input) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Error: Failed to read directory: {e}");
                return 1;
            }
        }
    } else {
        vec![input.to_path_buf()]
    };

    let mut status = 0;
    for file in &files {
        let name = file.display();
        match image::image_dimensions(file) {
            Ok((w, h)) => match engine.describe_with(w, h, force_size) {
                Ok(info) => println!("{name}: {w}x{h}, {info}"),
                Err(e) => println!("{name}: {w}x{h}, {e}"),
            },
            Err(e) => {
                eprintln!("[FAIL] {name}: {e}");
                status = 1;
            }
        }
    }
    status
}

fn print_result(result: &ProcessResult, cli: &Cli, progress: Option<usize>) {
    if cli.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );
    let prefix = progress.map(|n| format!("({n}) ")).unwrap_or_default();

    if result.skipped {
        eprintln!("{prefix}[SKIP] {filename}: {}", result.message);
    } else if result.success {
        match result.region {
            Some(r) if cli.verbose => eprintln!(
                "{prefix}[OK] {filename} ({0}x{0} at {1},{2})",
                r.width, r.x, r.y
            ),
            _ => eprintln!("{prefix}[OK] {filename}"),
        }
    } else {
        eprintln!("{prefix}[FAIL] {filename}: {}", result.message);
    }
}
