//! Remove the corner watermark from a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example remove_watermark -- input.png output.png
//! ```

use std::env;
use std::process;

use reverse_watermark::{ProcessOptions, WatermarkEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let engine = WatermarkEngine::new().expect("failed to initialize engine");
    let result = engine.process_file(input.as_ref(), output.as_ref(), &ProcessOptions::default());

    if result.skipped {
        println!("Skipped: {}", result.message);
    } else if result.success {
        match result.region {
            Some(r) => println!(
                "Done: {} ({}x{} at {},{})",
                result.message, r.width, r.height, r.x, r.y
            ),
            None => println!("Done: {}", result.message),
        }
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
