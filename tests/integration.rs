use image::{Rgba, RgbaImage};
use reverse_watermark::blending::{self, LOGO_VALUE};
use reverse_watermark::{Error, ProcessOptions, Region, WatermarkEngine, WatermarkSize};

#[allow(clippy::cast_possible_truncation)]
fn scene(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 7 % 256) as u8,
            (y * 5 % 256) as u8,
            ((x + 2 * y) % 256) as u8,
            255,
        ])
    })
}

/// Composite the engine's own logo onto `img` at the detected position.
fn watermark(engine: &WatermarkEngine, img: &mut RgbaImage) -> Region {
    let (w, h) = img.dimensions();
    let size = WatermarkSize::for_dimensions(w, h);
    let region = size.config().locate(w, h).unwrap();
    blending::apply_alpha_blend(img, engine.alpha_map(size), region, LOGO_VALUE);
    region
}

#[test]
fn engine_initializes_successfully() {
    let engine = WatermarkEngine::new();
    assert!(engine.is_ok());
}

#[test]
fn detect_and_locate_match_examples() {
    let engine = WatermarkEngine::new().unwrap();

    let config = engine.detect(1025, 1025);
    assert_eq!(
        (config.logo_size, config.margin_right, config.margin_bottom),
        (96, 64, 64)
    );
    let config = engine.detect(1024, 2000);
    assert_eq!(
        (config.logo_size, config.margin_right, config.margin_bottom),
        (48, 32, 32)
    );

    let large = engine.detect(2000, 1500);
    let region = engine.locate(2000, 1500, &large).unwrap();
    assert_eq!(
        region,
        Region {
            x: 1840,
            y: 1340,
            width: 96,
            height: 96
        }
    );
    assert_eq!(engine.locate(2000, 1500, &large).unwrap(), region);
}

#[test]
fn removes_synthetic_small_watermark() {
    let engine = WatermarkEngine::new().unwrap();
    let original = scene(400, 300);
    let mut marked = original.clone();
    let region = watermark(&engine, &mut marked);
    assert_ne!(marked, original, "fixture must actually be watermarked");

    let cleaned = engine.remove_watermark(&marked).unwrap();

    for (x, y, px) in cleaned.enumerate_pixels() {
        let orig = original.get_pixel(x, y);
        if region.contains(x, y) {
            for ch in 0..3 {
                let diff = (i32::from(px[ch]) - i32::from(orig[ch])).abs();
                assert!(diff <= 2, "({x},{y}) ch {ch}: {} vs {}", px[ch], orig[ch]);
            }
            assert_eq!(px[3], orig[3]);
        } else {
            assert_eq!(px, orig, "({x},{y}) outside the region changed");
        }
    }
}

#[test]
fn removes_synthetic_large_watermark() {
    let engine = WatermarkEngine::new().unwrap();
    let original = scene(1280, 1100);
    let mut marked = original.clone();
    let region = watermark(&engine, &mut marked);
    assert_eq!(region.width, 96);

    let cleaned = engine.remove_watermark(&marked).unwrap();

    let max_diff = cleaned
        .pixels()
        .zip(original.pixels())
        .flat_map(|(a, b)| (0..3).map(move |ch| (i32::from(a[ch]) - i32::from(b[ch])).abs()))
        .max()
        .unwrap();
    assert!(max_diff <= 2, "max channel error {max_diff}");
}

#[test]
fn remove_watermark_does_not_mutate_input() {
    let engine = WatermarkEngine::new().unwrap();
    let mut input = scene(200, 200);
    watermark(&engine, &mut input);
    let snapshot = input.clone();

    let output = engine.remove_watermark(&input).unwrap();

    assert_eq!(input, snapshot);
    assert_ne!(output, input);
}

#[test]
fn removal_is_deterministic() {
    let engine = WatermarkEngine::new().unwrap();
    let mut input = scene(640, 480);
    watermark(&engine, &mut input);

    let first = engine.remove_watermark(&input).unwrap();
    let second = engine.remove_watermark(&input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn alpha_maps_are_cached_across_removals() {
    let engine = WatermarkEngine::new().unwrap();
    let img = scene(200, 200);

    engine.remove_watermark(&img).unwrap();
    assert_eq!(engine.alpha_map_builds(), 1);
    engine.remove_watermark(&img).unwrap();
    assert_eq!(engine.alpha_map_builds(), 1);

    engine.remove_watermark(&scene(1100, 1100)).unwrap();
    assert_eq!(engine.alpha_map_builds(), 2);
}

#[test]
fn undersized_image_is_rejected() {
    let engine = WatermarkEngine::new().unwrap();
    let img = scene(40, 40);
    assert!(matches!(
        engine.remove_watermark(&img),
        Err(Error::ImageTooSmall {
            width: 40,
            height: 40,
            ..
        })
    ));
}

#[test]
fn describe_matches_removal_region() {
    let engine = WatermarkEngine::new().unwrap();
    let mut img = scene(800, 600);
    let info = engine.describe(800, 600).unwrap();
    let region = engine.remove_in_place(&mut img, None).unwrap();
    assert_eq!(info.region, region);
    assert_eq!(info.size, WatermarkSize::Small);
}

#[test]
fn engine_is_shareable_across_threads() {
    let engine = WatermarkEngine::new().unwrap();
    let mut input = scene(300, 300);
    watermark(&engine, &mut input);
    let expected = engine.remove_watermark(&input).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| engine.remove_watermark(&input).unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}

#[test]
fn process_file_writes_cleaned_image() {
    let engine = WatermarkEngine::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    let output = dir.path().join("out").join("photo.png");

    let original = scene(320, 240);
    let mut marked = original.clone();
    watermark(&engine, &mut marked);
    marked.save(&input).unwrap();

    let result = engine.process_file(&input, &output, &ProcessOptions::default());
    assert!(result.success, "{}", result.message);
    assert!(!result.skipped);
    assert_eq!(result.region.map(|r| (r.x, r.y)), Some((240, 160)));

    let written = image::open(&output).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (320, 240));
    assert_eq!(written.get_pixel(0, 0), original.get_pixel(0, 0));
}

#[test]
fn process_file_skips_small_and_oversized_inputs() {
    let engine = WatermarkEngine::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let tiny = dir.path().join("tiny.png");
    scene(30, 30).save(&tiny).unwrap();
    let result = engine.process_file(&tiny, &dir.path().join("a.png"), &ProcessOptions::default());
    assert!(result.success && result.skipped);
    assert!(result.message.contains("too small"));
    assert!(!dir.path().join("a.png").exists());

    let normal = dir.path().join("normal.png");
    scene(200, 200).save(&normal).unwrap();
    let opts = ProcessOptions {
        max_input_bytes: Some(10),
        ..ProcessOptions::default()
    };
    let result = engine.process_file(&normal, &dir.path().join("b.png"), &opts);
    assert!(result.success && result.skipped);
    assert!(result.message.contains("too large"));
}

#[test]
fn process_file_reports_decode_failure() {
    let engine = WatermarkEngine::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.png");
    std::fs::write(&bogus, b"definitely not an image").unwrap();

    let result = engine.process_file(&bogus, &dir.path().join("out.png"), &ProcessOptions::default());
    assert!(!result.success);
    assert!(!result.skipped);
    assert!(result.message.starts_with("Failed to load"));
}

#[test]
fn process_directory_reports_each_item() {
    let engine = WatermarkEngine::new().unwrap();
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    scene(200, 150).save(input_dir.path().join("a.png")).unwrap();
    scene(20, 20).save(input_dir.path().join("b.png")).unwrap();
    std::fs::write(input_dir.path().join("c.png"), b"broken").unwrap();
    std::fs::write(input_dir.path().join("notes.txt"), b"ignored").unwrap();

    let seen = std::sync::Mutex::new(Vec::new());
    let results = engine.process_directory_with(
        input_dir.path(),
        output_dir.path(),
        &ProcessOptions::default(),
        |r| seen.lock().unwrap().push(r.path.clone()),
    );

    assert_eq!(results.len(), 3);
    assert_eq!(seen.lock().unwrap().len(), 3);

    let names: Vec<_> = results
        .iter()
        .map(|r| r.path.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["a.png", "b.png", "c.png"]);

    assert!(results[0].success && !results[0].skipped);
    assert!(results[1].success && results[1].skipped);
    assert!(!results[2].success);

    assert!(output_dir.path().join("a.png").exists());
    assert!(!output_dir.path().join("b.png").exists());
}

#[test]
fn process_files_keeps_same_named_inputs_apart() {
    let engine = WatermarkEngine::new().unwrap();
    let root = tempfile::tempdir().unwrap();
    let output_dir = root.path().join("out");

    let first = root.path().join("a").join("x.png");
    let second = root.path().join("b").join("x.png");
    for (path, (w, h)) in [(&first, (200, 150)), (&second, (300, 200))] {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        scene(w, h).save(path).unwrap();
    }

    let results = engine.process_files(
        &[first, second],
        &output_dir,
        &ProcessOptions::default(),
        |_| {},
    );
    assert!(results.iter().all(|r| r.success && !r.skipped));

    let kept = image::open(output_dir.join("x.png")).unwrap();
    let renamed = image::open(output_dir.join("x_2.png")).unwrap();
    assert_eq!((kept.width(), kept.height()), (200, 150));
    assert_eq!((renamed.width(), renamed.height()), (300, 200));
}

#[test]
fn process_directory_missing_input_fails() {
    let engine = WatermarkEngine::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let results = engine.process_directory(
        &dir.path().join("missing"),
        &dir.path().join("out"),
        &ProcessOptions::default(),
    );
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[test]
fn reference_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let small = dir.path().join("bg_48.png");
    let large = dir.path().join("bg_96.png");
    RgbaImage::from_pixel(48, 48, Rgba([51, 51, 51, 255])).save(&small).unwrap();
    RgbaImage::from_pixel(96, 96, Rgba([0, 0, 0, 255])).save(&large).unwrap();

    let engine = WatermarkEngine::from_reference_files(&small, &large).unwrap();
    assert!(engine
        .alpha_map(WatermarkSize::Small)
        .values()
        .iter()
        .all(|&a| (a - 0.2).abs() < 1e-6));

    // All-zero alpha leaves large images untouched.
    let img = scene(1200, 1200);
    assert_eq!(engine.remove_watermark(&img).unwrap(), img);

    let err = WatermarkEngine::from_reference_files(&large, &small).unwrap_err();
    assert!(matches!(err, Error::ReferenceSize { .. }));
}
