use image::GrayImage;
use scriptmatch_types::{
    CompareError, CropRect, DisplaySize, OverlayTransform, SubScore, Verdict, CORRELATION,
    CURVATURE_MATCH, MACRO_GEOMETRY, STROKE_DISTRIBUTION, STRUCTURAL_SIMILARITY,
};

use crate::engine::{ComparisonEngine, EngineConfig};
use crate::geometry;
use crate::metrics::{cross_correlation, edge_overlap, ssim};
use crate::pipeline::feature;
use crate::pipeline::preprocess::{self, GrayPatch, PreprocessSettings};
use crate::scorer::{self, ScoreConfig};
use crate::visualize;

fn test_settings() -> PreprocessSettings {
    PreprocessSettings {
        canonical_edge: 160,
        ..PreprocessSettings::default()
    }
}

fn test_engine() -> ComparisonEngine {
    ComparisonEngine::new(EngineConfig {
        preprocess: test_settings(),
        score: ScoreConfig::default(),
    })
    .unwrap()
}

fn fill_rect(image: &mut GrayImage, x0: u32, y0: u32, width: u32, height: u32, value: u8) {
    for y in y0..(y0 + height).min(image.height()) {
        for x in x0..(x0 + width).min(image.width()) {
            image.put_pixel(x, y, image::Luma([value]));
        }
    }
}

/// Draws an "n"-like glyph: two downstrokes joined by a shoulder.
fn draw_glyph(image: &mut GrayImage, x: u32, y: u32) {
    fill_rect(image, x, y, 3, 24, 30);
    fill_rect(image, x + 10, y + 4, 3, 20, 30);
    fill_rect(image, x, y + 4, 13, 3, 30);
}

/// Synthetic handwriting page: rows of glyphs on paper white.
fn handwriting_image(width: u32, height: u32) -> GrayImage {
    let mut image = GrayImage::from_pixel(width, height, image::Luma([255]));
    let mut y = 8;
    while y + 26 < height {
        let mut x = 6;
        while x + 15 < width {
            draw_glyph(&mut image, x, y);
            x += 18;
        }
        y += 40;
    }
    image
}

fn png_bytes(image: &GrayImage) -> Vec<u8> {
    visualize::encode_png_gray(image).unwrap()
}

fn handwriting_png(width: u32, height: u32) -> Vec<u8> {
    png_bytes(&handwriting_image(width, height))
}

fn glyph_patch() -> GrayPatch {
    GrayPatch::from_luma(&handwriting_image(160, 120))
}

/// Deterministic pseudo-random positions, no RNG dependency.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

/// Speckles the image with `count` dark pixels. Speckle sets are nested:
/// a higher count always contains every speckle of a lower one.
fn speckled(base: &GrayImage, count: usize) -> GrayImage {
    let mut image = base.clone();
    let mut lcg = Lcg(0x5eed);
    for _ in 0..count {
        let x = (lcg.next() % image.width() as u64) as u32;
        let y = (lcg.next() % image.height() as u64) as u32;
        image.put_pixel(x, y, image::Luma([10]));
    }
    image
}

#[test]
fn identical_specimens_score_as_match() {
    let engine = test_engine();
    let bytes = handwriting_png(160, 120);
    let result = engine.compare(&bytes, &bytes).unwrap();

    assert!(result.composite_score > 99.9, "got {}", result.composite_score);
    assert_eq!(result.verdict, Verdict::MatchLikely);
    for sub in &result.sub_scores {
        assert!(sub.score > 99.9, "{} scored {}", sub.name, sub.score);
    }
}

#[test]
fn sub_scores_keep_a_stable_order() {
    let engine = test_engine();
    let bytes = handwriting_png(160, 120);
    let result = engine.compare(&bytes, &bytes).unwrap();
    let names: Vec<&str> = result.sub_scores.iter().map(|sub| sub.name).collect();
    assert_eq!(
        names,
        vec![
            MACRO_GEOMETRY,
            STROKE_DISTRIBUTION,
            CURVATURE_MATCH,
            STRUCTURAL_SIMILARITY,
            CORRELATION,
        ]
    );
}

#[test]
fn compare_is_deterministic() {
    let engine = test_engine();
    let questioned = handwriting_png(160, 120);
    let known = png_bytes(&speckled(&handwriting_image(160, 120), 120));

    let first = engine.compare(&questioned, &known).unwrap();
    let second = engine.compare(&questioned, &known).unwrap();

    assert_eq!(first.composite_score.to_bits(), second.composite_score.to_bits());
    assert_eq!(first.verdict, second.verdict);
    for (a, b) in first.sub_scores.iter().zip(second.sub_scores.iter()) {
        assert_eq!(a.score.to_bits(), b.score.to_bits(), "{} drifted", a.name);
    }
    assert_eq!(first.difference_heatmap, second.difference_heatmap);
}

#[test]
fn blank_specimen_degrades_without_failing() {
    let engine = test_engine();
    let blank = png_bytes(&GrayImage::from_pixel(160, 120, image::Luma([255])));
    let written = handwriting_png(160, 120);

    let result = engine.compare(&blank, &written).unwrap();

    for sub in &result.sub_scores {
        if matches!(sub.name, MACRO_GEOMETRY | STROKE_DISTRIBUTION | CURVATURE_MATCH) {
            assert!(sub.score < 1.0, "{} should degrade, got {}", sub.name, sub.score);
        }
    }
    assert!(result.composite_score < 70.0, "got {}", result.composite_score);
    assert_eq!(result.verdict, Verdict::MatchUnlikely);
}

#[test]
fn composite_is_non_increasing_under_noise() {
    let engine = test_engine();
    let base = handwriting_image(160, 120);
    let reference = png_bytes(&base);

    let mut previous = f32::MAX;
    for count in [0usize, 200, 1200, 4000] {
        let noisy = png_bytes(&speckled(&base, count));
        let result = engine.compare(&reference, &noisy).unwrap();
        assert!(
            result.composite_score <= previous + 0.75,
            "composite rose from {previous} to {} at {count} speckles",
            result.composite_score
        );
        previous = result.composite_score;
    }
}

#[test]
fn corrupt_bytes_report_a_decode_error() {
    let engine = test_engine();
    let good = handwriting_png(160, 120);
    let err = engine.compare(&[0u8, 1, 2, 3], &good).unwrap_err();
    assert!(matches!(err, CompareError::ImageDecode { .. }));
}

#[test]
fn ssim_and_edge_overlap_are_symmetric() {
    let a = glyph_patch();
    let b = GrayPatch::from_luma(&speckled(&handwriting_image(160, 120), 400));

    assert!((ssim(&a, &b) - ssim(&b, &a)).abs() < 1e-3);
    assert!((edge_overlap(&a, &b) - edge_overlap(&b, &a)).abs() < 1e-3);
}

#[test]
fn self_comparison_metrics_hit_full_score() {
    let patch = glyph_patch();
    assert!((ssim(&patch, &patch) - 100.0).abs() < 1e-3);
    assert!((edge_overlap(&patch, &patch) - 100.0).abs() < 1e-3);
    assert!(cross_correlation(&patch, &patch) > 99.9);
}

#[test]
fn metrics_fit_mismatched_shapes() {
    let a = glyph_patch();
    let b = GrayPatch::from_luma(&handwriting_image(120, 160));
    let score = ssim(&a, &b);
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn blank_patches_have_no_edge_overlap() {
    let blank = GrayPatch::from_luma(&GrayImage::from_pixel(64, 64, image::Luma([255])));
    assert_eq!(edge_overlap(&blank, &blank), 0.0);
}

#[test]
fn blank_specimen_extracts_sentinel_features() {
    let blank = png_bytes(&GrayImage::from_pixel(160, 120, image::Luma([255])));
    let specimen = preprocess::normalize(&blank, test_settings()).unwrap();
    let features = feature::extract(&specimen);

    assert!(!features.has_ink());
    assert!(features.stroke_widths.iter().all(|&v| v == 0.0));
    assert_eq!(features.curvature_mean, 0.0);
}

#[test]
fn written_specimen_extracts_nonzero_features() {
    let bytes = handwriting_png(160, 120);
    let specimen = preprocess::normalize(&bytes, test_settings()).unwrap();
    let features = feature::extract(&specimen);

    assert!(features.has_ink());
    assert!(features.size_ratio > 0.0);
    assert!(features.stroke_widths.iter().sum::<f32>() > 0.99);
    assert_eq!(features.stroke_widths.len(), feature::STROKE_BINS);
}

#[test]
fn display_rect_maps_to_source_pixels() {
    let rect = CropRect {
        x: 50.0,
        y: 50.0,
        width: 150.0,
        height: 100.0,
    };
    let display = DisplaySize {
        width: 500.0,
        height: 500.0,
    };
    let mapped = geometry::map_display_to_source(&rect, display, 1000, 1000).unwrap();
    assert_eq!(mapped.x, 100);
    assert_eq!(mapped.y, 100);
    assert_eq!(mapped.width, 300);
    assert_eq!(mapped.height, 200);
}

#[test]
fn degenerate_display_size_is_a_geometry_error() {
    let rect = CropRect {
        x: 0.0,
        y: 0.0,
        width: 10.0,
        height: 10.0,
    };
    let display = DisplaySize {
        width: 0.0,
        height: 500.0,
    };
    let err = geometry::map_display_to_source(&rect, display, 1000, 1000).unwrap_err();
    assert!(matches!(err, CompareError::Geometry { .. }));
}

#[test]
fn out_of_bounds_rect_clamps_instead_of_erroring() {
    let clamped = geometry::clamp_to_bounds(900, -50, 400, 300, 1000, 1000);
    assert!(clamped.x + clamped.width <= 1000);
    assert!(clamped.y + clamped.height <= 1000);
    assert!(clamped.width >= 1 && clamped.height >= 1);
}

#[test]
fn crop_returns_both_renderings_at_source_resolution() {
    let engine = test_engine();
    let bytes = handwriting_png(1000, 1000);
    let rect = CropRect {
        x: 50.0,
        y: 50.0,
        width: 150.0,
        height: 100.0,
    };
    let display = DisplaySize {
        width: 500.0,
        height: 500.0,
    };
    let crop = engine.crop_region(&bytes, rect, display).unwrap();

    assert_eq!(crop.width, 300);
    assert_eq!(crop.height, 200);
    assert_eq!(crop.origin_x, 100);
    assert_eq!(crop.origin_y, 100);

    let transparent = image::load_from_memory(&crop.transparent_png).unwrap().to_rgba8();
    let solid = image::load_from_memory(&crop.solid_png).unwrap().to_rgba8();
    assert_eq!(transparent.dimensions(), (300, 200));
    assert_eq!(solid.dimensions(), (300, 200));
    assert!(transparent.pixels().any(|p| p[3] == 0), "paper should knock out");
    assert!(solid.pixels().all(|p| p[3] == 255));
}

#[test]
fn crop_clamps_overflowing_rect() {
    let engine = test_engine();
    let bytes = handwriting_png(200, 200);
    let rect = CropRect {
        x: 150.0,
        y: 150.0,
        width: 500.0,
        height: 500.0,
    };
    let display = DisplaySize {
        width: 200.0,
        height: 200.0,
    };
    let crop = engine.crop_region(&bytes, rect, display).unwrap();
    assert!(crop.width <= 200 && crop.height <= 200);
    assert!(crop.origin_x + crop.width <= 200);
}

#[test]
fn crop_rejects_degenerate_rect() {
    let engine = test_engine();
    let bytes = handwriting_png(200, 200);
    let rect = CropRect {
        x: 10.0,
        y: 10.0,
        width: 0.0,
        height: 50.0,
    };
    let display = DisplaySize {
        width: 200.0,
        height: 200.0,
    };
    let err = engine.crop_region(&bytes, rect, display).unwrap_err();
    assert!(matches!(err, CompareError::Geometry { .. }));
}

#[test]
fn aligned_self_overlay_scores_high() {
    let engine = test_engine();
    let base = handwriting_png(200, 150);
    let rect = CropRect {
        x: 50.0,
        y: 30.0,
        width: 100.0,
        height: 80.0,
    };
    let display = DisplaySize {
        width: 200.0,
        height: 150.0,
    };
    let crop = engine.crop_region(&base, rect, display).unwrap();

    let transform = OverlayTransform {
        translate_x: 50.0,
        translate_y: 30.0,
        scale: 1.0,
        rotation_degrees: 0.0,
        alpha: 0.8,
    };
    let result = engine
        .local_comparison(&base, &crop.solid_png, transform)
        .unwrap();

    assert!(result.local_ssim > 90.0, "got {}", result.local_ssim);
    assert_eq!(result.region_width, 100);
    assert_eq!(result.region_height, 80);

    let heatmap = image::load_from_memory(&result.difference_heatmap).unwrap();
    assert_eq!(heatmap.width(), 100);
    let edges = image::load_from_memory(&result.edge_visualization).unwrap();
    assert_eq!(edges.height(), 80);
}

#[test]
fn misaligned_overlay_scores_lower_than_aligned() {
    let engine = test_engine();
    let base = handwriting_png(200, 150);
    let rect = CropRect {
        x: 50.0,
        y: 30.0,
        width: 100.0,
        height: 80.0,
    };
    let display = DisplaySize {
        width: 200.0,
        height: 150.0,
    };
    let crop = engine.crop_region(&base, rect, display).unwrap();

    let aligned = engine
        .local_comparison(
            &base,
            &crop.solid_png,
            OverlayTransform {
                translate_x: 50.0,
                translate_y: 30.0,
                ..OverlayTransform::default()
            },
        )
        .unwrap();
    let shifted = engine
        .local_comparison(
            &base,
            &crop.solid_png,
            OverlayTransform {
                translate_x: 95.0,
                translate_y: 65.0,
                ..OverlayTransform::default()
            },
        )
        .unwrap();

    assert!(shifted.local_ssim < aligned.local_ssim);
}

#[test]
fn out_of_bounds_overlay_clamps_instead_of_erroring() {
    let engine = test_engine();
    let base = handwriting_png(200, 150);
    let overlay = handwriting_png(64, 48);

    let transform = OverlayTransform {
        translate_x: 5000.0,
        translate_y: -3000.0,
        scale: 25.0,
        rotation_degrees: 720.0,
        alpha: 0.0,
    };
    let result = engine.local_comparison(&base, &overlay, transform).unwrap();
    assert!(result.region_width >= 1);
    assert!(result.region_height >= 1);
}

#[test]
fn overlay_transform_clamps_to_documented_ranges() {
    let clamped = OverlayTransform {
        translate_x: 12.0,
        translate_y: -4.0,
        scale: 25.0,
        rotation_degrees: 500.0,
        alpha: 0.0,
    }
    .clamped();
    assert_eq!(clamped.scale, 3.0);
    assert_eq!(clamped.rotation_degrees, 180.0);
    assert_eq!(clamped.alpha, 0.1);

    let lower = OverlayTransform {
        scale: 0.01,
        ..OverlayTransform::default()
    }
    .clamped();
    assert_eq!(lower.scale, 0.25);
}

#[test]
fn composing_empty_sub_scores_is_a_configuration_error() {
    let config = ScoreConfig::default();
    let err = scorer::compose(&[], &config).unwrap_err();
    assert!(matches!(err, CompareError::Configuration { .. }));
}

#[test]
fn unknown_sub_score_name_is_a_configuration_error() {
    let config = ScoreConfig::default();
    let subs = vec![SubScore::new("Mystery Metric", 50.0, "")];
    let err = scorer::compose(&subs, &config).unwrap_err();
    assert!(matches!(err, CompareError::Configuration { .. }));
}

#[test]
fn invalid_weight_table_fails_engine_construction() {
    let mut config = EngineConfig::default();
    config.score.weights = vec![(MACRO_GEOMETRY.to_string(), 0.4)];
    let err = ComparisonEngine::new(config).unwrap_err();
    assert!(matches!(err, CompareError::Configuration { .. }));
}

fn uniform_sub_scores(score: f32) -> Vec<SubScore> {
    scorer::SUB_SCORE_ORDER
        .iter()
        .copied()
        .map(|name| SubScore::new(name, score, String::new()))
        .collect()
}

#[test]
fn verdict_thresholds_classify_three_tiers() {
    let config = ScoreConfig::default();
    let (score, verdict) = scorer::compose(&uniform_sub_scores(92.0), &config).unwrap();
    assert!((score - 92.0).abs() < 1e-3);
    assert_eq!(verdict, Verdict::MatchLikely);

    let (_, verdict) = scorer::compose(&uniform_sub_scores(75.0), &config).unwrap();
    assert_eq!(verdict, Verdict::Inconclusive);

    let (_, verdict) = scorer::compose(&uniform_sub_scores(42.0), &config).unwrap();
    assert_eq!(verdict, Verdict::MatchUnlikely);
}

#[test]
fn ai_sub_score_is_advisory_unless_configured() {
    let mut subs = uniform_sub_scores(80.0);
    subs.push(SubScore::new(
        scriptmatch_types::AI_DEEP_ANALYSIS,
        20.0,
        "external opinion",
    ));

    let advisory = ScoreConfig::default();
    let (score, _) = scorer::compose(&subs, &advisory).unwrap();
    assert!((score - 80.0).abs() < 1e-3);

    let weighted = ScoreConfig {
        include_ai: true,
        ..ScoreConfig::default()
    };
    let (score, _) = scorer::compose(&subs, &weighted).unwrap();
    assert!((score - (80.0 * 0.65 + 20.0 * 0.35)).abs() < 1e-2);
}

#[test]
fn thumbnail_fits_within_preview_bounds() {
    let engine = test_engine();
    let bytes = handwriting_png(640, 480);
    let thumb = engine.thumbnail(&bytes).unwrap();
    let decoded = image::load_from_memory(&thumb).unwrap();
    assert!(decoded.width() <= 150 && decoded.height() <= 150);
}
