mod common;

use common::{blank_canvas, draw_disc};
use dotgrid::{
    calibrate_radius, detect_overlapping_circles, detect_overlapping_circles_tiled,
    verify_reference_color, CalibrationParameter, DetectOptions, InkThresholds, Palette, Rgb,
};
use image::RgbImage;

/// 300x300 with four black reference discs of radius 25.
fn four_black_discs() -> RgbImage {
    let mut img = blank_canvas(300, 300);
    for &(x, y) in &[(75, 75), (225, 75), (75, 225), (225, 225)] {
        draw_disc(&mut img, x, y, 25, Rgb::BLACK);
    }
    img
}

#[test]
fn reference_verification_passes_on_matching_bounds() {
    let img = four_black_discs();
    let result =
        verify_reference_color(&img, 15, 35, Rgb::BLACK, &InkThresholds::default()).unwrap();

    assert_eq!(result.count, 4);
    assert!(
        (result.radius_mean - 25.0).abs() <= 2.0,
        "radius_mean = {}",
        result.radius_mean
    );
    assert!(result.passed, "unexpected warnings: {:?}", result.warnings);
}

#[test]
fn reference_verification_reports_zero_for_incompatible_bounds() {
    let img = four_black_discs();
    let result =
        verify_reference_color(&img, 40, 80, Rgb::BLACK, &InkThresholds::default()).unwrap();

    assert_eq!(result.count, 0);
    assert!(!result.passed);
}

#[test]
fn three_far_apart_colors_yield_one_full_coverage_circle_each() {
    let mut img = blank_canvas(300, 300);
    let red = Rgb([255, 0, 0]);
    let green = Rgb([0, 255, 0]);
    let blue = Rgb([0, 0, 255]);
    draw_disc(&mut img, 70, 70, 40, red);
    draw_disc(&mut img, 230, 70, 40, green);
    draw_disc(&mut img, 150, 230, 40, blue);

    let palette = Palette::preset("rgb").unwrap();
    let circles =
        detect_overlapping_circles(&img, &palette, 20, 60, &DetectOptions::default()).unwrap();

    assert_eq!(circles.len(), 3);
    for (color, cx, cy) in [(red, 70, 70), (green, 230, 70), (blue, 150, 230)] {
        let matching: Vec<_> = circles.iter().filter(|c| c.color == color).collect();
        assert_eq!(matching.len(), 1, "expected one {color} circle");
        let c = matching[0];
        assert!((c.x - cx).abs() <= 3 && (c.y - cy).abs() <= 3);
        assert!((c.radius as i32 - 40).abs() <= 2);
        // An unoccluded dot's whole boundary matches: saturated confidence.
        assert!(c.confidence >= 99.9, "confidence = {}", c.confidence);
    }
}

#[test]
fn tiled_detection_matches_whole_image_for_interior_circles() {
    let mut img = blank_canvas(600, 600);
    for &(x, y) in &[(150, 150), (450, 150), (150, 450), (450, 450)] {
        draw_disc(&mut img, x, y, 30, Rgb::BLACK);
    }
    let palette = Palette::preset("grayscale").unwrap();
    let options = DetectOptions::default();

    let whole = detect_overlapping_circles(&img, &palette, 15, 45, &options).unwrap();
    let tiled =
        detect_overlapping_circles_tiled(&img, &palette, 300, 15, 45, &options).unwrap();

    assert_eq!(whole.len(), 4);
    assert_eq!(tiled.len(), whole.len());
    for w in &whole {
        let matched = tiled.iter().any(|t| {
            t.color == w.color
                && (t.x - w.x).abs() <= 1
                && (t.y - w.y).abs() <= 1
                && (t.radius as i32 - w.radius as i32).abs() <= 1
        });
        assert!(matched, "no tiled match for whole-image circle {w:?}");
    }
}

#[test]
fn detected_count_is_monotone_in_each_bound() {
    let img = four_black_discs();
    let thresholds = InkThresholds::default();

    // Raising min_radius never increases the count.
    let counts: Vec<usize> = [15u32, 20, 26, 40]
        .iter()
        .map(|&min| {
            verify_reference_color(&img, min, 60, Rgb::BLACK, &thresholds)
                .unwrap()
                .count
        })
        .collect();
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "count increased: {counts:?}");
    }
    assert_eq!(counts[0], 4);
    assert_eq!(*counts.last().unwrap(), 0);

    // Lowering max_radius never increases the count.
    let counts: Vec<usize> = [45u32, 35, 26, 20]
        .iter()
        .map(|&max| {
            verify_reference_color(&img, 10, max, Rgb::BLACK, &thresholds)
                .unwrap()
                .count
        })
        .collect();
    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "count increased: {counts:?}");
    }
    assert_eq!(counts[0], 4);
}

#[test]
fn calibration_finds_tight_bounds_around_known_radius() {
    let img = four_black_discs();
    let result = calibrate_radius(&img, 5, 100, &InkThresholds::default()).unwrap();

    assert_eq!(result.target_count, 4);
    assert_eq!(result.final_count, 4);
    assert_eq!(result.final_error, 0);
    assert!(result.converged);
    // The rasterized boundary of a radius-25 disc rounds to 24 or 25, so the
    // window must bracket that pixel.
    assert!(result.optimal_min_radius <= 25);
    assert!(result.optimal_max_radius >= 24);
    assert!(result.optimal_max_radius > result.optimal_min_radius);
    assert!((result.detected_radius_mean - 25.0).abs() <= 2.0);

    // History: one baseline probe first, then min_radius probes, then
    // max_radius probes, in order.
    assert_eq!(result.iterations, result.history.len());
    assert_eq!(result.history[0].parameter, CalibrationParameter::Baseline);
    let first_max_probe = result
        .history
        .iter()
        .position(|s| s.parameter == CalibrationParameter::MaxRadius);
    if let Some(pos) = first_max_probe {
        assert!(result.history[pos..]
            .iter()
            .all(|s| s.parameter == CalibrationParameter::MaxRadius));
    }
}

#[test]
fn calibration_without_reference_dots_does_not_converge() {
    let mut img = blank_canvas(300, 300);
    // Only a colored dot; the black reference channel is empty.
    draw_disc(&mut img, 150, 150, 30, Rgb([255, 0, 0]));
    let result = calibrate_radius(&img, 5, 100, &InkThresholds::default()).unwrap();

    assert!(!result.converged);
    assert_eq!(result.target_count, 0);
    assert_eq!(result.history.len(), 1);
}
