//! Ground-truth verification against the reference color.
//!
//! The reference color (conventionally the darkest ink, printed last and
//! never occluded) gives the most reliable detections in the image, so its
//! statistics are the yardstick for whether the configured radius bounds are
//! sane.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detect::{detect_in_mask, validate_bounds, DetectOptions};
use crate::error::ConfigError;
use crate::palette::{reference_mask, InkThresholds, Rgb};

/// Sparse and dense per-dot spacing assumptions (pixels) behind the
/// expected-count estimate. Rough heuristics; callers with real knowledge of
/// the artwork should pass their own [`ExpectedCount`].
const SPARSE_SPACING_PX: u64 = 200;
const DENSE_SPACING_PX: u64 = 50;

/// Expected number of reference dots for an image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedCount {
    pub min: usize,
    pub max: usize,
}

impl ExpectedCount {
    /// Estimate from image area and the typical halftone density window.
    pub fn from_image_area(total_pixels: u64) -> Self {
        Self {
            min: (total_pixels / (SPARSE_SPACING_PX * SPARSE_SPACING_PX)) as usize,
            max: (total_pixels / (DENSE_SPACING_PX * DENSE_SPACING_PX)) as usize,
        }
    }
}

/// Metrics and sanity warnings from one reference-color pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub count: usize,
    pub radius_mean: f64,
    pub radius_std: f64,
    pub radius_min: u32,
    pub radius_max: u32,
    /// Total circle area as a percentage of image area.
    pub coverage_percent: f64,
    /// Circles per megapixel.
    pub density: f64,
    pub warnings: Vec<String>,
    /// True exactly when `warnings` is empty.
    pub passed: bool,
}

/// Run the single-color pipeline on the reference color and grade the result.
pub fn verify_reference_color(
    image: &RgbImage,
    min_radius: u32,
    max_radius: u32,
    reference: Rgb,
    thresholds: &InkThresholds,
) -> Result<VerificationResult, ConfigError> {
    verify_reference_color_with_expected(image, min_radius, max_radius, reference, thresholds, None)
}

/// [`verify_reference_color`] with a caller-supplied expected-count window.
pub fn verify_reference_color_with_expected(
    image: &RgbImage,
    min_radius: u32,
    max_radius: u32,
    reference: Rgb,
    thresholds: &InkThresholds,
    expected: Option<ExpectedCount>,
) -> Result<VerificationResult, ConfigError> {
    validate_bounds(min_radius, max_radius)?;

    let (width, height) = image.dimensions();
    let total_pixels = width as u64 * height as u64;
    let mask = reference_mask(image, reference, thresholds);
    let circles = detect_in_mask(&mask, reference, min_radius, max_radius, &DetectOptions::default());

    let count = circles.len();
    if count == 0 {
        let warnings = vec![format!(
            "no reference circles detected; check radius bounds [{min_radius}, {max_radius}] \
             or verify the image contains halftone dots"
        )];
        tracing::warn!("reference verification found no circles");
        return Ok(VerificationResult {
            count: 0,
            radius_mean: 0.0,
            radius_std: 0.0,
            radius_min: 0,
            radius_max: 0,
            coverage_percent: 0.0,
            density: 0.0,
            warnings,
            passed: false,
        });
    }

    let radii: Vec<f64> = circles.iter().map(|c| c.radius as f64).collect();
    let radius_mean = radii.iter().sum::<f64>() / count as f64;
    let radius_std =
        (radii.iter().map(|r| (r - radius_mean).powi(2)).sum::<f64>() / count as f64).sqrt();
    let radius_min = circles.iter().map(|c| c.radius).min().unwrap();
    let radius_max = circles.iter().map(|c| c.radius).max().unwrap();

    let circle_area: f64 = radii.iter().map(|r| std::f64::consts::PI * r * r).sum();
    let coverage_percent = circle_area / total_pixels as f64 * 100.0;
    let density = count as f64 / (total_pixels as f64 / 1_000_000.0);

    let expected = expected.unwrap_or_else(|| ExpectedCount::from_image_area(total_pixels));
    let mut warnings = Vec::new();

    if count * 2 < expected.min {
        warnings.push(format!(
            "very few reference circles detected ({count}); expected at least {}; \
             consider lowering min_radius or raising max_radius",
            expected.min
        ));
    }

    let margin = (max_radius - min_radius) as f64 * 0.15;
    if radius_mean < min_radius as f64 + margin {
        warnings.push(format!(
            "mean radius ({radius_mean:.1}) is close to min_radius ({min_radius}); \
             circles may be clipped"
        ));
    }
    if radius_mean > max_radius as f64 - margin {
        warnings.push(format!(
            "mean radius ({radius_mean:.1}) is close to max_radius ({max_radius}); \
             circles may be clipped"
        ));
    }

    if radius_mean > 0.0 && radius_std / radius_mean > 0.4 {
        warnings.push(format!(
            "high radius variation (CV = {:.0}%); detection may be inconsistent",
            radius_std / radius_mean * 100.0
        ));
    }

    if coverage_percent < 0.1 {
        warnings.push(format!(
            "very low coverage ({coverage_percent:.2}%); many circles may be missed"
        ));
    }

    let passed = warnings.is_empty();
    tracing::info!(count, radius_mean, coverage_percent, passed, "reference verification done");
    Ok(VerificationResult {
        count,
        radius_mean,
        radius_std,
        radius_min,
        radius_max,
        coverage_percent,
        density,
        warnings,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{blank_canvas, draw_disc};

    #[test]
    fn expected_count_window_scales_with_area() {
        let e = ExpectedCount::from_image_area(4_000_000);
        assert_eq!(e.min, 100);
        assert_eq!(e.max, 1600);
    }

    #[test]
    fn zero_count_fails_with_single_fatal_warning() {
        let img = blank_canvas(300, 300);
        let result =
            verify_reference_color(&img, 15, 35, Rgb::BLACK, &InkThresholds::default()).unwrap();
        assert_eq!(result.count, 0);
        assert!(!result.passed);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn mean_radius_near_bound_warns() {
        let mut img = blank_canvas(400, 400);
        for &(x, y) in &[(60, 60), (200, 60), (60, 200), (200, 200)] {
            draw_disc(&mut img, x, y, 24, Rgb::BLACK);
        }
        // Bounds chosen so the mean (~23-24) sits within 15% of max_radius = 25.
        let result =
            verify_reference_color(&img, 10, 25, Rgb::BLACK, &InkThresholds::default()).unwrap();
        assert_eq!(result.count, 4);
        assert!(!result.passed);
        assert!(result.warnings.iter().any(|w| w.contains("max_radius")));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let img = blank_canvas(50, 50);
        assert!(verify_reference_color(&img, 40, 20, Rgb::BLACK, &InkThresholds::default()).is_err());
    }
}
