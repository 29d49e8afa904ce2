//! Self-calibration of radius bounds from reference-color ground truth.
//!
//! The only property that matters is "did we keep every reference circle",
//! which is binary and monotone in each bound independently: raising
//! `min_radius` or lowering `max_radius` can only lose circles. That turns
//! calibration into two monotone-predicate binary searches instead of a
//! numeric optimization loop, with total probes bounded by
//! `1 + log2(min range) + log2(max range)` regardless of image size.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detect::validate_bounds;
use crate::error::ConfigError;
use crate::palette::{InkThresholds, Rgb};
use crate::verify::{verify_reference_color_with_expected, VerificationResult};

/// Which bound a calibration probe was exercising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationParameter {
    Baseline,
    MinRadius,
    MaxRadius,
}

/// One probe of the search. Appended to the history, never mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationStep {
    pub iteration: usize,
    pub parameter: CalibrationParameter,
    pub min_radius: u32,
    pub max_radius: u32,
    pub detected_count: usize,
    pub target_count: usize,
    pub error: usize,
}

/// Final calibration output.
///
/// For a run with a nonzero target, `converged == (final_error == 0)`. A
/// zero-count baseline fails early with `converged == false` and only the
/// baseline probe in `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub optimal_min_radius: u32,
    pub optimal_max_radius: u32,
    pub target_count: usize,
    pub final_count: usize,
    pub final_error: usize,
    pub iterations: usize,
    pub converged: bool,
    pub history: Vec<CalibrationStep>,
    pub detected_radius_min: u32,
    pub detected_radius_max: u32,
    pub detected_radius_mean: f64,
    pub message: String,
}

/// Calibrate against the conventional black reference ink.
pub fn calibrate_radius(
    image: &RgbImage,
    initial_min: u32,
    initial_max: u32,
    thresholds: &InkThresholds,
) -> Result<CalibrationResult, ConfigError> {
    calibrate_radius_for_reference(image, initial_min, initial_max, Rgb::BLACK, thresholds)
}

/// Find the tightest `[min_radius, max_radius]` window that still reports
/// the full reference-color count.
pub fn calibrate_radius_for_reference(
    image: &RgbImage,
    initial_min: u32,
    initial_max: u32,
    reference: Rgb,
    thresholds: &InkThresholds,
) -> Result<CalibrationResult, ConfigError> {
    validate_bounds(initial_min, initial_max)?;

    let probe = |min_r: u32, max_r: u32| -> Result<VerificationResult, ConfigError> {
        verify_reference_color_with_expected(image, min_r, max_r, reference, thresholds, None)
    };

    let mut history: Vec<CalibrationStep> = Vec::new();
    let step = |iteration, parameter, min_radius, max_radius, detected: usize, target: usize| {
        CalibrationStep {
            iteration,
            parameter,
            min_radius,
            max_radius,
            detected_count: detected,
            target_count: target,
            error: detected.abs_diff(target),
        }
    };

    let baseline = probe(initial_min, initial_max)?;
    if baseline.count == 0 {
        history.push(step(0, CalibrationParameter::Baseline, initial_min, initial_max, 0, 0));
        tracing::warn!("calibration aborted: no reference circles");
        return Ok(CalibrationResult {
            optimal_min_radius: initial_min,
            optimal_max_radius: initial_max,
            target_count: 0,
            final_count: 0,
            final_error: 0,
            iterations: history.len(),
            converged: false,
            history,
            detected_radius_min: 0,
            detected_radius_max: 0,
            detected_radius_mean: 0.0,
            message: "no reference circles detected; cannot calibrate without ground truth"
                .to_string(),
        });
    }

    let target = baseline.count;
    history.push(step(
        0,
        CalibrationParameter::Baseline,
        initial_min,
        initial_max,
        target,
        target,
    ));
    tracing::info!(
        target,
        radius_min = baseline.radius_min,
        radius_max = baseline.radius_max,
        "calibration baseline established"
    );
    let mut iteration = 1;

    // Largest min_radius in [initial_min, detected minimum] that keeps the
    // full count. The lower end is known-good.
    let mut lo = initial_min;
    let mut hi = baseline.radius_min.min(initial_max - 1).max(initial_min);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        let v = probe(mid, initial_max)?;
        history.push(step(
            iteration,
            CalibrationParameter::MinRadius,
            mid,
            initial_max,
            v.count,
            target,
        ));
        iteration += 1;
        if v.count >= target {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let optimal_min = lo;

    // Smallest max_radius in [detected maximum, initial_max] that keeps the
    // full count, with min_radius fixed. The upper end is known-good.
    let mut lo = baseline.radius_max.max(optimal_min + 1);
    let mut hi = initial_max;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let v = probe(optimal_min, mid)?;
        history.push(step(
            iteration,
            CalibrationParameter::MaxRadius,
            optimal_min,
            mid,
            v.count,
            target,
        ));
        iteration += 1;
        if v.count >= target {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    // Keep the window non-degenerate when every reference dot has the same
    // radius and both searches collapse to it.
    let optimal_max = hi.max(optimal_min + 1);

    let final_v = probe(optimal_min, optimal_max)?;
    let final_error = final_v.count.abs_diff(target);
    let converged = final_error == 0;
    let message = if converged {
        format!("converged after {} probes", history.len())
    } else {
        format!("search ended with residual count error {final_error}")
    };
    tracing::info!(optimal_min, optimal_max, final_error, converged, "calibration finished");

    Ok(CalibrationResult {
        optimal_min_radius: optimal_min,
        optimal_max_radius: optimal_max,
        target_count: target,
        final_count: final_v.count,
        final_error,
        iterations: history.len(),
        converged,
        history,
        detected_radius_min: final_v.radius_min,
        detected_radius_max: final_v.radius_max,
        detected_radius_mean: final_v.radius_mean,
        message,
    })
}
