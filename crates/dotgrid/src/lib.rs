//! dotgrid — overlapping-dot detection and radius calibration for
//! halftone-printed artwork.
//!
//! Locates circular marks of known palette colors even when many dots
//! overlap, where a dot's visible silhouette is a crescent rather than a
//! disk. The pipeline stages are:
//!
//! 1. **Palette** – quantization to the caller's color set, per-color masks.
//! 2. **Blob** – connected-region isolation with a noise-area floor.
//! 3. **Convex** – occlusion-seam suppression via convexity defects.
//! 4. **Vote** – gradient-voting circle candidates on the surviving arcs.
//! 5. **Fit** – arc-coverage scoring, one circle (or zero) per blob.
//! 6. **Dedup** – k-d-tree first-wins spatial deduplication.
//! 7. **Tile** – overlapping-tile orchestration for oversized images.
//! 8. **Verify / Calibrate** – reference-color ground truth and binary-search
//!    radius calibration.
//!
//! All entry points are pure functions of their inputs; the engine holds no
//! process-wide state.

pub mod blob;
pub mod calibrate;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod palette;
pub mod tile;
pub mod verify;

mod convex;
mod fit;
mod spatial;
mod vote;

#[cfg(test)]
mod test_utils;

use serde::{Deserialize, Serialize};

pub use blob::MorphologyParams;
pub use calibrate::{
    calibrate_radius, calibrate_radius_for_reference, CalibrationParameter, CalibrationResult,
    CalibrationStep,
};
pub use dedup::dedup_circles;
pub use detect::{detect_overlapping_circles, DetectOptions, Sensitivity};
pub use error::ConfigError;
pub use palette::{filter_to_mask, quantize, reference_mask, InkThresholds, Palette, Rgb};
pub use tile::{
    detect_overlapping_circles_tiled, detect_overlapping_circles_tiled_with_observer,
    ProgressObserver, TileRect,
};
pub use verify::{
    verify_reference_color, verify_reference_color_with_expected, ExpectedCount,
    VerificationResult,
};

/// A detected dot: integer center and radius in image pixels, the exact
/// palette color that produced the blob, and an arc-coverage confidence in
/// `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedCircle {
    pub x: i32,
    pub y: i32,
    pub radius: u32,
    pub color: Rgb,
    pub confidence: f32,
}
