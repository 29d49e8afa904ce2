//! Per-color detection pipeline: blob isolation → convex boundary filtering
//! → circle fitting → spatial deduplication.

use image::{GrayImage, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::blob::{enhance_mask, isolate_blobs, MorphologyParams};
use crate::convex::convex_points;
use crate::dedup::dedup_circles;
use crate::error::ConfigError;
use crate::fit::fit_circle;
use crate::palette::{filter_to_mask, quantize, Palette, Rgb};
use crate::vote::VoteParams;
use crate::DetectedCircle;

/// Voting sensitivity. `Sensitive` admits circles supported by smaller arcs,
/// for heavily occluded dots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    #[default]
    Normal,
    Sensitive,
}

/// Tunables for one detection run. The defaults are the values validated on
/// overlapping CMYK halftone scans.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectOptions {
    /// Blobs below this pixel area are noise.
    pub min_blob_area: u32,
    /// Convexity defects deeper than this (pixels) mark an occlusion seam.
    pub defect_depth_threshold: f32,
    /// Boundary positions masked on each side of a seam.
    pub non_convex_margin: usize,
    /// Minimum surviving convex points to attempt a fit.
    pub min_convex_points: usize,
    /// Centers at most this far apart are the same dot.
    pub dedup_distance: f64,
    pub sensitivity: Sensitivity,
    /// Dilate/erode the mask before labeling to reconnect fragments.
    pub morphology: Option<MorphologyParams>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            min_blob_area: 1000,
            defect_depth_threshold: 5.0,
            non_convex_margin: 20,
            min_convex_points: 20,
            dedup_distance: 20.0,
            sensitivity: Sensitivity::Normal,
            morphology: None,
        }
    }
}

impl DetectOptions {
    fn vote_params(&self) -> VoteParams {
        match self.sensitivity {
            Sensitivity::Normal => VoteParams::normal(),
            Sensitivity::Sensitive => VoteParams::sensitive(),
        }
    }
}

pub(crate) fn validate_bounds(min_radius: u32, max_radius: u32) -> Result<(), ConfigError> {
    if max_radius <= min_radius {
        return Err(ConfigError::InvalidRadiusBounds {
            min: min_radius,
            max: max_radius,
        });
    }
    Ok(())
}

/// Detect circles in a single-color binary mask.
///
/// At most one circle is emitted per blob; a blob without enough unoccluded
/// boundary, or whose candidates all fall outside the radius range, yields
/// nothing.
pub(crate) fn detect_in_mask(
    mask: &GrayImage,
    color: Rgb,
    min_radius: u32,
    max_radius: u32,
    options: &DetectOptions,
) -> Vec<DetectedCircle> {
    let enhanced;
    let mask = match &options.morphology {
        Some(params) => {
            enhanced = enhance_mask(mask, params);
            &enhanced
        }
        None => mask,
    };

    let blobs = isolate_blobs(mask, options.min_blob_area);
    let vote_params = options.vote_params();

    let mut candidates = Vec::new();
    for blob in &blobs {
        let convex = convex_points(
            &blob.contour,
            options.defect_depth_threshold,
            options.non_convex_margin,
        );
        if convex.len() < options.min_convex_points {
            continue;
        }
        if let Some(fit) = fit_circle(&convex, min_radius, max_radius, &vote_params) {
            candidates.push(DetectedCircle {
                x: fit.x,
                y: fit.y,
                radius: fit.radius,
                color,
                confidence: fit.score.min(1.0) * 100.0,
            });
        }
    }

    let circles = dedup_circles(candidates, options.dedup_distance);
    tracing::debug!(
        color = %color,
        blobs = blobs.len(),
        circles = circles.len(),
        "single-color pass done"
    );
    circles
}

/// Detect all overlapping circles in one image.
///
/// The image is quantized to the palette once; every non-background color
/// then runs its own independent pass (in parallel), and results are merged
/// in palette order.
pub fn detect_overlapping_circles(
    image: &RgbImage,
    palette: &Palette,
    min_radius: u32,
    max_radius: u32,
    options: &DetectOptions,
) -> Result<Vec<DetectedCircle>, ConfigError> {
    validate_bounds(min_radius, max_radius)?;

    let quantized = quantize(image, palette);
    let per_color: Vec<Vec<DetectedCircle>> = palette
        .inks()
        .par_iter()
        .map(|&color| {
            let mask = filter_to_mask(&quantized, color);
            detect_in_mask(&mask, color, min_radius, max_radius, options)
        })
        .collect();

    let circles: Vec<DetectedCircle> = per_color.into_iter().flatten().collect();
    tracing::info!(
        colors = palette.inks().len(),
        circles = circles.len(),
        "detection pass done"
    );
    Ok(circles)
}
