//! Tiled detection for images too large to process in one pass.
//!
//! Tiles overlap by `2 x max_radius`, so any circle crossing a tile edge is
//! fully contained in at least one tile. Tiles are independent work items;
//! results are offset to global coordinates and boundary duplicates (the
//! same dot seen from two overlapping tiles) collapse in a final per-color
//! dedup pass with a tighter threshold.

use std::sync::atomic::{AtomicUsize, Ordering};

use image::imageops::crop_imm;
use image::RgbImage;
use rayon::prelude::*;

use crate::dedup::dedup_circles;
use crate::detect::{detect_overlapping_circles, validate_bounds, DetectOptions};
use crate::error::ConfigError;
use crate::palette::Palette;
use crate::DetectedCircle;

/// Observer for long multi-tile runs. Detection is callable without one.
pub trait ProgressObserver: Sync {
    fn tile_completed(&self, completed: usize, total: usize);
}

/// One tile rectangle, `[x1, x2) x [y1, y2)` in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Overlapping tile grid covering the whole image, clipped to its bounds.
pub(crate) fn generate_tiles(width: u32, height: u32, chunk_size: u32, overlap: u32) -> Vec<TileRect> {
    let step = chunk_size.saturating_sub(overlap).max(1) as usize;
    let mut tiles = Vec::new();
    for y in (0..height).step_by(step) {
        for x in (0..width).step_by(step) {
            tiles.push(TileRect {
                x1: x,
                y1: y,
                x2: (x + chunk_size).min(width),
                y2: (y + chunk_size).min(height),
            });
        }
    }
    tiles
}

/// Tiled variant of [`detect_overlapping_circles`].
///
/// `chunk_size` is a request; it is raised to at least `3 x overlap` so the
/// overlap bookkeeping stays a small fraction of each tile. A grid that
/// collapses to one tile short-circuits to the whole-image pipeline.
pub fn detect_overlapping_circles_tiled(
    image: &RgbImage,
    palette: &Palette,
    chunk_size: u32,
    min_radius: u32,
    max_radius: u32,
    options: &DetectOptions,
) -> Result<Vec<DetectedCircle>, ConfigError> {
    detect_overlapping_circles_tiled_with_observer(
        image, palette, chunk_size, min_radius, max_radius, options, None,
    )
}

/// [`detect_overlapping_circles_tiled`] with per-tile progress reporting.
pub fn detect_overlapping_circles_tiled_with_observer(
    image: &RgbImage,
    palette: &Palette,
    chunk_size: u32,
    min_radius: u32,
    max_radius: u32,
    options: &DetectOptions,
    observer: Option<&dyn ProgressObserver>,
) -> Result<Vec<DetectedCircle>, ConfigError> {
    validate_bounds(min_radius, max_radius)?;

    let (width, height) = image.dimensions();
    let overlap = 2 * max_radius;
    let chunk_size = chunk_size.max(3 * overlap);
    let tiles = generate_tiles(width, height, chunk_size, overlap);

    if tiles.len() == 1 {
        tracing::debug!("single tile, skipping orchestration");
        return detect_overlapping_circles(image, palette, min_radius, max_radius, options);
    }

    tracing::info!(
        tiles = tiles.len(),
        chunk_size,
        overlap,
        "running tiled detection"
    );

    let total = tiles.len();
    let completed = AtomicUsize::new(0);
    let per_tile: Result<Vec<Vec<DetectedCircle>>, ConfigError> = tiles
        .par_iter()
        .map(|tile| {
            let crop = crop_imm(image, tile.x1, tile.y1, tile.x2 - tile.x1, tile.y2 - tile.y1)
                .to_image();
            let circles =
                detect_overlapping_circles(&crop, palette, min_radius, max_radius, options)?;
            let offset: Vec<DetectedCircle> = circles
                .into_iter()
                .map(|c| DetectedCircle {
                    x: c.x + tile.x1 as i32,
                    y: c.y + tile.y1 as i32,
                    ..c
                })
                .collect();
            if let Some(obs) = observer {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                obs.tile_completed(done, total);
            }
            Ok(offset)
        })
        .collect();

    let all: Vec<DetectedCircle> = per_tile?.into_iter().flatten().collect();

    // Boundary duplicates are near-exact copies of the same dot, so the
    // threshold is tighter than the in-tile dedup distance.
    let boundary_dedup = max_radius as f64 / 2.0;
    let mut merged = Vec::new();
    for &color in palette.inks() {
        let group: Vec<DetectedCircle> = all.iter().filter(|c| c.color == color).copied().collect();
        merged.extend(dedup_circles(group, boundary_dedup));
    }
    tracing::info!(circles = merged.len(), "tiled detection merged");
    Ok(merged)
}
