//! Blob isolation: connected foreground regions of a single-color mask.
//!
//! Regions below the area threshold are quantization noise and are dropped.
//! Nothing is merged or split here; reconnecting fragmented regions is the
//! caller-selected morphological mode.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};

/// Dilation-then-erosion parameters for reconnecting a blob fragmented by
/// adjacent occluding colors. The radii are independent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MorphologyParams {
    pub dilation_radius: u8,
    pub erosion_radius: u8,
}

impl Default for MorphologyParams {
    fn default() -> Self {
        Self {
            dilation_radius: 1,
            erosion_radius: 1,
        }
    }
}

/// One connected foreground region with its 8-connected outer contour.
#[derive(Debug, Clone)]
pub(crate) struct Blob {
    pub area: u32,
    /// Ordered boundary points in mask coordinates.
    pub contour: Vec<Point<i32>>,
    /// Inclusive bounding box `(x0, y0, x1, y1)` in mask coordinates.
    pub bbox: (u32, u32, u32, u32),
}

/// Dilate then erode the whole mask to reconnect fragmented regions.
pub(crate) fn enhance_mask(mask: &GrayImage, params: &MorphologyParams) -> GrayImage {
    let mut out = mask.clone();
    if params.dilation_radius > 0 {
        out = dilate(&out, Norm::LInf, params.dilation_radius);
    }
    if params.erosion_radius > 0 {
        out = erode(&out, Norm::LInf, params.erosion_radius);
    }
    out
}

/// Find 8-connected foreground components of at least `min_area` pixels and
/// trace each one's outer contour.
pub(crate) fn isolate_blobs(mask: &GrayImage, min_area: u32) -> Vec<Blob> {
    let (w, h) = mask.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    // Single pass for per-label area and bounding box.
    let mut stats: Vec<(u32, u32, u32, u32, u32)> = Vec::new(); // area, x0, y0, x1, y1
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() < label {
            stats.resize(label, (0, u32::MAX, u32::MAX, 0, 0));
        }
        let entry = &mut stats[label - 1];
        entry.0 += 1;
        entry.1 = entry.1.min(x);
        entry.2 = entry.2.min(y);
        entry.3 = entry.3.max(x);
        entry.4 = entry.4.max(y);
    }

    let mut blobs = Vec::new();
    for (idx, &(area, x0, y0, x1, y1)) in stats.iter().enumerate() {
        if area < min_area {
            continue;
        }
        let label = (idx + 1) as u32;

        // Trace on a 1px-padded crop of this component only, then shift back.
        let (cw, ch) = (x1 - x0 + 1, y1 - y0 + 1);
        let mut crop = GrayImage::new(cw + 2, ch + 2);
        for y in y0..=y1 {
            for x in x0..=x1 {
                if labels.get_pixel(x, y)[0] == label {
                    crop.put_pixel(x - x0 + 1, y - y0 + 1, Luma([255]));
                }
            }
        }

        let contour = find_contours::<i32>(&crop)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .max_by_key(|c| c.points.len())
            .map(|c| c.points)
            .unwrap_or_default();
        if contour.len() < 5 {
            continue;
        }

        let offset_x = x0 as i32 - 1;
        let offset_y = y0 as i32 - 1;
        let contour = contour
            .into_iter()
            .map(|p| Point::new(p.x + offset_x, p.y + offset_y))
            .collect();

        blobs.push(Blob {
            area,
            contour,
            bbox: (x0, y0, x1, y1),
        });
    }
    blobs
}
