//! Shared synthetic-image helpers for unit tests.

use image::{Rgb as ImRgb, RgbImage};

use crate::palette::Rgb;

/// A white canvas, the conventional halftone background.
pub(crate) fn blank_canvas(w: u32, h: u32) -> RgbImage {
    RgbImage::from_pixel(w, h, ImRgb([255, 255, 255]))
}

/// Paint a filled disc, clipped to the image.
pub(crate) fn draw_disc(img: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb) {
    let (w, h) = img.dimensions();
    for y in (cy - radius).max(0)..=(cy + radius).min(h as i32 - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(w as i32 - 1) {
            let dx = x - cx;
            let dy = y - cy;
            if dx * dx + dy * dy <= radius * radius {
                img.put_pixel(x as u32, y as u32, ImRgb(color.0));
            }
        }
    }
}
