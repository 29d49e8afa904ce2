//! Palette classification: quantization to a fixed color set and per-color
//! binary masks.
//!
//! A palette is plain data supplied by the caller; the engine holds no
//! default color table of its own. `colors[0]` is the background (white for
//! all presets) and is never searched for dots.

use std::fmt;

use image::{GrayImage, Luma, Rgb as ImRgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An exact palette color in 8-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    /// Rec.601 luma; lower is darker.
    pub fn luminance(&self) -> f32 {
        let [r, g, b] = self.0;
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
    }

    /// Euclidean distance in RGB space.
    pub fn distance_to(&self, other: &Rgb) -> f32 {
        let dr = self.0[0] as f32 - other.0[0] as f32;
        let dg = self.0[1] as f32 - other.0[1] as f32;
        let db = self.0[2] as f32 - other.0[2] as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0[0], self.0[1], self.0[2])
    }
}

/// Thresholds for ink-separation masks used by verification and calibration.
///
/// `black_threshold` applies when the reference color is a dark ink,
/// `ink_threshold` otherwise. Both are Euclidean tolerances in RGB space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InkThresholds {
    pub ink_threshold: u8,
    pub black_threshold: u8,
}

impl Default for InkThresholds {
    fn default() -> Self {
        Self {
            ink_threshold: 100,
            black_threshold: 60,
        }
    }
}

/// An ordered color palette; `colors[0]` is the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Build from an explicit color list. The first color is the background.
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }

    /// A named preset: `cmyk`, `rgb` or `grayscale`.
    pub fn preset(name: &str) -> Option<Palette> {
        let colors = match name {
            "cmyk" => vec![
                Rgb::WHITE,
                Rgb::BLACK,
                Rgb([118, 193, 241]), // cyan ink
                Rgb([217, 93, 155]),  // magenta ink
                Rgb([238, 206, 94]),  // yellow ink
            ],
            "rgb" => vec![
                Rgb::WHITE,
                Rgb::BLACK,
                Rgb([255, 0, 0]),
                Rgb([0, 255, 0]),
                Rgb([0, 0, 255]),
            ],
            "grayscale" => vec![Rgb::WHITE, Rgb::BLACK, Rgb([128, 128, 128])],
            _ => return None,
        };
        Some(Palette { colors })
    }

    /// Parse a palette specification: a preset name, or semicolon-separated
    /// `R,G,B` triples. Custom lists get a white background prepended.
    pub fn parse(spec: &str) -> Result<Palette, ConfigError> {
        if let Some(preset) = Self::preset(&spec.to_ascii_lowercase()) {
            return Ok(preset);
        }

        let invalid = |reason: &str| ConfigError::InvalidPalette {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut colors = vec![Rgb::WHITE];
        for triple in spec.split(';') {
            let parts: Vec<&str> = triple.trim().split(',').collect();
            if parts.len() != 3 {
                return Err(invalid("expected `R,G,B` triples separated by `;`"));
            }
            let mut channels = [0u8; 3];
            for (slot, part) in channels.iter_mut().zip(&parts) {
                *slot = part
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| invalid("channel values must be integers in 0-255"))?;
            }
            colors.push(Rgb(channels));
        }
        if colors.len() < 2 {
            return Err(invalid("palette needs at least one ink color"));
        }
        Ok(Palette { colors })
    }

    pub fn background(&self) -> Rgb {
        self.colors[0]
    }

    /// Every non-background color, in palette order.
    pub fn inks(&self) -> &[Rgb] {
        &self.colors[1..]
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// The darkest ink by luminance: the conventional reference color
    /// (topmost printed, never occluded).
    pub fn reference_color(&self) -> Rgb {
        self.inks()
            .iter()
            .copied()
            .min_by(|a, b| a.luminance().total_cmp(&b.luminance()))
            .unwrap_or(Rgb::BLACK)
    }
}

/// Map every pixel to its nearest palette color (Euclidean RGB distance,
/// ties broken by palette order).
pub fn quantize(image: &RgbImage, palette: &Palette) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels() {
        let src = Rgb(pixel.0);
        let mut best = palette.colors[0];
        let mut best_dist = f32::INFINITY;
        for &color in &palette.colors {
            let d = src.distance_to(&color);
            if d < best_dist {
                best_dist = d;
                best = color;
            }
        }
        out.put_pixel(x, y, ImRgb(best.0));
    }
    out
}

/// Binary mask of pixels exactly matching one palette color.
pub fn filter_to_mask(quantized: &RgbImage, color: Rgb) -> GrayImage {
    let (w, h) = quantized.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (x, y, pixel) in quantized.enumerate_pixels() {
        if pixel.0 == color.0 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}

/// Ink-separation mask for the reference color, thresholded directly on the
/// source image (no quantization: verification must not depend on the rest
/// of the palette).
pub fn reference_mask(image: &RgbImage, reference: Rgb, thresholds: &InkThresholds) -> GrayImage {
    // Dark references use the tighter black threshold.
    let tolerance = if reference.luminance() < 64.0 {
        thresholds.black_threshold
    } else {
        thresholds.ink_threshold
    } as f32;

    let (w, h) = image.dimensions();
    let mut mask = GrayImage::new(w, h);
    for (x, y, pixel) in image.enumerate_pixels() {
        if Rgb(pixel.0).distance_to(&reference) <= tolerance {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    mask
}
