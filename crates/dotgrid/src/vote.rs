//! Circle voting on a sparse point image.
//!
//! Gradient-voting radial symmetry: the convex points are rendered as dots
//! and blurred; every strong-gradient pixel then votes along its gradient
//! direction at distances in `[min_radius, max_radius]`. Points on a circular
//! arc have gradients that converge at the circle center, so centers show up
//! as accumulator peaks even when only a small arc is visible. Per peak, the
//! radius is the mode of the point-distance histogram over the allowed range.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::point::Point;

/// Voting thresholds. `sensitive` admits circles supported by a smaller
/// fraction of their circumference, for heavily occluded dots.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VoteParams {
    /// Gradient magnitude threshold (fraction of max gradient).
    pub grad_threshold: f32,
    /// Minimum accumulator value for a peak (fraction of max).
    pub min_vote_frac: f32,
    /// Minimum distance between candidate centers (NMS radius, pixels).
    pub min_dist: f32,
    /// Gaussian sigma for accumulator smoothing.
    pub accum_sigma: f32,
    /// Gaussian sigma for blurring the rendered point image.
    pub blur_sigma: f32,
    /// Minimum number of points in a candidate's radius bin.
    pub support_threshold: usize,
}

impl VoteParams {
    pub fn normal() -> Self {
        Self {
            grad_threshold: 0.2,
            min_vote_frac: 0.25,
            min_dist: 50.0,
            accum_sigma: 2.0,
            blur_sigma: 2.0,
            support_threshold: 20,
        }
    }

    pub fn sensitive() -> Self {
        Self {
            grad_threshold: 0.1,
            min_vote_frac: 0.15,
            support_threshold: 15,
            ..Self::normal()
        }
    }
}

/// A candidate circle with its accumulator strength and radius-bin support.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CircleCandidate {
    pub cx: i32,
    pub cy: i32,
    pub radius: u32,
    pub votes: f32,
    pub support: usize,
}

/// Deposit a weighted vote using bilinear interpolation.
#[inline]
fn bilinear_add(accum: &mut [f32], w: u32, h: u32, x: f32, y: f32, weight: f32) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let stride = w as usize;
    let base = y0 as usize * stride + x0 as usize;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Render points as small dots and Gaussian-blur the result.
fn render_blurred(points: &[Point<i32>], w: u32, h: u32, sigma: f32) -> GrayImage {
    let mut f = ImageBuffer::<Luma<f32>, Vec<f32>>::new(w, h);
    for p in points {
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let (x, y) = (p.x + dx, p.y + dy);
                if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    f.put_pixel(x as u32, y as u32, Luma([1.0]));
                }
            }
        }
    }
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in blurred.enumerate_pixels() {
        let v = pixel[0].clamp(0.0, 1.0);
        out.put_pixel(x, y, Luma([(v * 255.0).round() as u8]));
    }
    out
}

/// Vote for circle candidates in `[min_radius, max_radius]`.
///
/// `points` are in the coordinate frame of a `w x h` buffer. Candidates are
/// returned ordered by accumulator strength descending, then radius-bin
/// support descending, then radius ascending, which makes downstream
/// "first wins" selection deterministic.
pub(crate) fn vote_circles(
    points: &[Point<i32>],
    w: u32,
    h: u32,
    min_radius: u32,
    max_radius: u32,
    params: &VoteParams,
) -> Vec<CircleCandidate> {
    if points.is_empty() || w < 4 || h < 4 || max_radius < min_radius {
        return Vec::new();
    }

    let rendered = render_blurred(points, w, h, params.blur_sigma);
    let gx = imageproc::gradients::horizontal_scharr(&rendered);
    let gy = imageproc::gradients::vertical_scharr(&rendered);

    let mut max_mag_sq = 0.0f32;
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            max_mag_sq = max_mag_sq.max(gxv * gxv + gyv * gyv);
        }
    }
    let max_mag = max_mag_sq.sqrt();
    if max_mag < 1e-6 {
        return Vec::new();
    }
    let threshold = params.grad_threshold * max_mag;

    let mut accum = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let gxv = gx.get_pixel(x, y)[0] as f32;
            let gyv = gy.get_pixel(x, y)[0] as f32;
            let mag = (gxv * gxv + gyv * gyv).sqrt();
            if mag < threshold {
                continue;
            }
            let dx = gxv / mag;
            let dy = gyv / mag;
            for &sign in &[-1.0f32, 1.0] {
                let mut r = min_radius as f32;
                while r <= max_radius as f32 {
                    let vx = x as f32 + sign * dx * r;
                    let vy = y as f32 + sign * dy * r;
                    bilinear_add(&mut accum, w, h, vx, vy, mag);
                    r += 1.0;
                }
            }
        }
    }

    let accum_img = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum)
        .expect("accumulator dimensions match");
    let smoothed = imageproc::filter::gaussian_blur_f32(&accum_img, params.accum_sigma);
    let data = smoothed.as_raw();

    let max_val = data.iter().cloned().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let vote_threshold = params.min_vote_frac * max_val;
    let nms_r = params.min_dist.ceil() as i32;
    let nms_r_sq = params.min_dist * params.min_dist;

    // Peak extraction. The comparison window is clamped at the buffer edges:
    // a padded blob crop must not lose a peak near its border.
    let mut centers: Vec<(i32, i32, f32)> = Vec::new();
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let idx = y as usize * w as usize + x as usize;
            let val = data[idx];
            if val < vote_threshold {
                continue;
            }
            let mut is_max = true;
            'window: for dy in -nms_r..=nms_r {
                for dx in -nms_r..=nms_r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    if (dx * dx + dy * dy) as f32 > nms_r_sq {
                        continue;
                    }
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let nidx = ny as usize * w as usize + nx as usize;
                    if data[nidx] > val || (data[nidx] == val && nidx < idx) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                centers.push((x, y, val));
            }
        }
    }

    // Radius from the point-distance histogram; candidates must clear the
    // absolute support gate, otherwise out-of-range blobs would always
    // produce some "best" circle.
    let bins = (max_radius - min_radius + 1) as usize;
    let mut candidates = Vec::new();
    for (cx, cy, votes) in centers {
        let mut hist = vec![0usize; bins];
        for p in points {
            let dx = (p.x - cx) as f64;
            let dy = (p.y - cy) as f64;
            let d = (dx * dx + dy * dy).sqrt().round() as i64;
            if d >= min_radius as i64 && d <= max_radius as i64 {
                hist[(d - min_radius as i64) as usize] += 1;
            }
        }
        let mut best_bin = 0usize;
        let mut best_support = 0usize;
        for (bin, &count) in hist.iter().enumerate() {
            if count > best_support {
                best_support = count;
                best_bin = bin;
            }
        }
        if best_support >= params.support_threshold {
            candidates.push(CircleCandidate {
                cx,
                cy,
                radius: min_radius + best_bin as u32,
                votes,
                support: best_support,
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.votes
            .total_cmp(&a.votes)
            .then_with(|| b.support.cmp(&a.support))
            .then_with(|| a.radius.cmp(&b.radius))
    });
    candidates
}
