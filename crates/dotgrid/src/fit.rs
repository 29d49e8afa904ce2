//! Circle fitting and scoring on a convex point set.
//!
//! Voting proposes candidates; every candidate is re-scored here by how much
//! of the convex boundary it actually explains. The normalization assumes
//! roughly 30% of a dot's circumference survives occlusion filtering, so a
//! fully visible dot saturates the score.

use imageproc::point::Point;

use crate::vote::{vote_circles, VoteParams};

/// A point counts as on-rim within this distance of the candidate circle.
const EDGE_TOLERANCE_PX: f32 = 10.0;
/// Fraction of the circumference expected to be visible.
const VISIBLE_ARC_FRACTION: f32 = 0.3;
/// Crop padding beyond the blob bounding box; a crescent's center can sit a
/// full radius outside its silhouette.
const CROP_MARGIN_PX: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FittedCircle {
    pub x: i32,
    pub y: i32,
    pub radius: u32,
    /// Normalized arc-coverage score; 1.0 means the full expected arc matched.
    pub score: f32,
}

/// Fit the single best circle to a convex point set, or nothing.
///
/// Candidates come ordered by accumulator strength then ascending radius;
/// only a strictly greater coverage score displaces the incumbent, so the
/// selection is deterministic.
pub(crate) fn fit_circle(
    convex: &[Point<i32>],
    min_radius: u32,
    max_radius: u32,
    params: &VoteParams,
) -> Option<FittedCircle> {
    if convex.is_empty() {
        return None;
    }

    let min_x = convex.iter().map(|p| p.x).min().unwrap();
    let min_y = convex.iter().map(|p| p.y).min().unwrap();
    let max_x = convex.iter().map(|p| p.x).max().unwrap();
    let max_y = convex.iter().map(|p| p.y).max().unwrap();

    let pad = (max_radius + CROP_MARGIN_PX) as i32;
    let origin_x = min_x - pad;
    let origin_y = min_y - pad;
    let w = (max_x - min_x + 2 * pad + 1) as u32;
    let h = (max_y - min_y + 2 * pad + 1) as u32;

    let local: Vec<Point<i32>> = convex
        .iter()
        .map(|p| Point::new(p.x - origin_x, p.y - origin_y))
        .collect();

    let candidates = vote_circles(&local, w, h, min_radius, max_radius, params);

    let mut best: Option<FittedCircle> = None;
    for cand in candidates {
        let mut matched = 0usize;
        for p in &local {
            let dx = (p.x - cand.cx) as f32;
            let dy = (p.y - cand.cy) as f32;
            let rim_dist = ((dx * dx + dy * dy).sqrt() - cand.radius as f32).abs();
            if rim_dist < EDGE_TOLERANCE_PX {
                matched += 1;
            }
        }
        let expected = 2.0 * std::f32::consts::PI * cand.radius as f32 * VISIBLE_ARC_FRACTION;
        let score = matched as f32 / expected.max(1.0);

        if best.map_or(true, |b| score > b.score) {
            best = Some(FittedCircle {
                x: cand.cx + origin_x,
                y: cand.cy + origin_y,
                radius: cand.radius,
                score,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn circle_points(cx: i32, cy: i32, radius: f64, start_deg: f64, end_deg: f64) -> Vec<Point<i32>> {
        let steps = (2.0 * PI * radius * (end_deg - start_deg) / 360.0).ceil() as usize;
        (0..steps)
            .map(|i| {
                let t = (start_deg + (end_deg - start_deg) * i as f64 / steps as f64).to_radians();
                Point::new(
                    (cx as f64 + radius * t.cos()).round() as i32,
                    (cy as f64 + radius * t.sin()).round() as i32,
                )
            })
            .collect()
    }

    #[test]
    fn full_circle_fits_with_saturated_score() {
        let points = circle_points(100, 100, 30.0, 0.0, 360.0);
        let fit = fit_circle(&points, 15, 45, &VoteParams::normal()).unwrap();
        assert!((fit.x - 100).abs() <= 3);
        assert!((fit.y - 100).abs() <= 3);
        assert!((fit.radius as i32 - 30).abs() <= 2);
        // Full visibility is ~1/0.3 of the expected arc.
        assert!(fit.score >= 1.0, "score = {}", fit.score);
    }

    #[test]
    fn crescent_arc_still_fits_its_circle() {
        let points = circle_points(80, 80, 35.0, -40.0, 130.0);
        let fit = fit_circle(&points, 20, 50, &VoteParams::sensitive()).unwrap();
        let err = (((fit.x - 80).pow(2) + (fit.y - 80).pow(2)) as f64).sqrt();
        assert!(err < 6.0, "center ({}, {}) too far off", fit.x, fit.y);
        assert!((fit.radius as i32 - 35).abs() <= 3, "radius = {}", fit.radius);
    }

    #[test]
    fn no_candidates_is_none() {
        // A straight line has no circular structure in range.
        let points: Vec<Point<i32>> = (0..40).map(|i| Point::new(10 + i, 20)).collect();
        assert!(fit_circle(&points, 10, 30, &VoteParams::normal()).is_none());
    }

    #[test]
    fn empty_input_is_none() {
        assert!(fit_circle(&[], 10, 30, &VoteParams::normal()).is_none());
    }
}
