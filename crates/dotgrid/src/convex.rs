//! Convex boundary filtering: suppress contour points near occlusion seams.
//!
//! The seam between two overlapping dots is locally concave, while a dot's
//! own silhouette is convex everywhere. Deep convexity defects therefore mark
//! exactly the boundary stretches that belong to a neighbor, and what
//! survives plausibly lies on an unoccluded arc of the original circle.

use imageproc::point::Point;

/// One concave region between two hull vertices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConvexityDefect {
    /// Contour index of the hull vertex starting the concave arc.
    pub start: usize,
    /// Contour index of the hull vertex ending the concave arc.
    pub end: usize,
    /// Deepest interior point, as perpendicular distance to the hull chord.
    pub depth: f32,
}

fn cross(o: Point<i32>, a: Point<i32>, b: Point<i32>) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Convex hull of the contour as indices into it, monotone-chain order.
pub(crate) fn hull_indices(contour: &[Point<i32>]) -> Vec<usize> {
    let n = contour.len();
    if n < 3 {
        return (0..n).collect();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (contour[i].x, contour[i].y));

    let mut hull: Vec<usize> = Vec::with_capacity(2 * n);
    for &i in &order {
        while hull.len() >= 2
            && cross(
                contour[hull[hull.len() - 2]],
                contour[hull[hull.len() - 1]],
                contour[i],
            ) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev() {
        while hull.len() >= lower_len
            && cross(
                contour[hull[hull.len() - 2]],
                contour[hull[hull.len() - 1]],
                contour[i],
            ) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();
    hull
}

/// For every hull edge, the deepest contour point between its endpoints.
pub(crate) fn convexity_defects(contour: &[Point<i32>], hull: &[usize]) -> Vec<ConvexityDefect> {
    let n = contour.len();
    if n == 0 || hull.len() < 2 {
        return Vec::new();
    }
    let mut sorted: Vec<usize> = hull.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut defects = Vec::new();
    for (k, &s) in sorted.iter().enumerate() {
        let e = sorted[(k + 1) % sorted.len()];
        let span = (e as isize - s as isize).rem_euclid(n as isize) as usize;
        if span < 2 {
            continue;
        }
        let (ps, pe) = (contour[s], contour[e]);
        let chord_len = {
            let dx = (pe.x - ps.x) as f32;
            let dy = (pe.y - ps.y) as f32;
            (dx * dx + dy * dy).sqrt()
        };
        if chord_len < 1.0 {
            continue;
        }

        let mut depth = 0.0f32;
        for step in 1..span {
            let idx = (s + step) % n;
            let d = cross(ps, pe, contour[idx]).abs() as f32 / chord_len;
            if d > depth {
                depth = d;
            }
        }
        defects.push(ConvexityDefect { start: s, end: e, depth });
    }
    defects
}

/// Contour points judged to lie on an unoccluded arc.
///
/// Every defect deeper than `depth_threshold` masks the whole contour arc
/// between its hull vertices, widened by `margin` boundary positions on each
/// side (arc-length neighborhood, wrapping modulo the contour length). A
/// degenerate hull (< 4 vertices) means the contour is nearly convex and
/// every point is kept.
pub(crate) fn convex_points(
    contour: &[Point<i32>],
    depth_threshold: f32,
    margin: usize,
) -> Vec<Point<i32>> {
    let n = contour.len();
    let hull = hull_indices(contour);
    if hull.len() < 4 {
        return contour.to_vec();
    }

    let mut keep = vec![true; n];
    for defect in convexity_defects(contour, &hull) {
        if defect.depth <= depth_threshold {
            continue;
        }
        let span = (defect.end as isize - defect.start as isize).rem_euclid(n as isize) as usize;
        let first = defect.start as isize - margin as isize;
        for step in 0..=(span + 2 * margin).min(n) {
            let idx = (first + step as isize).rem_euclid(n as isize) as usize;
            keep[idx] = false;
        }
    }

    contour
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(p, _)| *p)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::isolate_blobs;
    use image::{GrayImage, Luma};

    #[test]
    fn hull_of_triangle_is_three_corners() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(5, 1),
            Point::new(5, 10),
        ];
        let mut hull = hull_indices(&pts);
        hull.sort_unstable();
        assert_eq!(hull, vec![0, 1, 3]);
    }

    #[test]
    fn convex_contour_keeps_every_point() {
        let mut mask = GrayImage::new(60, 60);
        for y in 10..50 {
            for x in 10..50 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let blobs = isolate_blobs(&mask, 100);
        let contour = &blobs[0].contour;
        let kept = convex_points(contour, 5.0, 10);
        assert_eq!(kept.len(), contour.len());
    }

    #[test]
    fn deep_notch_is_masked_out() {
        // A square with a slot cut in from the top edge.
        let mut mask = GrayImage::new(60, 60);
        for y in 10..50 {
            for x in 10..50 {
                if x >= 27 && x <= 32 && y < 35 {
                    continue;
                }
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let blobs = isolate_blobs(&mask, 100);
        let contour = &blobs[0].contour;
        let kept = convex_points(contour, 5.0, 3);

        assert!(kept.len() < contour.len(), "notch points should be dropped");
        // Neither the slot walls nor the slot floor survive.
        for p in &kept {
            let on_wall = (p.x == 26 || p.x == 33) && p.y < 35;
            let on_floor = p.x >= 26 && p.x <= 33 && p.y >= 34 && p.y <= 36;
            assert!(
                !on_wall && !on_floor,
                "slot point ({}, {}) survived",
                p.x,
                p.y
            );
        }
    }

    #[test]
    fn degenerate_contour_falls_back_to_all_points() {
        let pts = vec![Point::new(0, 0), Point::new(1, 0), Point::new(2, 0)];
        let kept = convex_points(&pts, 5.0, 10);
        assert_eq!(kept.len(), 3);
    }
}
