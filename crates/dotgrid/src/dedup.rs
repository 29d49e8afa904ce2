//! Spatial deduplication of near-duplicate circle detections.
//!
//! Greedy first-wins clustering: candidates are visited in input order, each
//! survivor consumes every not-yet-visited candidate within `dedup_distance`
//! of its center. Survivors are exact copies of inputs, never averages, so
//! running the pass twice is a no-op.

use crate::spatial::CenterIndex;
use crate::DetectedCircle;

/// Remove duplicate detections of the same physical dot.
///
/// A center-to-center distance equal to `dedup_distance` counts as a
/// duplicate. O(n log n): one index build plus one radius query per survivor.
pub fn dedup_circles(circles: Vec<DetectedCircle>, dedup_distance: f64) -> Vec<DetectedCircle> {
    if circles.len() < 2 {
        return circles;
    }

    let centers: Vec<(f64, f64)> = circles
        .iter()
        .map(|c| (c.x as f64, c.y as f64))
        .collect();
    let index = CenterIndex::build(&centers).expect("non-empty centers");

    let mut consumed = vec![false; circles.len()];
    let mut kept = Vec::new();
    for (i, circle) in circles.into_iter().enumerate() {
        if consumed[i] {
            continue;
        }
        for j in index.query_radius(centers[i], dedup_distance) {
            consumed[j] = true;
        }
        kept.push(circle);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgb;

    fn circle(x: i32, y: i32, radius: u32) -> DetectedCircle {
        DetectedCircle {
            x,
            y,
            radius,
            color: Rgb::BLACK,
            confidence: 100.0,
        }
    }

    #[test]
    fn first_candidate_wins() {
        let out = dedup_circles(vec![circle(10, 10, 5), circle(15, 10, 7)], 20.0);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].x, out[0].radius), (10, 5));
    }

    #[test]
    fn boundary_distance_counts_as_duplicate() {
        let out = dedup_circles(vec![circle(0, 0, 5), circle(20, 0, 5)], 20.0);
        assert_eq!(out.len(), 1);

        let out = dedup_circles(vec![circle(0, 0, 5), circle(21, 0, 5)], 20.0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = vec![
            circle(0, 0, 5),
            circle(5, 0, 5),
            circle(100, 100, 8),
            circle(103, 99, 8),
            circle(200, 0, 6),
        ];
        let once = dedup_circles(input, 20.0);
        let twice = dedup_circles(once.clone(), 20.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn no_two_survivors_within_distance() {
        let input: Vec<DetectedCircle> = (0..50)
            .map(|i| circle((i * 7) % 60, (i * 13) % 60, 5))
            .collect();
        let distance = 15.0;
        let out = dedup_circles(input, distance);
        for a in &out {
            for b in &out {
                if (a.x, a.y) == (b.x, b.y) {
                    continue;
                }
                let dx = (a.x - b.x) as f64;
                let dy = (a.y - b.y) as f64;
                assert!((dx * dx + dy * dy).sqrt() > distance);
            }
        }
    }
}
