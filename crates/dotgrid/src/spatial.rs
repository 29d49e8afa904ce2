//! A 2D k-d tree over circle centers.
//!
//! Built once per deduplication pass and queried many times; median-split
//! construction keeps the tree balanced so `query_radius` stays O(log n)
//! expected per call.

#[derive(Debug)]
pub(crate) struct CenterIndex {
    nodes: Vec<Node>,
    points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
struct Node {
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    split_dim: usize,
}

impl CenterIndex {
    /// Build from a list of centers. Returns `None` for an empty input.
    pub fn build(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let points_vec = points.to_vec();
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        Self::build_recursive(&points_vec, &mut indices, 0, &mut nodes);
        Some(Self {
            nodes,
            points: points_vec,
        })
    }

    fn build_recursive(
        points: &[(f64, f64)],
        indices: &mut [usize],
        depth: usize,
        nodes: &mut Vec<Node>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let split_dim = depth % 2;
        indices.sort_by(|&a, &b| {
            let va = if split_dim == 0 { points[a].0 } else { points[a].1 };
            let vb = if split_dim == 0 { points[b].0 } else { points[b].1 };
            va.total_cmp(&vb)
        });

        let median = indices.len() / 2;
        let point_idx = indices[median];
        let node_idx = nodes.len();
        nodes.push(Node {
            point_idx,
            left: None,
            right: None,
            split_dim,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];
        let left = Self::build_recursive(points, left_indices, depth + 1, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, nodes);
        nodes[node_idx].left = left;
        nodes[node_idx].right = right;
        Some(node_idx)
    }

    /// Indices of every point within `radius` of `query`, boundary included.
    pub fn query_radius(&self, query: (f64, f64), radius: f64) -> Vec<usize> {
        let mut results = Vec::new();
        if self.nodes.is_empty() {
            return results;
        }
        self.query_recursive(0, query, radius * radius, &mut results);
        results
    }

    fn query_recursive(
        &self,
        node_idx: usize,
        query: (f64, f64),
        radius_sq: f64,
        results: &mut Vec<usize>,
    ) {
        let node = &self.nodes[node_idx];
        let point = self.points[node.point_idx];

        let dx = query.0 - point.0;
        let dy = query.1 - point.1;
        if dx * dx + dy * dy <= radius_sq {
            results.push(node.point_idx);
        }

        let diff = if node.split_dim == 0 {
            query.0 - point.0
        } else {
            query.1 - point.1
        };
        let diff_sq = diff * diff;

        if let Some(left) = node.left {
            if diff <= 0.0 || diff_sq <= radius_sq {
                self.query_recursive(left, query, radius_sq, results);
            }
        }
        if let Some(right) = node.right {
            if diff >= 0.0 || diff_sq <= radius_sq {
                self.query_recursive(right, query, radius_sq, results);
            }
        }
    }
}
