//! Nearest-neighbor index over roadmap vertex positions.
//!
//! Only FIRM vertices are ever inserted, so radius queries during action
//! expansion are restricted to roadmap nodes by construction; transient
//! search-tree vertices never enter the index.

use crate::core::types::Point2D;
use crate::graph::VertexId;
use kiddo::{KdTree, SquaredEuclidean};

/// k-d tree over FIRM vertex positions.
pub struct FirmIndex {
    tree: KdTree<f32, 2>,
    count: usize,
}

impl std::fmt::Debug for FirmIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmIndex").field("count", &self.count).finish()
    }
}

impl FirmIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            tree: KdTree::new(),
            count: 0,
        }
    }

    /// Insert a FIRM vertex at its position.
    pub fn insert(&mut self, v: VertexId, position: Point2D) {
        self.tree.add(&[position.x, position.y], v.0 as u64);
        self.count += 1;
    }

    /// Number of indexed vertices.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// All indexed vertices within `radius` of a position.
    pub fn within_radius(&self, position: Point2D, radius: f32) -> Vec<VertexId> {
        self.tree
            .within_unsorted::<SquaredEuclidean>(&[position.x, position.y], radius * radius)
            .iter()
            .map(|n| VertexId(n.item as u32))
            .collect()
    }

    /// The indexed vertex closest to a position.
    pub fn nearest(&self, position: Point2D) -> Option<VertexId> {
        if self.is_empty() {
            return None;
        }
        let n = self.tree.nearest_one::<SquaredEuclidean>(&[position.x, position.y]);
        Some(VertexId(n.item as u32))
    }
}
