use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy)]
pub(super) struct CellBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl CellBounds {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }
        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let span = (max.x - min.x).max(max.y - min.y).max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: (span * 0.5) + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let gap = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - gap).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - gap).max(0.0);
        dx * dx + dy * dy
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        ((point.x >= self.center.x) as usize) | (((point.y >= self.center.y) as usize) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let dx = if quadrant & 1 == 0 { -quarter } else { quarter };
        let dy = if quadrant & 2 == 0 { -quarter } else { quarter };
        Self {
            center: self.center + vec2(dx, dy),
            half_extent: quarter,
        }
    }
}

/// One cell of the Barnes-Hut quadtree. Interior cells keep only their
/// aggregate mass and center of mass; point indices live in the leaves.
pub(super) struct QuadCell {
    pub(super) bounds: CellBounds,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadCell>>; 4],
}

impl QuadCell {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = CellBounds::enclosing(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::split(bounds, indices, positions, 0))
    }

    fn split(bounds: CellBounds, indices: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = indices.len() as f32;
        let mut center_of_mass = Vec2::ZERO;
        for &index in &indices {
            center_of_mass += positions[index];
        }
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut cell = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &cell.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }

        // All points piled into one quadrant cannot be separated by
        // further splitting.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            cell.children[quadrant] = Some(Box::new(Self::split(
                bounds.child(quadrant),
                bucket,
                positions,
                depth + 1,
            )));
        }
        cell.indices.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_non_finite_input() {
        assert!(QuadCell::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(QuadCell::build(&[]).is_none());
    }

    #[test]
    fn tree_mass_matches_point_count() {
        let positions = (0..40)
            .map(|i| vec2((i % 8) as f32 * 10.0, (i / 8) as f32 * 10.0))
            .collect::<Vec<_>>();
        let tree = QuadCell::build(&positions).unwrap();
        assert_eq!(tree.mass as usize, positions.len());
        assert!(!tree.is_leaf());
    }
}
