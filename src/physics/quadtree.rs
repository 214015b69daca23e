use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 10;

/// Axis-aligned square cell.
#[derive(Clone, Copy, Debug)]
pub(super) struct Square {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl Square {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span.max_elem() * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    pub(super) fn side(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - vec2(reach, reach)).max(Vec2::ZERO);
        gap.length_sq()
    }

    fn quadrant(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign_x = if quadrant & 1 == 0 { -1.0 } else { 1.0 };
        let sign_y = if quadrant & 2 == 0 { -1.0 } else { 1.0 };
        Self {
            center: self.center + vec2(sign_x, sign_y) * quarter,
            half_extent: quarter,
        }
    }
}

pub(super) struct QuadNode {
    pub(super) bounds: Square,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    /// Body indices; populated on leaves only.
    pub(super) bodies: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

/// A cell of the current partition, exposed for the debug overlay.
#[derive(Clone, Copy, Debug)]
pub struct QuadtreeCell {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = Square::enclosing(positions)?;
        Some(Self::subdivide(bounds, (0..positions.len()).collect(), positions, 0))
    }

    fn subdivide(bounds: Square, bodies: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = bodies.len() as f32;
        let center_of_mass = if bodies.is_empty() {
            Vec2::ZERO
        } else {
            bodies.iter().fold(Vec2::ZERO, |sum, &index| sum + positions[index]) / mass
        };

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            bodies,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || node.bodies.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &index in &node.bodies {
            buckets[bounds.quadrant(positions[index])].push(index);
        }

        // Coincident points would otherwise recurse to MAX_DEPTH.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                node.children[quadrant] = Some(Box::new(Self::subdivide(
                    bounds.child(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        node.bodies.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }

    pub(super) fn collect_cells(&self, depth: usize, cells: &mut Vec<QuadtreeCell>) {
        cells.push(QuadtreeCell {
            center: self.bounds.center,
            half_extent: self.bounds.half_extent,
            depth,
            is_leaf: self.is_leaf(),
        });
        for child in self.children() {
            child.collect_cells(depth + 1, cells);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_body_count(node: &QuadNode) -> usize {
        if node.is_leaf() {
            node.bodies.len()
        } else {
            node.children().map(leaf_body_count).sum()
        }
    }

    #[test]
    fn empty_input_has_no_tree() {
        assert!(QuadNode::build(&[]).is_none());
    }

    #[test]
    fn every_body_lands_in_exactly_one_leaf() {
        let positions = (0..40)
            .map(|index| vec2((index % 7) as f32 * 30.0, (index / 7) as f32 * 25.0))
            .collect::<Vec<_>>();
        let tree = QuadNode::build(&positions).expect("tree");

        assert!(!tree.is_leaf());
        assert_eq!(tree.mass, 40.0);
        assert_eq!(leaf_body_count(&tree), 40);
        for position in &positions {
            assert!(tree.bounds.contains(*position));
        }
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![vec2(3.0, 3.0); 20];
        let tree = QuadNode::build(&positions).expect("tree");
        assert!(tree.is_leaf());
        assert_eq!(tree.bodies.len(), 20);
        assert_eq!(tree.center_of_mass, vec2(3.0, 3.0));
    }

    #[test]
    fn collects_cells_depth_first() {
        let positions = (0..30)
            .map(|index| vec2(index as f32 * 11.0, (index * index) as f32 % 97.0))
            .collect::<Vec<_>>();
        let tree = QuadNode::build(&positions).expect("tree");
        let mut cells = Vec::new();
        tree.collect_cells(0, &mut cells);

        assert_eq!(cells[0].depth, 0);
        assert!(cells.iter().skip(1).all(|cell| cell.depth >= 1));
        assert!(cells.iter().any(|cell| cell.is_leaf));
    }
}
