use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

/// Square cell anchored at its top-left corner. The root cover starts on
/// integer coordinates and doubles until every point fits, so every cell side
/// is a power of two.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Cell {
    pub(super) origin: Vec2,
    pub(super) size: f32,
}

impl Cell {
    fn cover(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), point| (min.min(*point), max.max(*point)));
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }

        let origin = vec2(min.x.floor(), min.y.floor());
        let mut size = 1.0_f32;
        while max.x >= origin.x + size || max.y >= origin.y + size {
            size *= 2.0;
            if !size.is_finite() {
                return None;
            }
        }
        Some(Self { origin, size })
    }

    fn midpoint(self) -> Vec2 {
        self.origin + Vec2::splat(self.size * 0.5)
    }

    /// Bit 0 is set right of the midpoint, bit 1 below it.
    fn quadrant(self, point: Vec2) -> usize {
        let mid = self.midpoint();
        usize::from(point.x >= mid.x) | (usize::from(point.y >= mid.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let half = self.size * 0.5;
        let step = |bit: usize| if quadrant & bit != 0 { half } else { 0.0 };
        Self {
            origin: self.origin + vec2(step(1), step(2)),
            size: half,
        }
    }

    pub(super) fn side_length(self) -> f32 {
        self.size
    }

    /// Squared gap between two cells, zero when they touch or overlap.
    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let gap = |a0: f32, b0: f32| (a0 - (b0 + other.size)).max(b0 - (a0 + self.size)).max(0.0);
        let dx = gap(self.origin.x, other.origin.x);
        let dy = gap(self.origin.y, other.origin.y);
        dx * dx + dy * dy
    }
}

/// Point-region quadtree with every vertex weighted equally, so `mass` is the
/// number of vertices below a cell. Points are inserted one by one and the
/// aggregates are filled in afterwards.
pub(super) struct QuadNode {
    pub(super) bounds: Cell,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    pub(super) indices: Vec<usize>,
    children: [Option<Box<QuadNode>>; 4],
    depth: usize,
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let mut root = Self::leaf(Cell::cover(positions)?, 0);
        for index in 0..positions.len() {
            root.insert(index, positions);
        }
        root.accumulate(positions);
        Some(root)
    }

    fn leaf(bounds: Cell, depth: usize) -> Self {
        Self {
            bounds,
            center_of_mass: bounds.midpoint(),
            mass: 0.0,
            indices: Vec::new(),
            children: [None, None, None, None],
            depth,
        }
    }

    fn insert(&mut self, index: usize, positions: &[Vec2]) {
        if !self.is_leaf() {
            self.insert_below(index, positions);
            return;
        }

        self.indices.push(index);
        if self.indices.len() > LEAF_CAPACITY && self.depth < MAX_DEPTH && !self.coincident(positions) {
            for index in std::mem::take(&mut self.indices) {
                self.insert_below(index, positions);
            }
        }
    }

    fn insert_below(&mut self, index: usize, positions: &[Vec2]) {
        let quadrant = self.bounds.quadrant(positions[index]);
        let bounds = self.bounds.child(quadrant);
        let depth = self.depth + 1;
        self.children[quadrant]
            .get_or_insert_with(|| Box::new(Self::leaf(bounds, depth)))
            .insert(index, positions);
    }

    // Coincident points never separate; splitting them would only burn depth.
    fn coincident(&self, positions: &[Vec2]) -> bool {
        let first = positions[self.indices[0]];
        self.indices.iter().all(|&index| positions[index] == first)
    }

    fn accumulate(&mut self, positions: &[Vec2]) {
        let mut weighted = Vec2::ZERO;
        let mut mass = 0.0;

        if self.is_leaf() {
            for &index in &self.indices {
                weighted += positions[index];
                mass += 1.0;
            }
        } else {
            for child in self.children.iter_mut().flatten() {
                child.accumulate(positions);
                weighted += child.center_of_mass * child.mass;
                mass += child.mass;
            }
        }

        self.mass = mass;
        if mass > 0.0 {
            self.center_of_mass = weighted / mass;
        }
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}
