use crate::bounds::AxisAlignedBox;
use crate::error::{GravityError, Result};
use crate::vector::Vector2;

/// A position carrying mass: a stored entry, or a cluster standing in for a subtree.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointMass {
    pub pos: Vector2,
    pub mass: f64,
}

impl PointMass {
    pub fn new(pos: Vector2, mass: f64) -> Self {
        Self { pos, mass }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    /// Region covered by this node.
    pub bounds: AxisAlignedBox,
    /// Levels still available below and including this node; a node at depth 1
    /// never subdivides and keeps every entry routed to it.
    pub depth: usize,
    /// Index of the first of four consecutive children (0 if leaf).
    pub children: u32,
    /// Stored entries, only ever non-empty on a leaf.
    pub entries: Vec<PointMass>,
    /// Total mass of the subtree. Stale until `Quadtree::compute_aggregates` runs.
    pub mass: f64,
    /// Center of mass of the subtree. Zero for an empty subtree.
    pub centroid: Vector2,
}

impl Node {
    pub fn new(bounds: AxisAlignedBox, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            children: 0,
            entries: Vec::new(),
            mass: 0.0,
            centroid: Vector2::ZERO,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children == 0
    }

    pub fn is_branch(&self) -> bool {
        self.children != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mass == 0.0
    }

    /// Arena indices of the four children in `[NW, NE, SE, SW]` order.
    pub fn child_indices(&self) -> Option<[usize; 4]> {
        let first = self.children as usize;
        self.is_branch().then(|| [first, first + 1, first + 2, first + 3])
    }
}

/// Region quadtree over point masses, used for the Barnes-Hut approximation.
///
/// Nodes live in a flat arena; every branch owns exactly four consecutive slots.
/// Leaves hold up to `capacity` entries and split lazily on overflow, until the
/// depth budget runs out.
#[derive(Clone, Debug)]
pub struct Quadtree {
    capacity: usize,
    max_depth: usize,
    nodes: Vec<Node>,
    /// Branch indices in subdivision order, walked backwards for the bottom-up pass.
    parents: Vec<usize>,
    len: usize,
    aggregated: bool,
}

impl Quadtree {
    pub const ROOT: usize = 0;

    pub fn new(bounds: AxisAlignedBox, capacity: usize, max_depth: usize) -> Self {
        let mut tree = Self {
            capacity,
            max_depth: max_depth.max(1),
            nodes: Vec::new(),
            parents: Vec::new(),
            len: 0,
            aggregated: false,
        };
        tree.clear(bounds);
        tree
    }

    /// Empties the tree and re-roots it over `bounds`, keeping allocations.
    pub fn clear(&mut self, bounds: AxisAlignedBox) {
        self.nodes.clear();
        self.parents.clear();
        self.nodes.push(Node::new(bounds, self.max_depth));
        self.len = 0;
        self.aggregated = false;
    }

    pub fn bounds(&self) -> AxisAlignedBox {
        self.nodes[Self::ROOT].bounds
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn root(&self) -> &Node {
        &self.nodes[Self::ROOT]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Number of levels actually in use (1 for a lone root).
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| self.max_depth - n.depth + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether `compute_aggregates` has run since the last mutation.
    pub fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    /// Inserts a point mass. Positions outside the root bounds (or non-finite ones)
    /// are rejected rather than misrouted.
    pub fn insert(&mut self, pos: Vector2, mass: f64) -> Result<()> {
        if !self.bounds().contains(pos) {
            return Err(GravityError::OutOfBounds { position: pos });
        }
        self.insert_from(Self::ROOT, PointMass::new(pos, mass))?;
        self.len += 1;
        self.aggregated = false;
        Ok(())
    }

    fn insert_from(&mut self, mut node: usize, entry: PointMass) -> Result<()> {
        loop {
            while self.nodes[node].is_branch() {
                let quadrant = self.nodes[node].bounds.find_quadrant(entry.pos);
                node = self.nodes[node].children as usize + quadrant;
            }

            let leaf = &mut self.nodes[node];
            if leaf.entries.len() < self.capacity || leaf.depth <= 1 {
                leaf.entries.push(entry);
                return Ok(());
            }

            // Full leaf with depth to spare: split, then descend again.
            self.subdivide(node)?;
        }
    }

    /// Turns a leaf into a branch with four children and moves its entries down.
    fn subdivide(&mut self, node: usize) -> Result<()> {
        if self.nodes[node].is_branch() {
            return Err(GravityError::InvariantViolation("subdividing a branch"));
        }

        self.parents.push(node);
        let children = self.nodes.len();
        self.nodes[node].children = children as u32;

        let depth = self.nodes[node].depth - 1;
        for quad in self.nodes[node].bounds.quadrants() {
            self.nodes.push(Node::new(quad, depth));
        }

        self.reallocate(node)
    }

    /// Pushes a branch's stored entries down into its children.
    fn reallocate(&mut self, node: usize) -> Result<()> {
        if self.nodes[node].is_leaf() {
            return Err(GravityError::InvariantViolation(
                "reallocating a node that has no children",
            ));
        }

        let entries = std::mem::take(&mut self.nodes[node].entries);
        for entry in entries {
            self.insert_from(node, entry)?;
        }
        Ok(())
    }

    /// Returns the leaf whose region routes `pos`.
    pub fn retrieve_leaf(&self, pos: Vector2) -> Result<&Node> {
        if !self.bounds().contains(pos) {
            return Err(GravityError::OutOfBounds { position: pos });
        }

        let mut node = &self.nodes[Self::ROOT];
        while node.is_branch() {
            let quadrant = node.bounds.find_quadrant(pos);
            node = &self.nodes[node.children as usize + quadrant];
        }
        Ok(node)
    }

    /// Computes total mass and center of mass for every node.
    /// Must be called after all insertions and before any cluster query.
    pub fn compute_aggregates(&mut self) {
        for node in self.nodes.iter_mut().filter(|n| n.is_leaf()) {
            let mass: f64 = node.entries.iter().map(|e| e.mass).sum();
            let weighted = node
                .entries
                .iter()
                .fold(Vector2::ZERO, |acc, e| acc + e.pos * e.mass);

            node.mass = mass;
            node.centroid = if mass > 0.0 { weighted / mass } else { Vector2::ZERO };
        }

        // Children are always created after their parent, so walking the
        // subdivision order backwards visits every child before its parent.
        for &node in self.parents.iter().rev() {
            let i = self.nodes[node].children as usize;

            let mut mass = 0.0;
            let mut weighted = Vector2::ZERO;
            for child in &self.nodes[i..i + 4] {
                mass += child.mass;
                weighted += child.centroid * child.mass;
            }

            self.nodes[node].mass = mass;
            self.nodes[node].centroid = if mass > 0.0 { weighted / mass } else { Vector2::ZERO };
        }

        self.aggregated = true;
    }

    /// Gathers the point masses that act on `query` under the opening criterion.
    ///
    /// A child whose `width / distance` falls below `theta` is approximated by one
    /// point mass at its centroid; otherwise it is opened. Leaves reached this way
    /// contribute their raw entries. Empty subtrees are skipped.
    pub fn collect_clusters(&self, query: Vector2, theta: f64, out: &mut Vec<PointMass>) {
        debug_assert!(self.aggregated, "cluster query before compute_aggregates");
        let root = &self.nodes[Self::ROOT];
        let Some(children) = root.child_indices() else {
            out.extend_from_slice(&root.entries);
            return;
        };

        // Explicit stack: coincident entries can drive the tree to `max_depth` levels.
        let mut stack: Vec<usize> = children.into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            if n.is_empty() {
                continue;
            }

            let width = n.bounds.width();
            let dist = (query - n.centroid).length();

            if width / dist < theta {
                out.push(PointMass::new(n.centroid, n.mass)); // long range
                continue;
            }

            // short range
            match n.child_indices() {
                Some(children) => stack.extend(children.into_iter().rev()),
                None => out.extend_from_slice(&n.entries),
            }
        }
    }

    /// Folds over every stored entry, visiting children in `[NW, NE, SE, SW]` order.
    pub fn fold<B>(&self, init: B, mut f: impl FnMut(B, &PointMass) -> B) -> B {
        let mut acc = init;
        let mut stack = vec![Self::ROOT];

        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            match n.child_indices() {
                Some(children) => stack.extend(children.into_iter().rev()),
                None => {
                    for entry in &n.entries {
                        acc = f(acc, entry);
                    }
                }
            }
        }

        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{NE, NW, SE, SW};

    fn square(half: f64) -> AxisAlignedBox {
        AxisAlignedBox::new(Vector2::new(-half, -half), Vector2::new(half, half)).unwrap()
    }

    fn random_tree(n: usize, capacity: usize, max_depth: usize, seed: u64) -> (Quadtree, Vec<PointMass>) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut tree = Quadtree::new(square(100.0), capacity, max_depth);
        let mut inserted = Vec::with_capacity(n);
        for _ in 0..n {
            let pos = Vector2::new(rng.f64() * 200.0 - 100.0, rng.f64() * 200.0 - 100.0);
            let mass = rng.f64() * 9.0 + 1.0;
            tree.insert(pos, mass).unwrap();
            inserted.push(PointMass::new(pos, mass));
        }
        (tree, inserted)
    }

    #[test]
    fn stays_a_leaf_until_capacity_is_exceeded() {
        let mut tree = Quadtree::new(square(10.0), 2, 5);
        tree.insert(Vector2::new(-5.0, -5.0), 1.0).unwrap();
        tree.insert(Vector2::new(5.0, 5.0), 1.0).unwrap();
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().entries.len(), 2);

        tree.insert(Vector2::new(5.0, -5.0), 1.0).unwrap();
        assert!(tree.root().is_branch());
        assert!(tree.root().entries.is_empty());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.node_count(), 5);

        let [nw, ne, se, sw] = tree.root().child_indices().unwrap();
        assert_eq!(tree.nodes()[nw].entries.len(), 1);
        assert_eq!(tree.nodes()[ne].entries.len(), 1);
        assert_eq!(tree.nodes()[se].entries.len(), 1);
        assert!(tree.nodes()[sw].entries.is_empty());
    }

    #[test]
    fn depth_one_holds_everything() {
        let mut tree = Quadtree::new(square(10.0), 1, 1);
        for i in 0..50 {
            tree.insert(Vector2::new(i as f64 / 10.0, 0.0), 1.0).unwrap();
        }
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().entries.len(), 50);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn coincident_points_stop_at_max_depth() {
        let mut tree = Quadtree::new(square(10.0), 1, 4);
        for _ in 0..3 {
            tree.insert(Vector2::new(3.0, 3.0), 1.0).unwrap();
        }
        assert_eq!(tree.depth(), 4);
        let leaf = tree.retrieve_leaf(Vector2::new(3.0, 3.0)).unwrap();
        assert_eq!(leaf.depth, 1);
        assert_eq!(leaf.entries.len(), 3);
    }

    #[test]
    fn rejects_out_of_bounds_and_nan() {
        let mut tree = Quadtree::new(square(1.0), 4, 4);
        assert!(matches!(
            tree.insert(Vector2::new(2.0, 0.0), 1.0),
            Err(GravityError::OutOfBounds { .. })
        ));
        assert!(tree.insert(Vector2::new(f64::NAN, 0.0), 1.0).is_err());
        assert!(tree.retrieve_leaf(Vector2::new(0.0, -3.0)).is_err());
        assert!(tree.is_empty());
    }

    #[test]
    fn reallocate_requires_children() {
        let mut tree = Quadtree::new(square(1.0), 4, 4);
        assert_eq!(
            tree.reallocate(Quadtree::ROOT),
            Err(GravityError::InvariantViolation("reallocating a node that has no children"))
        );
    }

    #[test]
    fn midpoint_routes_to_south_east() {
        let mut tree = Quadtree::new(square(4.0), 1, 3);
        tree.insert(Vector2::new(-2.0, -2.0), 1.0).unwrap();
        tree.insert(Vector2::ZERO, 1.0).unwrap();
        let [nw, ne, se, sw] = tree.root().child_indices().unwrap();
        assert_eq!(tree.nodes()[se].entries, vec![PointMass::new(Vector2::ZERO, 1.0)]);
        assert_eq!(tree.nodes()[nw].entries.len(), 1);
        assert!(tree.nodes()[ne].entries.is_empty());
        assert!(tree.nodes()[sw].entries.is_empty());
        assert_eq!([nw, ne, se, sw].map(|i| i - nw), [NW, NE, SE, SW]);
    }

    #[test]
    fn centroid_of_two_equal_masses() {
        let mut tree = Quadtree::new(square(4.0), 4, 3);
        tree.insert(Vector2::new(0.0, 0.0), 1.0).unwrap();
        tree.insert(Vector2::new(2.0, 0.0), 1.0).unwrap();
        tree.compute_aggregates();
        assert_eq!(tree.root().mass, 2.0);
        assert_eq!(tree.root().centroid, Vector2::new(1.0, 0.0));
    }

    #[test]
    fn aggregate_mass_is_conserved() {
        for seed in 0..8 {
            let (mut tree, inserted) = random_tree(500, 4, 8, seed);
            tree.compute_aggregates();
            let total: f64 = inserted.iter().map(|e| e.mass).sum();
            assert!((tree.root().mass - total).abs() < 1e-9 * total);

            let weighted = inserted.iter().fold(Vector2::ZERO, |acc, e| acc + e.pos * e.mass);
            assert!((tree.root().centroid - weighted / total).length() < 1e-9);
        }
    }

    #[test]
    fn every_branch_is_entry_free() {
        let (tree, _) = random_tree(300, 3, 10, 7);
        for node in tree.nodes() {
            if node.is_branch() {
                assert!(node.entries.is_empty());
            } else if node.depth > 1 {
                assert!(node.entries.len() <= tree.capacity());
            }
        }
    }

    #[test]
    fn retrieved_leaf_contains_the_point() {
        let (tree, inserted) = random_tree(400, 2, 10, 3);
        for entry in &inserted {
            let leaf = tree.retrieve_leaf(entry.pos).unwrap();
            assert!(leaf.is_leaf());
            assert!(leaf.bounds.contains(entry.pos));
            assert!(leaf.entries.contains(entry));
        }
    }

    #[test]
    fn fold_visits_every_entry() {
        let (tree, inserted) = random_tree(250, 5, 6, 11);
        let (count, mass) = tree.fold((0usize, 0.0), |(c, m), e| (c + 1, m + e.mass));
        assert_eq!(count, inserted.len());
        let total: f64 = inserted.iter().map(|e| e.mass).sum();
        assert!((mass - total).abs() < 1e-9 * total);
    }

    #[test]
    fn smaller_theta_never_returns_fewer_clusters() {
        let (mut tree, _) = random_tree(600, 4, 10, 5);
        tree.compute_aggregates();
        let query = Vector2::new(12.5, -40.0);

        let mut previous = 0;
        for theta in [2.0, 1.5, 1.0, 0.7, 0.5, 0.3, 0.1, 0.0] {
            let mut clusters = Vec::new();
            tree.collect_clusters(query, theta, &mut clusters);
            assert!(clusters.len() >= previous);
            previous = clusters.len();

            let mass: f64 = clusters.iter().map(|c| c.mass).sum();
            assert!((mass - tree.root().mass).abs() < 1e-9 * mass);
        }
        assert_eq!(previous, 600);
    }

    #[test]
    fn deep_coincident_tree_walks_without_recursion() {
        let mut tree = Quadtree::new(square(10.0), 1, 5_000);
        tree.insert(Vector2::new(1.0, 1.0), 1.0).unwrap();
        tree.insert(Vector2::new(1.0, 1.0), 2.0).unwrap();
        tree.compute_aggregates();
        assert_eq!(tree.depth(), 5_000);

        let mut clusters = Vec::new();
        tree.collect_clusters(Vector2::new(1.0, 1.0), 1.0, &mut clusters);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.iter().map(|c| c.mass).sum::<f64>(), 3.0);

        // far away the whole stack collapses into one aggregate
        clusters.clear();
        tree.collect_clusters(Vector2::new(-10.0, -10.0), 0.5, &mut clusters);
        assert_eq!(clusters.len(), 1);
        assert_eq!(tree.fold(0, |n, _| n + 1), 2);
    }
}
