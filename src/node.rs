use thiserror::Error;

use crate::WorldOffset;
use crate::table::NodeTable;

/// Deepest node a [`NodeTable`] will build. A node of depth `d` spans `2^d` cells on a side,
/// centered on its origin, so depth 63 still addresses every offset in `[-2^62, 2^62)`.
pub const MAX_DEPTH: u8 = 63;

/// Handle to a canonical node in a [`NodeTable`].
///
/// Two handles from the same table are equal exactly when the regions they cover are identical.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Result<Self, NodeError> {
        let index = u32::try_from(index).map_err(|_| NodeError::TableFull)?;

        Ok(Self(index))
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One quadrant of a [`Node`]: a raw cell at depth 1, a sub-node everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Child {
    Leaf(bool),
    Inner(NodeId),
}

impl Child {
    /// Whether this is a live raw cell. Sub-nodes are never "alive" themselves.
    pub fn is_alive(&self) -> bool {
        matches!(self, Child::Leaf(true))
    }
}

/// The four children of a node. This is the signature the [`NodeTable`] deduplicates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quad {
    pub nw: Child,
    pub ne: Child,
    pub sw: Child,
    pub se: Child,
}

/// An immutable quadtree node covering a `2^depth` square.
#[derive(Debug, Clone)]
pub struct Node {
    quad: Quad,
    depth: u8,

    /// Number of live cells in the square
    population: u64,

    /// The last evolution computed for this node, as `(step, result)`: `result` is the center of
    /// this node, `2^step` generations later.
    pub(crate) res: Option<(u32, NodeId)>,
}

impl Node {
    pub(crate) fn new(quad: Quad, depth: u8, population: u64) -> Self {
        Self {
            quad,
            depth,
            population,
            res: None,
        }
    }

    pub fn quad(&self) -> Quad {
        self.quad
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn is_empty(&self) -> bool {
        self.population == 0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Shape mismatch: {op} is undefined on a node of depth {depth}")]
    ShapeMismatch { op: &'static str, depth: u8 },

    #[error("Cell ({x}, {y}) lies outside a node of depth {depth}")]
    OutOfRange {
        x: WorldOffset,
        y: WorldOffset,
        depth: u8,
    },

    #[error("A node of depth {depth} cannot advance 2^{step} generations")]
    StepTooLarge { step: u32, depth: u8 },

    #[error("Node depth {depth} exceeds the maximum of {MAX_DEPTH}")]
    TooDeep { depth: u8 },

    #[error("Node table is full: more than {} nodes", u32::MAX)]
    TableFull,
}

#[derive(Clone, Copy)]
enum Quadrant {
    Nw,
    Ne,
    Sw,
    Se,
}

/// Pick the quadrant containing `(x, y)` in a node of `depth > 1`, and re-center the coordinates
/// on that quadrant.
fn descend(x: WorldOffset, y: WorldOffset, depth: u8) -> (Quadrant, WorldOffset, WorldOffset) {
    let quad = 1 << (depth - 2);

    let (west, x) = if x < 0 { (true, x + quad) } else { (false, x - quad) };
    let (north, y) = if y < 0 { (true, y + quad) } else { (false, y - quad) };

    let quadrant = match (north, west) {
        (true, true) => Quadrant::Nw,
        (true, false) => Quadrant::Ne,
        (false, true) => Quadrant::Sw,
        (false, false) => Quadrant::Se,
    };

    (quadrant, x, y)
}

impl Quad {
    fn get(&self, quadrant: Quadrant) -> Child {
        match quadrant {
            Quadrant::Nw => self.nw,
            Quadrant::Ne => self.ne,
            Quadrant::Sw => self.sw,
            Quadrant::Se => self.se,
        }
    }

    fn with(mut self, quadrant: Quadrant, child: Child) -> Self {
        match quadrant {
            Quadrant::Nw => self.nw = child,
            Quadrant::Ne => self.ne = child,
            Quadrant::Sw => self.sw = child,
            Quadrant::Se => self.se = child,
        }

        self
    }
}

impl NodeId {
    pub fn depth(self, table: &NodeTable) -> u8 {
        table.node(self).depth()
    }

    pub fn population(self, table: &NodeTable) -> u64 {
        table.node(self).population()
    }

    /// Whether `(x, y)`, relative to the center of this node, lies inside it.
    pub fn contains(self, table: &NodeTable, x: WorldOffset, y: WorldOffset) -> bool {
        let half: WorldOffset = 1 << (self.depth(table) - 1);

        (-half..half).contains(&x) && (-half..half).contains(&y)
    }

    /// Read the cell at `(x, y)`, relative to the center of this node.
    pub fn get_cell(
        self,
        table: &NodeTable,
        x: WorldOffset,
        y: WorldOffset,
    ) -> Result<bool, NodeError> {
        if !self.contains(table, x, y) {
            return Err(NodeError::OutOfRange {
                x,
                y,
                depth: self.depth(table),
            });
        }

        let (mut node, mut x, mut y) = (self, x, y);

        loop {
            let n = table.node(node);
            let (quadrant, cx, cy) = descend_or_pick(x, y, n.depth());

            match n.quad().get(quadrant) {
                Child::Leaf(alive) => return Ok(alive),
                Child::Inner(child) => (node, x, y) = (child, cx, cy),
            }
        }
    }

    /// Return a copy of this node with the cell at `(x, y)` set to `alive`.
    ///
    /// Only the nodes on the path down to the cell are rebuilt, everything else is shared with
    /// `self`.
    pub fn set_cell(
        self,
        table: &mut NodeTable,
        x: WorldOffset,
        y: WorldOffset,
        alive: bool,
    ) -> Result<NodeId, NodeError> {
        if !self.contains(table, x, y) {
            return Err(NodeError::OutOfRange {
                x,
                y,
                depth: self.depth(table),
            });
        }

        self.set_cell_unchecked(table, x, y, alive)
    }

    fn set_cell_unchecked(
        self,
        table: &mut NodeTable,
        x: WorldOffset,
        y: WorldOffset,
        alive: bool,
    ) -> Result<NodeId, NodeError> {
        let node = table.node(self);
        let quad = node.quad();
        let (quadrant, cx, cy) = descend_or_pick(x, y, node.depth());

        let child = match quad.get(quadrant) {
            Child::Leaf(current) if current == alive => return Ok(self),
            Child::Leaf(_) => Child::Leaf(alive),
            Child::Inner(child) => Child::Inner(child.set_cell_unchecked(table, cx, cy, alive)?),
        };

        let Quad { nw, ne, sw, se } = quad.with(quadrant, child);

        table.canonicalize(nw, ne, sw, se)
    }

    /// Coordinates of every live cell, for a node centered on `(offset_x, offset_y)`.
    pub fn list_active_cells(
        self,
        table: &NodeTable,
        offset_x: WorldOffset,
        offset_y: WorldOffset,
    ) -> Vec<(WorldOffset, WorldOffset)> {
        let mut cells = Vec::with_capacity(self.population(table) as usize);
        self.collect_active_cells(table, offset_x, offset_y, &mut cells);

        cells
    }

    fn collect_active_cells(
        self,
        table: &NodeTable,
        offset_x: WorldOffset,
        offset_y: WorldOffset,
        cells: &mut Vec<(WorldOffset, WorldOffset)>,
    ) {
        let node = table.node(self);

        if node.is_empty() {
            return;
        }

        // Distance from this node's center to the center of each quadrant. At depth 1 the
        // quadrants are single cells, sitting at -1 and 0 on either axis.
        let (lo, hi) = if node.depth() == 1 {
            (-1, 0)
        } else {
            let quad: WorldOffset = 1 << (node.depth() - 2);
            (-quad, quad)
        };

        let Quad { nw, ne, sw, se } = node.quad();
        let quadrants = [(nw, lo, lo), (ne, hi, lo), (sw, lo, hi), (se, hi, hi)];

        for (child, dx, dy) in quadrants {
            let (x, y) = (offset_x + dx, offset_y + dy);

            match child {
                Child::Leaf(true) => cells.push((x, y)),
                Child::Leaf(false) => {}
                Child::Inner(child) => child.collect_active_cells(table, x, y, cells),
            }
        }
    }

    /// Wrap this node in a blank border, returning a node one level deeper with the same content
    /// at its center.
    pub fn increase_depth(self, table: &mut NodeTable) -> Result<NodeId, NodeError> {
        let node = table.node(self);
        let depth = node.depth();
        let Quad { nw, ne, sw, se } = node.quad();

        let b = table.blank_child(depth)?;

        let nw = table.canonicalize(b, b, b, nw)?;
        let ne = table.canonicalize(b, b, ne, b)?;
        let sw = table.canonicalize(b, sw, b, b)?;
        let se = table.canonicalize(se, b, b, b)?;

        table.join(nw, ne, sw, se)
    }
}

/// Like [`descend`], but also handles depth 1 nodes, whose quadrants are the four cells at
/// offsets `-1` and `0`.
fn descend_or_pick(
    x: WorldOffset,
    y: WorldOffset,
    depth: u8,
) -> (Quadrant, WorldOffset, WorldOffset) {
    if depth > 1 {
        return descend(x, y, depth);
    }

    let quadrant = match (y < 0, x < 0) {
        (true, true) => Quadrant::Nw,
        (true, false) => Quadrant::Ne,
        (false, true) => Quadrant::Sw,
        (false, false) => Quadrant::Se,
    };

    (quadrant, 0, 0)
}

// Windows
//
// These build the overlapping sub-squares evolution works on. Given a node of depth `n`, with
// its sixteen grandchildren laid out as
//
//   a b c d
//   e f g h
//   i j k l
//   m n o p
//
// `center` is `f g j k`, and `center_center` is the center of that, one level further down.
// Pairs are taken across the boundary between two neighbors of the same depth.
impl NodeId {
    /// The node of depth `n - 1` at the center of this one.
    pub fn center(self, table: &mut NodeTable) -> Result<NodeId, NodeError> {
        let [nw, ne, sw, se] = table.inner(self, "center")?;

        let nw = table.node(nw).quad().se;
        let ne = table.node(ne).quad().sw;
        let sw = table.node(sw).quad().ne;
        let se = table.node(se).quad().nw;

        table.canonicalize(nw, ne, sw, se)
    }

    /// Given `self` to the west and `e` to the east, the node of the same depth straddling their
    /// shared edge.
    pub fn horizontal(self, table: &mut NodeTable, e: NodeId) -> Result<NodeId, NodeError> {
        let [_, w_ne, _, w_se] = table.inner(self, "horizontal")?;
        let [e_nw, _, e_sw, _] = table.inner(e, "horizontal")?;

        table.join(w_ne, e_nw, w_se, e_sw)
    }

    /// Given `self` to the north and `s` to the south, the node of the same depth straddling
    /// their shared edge.
    pub fn vertical(self, table: &mut NodeTable, s: NodeId) -> Result<NodeId, NodeError> {
        let [_, _, n_sw, n_se] = table.inner(self, "vertical")?;
        let [s_nw, s_ne, _, _] = table.inner(s, "vertical")?;

        table.join(n_sw, n_se, s_nw, s_ne)
    }

    /// The center of [`NodeId::horizontal`], one level down.
    pub fn center_horizontal(self, table: &mut NodeTable, e: NodeId) -> Result<NodeId, NodeError> {
        let [_, w_ne, _, w_se] = table.inner(self, "center_horizontal")?;
        let [e_nw, _, e_sw, _] = table.inner(e, "center_horizontal")?;

        let nw = table.node(w_ne).quad().se;
        let ne = table.node(e_nw).quad().sw;
        let sw = table.node(w_se).quad().ne;
        let se = table.node(e_sw).quad().nw;

        table.canonicalize(nw, ne, sw, se)
    }

    /// The center of [`NodeId::vertical`], one level down.
    pub fn center_vertical(self, table: &mut NodeTable, s: NodeId) -> Result<NodeId, NodeError> {
        let [_, _, n_sw, n_se] = table.inner(self, "center_vertical")?;
        let [s_nw, s_ne, _, _] = table.inner(s, "center_vertical")?;

        let nw = table.node(n_sw).quad().se;
        let ne = table.node(n_se).quad().sw;
        let sw = table.node(s_nw).quad().ne;
        let se = table.node(s_ne).quad().nw;

        table.canonicalize(nw, ne, sw, se)
    }

    /// The node of depth `n - 2` at the center of this one.
    pub fn center_center(self, table: &mut NodeTable) -> Result<NodeId, NodeError> {
        let [nw, ne, sw, se] = table.inner(self, "center_center")?;

        let [_, _, _, nw] = table.inner(nw, "center_center")?;
        let [_, _, ne, _] = table.inner(ne, "center_center")?;
        let [_, sw, _, _] = table.inner(sw, "center_center")?;
        let [se, _, _, _] = table.inner(se, "center_center")?;

        let nw = table.node(nw).quad().se;
        let ne = table.node(ne).quad().sw;
        let sw = table.node(sw).quad().ne;
        let se = table.node(se).quad().nw;

        table.canonicalize(nw, ne, sw, se)
    }
}
