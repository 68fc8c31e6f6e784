use std::collections::HashMap;

use tracing::trace;

use crate::node::Child;
use crate::node::MAX_DEPTH;
use crate::node::Node;
use crate::node::NodeError;
use crate::node::NodeId;
use crate::node::Quad;
use crate::rule_set::RuleSet;

/// The canonical node table.
///
/// Every [`Node`] lives in `nodes` and is addressed by its [`NodeId`]. `index` maps each 4-child
/// signature to the one node built from it, so two structurally identical regions always share a
/// handle. Nodes are never removed.
///
/// Memoized evolution results depend on the rules, so a table is bound to a single [`RuleSet`].
pub struct NodeTable {
    rules: RuleSet,

    /// This is where all of our memory goes
    nodes: Vec<Node>,

    index: HashMap<Quad, NodeId>,

    /// `blanks[d - 1]` is the empty node of depth `d`, filled in lazily
    blanks: Vec<NodeId>,
}

impl NodeTable {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            nodes: Vec::new(),
            index: HashMap::new(),
            blanks: Vec::new(),
        }
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    /// Number of distinct nodes built so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` was handed out by a different table.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Return the unique node whose children are `nw`, `ne`, `sw` and `se`, building it on the
    /// first request.
    ///
    /// The four children must either all be leaves, or all be inner nodes of the same depth.
    pub fn canonicalize(
        &mut self,
        nw: Child,
        ne: Child,
        sw: Child,
        se: Child,
    ) -> Result<NodeId, NodeError> {
        let quad = Quad { nw, ne, sw, se };

        if let Some(&id) = self.index.get(&quad) {
            return Ok(id);
        }

        let (depth, population) = self.measure(&quad)?;

        let id = NodeId::new(self.nodes.len())?;
        self.nodes.push(Node::new(quad, depth, population));
        self.index.insert(quad, id);

        trace!(?id, depth, population, "new node");

        Ok(id)
    }

    /// Like [`NodeTable::canonicalize`] for four inner children.
    pub fn join(
        &mut self,
        nw: NodeId,
        ne: NodeId,
        sw: NodeId,
        se: NodeId,
    ) -> Result<NodeId, NodeError> {
        self.canonicalize(
            Child::Inner(nw),
            Child::Inner(ne),
            Child::Inner(sw),
            Child::Inner(se),
        )
    }

    /// Like [`NodeTable::canonicalize`] for a 2x2 block of raw cells.
    pub fn leaf(&mut self, nw: bool, ne: bool, sw: bool, se: bool) -> Result<NodeId, NodeError> {
        let quad = Quad {
            nw: Child::Leaf(nw),
            ne: Child::Leaf(ne),
            sw: Child::Leaf(sw),
            se: Child::Leaf(se),
        };

        if let Some(&id) = self.index.get(&quad) {
            return Ok(id);
        }

        let population = [nw, ne, sw, se].into_iter().filter(|&b| b).count() as u64;

        let id = NodeId::new(self.nodes.len())?;
        self.nodes.push(Node::new(quad, 1, population));
        self.index.insert(quad, id);

        Ok(id)
    }

    /// The all-dead node of the given depth.
    pub fn blank_node(&mut self, depth: u8) -> Result<NodeId, NodeError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(NodeError::ShapeMismatch {
                op: "blank_node",
                depth,
            });
        }

        while self.blanks.len() < depth as usize {
            let blank = match self.blanks.last().copied() {
                None => self.leaf(false, false, false, false)?,
                Some(b) => self.join(b, b, b, b)?,
            };

            self.blanks.push(blank);
        }

        Ok(self.blanks[depth as usize - 1])
    }

    /// A dead child fitting in a node of depth `depth`: a raw value at depth 1, the blank node one
    /// level down otherwise.
    pub fn blank_child(&mut self, depth: u8) -> Result<Child, NodeError> {
        if depth <= 1 {
            Ok(Child::Leaf(false))
        } else {
            self.blank_node(depth - 1).map(Child::Inner)
        }
    }

    /// The four children of `id` as sub-nodes. Fails with [`NodeError::ShapeMismatch`] when they
    /// are raw values, naming `op` as the operation that needed them.
    pub fn inner(&self, id: NodeId, op: &'static str) -> Result<[NodeId; 4], NodeError> {
        let node = self.node(id);

        let Quad { nw, ne, sw, se } = node.quad();
        match (nw, ne, sw, se) {
            (Child::Inner(nw), Child::Inner(ne), Child::Inner(sw), Child::Inner(se)) => {
                Ok([nw, ne, sw, se])
            }
            _ => Err(NodeError::ShapeMismatch {
                op,
                depth: node.depth(),
            }),
        }
    }

    /// The four raw cells of a depth 1 node.
    pub fn leaves(&self, id: NodeId, op: &'static str) -> Result<[bool; 4], NodeError> {
        let node = self.node(id);

        let Quad { nw, ne, sw, se } = node.quad();
        match (nw, ne, sw, se) {
            (Child::Leaf(nw), Child::Leaf(ne), Child::Leaf(sw), Child::Leaf(se)) => {
                Ok([nw, ne, sw, se])
            }
            _ => Err(NodeError::ShapeMismatch {
                op,
                depth: node.depth(),
            }),
        }
    }

    pub(crate) fn memo(&self, id: NodeId) -> Option<(u32, NodeId)> {
        self.node(id).res
    }

    /// Remember `res` as the result of evolving `id` by `2^step` generations, replacing whatever
    /// was remembered before.
    pub(crate) fn set_memo(&mut self, id: NodeId, step: u32, res: NodeId) {
        self.nodes[id.index()].res = Some((step, res));
    }

    /// Depth and population of a node about to be built from `quad`.
    fn measure(&self, quad: &Quad) -> Result<(u8, u64), NodeError> {
        let children = [quad.nw, quad.ne, quad.sw, quad.se];

        match children {
            [Child::Leaf(_), Child::Leaf(_), Child::Leaf(_), Child::Leaf(_)] => {
                let population = children.iter().filter(|c| c.is_alive()).count() as u64;

                Ok((1, population))
            }
            [Child::Inner(nw), Child::Inner(ne), Child::Inner(sw), Child::Inner(se)] => {
                let depth = self.node(nw).depth();

                for id in [ne, sw, se] {
                    if self.node(id).depth() != depth {
                        return Err(NodeError::ShapeMismatch {
                            op: "canonicalize",
                            depth: self.node(id).depth(),
                        });
                    }
                }

                if depth >= MAX_DEPTH {
                    return Err(NodeError::TooDeep { depth: depth + 1 });
                }

                let population = [nw, ne, sw, se]
                    .iter()
                    .map(|&id| self.node(id).population())
                    .sum();

                Ok((depth + 1, population))
            }
            _ => Err(NodeError::ShapeMismatch {
                op: "canonicalize",
                depth: 1,
            }),
        }
    }
}

impl std::fmt::Debug for NodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTable")
            .field("rules", &self.rules)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
