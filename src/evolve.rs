use tracing::trace;

use crate::node::NodeError;
use crate::node::NodeId;
use crate::table::NodeTable;

impl NodeId {
    /// The center of this node, `2^step` generations into the future.
    ///
    /// A node of depth `d` can see at most `2^(d - 2)` generations ahead, so `step` may be at most
    /// `d - 2`. The result has depth `d - 1`.
    pub fn evolve(self, table: &mut NodeTable, step: u32) -> Result<NodeId, NodeError> {
        let node = table.node(self);
        let depth = node.depth();

        if depth < 2 {
            return Err(NodeError::ShapeMismatch { op: "evolve", depth });
        }

        if step.saturating_add(2) > depth as u32 {
            return Err(NodeError::StepTooLarge { step, depth });
        }

        if let Some((s, res)) = table.memo(self) {
            if s == step {
                return Ok(res);
            }
        }

        let res = if table.node(self).is_empty() {
            table.blank_node(depth - 1)?
        } else if depth == 2 {
            self.next_generation(table)?
        } else if step + 2 == depth as u32 {
            self.evolve_full(table, step)?
        } else {
            self.evolve_partial(table, step)?
        };

        trace!(node = ?self, depth, step, ?res, "evolved");
        table.set_memo(self, step, res);

        Ok(res)
    }

    /// Advance a 4x4 node by a single generation, returning its central 2x2 block.
    fn next_generation(self, table: &mut NodeTable) -> Result<NodeId, NodeError> {
        let [nw, ne, sw, se] = table.inner(self, "next_generation")?;

        //   a b | c d
        //   e f | g h
        //   ----+----
        //   i j | k l
        //   m n | o p
        let [a, b, e, f] = table.leaves(nw, "next_generation")?;
        let [c, d, g, h] = table.leaves(ne, "next_generation")?;
        let [i, j, m, n] = table.leaves(sw, "next_generation")?;
        let [k, l, o, p] = table.leaves(se, "next_generation")?;

        let rules = table.rules();
        let next = |alive: bool, neighbors: [bool; 8]| {
            let count = neighbors.iter().filter(|&&b| b).count() as u8;
            rules.next_state(alive, count)
        };

        let nw = next(f, [a, b, c, e, g, i, j, k]);
        let ne = next(g, [b, c, d, f, h, j, k, l]);
        let sw = next(j, [e, f, g, i, k, m, n, o]);
        let se = next(k, [f, g, h, j, l, n, o, p]);

        table.leaf(nw, ne, sw, se)
    }

    /// `depth == step + 2`: go as far as the node allows, in two half steps.
    ///
    /// The nine overlapping windows of depth `d - 1` are each advanced `2^(step - 1)` generations,
    /// regrouped into four windows and advanced again.
    fn evolve_full(self, table: &mut NodeTable, step: u32) -> Result<NodeId, NodeError> {
        let [nw, ne, sw, se] = table.inner(self, "evolve")?;

        //  n00 n01 n02
        //  n10 n11 n12
        //  n20 n21 n22
        let n01 = nw.horizontal(table, ne)?;
        let n10 = nw.vertical(table, sw)?;
        let n11 = self.center(table)?;
        let n12 = ne.vertical(table, se)?;
        let n21 = sw.horizontal(table, se)?;

        let windows = [nw, n01, ne, n10, n11, n12, sw, n21, se];

        let mut half = [self; 9];
        for (res, window) in half.iter_mut().zip(windows) {
            *res = window.evolve(table, step - 1)?;
        }

        self.combine(table, half, step - 1)
    }

    /// `depth > step + 2`: the node can see further ahead than asked.
    ///
    /// The nine windows are taken one level further in, at the current generation, so they
    /// overlap by half. Regrouped into four, each is advanced the full `2^step` generations.
    fn evolve_partial(self, table: &mut NodeTable, step: u32) -> Result<NodeId, NodeError> {
        let [nw, ne, sw, se] = table.inner(self, "evolve")?;

        let n00 = nw.center(table)?;
        let n01 = nw.center_horizontal(table, ne)?;
        let n02 = ne.center(table)?;
        let n10 = nw.center_vertical(table, sw)?;
        let n11 = self.center_center(table)?;
        let n12 = ne.center_vertical(table, se)?;
        let n20 = sw.center(table)?;
        let n21 = sw.center_horizontal(table, se)?;
        let n22 = se.center(table)?;

        let windows = [n00, n01, n02, n10, n11, n12, n20, n21, n22];

        self.combine(table, windows, step)
    }

    /// Regroup a 3x3 grid of windows into the four overlapping 2x2 groups, evolve each group by
    /// `2^step` and assemble the results.
    fn combine(
        self,
        table: &mut NodeTable,
        grid: [NodeId; 9],
        step: u32,
    ) -> Result<NodeId, NodeError> {
        let [n00, n01, n02, n10, n11, n12, n20, n21, n22] = grid;

        let nw = table.join(n00, n01, n10, n11)?;
        let ne = table.join(n01, n02, n11, n12)?;
        let sw = table.join(n10, n11, n20, n21)?;
        let se = table.join(n11, n12, n21, n22)?;

        let nw = nw.evolve(table, step)?;
        let ne = ne.evolve(table, step)?;
        let sw = sw.evolve(table, step)?;
        let se = se.evolve(table, step)?;

        table.join(nw, ne, sw, se)
    }
}

#[cfg(test)]
mod test {
    use crate::WorldOffset;
    use crate::node::NodeError;
    use crate::node::NodeId;
    use crate::rule_set::B3S23;
    use crate::rule_set::RuleSet;
    use crate::table::NodeTable;

    fn node_with(table: &mut NodeTable, depth: u8, cells: &[(WorldOffset, WorldOffset)]) -> NodeId {
        let mut node = table.blank_node(depth).unwrap();

        for &(x, y) in cells {
            node = node.set_cell(table, x, y, true).unwrap();
        }

        node
    }

    fn sorted(table: &NodeTable, node: NodeId) -> Vec<(WorldOffset, WorldOffset)> {
        let mut cells = node.list_active_cells(table, 0, 0);
        cells.sort();
        cells
    }

    #[test]
    fn block_is_still() {
        let mut table = NodeTable::new(B3S23);
        let block = [(-1, -1), (0, -1), (-1, 0), (0, 0)];
        let node = node_with(&mut table, 2, &block);

        let res = node.evolve(&mut table, 0).unwrap();
        assert_eq!(res.depth(&table), 1);
        assert_eq!(res, table.leaf(true, true, true, true).unwrap());

        let node = node_with(&mut table, 5, &block);
        let res = node.evolve(&mut table, 3).unwrap();
        assert_eq!(sorted(&table, res), sorted(&table, node));
    }

    #[test]
    fn lonely_cell_dies() {
        let mut table = NodeTable::new(B3S23);
        let node = node_with(&mut table, 2, &[(0, 0)]);

        let res = node.evolve(&mut table, 0).unwrap();
        assert_eq!(res, table.blank_node(1).unwrap());
    }

    #[test]
    fn blinker_flips() {
        let mut table = NodeTable::new(B3S23);
        let horizontal = node_with(&mut table, 4, &[(-1, 0), (0, 0), (1, 0)]);
        let vertical = node_with(&mut table, 3, &[(0, -1), (0, 0), (0, 1)]);

        // depth 4 with step 0 takes the partial path all the way down
        let res = horizontal.evolve(&mut table, 0).unwrap();
        assert_eq!(res, vertical);

        // period 2: after 2^1 generations it is back where it started
        let res = horizontal.evolve(&mut table, 1).unwrap();
        assert_eq!(sorted(&table, res), vec![(-1, 0), (0, 0), (1, 0)]);
    }

    #[test]
    fn full_and_partial_paths_agree() {
        let mut table = NodeTable::new(B3S23);

        // R-pentomino, right in the middle
        let cells = [(0, -1), (1, -1), (-1, 0), (0, 0), (0, 1)];
        let node = node_with(&mut table, 5, &cells);

        // step 3 is the full path at depth 5, four step 1 evolutions go through the partial path
        let full = node.evolve(&mut table, 3).unwrap();

        let mut node = node;
        for _ in 0..4 {
            let centered = node.evolve(&mut table, 1).unwrap();
            node = centered.increase_depth(&mut table).unwrap();
        }

        assert_eq!(sorted(&table, full), sorted(&table, node));
    }

    #[test]
    fn results_are_memoized() {
        let mut table = NodeTable::new(B3S23);
        let node = node_with(&mut table, 4, &[(-1, 0), (0, 0), (1, 0)]);

        let res = node.evolve(&mut table, 1).unwrap();
        assert_eq!(table.memo(node), Some((1, res)));

        let built = table.len();
        assert_eq!(node.evolve(&mut table, 1).unwrap(), res);
        assert_eq!(table.len(), built);

        // a different step replaces the memo
        let other = node.evolve(&mut table, 0).unwrap();
        assert_eq!(table.memo(node), Some((0, other)));
    }

    #[test]
    fn preconditions() {
        let mut table = NodeTable::new(B3S23);
        let leaf = table.leaf(true, true, false, false).unwrap();
        let node = table.blank_node(3).unwrap();

        assert_eq!(
            leaf.evolve(&mut table, 0),
            Err(NodeError::ShapeMismatch { op: "evolve", depth: 1 })
        );
        assert_eq!(
            node.evolve(&mut table, 2),
            Err(NodeError::StepTooLarge { step: 2, depth: 3 })
        );
    }

    #[test]
    fn rules_drive_the_base_case() {
        // B1/S: every cell with a single neighbor is born, nothing survives
        let mut table = NodeTable::new(RuleSet::new(0b10, 0).unwrap());
        let node = node_with(&mut table, 2, &[(-2, -2)]);

        let res = node.evolve(&mut table, 0).unwrap();
        assert_eq!(res, table.leaf(true, false, false, false).unwrap());
    }
}
