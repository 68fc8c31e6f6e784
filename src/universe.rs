use thiserror::Error;
use tracing::debug;
use tracing::trace;

use crate::WorldOffset;
use crate::node::MAX_DEPTH;
use crate::node::NodeError;
use crate::node::NodeId;
use crate::parse_rle;
use crate::parse_rle::RleError;
use crate::rule_set::RuleSet;
use crate::table::NodeTable;

/// Depth of the root of a fresh universe, a 16x16 square.
const INITIAL_DEPTH: u8 = 4;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("Cell ({x}, {y}) is too far from the origin")]
    OutOfBounds { x: WorldOffset, y: WorldOffset },

    #[error("Cannot advance 2^{step} generations at once")]
    StepTooLarge { step: u32 },

    #[error("Failed to read RLE pattern: {0}")]
    Rle(#[from] RleError),
}

/// An unbounded Life universe.
///
/// The universe is a square of side `2^depth` centered on the origin, grown on demand. `x` grows
/// to the east and `y` to the south.
pub struct Universe {
    table: NodeTable,
    root: NodeId,

    /// Generations advanced so far
    generation: u128,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    /// An empty universe running Conway's Game of Life.
    pub fn new() -> Self {
        Self::with_rules(RuleSet::default())
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        let (table, root) = Self::fresh(rules);

        Self {
            table,
            root,
            generation: 0,
        }
    }

    /// Build a universe from an RLE pattern, running the rules the pattern asks for.
    pub fn from_rle(bytes: &[u8]) -> Result<Self, UniverseError> {
        let mut cells = Vec::new();
        let file = parse_rle::read_rle(bytes, |x, y| cells.push((x, y)))?;

        if let Some(name) = file.name {
            debug!(name = %String::from_utf8_lossy(name), rules = %file.set, "loading pattern");
        }

        let mut universe = Self::with_rules(file.set);
        for (x, y) in cells {
            universe.set_cell(x, y, true)?;
        }

        Ok(universe)
    }

    /// Add the live cells of an RLE pattern to this universe. The pattern's own rules are ignored.
    pub fn load_rle(&mut self, bytes: &[u8]) -> Result<(), UniverseError> {
        let mut cells = Vec::new();
        let file = parse_rle::read_rle(bytes, |x, y| cells.push((x, y)))?;

        if file.set != self.rules() {
            debug!(
                pattern = %file.set,
                universe = %self.rules(),
                "pattern rules ignored"
            );
        }

        for (x, y) in cells {
            self.set_cell(x, y, true)?;
        }

        Ok(())
    }

    fn fresh(rules: RuleSet) -> (NodeTable, NodeId) {
        let mut table = NodeTable::new(rules);

        let Ok(root) = table.blank_node(INITIAL_DEPTH) else {
            unreachable!("INITIAL_DEPTH is within 1..=MAX_DEPTH")
        };

        (table, root)
    }

    pub fn rules(&self) -> RuleSet {
        self.table.rules()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn table(&self) -> &NodeTable {
        &self.table
    }

    pub fn depth(&self) -> u8 {
        self.root.depth(&self.table)
    }

    pub fn generation(&self) -> u128 {
        self.generation
    }

    /// Number of live cells.
    pub fn population(&self) -> u64 {
        self.root.population(&self.table)
    }

    /// Number of distinct nodes held by the table.
    pub fn node_count(&self) -> usize {
        self.table.len()
    }

    /// Kill every cell and rewind to generation 0.
    ///
    /// This also drops every node built so far, along with their memoized futures.
    pub fn clear(&mut self) {
        let (table, root) = Self::fresh(self.rules());

        debug!(nodes = self.table.len(), "clearing universe");

        self.table = table;
        self.root = root;
        self.generation = 0;
    }

    /// Grow the root until `(x, y)` lies inside it.
    pub fn increase_grid_size(
        &mut self,
        x: WorldOffset,
        y: WorldOffset,
    ) -> Result<(), UniverseError> {
        while !self.root.contains(&self.table, x, y) {
            if self.depth() >= MAX_DEPTH {
                return Err(UniverseError::OutOfBounds { x, y });
            }

            self.grow()?;
        }

        Ok(())
    }

    fn grow(&mut self) -> Result<(), UniverseError> {
        self.root = self.root.increase_depth(&mut self.table)?;
        trace!(depth = self.depth(), "grew universe");

        Ok(())
    }

    pub fn set_cell(
        &mut self,
        x: WorldOffset,
        y: WorldOffset,
        alive: bool,
    ) -> Result<(), UniverseError> {
        self.increase_grid_size(x, y)?;
        self.root = self.root.set_cell(&mut self.table, x, y, alive)?;

        Ok(())
    }

    pub fn get_cell(&mut self, x: WorldOffset, y: WorldOffset) -> Result<bool, UniverseError> {
        self.increase_grid_size(x, y)?;

        Ok(self.root.get_cell(&self.table, x, y)?)
    }

    /// Advance the universe by `2^step` generations.
    pub fn evolve(&mut self, step: u32) -> Result<(), UniverseError> {
        // The root sees `2^(depth - 2)` generations ahead and keeps its center half. One more level
        // leaves room for cells to travel a full `2^step` away from the middle quarter.
        let min_depth = step.saturating_add(3);

        if min_depth > MAX_DEPTH as u32 {
            return Err(UniverseError::StepTooLarge { step });
        }

        while !self.is_padded(min_depth)? {
            if self.depth() >= MAX_DEPTH {
                return Err(UniverseError::StepTooLarge { step });
            }

            self.grow()?;
        }

        let before = self.table.len();
        self.root = self.root.evolve(&mut self.table, step)?;
        self.generation += 1 << step;

        debug!(
            generation = self.generation,
            population = self.population(),
            new_nodes = self.table.len() - before,
            "evolved"
        );

        Ok(())
    }

    /// Whether the root is at least `min_depth` deep, with every live cell in its middle quarter.
    fn is_padded(&mut self, min_depth: u32) -> Result<bool, UniverseError> {
        if (self.depth() as u32) < min_depth {
            return Ok(false);
        }

        let inner = self.root.center_center(&mut self.table)?;

        Ok(inner.population(&self.table) == self.population())
    }

    /// Coordinates of every live cell, in no particular order.
    pub fn list_active_cells(&self) -> Vec<(WorldOffset, WorldOffset)> {
        self.root.list_active_cells(&self.table, 0, 0)
    }

    /// The smallest `((min_x, min_y), (max_x, max_y))` box holding every live cell, bounds
    /// included. `None` when the universe is empty.
    pub fn bounding_box(&self) -> Option<((WorldOffset, WorldOffset), (WorldOffset, WorldOffset))> {
        let cells = self.list_active_cells();
        let (&(x, y), rest) = cells.split_first()?;

        let bounds = rest.iter().fold(((x, y), (x, y)), |(min, max), &(x, y)| {
            ((min.0.min(x), min.1.min(y)), (max.0.max(x), max.1.max(y)))
        });

        Some(bounds)
    }
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("rules", &self.rules())
            .field("depth", &self.depth())
            .field("generation", &self.generation)
            .field("population", &self.population())
            .field("nodes", &self.table.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::Universe;
    use super::UniverseError;
    use crate::WorldOffset;

    fn universe_with(cells: &[(WorldOffset, WorldOffset)]) -> Universe {
        let mut universe = Universe::new();

        for &(x, y) in cells {
            universe.set_cell(x, y, true).unwrap();
        }

        universe
    }

    fn sorted(universe: &Universe) -> Vec<(WorldOffset, WorldOffset)> {
        let mut cells = universe.list_active_cells();
        cells.sort();
        cells
    }

    #[test]
    fn blinker() {
        let mut universe = universe_with(&[(0, 0), (1, 0), (2, 0)]);

        universe.evolve(0).unwrap();
        assert_eq!(sorted(&universe), vec![(1, -1), (1, 0), (1, 1)]);

        universe.evolve(0).unwrap();
        assert_eq!(sorted(&universe), vec![(0, 0), (1, 0), (2, 0)]);
        assert_eq!(universe.generation(), 2);
    }

    #[test]
    fn glider() {
        let glider = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];
        let mut universe = universe_with(&glider);

        universe.evolve(2).unwrap();

        let mut want: Vec<_> = glider.iter().map(|&(x, y)| (x + 1, y + 1)).collect();
        want.sort();
        assert_eq!(sorted(&universe), want);
        assert_eq!(universe.generation(), 4);
    }

    #[test]
    fn far_cells_grow_the_tree() {
        let mut universe = Universe::new();
        let depth = universe.depth();

        universe.set_cell(1_000_000, -3, true).unwrap();
        universe.set_cell(-70_000_000_000, 12, true).unwrap();
        assert!(universe.depth() > depth);

        assert!(universe.get_cell(1_000_000, -3).unwrap());
        assert!(universe.get_cell(-70_000_000_000, 12).unwrap());
        assert!(!universe.get_cell(1_000_000, -2).unwrap());
        assert_eq!(universe.population(), 2);
    }

    #[test]
    fn reading_grows_without_changing_content() {
        let mut universe = universe_with(&[(1, 1)]);
        let depth = universe.depth();

        assert!(!universe.get_cell(500, 500).unwrap());
        assert!(universe.depth() > depth);
        assert!(universe.get_cell(1, 1).unwrap());
        assert_eq!(sorted(&universe), vec![(1, 1)]);
    }

    #[test]
    fn out_of_bounds() {
        let mut universe = Universe::new();

        assert!(matches!(
            universe.set_cell(WorldOffset::MAX, 0, true),
            Err(UniverseError::OutOfBounds { .. })
        ));
        assert!(matches!(
            universe.evolve(61),
            Err(UniverseError::StepTooLarge { step: 61 })
        ));
    }

    #[test]
    fn malformed_patterns_are_errors() {
        let huge_run = Universe::from_rle(b"x = 3, y = 1\n9223372036854775807b2o!");
        assert!(matches!(huge_run, Err(UniverseError::Rle(_))));

        let b0 = Universe::from_rle(b"x = 1, y = 1, rule = B0/S23\no!");
        assert!(matches!(b0, Err(UniverseError::Rle(_))));

        let mut universe = Universe::new();
        assert!(universe.load_rle(b"#P 9223372036854775807 0\n2o!").is_err());
        assert_eq!(universe.population(), 0);
    }

    #[test]
    fn empty_universe_evolves() {
        let mut universe = Universe::new();

        universe.evolve(10).unwrap();
        assert_eq!(universe.population(), 0);
        assert_eq!(universe.generation(), 1024);
        assert_eq!(universe.bounding_box(), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut universe = universe_with(&[(0, 0), (1, 0), (2, 0), (40, 40)]);
        universe.evolve(3).unwrap();

        universe.clear();
        assert_eq!(universe.population(), 0);
        assert_eq!(universe.generation(), 0);
        assert!(universe.list_active_cells().is_empty());

        universe.set_cell(5, 5, true).unwrap();
        assert_eq!(sorted(&universe), vec![(5, 5)]);
    }

    #[test]
    fn bounding_box() {
        let universe = universe_with(&[(3, -2), (-5, 7), (0, 0)]);

        assert_eq!(universe.bounding_box(), Some(((-5, -2), (3, 7))));
    }

    #[test]
    fn big_jump_matches_small_steps() {
        // Lightweight spaceship, moving west at c/2
        let lwss = [(1, 0), (4, 0), (0, 1), (0, 2), (4, 2), (0, 3), (1, 3), (2, 3), (3, 3)];

        let mut fast = universe_with(&lwss);
        fast.evolve(6).unwrap();

        let mut slow = universe_with(&lwss);
        for _ in 0..16 {
            slow.evolve(2).unwrap();
        }

        assert_eq!(fast.generation(), 64);
        assert_eq!(sorted(&fast), sorted(&slow));
        assert_eq!(fast.population(), 9);

        let ((min_x, _), _) = fast.bounding_box().unwrap();
        assert_eq!(min_x, -32);
    }
}
