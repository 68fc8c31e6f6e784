//! Direct neighbor counting over a sparse set of live cells.
//!
//! Far slower than the quadtree, but simple enough to trust. Used to cross-check it.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::WorldOffset;
use crate::rule_set::RuleSet;

pub type Cells = HashSet<(WorldOffset, WorldOffset)>;

const NEIGHBORS: [(WorldOffset, WorldOffset); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Advance `cells` by a single generation.
pub fn step(cells: &Cells, rules: RuleSet) -> Cells {
    // Only live cells and their neighbors can be alive next generation
    let mut counts: HashMap<(WorldOffset, WorldOffset), u8> = HashMap::new();

    for &(x, y) in cells {
        counts.entry((x, y)).or_insert(0);

        for (dx, dy) in NEIGHBORS {
            *counts.entry((x + dx, y + dy)).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|&(cell, n)| rules.next_state(cells.contains(&cell), n))
        .map(|(cell, _)| cell)
        .collect()
}

/// Advance `cells` by `generations` generations, one at a time.
pub fn advance(cells: &Cells, rules: RuleSet, generations: u64) -> Cells {
    let mut cells = cells.clone();

    for _ in 0..generations {
        cells = step(&cells, rules);
    }

    cells
}

#[cfg(test)]
mod test {
    use super::Cells;
    use super::advance;
    use super::step;
    use crate::rule_set::B3S23;

    #[test]
    fn blinker() {
        let horizontal: Cells = [(0, 0), (1, 0), (2, 0)].into_iter().collect();
        let vertical: Cells = [(1, -1), (1, 0), (1, 1)].into_iter().collect();

        assert_eq!(step(&horizontal, B3S23), vertical);
        assert_eq!(advance(&horizontal, B3S23, 2), horizontal);
    }

    #[test]
    fn empty_stays_empty() {
        assert!(step(&Cells::new(), B3S23).is_empty());
    }
}
