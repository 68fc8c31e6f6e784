use std::collections::HashSet;

use quadlife::Universe;
use quadlife::naive;

/// Draw the live cells inside their bounding box, one line per row.
fn render(universe: &Universe) -> String {
    let Some(((min_x, min_y), (max_x, max_y))) = universe.bounding_box() else {
        return String::new();
    };

    let cells: HashSet<_> = universe.list_active_cells().into_iter().collect();

    (min_y..=max_y)
        .map(|y| {
            (min_x..=max_x)
                .map(|x| if cells.contains(&(x, y)) { 'O' } else { '.' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn live_set(universe: &Universe) -> naive::Cells {
    universe.list_active_cells().into_iter().collect()
}

#[test]
fn test_patterns() -> anyhow::Result<()> {
    let pattern_dir = std::fs::read_dir("tests/patterns")?;
    let mut tested = 0;
    let mut failed = Vec::new();

    for entry in pattern_dir {
        let path = entry?.path();
        let bytes = std::fs::read(&path)?;

        let mut universe = match Universe::from_rle(&bytes) {
            Ok(universe) => universe,
            Err(e) => {
                failed.push((path.clone(), e.to_string()));
                continue;
            }
        };

        let rules = universe.rules();
        let mut want = live_set(&universe);

        // a few single generations, then a few bigger jumps
        for step in [0, 0, 0, 1, 2, 3, 4] {
            want = naive::advance(&want, rules, 1 << step);
            universe.evolve(step)?;

            if live_set(&universe) != want {
                failed.push((
                    path.clone(),
                    format!("mismatch at generation {}", universe.generation()),
                ));
                break;
            }
        }

        tested += 1;
    }

    if !failed.is_empty() {
        for (path, err) in &failed {
            eprintln!("Failed on {:?}: {}", path, err);
        }

        panic!("{}/{} patterns failed", failed.len(), tested);
    }

    assert!(tested >= 5);

    Ok(())
}

#[test]
fn glider_walks_south_east() -> anyhow::Result<()> {
    let bytes = std::fs::read("tests/patterns/glider.rle")?;
    let mut universe = Universe::from_rle(&bytes)?;

    insta::assert_snapshot!(render(&universe), @r"
    .O.
    ..O
    OOO
    ");

    universe.evolve(2)?;
    assert_eq!(universe.bounding_box(), Some(((1, 1), (3, 3))));

    insta::assert_snapshot!(render(&universe), @r"
    .O.
    ..O
    OOO
    ");

    // half a period on, in its other phase
    universe.evolve(1)?;
    insta::assert_snapshot!(render(&universe), @r"
    ..O
    O.O
    .OO
    ");

    Ok(())
}

#[test]
fn gun_emits_gliders() -> anyhow::Result<()> {
    let bytes = std::fs::read("tests/patterns/gosper_glider_gun.rle")?;
    let mut universe = Universe::from_rle(&bytes)?;
    assert_eq!(universe.population(), 36);

    // 120 generations: four full periods, four gliders
    for _ in 0..15 {
        universe.evolve(3)?;
    }

    assert_eq!(universe.generation(), 120);
    assert_eq!(universe.population(), 36 + 4 * 5);

    Ok(())
}

#[test]
fn rule_override() -> anyhow::Result<()> {
    let bytes = std::fs::read("tests/patterns/replicator.rle")?;

    let highlife = Universe::from_rle(&bytes)?;
    assert_eq!(highlife.rules().to_string(), "B36/S23");

    let mut life = Universe::new();
    life.load_rle(&bytes)?;
    assert_eq!(life.rules().to_string(), "B3/S23");
    assert_eq!(life.population(), highlife.population());

    Ok(())
}
