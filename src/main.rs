use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quadlife::Universe;
use quadlife::naive;
use quadlife::rule_set::RuleSet;

/// Advance a Life pattern with hashlife.
#[derive(Debug, Parser)]
#[command(name = "quadlife")]
struct Args {
    /// Pattern to load, in RLE format
    pattern: PathBuf,

    /// Each evolution advances 2^STEP generations
    #[arg(short, long, default_value_t = 0)]
    step: u32,

    /// Number of evolutions to run
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Rules to run instead of the pattern's own, e.g. B36/S23
    #[arg(long)]
    rule: Option<RuleSet>,

    /// Print the live cells once done
    #[arg(long)]
    list: bool,

    /// Check every evolution against direct neighbor counting
    #[arg(long)]
    verify: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let bytes = std::fs::read(&args.pattern)
        .with_context(|| format!("Failed to open {}", args.pattern.display()))?;

    let mut universe = match args.rule {
        Some(rules) => {
            let mut universe = Universe::with_rules(rules);
            universe.load_rle(&bytes)?;
            universe
        }
        None => Universe::from_rle(&bytes)?,
    };

    info!(
        rules = %universe.rules(),
        population = universe.population(),
        "loaded {}",
        args.pattern.display()
    );

    for _ in 0..args.repeat {
        let before: HashSet<_> = universe.list_active_cells().into_iter().collect();

        universe
            .evolve(args.step)
            .with_context(|| format!("Failed to evolve at generation {}", universe.generation()))?;

        info!(
            generation = universe.generation(),
            population = universe.population(),
            depth = universe.depth(),
            nodes = universe.node_count(),
            "evolved"
        );

        if args.verify {
            let want = naive::advance(&before, universe.rules(), 1 << args.step);
            let got: HashSet<_> = universe.list_active_cells().into_iter().collect();

            if want != got {
                bail!(
                    "Mismatch at generation {}: expected {} cells, found {}",
                    universe.generation(),
                    want.len(),
                    got.len()
                );
            }
        }
    }

    if args.list {
        let mut cells = universe.list_active_cells();
        cells.sort_by_key(|&(x, y)| (y, x));

        for (x, y) in cells {
            println!("{x} {y}");
        }
    }

    Ok(())
}
