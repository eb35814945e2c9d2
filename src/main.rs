use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use nbody_gravity::{
    scenario::{self, DiscParams},
    GravitySystem, PositionUpdate, Strategy, SystemConfig,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    BruteForce,
    BarnesHut,
    SingleAggregate,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::BruteForce => Strategy::BruteForce,
            StrategyArg::BarnesHut => Strategy::BarnesHut,
            StrategyArg::SingleAggregate => Strategy::SingleAggregate,
        }
    }
}

/// Runs a headless disc-galaxy simulation and logs diagnostics per tick.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of bodies, including the central mass.
    #[arg(long, default_value_t = 2_000)]
    bodies: usize,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 100)]
    ticks: usize,

    /// Overrides the strategy from the config file.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// TOML file with a `SystemConfig`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the initial conditions.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Use the rayon pool for force queries.
    #[arg(long)]
    parallel: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SystemConfig::from_toml_str(&text).with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => SystemConfig {
            gravitational_constant: 1.0,
            dt: 0.05,
            iterations_per_tick: 1,
            opening_angle_theta: 0.7,
            strategy: Strategy::BarnesHut,
            ..Default::default()
        },
    };
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    config.parallel |= args.parallel;

    let params = DiscParams {
        gravitational_constant: config.gravitational_constant,
        speed_scale: match config.position_update {
            PositionUpdate::Unscaled => config.dt,
            PositionUpdate::Scaled => 1.0,
        },
        ..Default::default()
    };
    let bodies = scenario::uniform_disc(args.bodies, args.seed, &params);
    let mut system = GravitySystem::with_bodies(config, bodies).context("failed to build the system")?;

    let start = std::time::Instant::now();
    for _ in 0..args.ticks {
        system.advance().with_context(|| format!("tick {} failed", system.frame()))?;

        log::debug!(
            "tick {}: kinetic energy {:.3e}, momentum {:?}, tree nodes {}",
            system.frame(),
            system.kinetic_energy(),
            system.momentum(),
            system.quadtree().node_count(),
        );
    }

    let elapsed = start.elapsed();
    log::info!(
        "{} ticks of {} bodies in {:.2?} ({:.2?} per tick), center of mass {:?}",
        args.ticks,
        system.len(),
        elapsed,
        per_tick(elapsed, args.ticks),
        system.center_of_mass(),
    );
    Ok(())
}

/// Mean wall time per tick; a zero-tick run reports the whole span.
fn per_tick(elapsed: Duration, ticks: usize) -> Duration {
    elapsed.div_f64(ticks.max(1) as f64)
}
