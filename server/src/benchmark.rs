//! Timed benchmark mode: runs batches of warp ticks on a populated world and
//! reports the average tick duration.

use crate::config::WorldConfig;
use crate::content::entity_types::SpawnParams;
use crate::scheduler::TickScheduler;
use crate::simulation::Simulation;
use log::info;
use rand::Rng;
use shared::{EntityType, Point};
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkOptions {
    pub runs: u32,
    pub ticks_per_run: u32,
    /// Entities created before each run.
    pub entities: u32,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            runs: 5,
            ticks_per_run: 1_000,
            entities: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    /// Average tick duration of each run.
    pub run_averages: Vec<Duration>,
    pub overall_average: Duration,
}

const POPULATION: [EntityType; 3] = [EntityType::Cow, EntityType::Tree, EntityType::Boulder];

/// Stages `count` entities at random positions, cycling through the
/// naturally occurring types.
pub fn populate(simulation: &mut Simulation, count: u32) {
    let world = &mut simulation.world;
    let (width, height) = (world.config().world_width(), world.config().world_height());
    for i in 0..count {
        let entity_type = POPULATION[i as usize % POPULATION.len()];
        let rng = world.rng_mut();
        let position = Point::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height));
        let rotation = rng.gen_range(0.0..TAU);
        world.create_entity(entity_type, position, rotation, SpawnParams::default());
    }
}

pub fn run_benchmark(config: WorldConfig, options: BenchmarkOptions) -> BenchmarkReport {
    let mut simulation = Simulation::new(config.clone(), 0);
    let mut scheduler = TickScheduler::new(config.tick_duration(), true);
    let mut run_averages = Vec::with_capacity(options.runs as usize);

    info!(
        "Benchmarking {} runs of {} ticks with {} entities",
        options.runs, options.ticks_per_run, options.entities
    );

    for run in 0..options.runs {
        simulation.reset();
        scheduler.reset_stats();
        populate(&mut simulation, options.entities);

        let started = Instant::now();
        for _ in 0..options.ticks_per_run {
            let tick_started = Instant::now();
            simulation.run_tick();
            scheduler.complete_tick(Instant::now(), tick_started.elapsed());
        }
        let average = started.elapsed() / options.ticks_per_run.max(1);
        let stats = scheduler.stats();
        info!(
            "Run {}: avg {:.3}ms, min {}us, max {}us, {} entities at end",
            run + 1,
            average.as_secs_f64() * 1000.0,
            stats.min_tick_us,
            stats.max_tick_us,
            simulation.world.entity_count()
        );
        run_averages.push(average);
    }

    let total: Duration = run_averages.iter().sum();
    let overall_average = total / options.runs.max(1);
    info!(
        "Average tick duration over {} runs: {:.3}ms",
        options.runs,
        overall_average.as_secs_f64() * 1000.0
    );

    BenchmarkReport {
        run_averages,
        overall_average,
    }
}
