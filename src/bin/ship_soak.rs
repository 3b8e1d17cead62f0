//! Soak test: many ships in one world, stepped for a while, with the physics
//! thread's tick statistics reported at the end.
//!
//! Usage: ship_soak [ships] [seconds] [config.toml]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::DVec3;
use voxel_ships::{
    BlockPhysics, BlockPhysicsRegistry, PhysicsConfig, PhysicsEvent, PointForce, ProviderContext, ProviderError,
    ShipWorld, TransformSelector, VoxelForceProvider, VoxelPos,
};

/// Pushes up along the ship's local +Y
struct Lifter {
    thrust: f64,
}

impl VoxelForceProvider for Lifter {
    fn force_at(&self, ctx: &ProviderContext<'_>) -> Result<Option<PointForce>, ProviderError> {
        let force = ctx.to_global_direction(DVec3::Y) * self.thrust * ctx.dt;
        Ok(Some(PointForce::at_point(force, ctx.voxel_center_global())))
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let ship_count: usize = args.next().map(|s| s.parse()).transpose().context("ships must be a number")?.unwrap_or(64);
    let seconds: u64 = args.next().map(|s| s.parse()).transpose().context("seconds must be a number")?.unwrap_or(5);
    let config = match args.next() {
        Some(path) => PhysicsConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => PhysicsConfig::default(),
    };

    println!("Voxel Ships - Physics Soak");
    println!("==========================");
    println!("  Ships: {}", ship_count);
    println!("  Duration: {}s", seconds);
    println!("  Tick rate: {} Hz x {} substeps", config.tick_rate_hz, config.substeps_per_tick);
    println!();

    let mut registry = BlockPhysicsRegistry::new();
    let hull = registry.register("hull", BlockPhysics::solid(100.0));
    let lifter = registry.register(
        "lifter",
        BlockPhysics::solid(50.0).with_force_provider(Lifter { thrust: 2_000.0 }),
    );
    let world = ShipWorld::new(0, config, Arc::new(registry))?;

    for i in 0..ship_count {
        let ship = world.spawn_ship(None)?;
        let origin = ship.claim().center_pos();
        for dx in 0..4 {
            for dz in 0..4 {
                let pos = VoxelPos::new(origin.x_start() + dx, 64, origin.z_start() + dz);
                ship.set_voxel(pos, hull)?;
            }
        }
        // Lifter off center so ships tumble as well as climb
        ship.set_voxel(VoxelPos::new(origin.x_start() + (i % 4) as i32, 65, origin.z_start()), lifter)?;
        world.teleport_ship(ship.id(), DVec3::new(i as f64 * 8.0, 100.0, 0.0), None)?;
    }

    let game_tick = Duration::from_millis(50);
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut frozen = 0usize;
    while Instant::now() < deadline {
        for event in world.on_game_tick() {
            if let PhysicsEvent::ShipFrozen { .. } = event {
                frozen += 1;
            }
        }
        thread::sleep(game_tick);
    }

    let highest = world
        .ships()
        .iter()
        .map(|ship| ship.transform(TransformSelector::GameTick).position().y)
        .fold(f64::NEG_INFINITY, f64::max);

    println!("Results");
    println!("-------");
    println!("  Physics ticks: {}", world.physics_tick_count());
    match world.average_tick_duration() {
        Some(avg) => println!("  Average tick: {:.3}ms", avg.as_secs_f64() * 1000.0),
        None => println!("  Average tick: n/a"),
    }
    if let Some(tps) = world.ticks_per_second() {
        println!("  Sustainable rate: {:.0} ticks/s", tps);
    }
    println!("  Overruns: {}", world.physics_overrun_count());
    println!("  Frozen ships: {}", frozen);
    println!("  Highest ship: y = {:.2}", highest);

    world.shutdown();
    Ok(())
}
