//! Dedicated physics thread for one world

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::events::PhysicsEvent;
use super::tick_stats::TickStats;
use super::timeline::{SchedulerCommand, WorldTimeline};
use crate::config::PhysicsConfig;
use crate::error::{ShipError, ShipResult};
use crate::ship::{ShipHandle, ShipId};
use crate::world::WorldId;

/// Runs a `WorldTimeline` at the configured tick rate on its own thread
///
/// Commands are applied between passes. Stopping discards queued commands and
/// waits for the current ship's substep to finish.
pub struct PhysicsScheduler {
    world: WorldId,
    commands: Sender<SchedulerCommand>,
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<TickStats>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PhysicsScheduler {
    pub fn start(world: WorldId, config: Arc<PhysicsConfig>, events: Sender<PhysicsEvent>) -> ShipResult<Self> {
        let (commands, command_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(Mutex::new(TickStats::new(config.tick_stats_window)));

        let timeline = WorldTimeline::new(world, config, events);
        let thread_running = Arc::clone(&running);
        let thread_stats = Arc::clone(&stats);

        let thread = thread::Builder::new()
            .name(format!("physics-world-{}", world))
            .spawn(move || Self::run(timeline, command_rx, thread_running, thread_stats))
            .map_err(|e| ShipError::Scheduler(format!("Failed to spawn physics thread for world {}: {}", world, e)))?;

        log::info!("Started physics scheduler for world {}", world);
        Ok(Self {
            world,
            commands,
            running,
            stats,
            thread: Some(thread),
        })
    }

    fn run(
        mut timeline: WorldTimeline,
        commands: Receiver<SchedulerCommand>,
        running: Arc<AtomicBool>,
        stats: Arc<Mutex<TickStats>>,
    ) {
        while running.load(Ordering::Acquire) {
            let tick_start = Instant::now();

            while let Ok(command) = commands.try_recv() {
                timeline.apply(command);
            }

            timeline.run_pass(&running);

            let elapsed = tick_start.elapsed();
            let budget = timeline.config().tick_duration();
            let overrun = elapsed > budget;
            {
                let mut stats = stats.lock();
                stats.record(elapsed);
                if overrun {
                    stats.record_overrun();
                }
            }

            // Overruns are telemetry only; the event channel carries ship events
            if overrun {
                log::debug!(
                    "World {} physics tick took {:?}, budget {:?}",
                    timeline.world(),
                    elapsed,
                    budget
                );
                continue;
            }

            // Sleep out the rest of the tick, picking up commands as they arrive
            let deadline = tick_start + budget;
            while running.load(Ordering::Acquire) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                match commands.recv_timeout(deadline - now) {
                    Ok(command) => timeline.apply(command),
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        }
        log::debug!("Physics thread for world {} exiting", timeline.world());
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.thread.is_some()
    }

    pub fn add_ship(&self, ship: Arc<ShipHandle>) -> ShipResult<()> {
        self.send(SchedulerCommand::AddShip(ship))
    }

    pub fn remove_ship(&self, id: ShipId) -> ShipResult<()> {
        self.send(SchedulerCommand::RemoveShip(id))
    }

    pub fn reconfigure(&self, config: Arc<PhysicsConfig>) -> ShipResult<()> {
        self.send(SchedulerCommand::Reconfigure(config))
    }

    fn send(&self, command: SchedulerCommand) -> ShipResult<()> {
        if !self.is_running() {
            return Err(ShipError::Scheduler(format!("World {} scheduler is stopped", self.world)));
        }
        self.commands
            .send(command)
            .map_err(|_| ShipError::Scheduler(format!("World {} scheduler thread has exited", self.world)))
    }

    pub fn average_tick_duration(&self) -> Option<Duration> {
        self.stats.lock().average()
    }

    pub fn ticks_per_second(&self) -> Option<f64> {
        self.stats.lock().ticks_per_second()
    }

    pub fn tick_count(&self) -> u64 {
        self.stats.lock().ticks()
    }

    /// Passes that ran longer than one tick
    pub fn overrun_count(&self) -> u64 {
        self.stats.lock().overruns()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Physics thread for world {} panicked", self.world);
            }
            log::info!("Stopped physics scheduler for world {}", self.world);
        }
    }
}

impl Drop for PhysicsScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
