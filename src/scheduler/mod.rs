//! Physics scheduling
//!
//! Each loaded world owns one `PhysicsScheduler` thread that steps its ships
//! at a fixed rate, independent of the host's game tick. The host talks to a
//! world through `ShipWorld`; physics results cross back as `PhysicsEvent`s
//! drained on the host's game tick.

pub mod events;
pub mod hooks;
pub mod physics_scheduler;
pub mod ship_world;
pub mod tick_stats;
pub mod timeline;
pub mod worlds;

pub use events::{PhysicsEvent, RemovalReason};
pub use hooks::{HostHooks, NoHooks};
pub use physics_scheduler::PhysicsScheduler;
pub use ship_world::ShipWorld;
pub use tick_stats::TickStats;
pub use timeline::{PassReport, SchedulerCommand, WorldTimeline};
pub use worlds::PhysicsWorlds;
