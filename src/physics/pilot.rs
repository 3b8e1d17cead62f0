use glam::DVec3;
use parking_lot::Mutex;

/// Force and torque requested by a pilot or controller, per second, global frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInput {
    pub force: DVec3,
    pub torque: DVec3,
}

impl ControlInput {
    pub const NONE: ControlInput = ControlInput {
        force: DVec3::ZERO,
        torque: DVec3::ZERO,
    };

    pub fn new(force: DVec3, torque: DVec3) -> Self {
        Self { force, torque }
    }

    pub fn is_finite(&self) -> bool {
        self.force.is_finite() && self.torque.is_finite()
    }
}

/// Source of pilot input, polled once per substep on the physics thread
pub trait PilotInput: Send + Sync {
    fn control(&self) -> ControlInput;
}

/// Pilot input written by the host and read by the physics thread
///
/// The last value set stays in effect until replaced or cleared.
#[derive(Debug, Default)]
pub struct LatchedPilotInput {
    latest: Mutex<ControlInput>,
}

impl LatchedPilotInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, input: ControlInput) {
        *self.latest.lock() = input;
    }

    pub fn clear(&self) {
        self.set(ControlInput::NONE);
    }
}

impl PilotInput for LatchedPilotInput {
    fn control(&self) -> ControlInput {
        *self.latest.lock()
    }
}
