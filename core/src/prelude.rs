use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;

/// Where a deposit came from. Used for bookkeeping only; transport treats both alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositOrigin {
    Primary,
    /// Index into the configured isotope list.
    Background(usize),
}

/// A point-like bunch of ionization electrons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyDeposit {
    /// Position in mm.
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Creation time offset in µs relative to the event trigger.
    pub t: f64,
    pub electrons: f64,
    pub origin: DepositOrigin,
}

impl EnergyDeposit {
    pub fn primary(x: f64, y: f64, z: f64, electrons: f64) -> Self {
        Self {
            x,
            y,
            z,
            t: 0.0,
            electrons,
            origin: DepositOrigin::Primary,
        }
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// A single sampled radioactive decay inside the event volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayEvent {
    pub origin: [f64; 3],
    /// µs relative to the event trigger.
    pub decay_time: f64,
    /// MeV.
    pub kinetic_energy: f64,
    pub isotope_id: usize,
}

/// Arrival of one drifted electron at the anode plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftedSample {
    pub arrival_time: f64,
    pub wire_coordinate: f64,
}

/// Common error type for the simulation core.
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("event {event_id} not found in deposit table")]
    DataNotFound { event_id: u64 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type SimResult<T> = Result<T, SimError>;

/// Trait describing one physics effect in the event pipeline.
///
/// Stages are initialized once from the run configuration, executed once per
/// event with the event's random generator, and cleaned up when the owning
/// pipeline is finished.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &SimulationConfig) -> SimResult<()>;
    fn execute(&mut self, input: Self::Input, rng: &mut dyn RngCore) -> SimResult<Self::Output>;
    fn cleanup(&mut self);
}
