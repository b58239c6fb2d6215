//! Charge transport and image formation for a liquid-argon TPC.
//!
//! Ionization deposits from an event generator are drifted onto the anode
//! plane, attenuated and diffused, joined by radioactive background decays,
//! and binned into a calibrated wire-versus-time ADC image.

pub mod config;
pub mod dataset;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use config::SimulationConfig;
pub use dataset::{DepositTable, DetectorImage};
pub use prelude::{ProcessingStage, SimError, SimResult};
pub use processing::Pipeline;
