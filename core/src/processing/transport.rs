use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::config::{SampleRounding, SimulationConfig};
use crate::math::geometry::AnodePlane;
use crate::prelude::{DriftedSample, EnergyDeposit, ProcessingStage, SimError, SimResult};
use crate::telemetry::log::LogManager;

/// Exponential loss of drifting electrons to impurities.
pub fn attenuate(electrons: f64, drift_time_us: f64, lifetime_us: f64) -> f64 {
    electrons * (-drift_time_us / lifetime_us).exp()
}

/// Drift, attenuation and diffusion of electron bunches onto the anode plane.
#[derive(Debug, Clone)]
pub struct DriftModel {
    plane: AnodePlane,
    anode_distance: f64,
    velocity: f64,
    /// `None` when attenuation is switched off.
    lifetime: Option<f64>,
    transverse_coef: f64,
    longitudinal_coef: f64,
    time_diffusion: bool,
    wire_diffusion: bool,
    rounding: SampleRounding,
}

impl DriftModel {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let drift = &config.drift;
        Self {
            plane: AnodePlane::at_distance(drift.anode_distance_mm),
            anode_distance: drift.anode_distance_mm,
            velocity: drift.velocity_mm_per_us,
            lifetime: config.effects.lifetime.then_some(drift.lifetime_us),
            transverse_coef: drift.transverse_diffusion_coef,
            longitudinal_coef: drift.longitudinal_diffusion_coef,
            time_diffusion: config.effects.time_diffusion,
            wire_diffusion: config.effects.wire_diffusion,
            rounding: drift.rounding,
        }
    }

    pub fn drift_distance(&self, x: f64) -> f64 {
        (self.anode_distance - x).abs()
    }

    pub fn drift_time(&self, drift_distance: f64) -> f64 {
        drift_distance / self.velocity
    }

    /// Expected electrons reaching the anode.
    pub fn surviving_electrons(&self, electrons: f64, drift_time: f64) -> f64 {
        match self.lifetime {
            Some(lifetime) => attenuate(electrons, drift_time, lifetime),
            None => electrons,
        }
    }

    /// Standard deviations along (time, wire).
    pub fn diffusion_spread(&self, drift_distance: f64, drift_time: f64) -> (f64, f64) {
        let time_std = if self.time_diffusion {
            (2.0 * drift_distance * self.transverse_coef / self.velocity.powi(3)).sqrt()
        } else {
            0.0
        };
        let wire_std = if self.wire_diffusion {
            2.0 * (self.longitudinal_coef * drift_time).sqrt()
        } else {
            0.0
        };
        (time_std, wire_std)
    }

    /// Number of individual electrons drawn for a deposit.
    pub fn sample_count(&self, deposit: &EnergyDeposit) -> usize {
        let drift_time = self.drift_time(self.drift_distance(deposit.x));
        self.rounding
            .apply(self.surviving_electrons(deposit.electrons, drift_time))
    }

    /// Draw one arrival per surviving electron. Each sample consumes a time
    /// draw then a wire draw.
    pub fn transport(&self, deposit: &EnergyDeposit, rng: &mut dyn RngCore) -> Vec<DriftedSample> {
        let drift_distance = self.drift_distance(deposit.x);
        let drift_time = self.drift_time(drift_distance);
        let wire = self.plane.intercept(deposit.position())[1];
        let count = self
            .rounding
            .apply(self.surviving_electrons(deposit.electrons, drift_time));
        let (time_std, wire_std) = self.diffusion_spread(drift_distance, drift_time);
        let mean_time = drift_time + deposit.t;

        (0..count)
            .map(|_| {
                let dt: f64 = rng.sample(StandardNormal);
                let dw: f64 = rng.sample(StandardNormal);
                DriftedSample {
                    arrival_time: mean_time + time_std * dt,
                    wire_coordinate: wire + wire_std * dw,
                }
            })
            .collect()
    }
}

/// Moves every deposit of an event onto the anode plane.
pub struct TransportStage {
    model: Option<DriftModel>,
    logger: LogManager,
}

impl TransportStage {
    pub fn new() -> Self {
        Self {
            model: None,
            logger: LogManager::new("transport"),
        }
    }

    pub fn model(&self) -> Option<&DriftModel> {
        self.model.as_ref()
    }
}

impl Default for TransportStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for TransportStage {
    type Input = Vec<EnergyDeposit>;
    type Output = Vec<DriftedSample>;

    fn initialize(&mut self, config: &SimulationConfig) -> SimResult<()> {
        self.model = Some(DriftModel::from_config(config));
        Ok(())
    }

    fn execute(&mut self, input: Self::Input, rng: &mut dyn RngCore) -> SimResult<Self::Output> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| SimError::Internal("stage not initialized".into()))?;

        let mut samples = Vec::new();
        for deposit in &input {
            if !(deposit.x.is_finite() && deposit.y.is_finite() && deposit.electrons.is_finite())
            {
                return Err(SimError::InvalidInput(format!(
                    "non-finite deposit {deposit:?}"
                )));
            }
            samples.extend(model.transport(deposit, rng));
        }

        self.logger.detail(&format!(
            "{} deposits -> {} drifted electrons",
            input.len(),
            samples.len()
        ));
        Ok(samples)
    }

    fn cleanup(&mut self) {
        self.model = None;
    }
}
