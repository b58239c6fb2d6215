use std::f64::consts::PI;

use rand::{Rng, RngCore};

use crate::config::SimulationConfig;
use crate::prelude::{
    DecayEvent, DepositOrigin, EnergyDeposit, ProcessingStage, SimError, SimResult,
};
use crate::telemetry::log::LogManager;

/// Straight-line range of a beta electron in liquid argon, mm, from a linear
/// fit of range against kinetic energy (MeV).
pub fn travel_distance_mm(energy_mev: f64) -> f64 {
    (0.685 * energy_mev + 0.156) * 10.0
}

/// Direction from uniformly drawn spherical angles.
///
/// Drawing θ uniformly over-weights the poles; directions are not uniform on
/// the sphere.
pub fn random_direction(rng: &mut dyn RngCore) -> [f64; 3] {
    let theta = rng.gen_range(0.0..PI);
    let phi = rng.gen_range(0.0..2.0 * PI);
    [
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    ]
}

/// Number of equal steps along a track, never fewer than one.
pub fn step_count(distance_mm: f64, step_size_mm: f64) -> usize {
    let steps = (distance_mm / step_size_mm).floor();
    if steps.is_finite() && steps >= 1.0 {
        steps as usize
    } else {
        1
    }
}

/// Splits a beta track into equal energy deposits along a random straight line.
#[derive(Debug, Clone, Copy)]
pub struct BetaTrackSmearer {
    step_size_mm: f64,
    ionisation_energy_mev: f64,
}

impl BetaTrackSmearer {
    pub fn new(step_size_mm: f64, ionisation_energy_mev: f64) -> Self {
        Self {
            step_size_mm,
            ionisation_energy_mev,
        }
    }

    pub fn smear(&self, decay: &DecayEvent, rng: &mut dyn RngCore) -> Vec<EnergyDeposit> {
        let distance = travel_distance_mm(decay.kinetic_energy);
        let direction = random_direction(rng);
        let steps = step_count(distance, self.step_size_mm);
        let electrons = decay.kinetic_energy / steps as f64 / self.ionisation_energy_mev;

        (0..steps)
            .map(|j| {
                let along = self.step_size_mm * j as f64;
                EnergyDeposit {
                    x: decay.origin[0] + direction[0] * along,
                    y: decay.origin[1] + direction[1] * along,
                    z: decay.origin[2] + direction[2] * along,
                    t: decay.decay_time,
                    electrons,
                    origin: DepositOrigin::Background(decay.isotope_id),
                }
            })
            .collect()
    }

    /// The whole decay energy as one deposit at the decay point.
    pub fn point_deposit(&self, decay: &DecayEvent) -> EnergyDeposit {
        EnergyDeposit {
            x: decay.origin[0],
            y: decay.origin[1],
            z: decay.origin[2],
            t: decay.decay_time,
            electrons: decay.kinetic_energy / self.ionisation_energy_mev,
            origin: DepositOrigin::Background(decay.isotope_id),
        }
    }
}

/// Expands decays into energy deposits, smeared along the track when enabled.
pub struct SmearingStage {
    smearer: Option<BetaTrackSmearer>,
    enabled: bool,
    logger: LogManager,
}

impl SmearingStage {
    pub fn new() -> Self {
        Self {
            smearer: None,
            enabled: true,
            logger: LogManager::new("smearing"),
        }
    }
}

impl Default for SmearingStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SmearingStage {
    type Input = Vec<DecayEvent>;
    type Output = Vec<EnergyDeposit>;

    fn initialize(&mut self, config: &SimulationConfig) -> SimResult<()> {
        self.smearer = Some(BetaTrackSmearer::new(
            config.smearing.step_size_mm(),
            config.ionisation_energy_mev,
        ));
        self.enabled = config.smearing.enabled;
        Ok(())
    }

    fn execute(&mut self, input: Self::Input, rng: &mut dyn RngCore) -> SimResult<Self::Output> {
        let smearer = self
            .smearer
            .as_ref()
            .ok_or_else(|| SimError::Internal("stage not initialized".into()))?;

        let deposits: Vec<EnergyDeposit> = if self.enabled {
            input
                .iter()
                .flat_map(|decay| smearer.smear(decay, rng))
                .collect()
        } else {
            input
                .iter()
                .map(|decay| smearer.point_deposit(decay))
                .collect()
        };

        self.logger.detail(&format!(
            "{} decays -> {} deposits",
            input.len(),
            deposits.len()
        ));
        Ok(deposits)
    }

    fn cleanup(&mut self) {
        self.smearer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ARGON_IONISATION_ENERGY_MEV;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn decay(energy: f64) -> DecayEvent {
        DecayEvent {
            origin: [10.0, 20.0, 30.0],
            decay_time: -120.0,
            kinetic_energy: energy,
            isotope_id: 1,
        }
    }

    #[test]
    fn range_fit_in_millimetres() {
        assert!((travel_distance_mm(1.0) - 8.41).abs() < 1e-12);
        assert!((travel_distance_mm(0.0) - 1.56).abs() < 1e-12);
    }

    #[test]
    fn step_count_never_zero() {
        assert_eq!(step_count(8.41, 0.5), 16);
        assert_eq!(step_count(1.56, 5.0), 1);
        assert_eq!(step_count(1.56, 0.0), 1);
    }

    #[test]
    fn energy_is_conserved_across_steps() {
        let smearer = BetaTrackSmearer::new(0.5, ARGON_IONISATION_ENERGY_MEV);
        let mut rng = StdRng::seed_from_u64(4);
        for energy in [0.05, 0.6, 2.3] {
            let deposits = smearer.smear(&decay(energy), &mut rng);
            let total: f64 = deposits.iter().map(|d| d.electrons).sum();
            let per_step = energy / deposits.len() as f64;
            assert!((total * ARGON_IONISATION_ENERGY_MEV - energy).abs() <= per_step);
        }
    }

    #[test]
    fn deposits_walk_along_a_unit_direction() {
        let smearer = BetaTrackSmearer::new(0.5, ARGON_IONISATION_ENERGY_MEV);
        let mut rng = StdRng::seed_from_u64(8);
        let deposits = smearer.smear(&decay(1.0), &mut rng);
        assert_eq!(deposits.len(), 16);
        assert_eq!(deposits[0].position(), [10.0, 20.0, 30.0]);
        for pair in deposits.windows(2) {
            let d: f64 = (0..3)
                .map(|a| (pair[1].position()[a] - pair[0].position()[a]).powi(2))
                .sum::<f64>()
                .sqrt();
            assert!((d - 0.5).abs() < 1e-9);
        }
        assert!(deposits.iter().all(|d| d.t == -120.0));
        assert!(deposits
            .iter()
            .all(|d| d.origin == DepositOrigin::Background(1)));
    }

    #[test]
    fn disabled_smearing_emits_point_deposits() {
        let mut config = SimulationConfig::default();
        config.smearing.enabled = false;
        let mut stage = SmearingStage::new();
        stage.initialize(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let deposits = stage
            .execute(vec![decay(0.236), decay(1.0)], &mut rng)
            .unwrap();
        assert_eq!(deposits.len(), 2);
        assert!((deposits[0].electrons - 10_000.0).abs() < 1e-6);
        assert_eq!(deposits[0].position(), [10.0, 20.0, 30.0]);
    }
}
