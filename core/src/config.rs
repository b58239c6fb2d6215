use serde::{Deserialize, Serialize};

use crate::prelude::{SimError, SimResult};

/// Electron rest mass in MeV.
pub const ELECTRON_MASS_MEV: f64 = 0.511;
/// Mean energy to create one electron-ion pair in liquid argon, in MeV.
pub const ARGON_IONISATION_ENERGY_MEV: f64 = 23.6e-6;

/// How the random generator is seeded for a batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Every event gets a generator seeded from `seed + event_id`, so results
    /// do not depend on how events are distributed over workers.
    #[default]
    PerEvent,
    /// One generator per worker seeded from `seed + worker_id`, advanced across events.
    PerRun,
}

/// Conversion of a fractional surviving-electron count into a sample count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRounding {
    #[default]
    Floor,
    Round,
}

impl SampleRounding {
    pub fn apply(self, expected: f64) -> usize {
        if !expected.is_finite() || expected <= 0.0 {
            return 0;
        }
        match self {
            SampleRounding::Floor => expected.floor() as usize,
            SampleRounding::Round => expected.round() as usize,
        }
    }
}

/// Named on/off switches for each physics effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectToggles {
    /// Exponential attenuation of drifting electrons.
    pub lifetime: bool,
    /// Gaussian spread along the time axis.
    pub time_diffusion: bool,
    /// Gaussian spread along the wire axis.
    pub wire_diffusion: bool,
    /// Additive Gaussian noise on every image cell.
    pub electronic_noise: bool,
    /// Master switch for background decays; individual isotopes can also be disabled.
    pub radioactivity: bool,
}

impl Default for EffectToggles {
    fn default() -> Self {
        Self {
            lifetime: true,
            time_diffusion: true,
            wire_diffusion: true,
            electronic_noise: true,
            radioactivity: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// x position of the anode plane, mm.
    pub anode_distance_mm: f64,
    pub velocity_mm_per_us: f64,
    pub lifetime_us: f64,
    /// Drives the time-axis spread.
    pub transverse_diffusion_coef: f64,
    /// Drives the wire-axis spread.
    pub longitudinal_diffusion_coef: f64,
    pub rounding: SampleRounding,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            anode_distance_mm: 10.0,
            velocity_mm_per_us: 1.6,
            lifetime_us: 50.0,
            transverse_diffusion_coef: 7.4e-4,
            longitudinal_diffusion_coef: 24e-4,
            rounding: SampleRounding::Floor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsotopeConfig {
    pub name: String,
    /// Beta endpoint energy, MeV.
    pub q_value_mev: f64,
    /// Decays per module volume per ms.
    pub activity_per_ms: f64,
    pub enabled: bool,
}

impl IsotopeConfig {
    pub fn argon39() -> Self {
        Self {
            name: String::from("Ar39"),
            q_value_mev: 0.6,
            activity_per_ms: 10_000.0,
            enabled: true,
        }
    }

    pub fn potassium42() -> Self {
        Self {
            name: String::from("K42"),
            q_value_mev: 3.5,
            activity_per_ms: 1.0,
            enabled: true,
        }
    }
}

impl Default for IsotopeConfig {
    fn default() -> Self {
        Self::argon39()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioactivityConfig {
    /// Reference volume the activities are quoted for, mm^3.
    pub module_volume_mm3: f64,
    /// Sample volume as a multiple of the primary bounding-box volume.
    pub volume_scale: f64,
    /// Full width of the decay-time window centred on the trigger, µs.
    pub time_window_us: f64,
    /// Intervals of the tabulated spectrum CDF.
    pub spectrum_resolution: usize,
    pub isotopes: Vec<IsotopeConfig>,
}

impl Default for RadioactivityConfig {
    fn default() -> Self {
        Self {
            module_volume_mm3: 7e12,
            volume_scale: 2.0,
            time_window_us: 1000.0,
            spectrum_resolution: 2048,
            isotopes: vec![IsotopeConfig::argon39(), IsotopeConfig::potassium42()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmearingConfig {
    pub enabled: bool,
    pub step_size_cm: f64,
}

impl SmearingConfig {
    pub fn step_size_mm(&self) -> f64 {
        self.step_size_cm * 10.0
    }
}

impl Default for SmearingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_size_cm: 0.05,
        }
    }
}

/// Piecewise-linear hit count to ADC calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcCalibration {
    pub max_hits: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for AdcCalibration {
    fn default() -> Self {
        Self {
            max_hits: 4500.0,
            floor: 500.0,
            ceiling: 4091.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagingConfig {
    pub wire_bins: usize,
    pub time_min_us: f64,
    pub time_max_us: f64,
    pub time_bin_us: f64,
    pub adc: AdcCalibration,
    /// Electronics response blur along time, in bins. Zero disables the blur.
    pub response_sigma_bins: f64,
    /// Kernel half-width in units of sigma.
    pub response_truncate: f64,
    pub noise_std_adc: f64,
}

impl ImagingConfig {
    pub fn time_bins(&self) -> usize {
        ((self.time_max_us - self.time_min_us) / self.time_bin_us).ceil() as usize
    }
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            wire_bins: 960,
            time_min_us: -500.0,
            time_max_us: 500.0,
            time_bin_us: 2.0,
            adc: AdcCalibration::default(),
            response_sigma_bins: 2.0,
            response_truncate: 10.0,
            noise_std_adc: 5.0,
        }
    }
}

/// Immutable parameter bundle for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub seed_policy: SeedPolicy,
    pub ionisation_energy_mev: f64,
    pub effects: EffectToggles,
    pub drift: DriftConfig,
    pub radioactivity: RadioactivityConfig,
    pub smearing: SmearingConfig,
    pub imaging: ImagingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 3,
            seed_policy: SeedPolicy::PerEvent,
            ionisation_energy_mev: ARGON_IONISATION_ENERGY_MEV,
            effects: EffectToggles::default(),
            drift: DriftConfig::default(),
            radioactivity: RadioactivityConfig::default(),
            smearing: SmearingConfig::default(),
            imaging: ImagingConfig::default(),
        }
    }
}

fn require_positive(name: &str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::Configuration(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn require_non_negative(name: &str, value: f64) -> SimResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::Configuration(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

impl SimulationConfig {
    /// Check every physical parameter. Q-values are only checked for enabled
    /// isotopes; their normalization is checked when the spectrum samplers are
    /// built.
    pub fn validate(&self) -> SimResult<()> {
        require_positive("ionisation_energy_mev", self.ionisation_energy_mev)?;

        let drift = &self.drift;
        if !drift.anode_distance_mm.is_finite() {
            return Err(SimError::Configuration(
                "anode_distance_mm must be finite".into(),
            ));
        }
        require_positive("drift.velocity_mm_per_us", drift.velocity_mm_per_us)?;
        require_positive("drift.lifetime_us", drift.lifetime_us)?;
        require_non_negative(
            "drift.transverse_diffusion_coef",
            drift.transverse_diffusion_coef,
        )?;
        require_non_negative(
            "drift.longitudinal_diffusion_coef",
            drift.longitudinal_diffusion_coef,
        )?;

        let radio = &self.radioactivity;
        require_positive("radioactivity.module_volume_mm3", radio.module_volume_mm3)?;
        require_non_negative("radioactivity.volume_scale", radio.volume_scale)?;
        require_non_negative("radioactivity.time_window_us", radio.time_window_us)?;
        if radio.spectrum_resolution < 2 {
            return Err(SimError::Configuration(
                "radioactivity.spectrum_resolution must be at least 2".into(),
            ));
        }
        for isotope in &radio.isotopes {
            if isotope.enabled {
                require_positive(
                    &format!("isotope {} q_value_mev", isotope.name),
                    isotope.q_value_mev,
                )?;
            }
            require_non_negative(
                &format!("isotope {} activity_per_ms", isotope.name),
                isotope.activity_per_ms,
            )?;
        }

        require_positive("smearing.step_size_cm", self.smearing.step_size_cm)?;

        let imaging = &self.imaging;
        if imaging.wire_bins == 0 {
            return Err(SimError::Configuration(
                "imaging.wire_bins must be at least 1".into(),
            ));
        }
        require_positive("imaging.time_bin_us", imaging.time_bin_us)?;
        if !(imaging.time_min_us.is_finite()
            && imaging.time_max_us.is_finite()
            && imaging.time_max_us > imaging.time_min_us)
        {
            return Err(SimError::Configuration(format!(
                "imaging time range [{}, {}) is empty",
                imaging.time_min_us, imaging.time_max_us
            )));
        }
        require_positive("imaging.adc.max_hits", imaging.adc.max_hits)?;
        if !(imaging.adc.ceiling.is_finite()
            && imaging.adc.floor.is_finite()
            && imaging.adc.ceiling >= imaging.adc.floor)
        {
            return Err(SimError::Configuration(
                "imaging.adc ceiling must not be below floor".into(),
            ));
        }
        require_non_negative("imaging.response_sigma_bins", imaging.response_sigma_bins)?;
        require_positive("imaging.response_truncate", imaging.response_truncate)?;
        require_non_negative("imaging.noise_std_adc", imaging.noise_std_adc)?;

        Ok(())
    }

    /// Number of ionization electrons for an energy in MeV.
    pub fn electrons_for(&self, energy_mev: f64) -> f64 {
        energy_mev / self.ionisation_energy_mev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.imaging.time_bins(), 500);
        assert_eq!(config.radioactivity.isotopes.len(), 2);
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let mut config = SimulationConfig::default();
        config.drift.lifetime_us = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn negative_activity_is_rejected() {
        let mut config = SimulationConfig::default();
        config.radioactivity.isotopes[1].activity_per_ms = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoint_is_checked_only_for_enabled_isotopes() {
        let mut config = SimulationConfig::default();
        config.radioactivity.isotopes[1].q_value_mev = 0.0;
        assert!(config.validate().is_err());
        config.radioactivity.isotopes[1].enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"seed": 11, "drift": {"lifetime_us": 20.0}}"#).unwrap();
        assert_eq!(config.seed, 11);
        assert_eq!(config.drift.lifetime_us, 20.0);
        assert_eq!(config.drift.velocity_mm_per_us, 1.6);
        assert!(config.effects.radioactivity);
    }

    #[test]
    fn rounding_rules_differ_on_fractions() {
        assert_eq!(SampleRounding::Floor.apply(2.87), 2);
        assert_eq!(SampleRounding::Round.apply(2.87), 3);
        assert_eq!(SampleRounding::Floor.apply(-1.0), 0);
        assert_eq!(SampleRounding::Round.apply(f64::NAN), 0);
    }
}
