use anyhow::ensure;
use serde::{Deserialize, Serialize};
use tpccore::config::SimulationConfig;

/// Independent variable of a dataset sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepVariable {
    /// Electron lifetime in µs.
    Lifetime,
    /// Standard deviation of the electronic noise in ADC counts.
    ElectronicNoise,
    /// Multiplier on every isotope activity.
    RadioactivityScale,
}

impl SweepVariable {
    pub fn label(self) -> &'static str {
        match self {
            SweepVariable::Lifetime => "lifetime",
            SweepVariable::ElectronicNoise => "noise",
            SweepVariable::RadioactivityScale => "radioactivity",
        }
    }

    fn apply(self, config: &mut SimulationConfig, value: f64) {
        match self {
            SweepVariable::Lifetime => config.drift.lifetime_us = value,
            SweepVariable::ElectronicNoise => config.imaging.noise_std_adc = value,
            SweepVariable::RadioactivityScale => {
                for isotope in &mut config.radioactivity.isotopes {
                    isotope.activity_per_ms *= value;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub variable: SweepVariable,
    pub values: Vec<f64>,
}

/// One dataset of a run: its directory label and the configuration used.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    pub label: String,
    pub config: SimulationConfig,
}

/// Expand a base configuration into the datasets to simulate. Without a
/// sweep the single dataset is named after the configured lifetime.
pub fn expand(
    base: &SimulationConfig,
    sweep: Option<&SweepConfig>,
) -> anyhow::Result<Vec<SweepPoint>> {
    let Some(sweep) = sweep else {
        return Ok(vec![SweepPoint {
            label: format!("lifetime_{}", base.drift.lifetime_us),
            config: base.clone(),
        }]);
    };
    ensure!(
        !sweep.values.is_empty(),
        "sweep over {} has no values",
        sweep.variable.label()
    );

    sweep
        .values
        .iter()
        .map(|&value| {
            let mut config = base.clone();
            sweep.variable.apply(&mut config, value);
            config.validate().map_err(|err| {
                anyhow::anyhow!("{} = {}: {}", sweep.variable.label(), value, err)
            })?;
            Ok(SweepPoint {
                label: format!("{}_{}", sweep.variable.label(), value),
                config,
            })
        })
        .collect()
}
