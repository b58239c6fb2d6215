use rand::{Rng, RngCore};
use rand_distr::{Distribution, Poisson};

use crate::config::{IsotopeConfig, SimulationConfig};
use crate::math::geometry::BoundingBox;
use crate::prelude::{DecayEvent, ProcessingStage, SimError, SimResult};
use crate::processing::spectrum::SpectrumSampler;
use crate::telemetry::log::LogManager;

/// Mean number of decays for an isotope in the sampled volume and window.
///
/// `activity_per_ms` is quoted per `module_volume`; the window is in µs.
pub fn expected_decays(
    activity_per_ms: f64,
    sample_volume: f64,
    module_volume: f64,
    window_us: f64,
) -> f64 {
    activity_per_ms * (sample_volume / module_volume) * (window_us / 1000.0)
}

/// Poisson-distributed decay count. A non-positive mean yields zero without
/// touching the generator.
pub fn draw_decay_count(mean: f64, rng: &mut dyn RngCore) -> SimResult<usize> {
    if mean <= 0.0 {
        return Ok(0);
    }
    let poisson = Poisson::new(mean).map_err(|err| {
        SimError::Configuration(format!("invalid decay rate mean {mean}: {err}"))
    })?;
    Ok(poisson.sample(rng) as usize)
}

struct IsotopeSource {
    config: IsotopeConfig,
    /// Only built for isotopes that can decay.
    sampler: Option<SpectrumSampler>,
}

struct BackgroundParams {
    enabled: bool,
    module_volume: f64,
    volume_scale: f64,
    window_us: f64,
    sources: Vec<IsotopeSource>,
}

/// Populates the volume around a primary event with radioactive decays.
pub struct BackgroundStage {
    params: Option<BackgroundParams>,
    logger: LogManager,
}

impl BackgroundStage {
    pub fn new() -> Self {
        Self {
            params: None,
            logger: LogManager::new("background"),
        }
    }

    pub fn isotope_count(&self) -> usize {
        self.params.as_ref().map_or(0, |p| p.sources.len())
    }
}

impl Default for BackgroundStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for BackgroundStage {
    /// Bounding box of the primary deposits, if there are any.
    type Input = Option<BoundingBox>;
    type Output = Vec<DecayEvent>;

    fn initialize(&mut self, config: &SimulationConfig) -> SimResult<()> {
        let radio = &config.radioactivity;
        let sources = radio
            .isotopes
            .iter()
            .map(|isotope| {
                let sampler = if config.effects.radioactivity && isotope.enabled {
                    Some(SpectrumSampler::for_isotope(
                        isotope,
                        radio.spectrum_resolution,
                    )?)
                } else {
                    None
                };
                Ok(IsotopeSource {
                    config: isotope.clone(),
                    sampler,
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        self.params = Some(BackgroundParams {
            enabled: config.effects.radioactivity,
            module_volume: radio.module_volume_mm3,
            volume_scale: radio.volume_scale,
            window_us: radio.time_window_us,
            sources,
        });
        Ok(())
    }

    fn execute(&mut self, input: Self::Input, rng: &mut dyn RngCore) -> SimResult<Self::Output> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| SimError::Internal("stage not initialized".into()))?;

        if !params.enabled {
            return Ok(Vec::new());
        }
        let Some(bbox) = input else {
            log::warn!("no primary deposits to bound the background volume; skipping decays");
            return Ok(Vec::new());
        };

        let sample_volume = params.volume_scale * bbox.volume();
        let counts = params
            .sources
            .iter()
            .map(|source| {
                let mean = if source.config.enabled {
                    expected_decays(
                        source.config.activity_per_ms,
                        sample_volume,
                        params.module_volume,
                        params.window_us,
                    )
                } else {
                    0.0
                };
                let count = draw_decay_count(mean, rng)?;
                self.logger.detail(&format!(
                    "{} mean {:.4} observed {}",
                    source.config.name, mean, count
                ));
                Ok(count)
            })
            .collect::<SimResult<Vec<_>>>()?;

        let half_window = 0.5 * params.window_us;
        let mut decays = Vec::with_capacity(counts.iter().sum());
        for (isotope_id, (source, &count)) in params.sources.iter().zip(&counts).enumerate() {
            if count == 0 {
                continue;
            }
            let sampler = source.sampler.as_ref().ok_or_else(|| {
                SimError::Internal(format!("no spectrum sampler for {}", source.config.name))
            })?;
            let first = decays.len();
            for _ in 0..count {
                let origin = [
                    rng.gen_range(bbox.min[0]..=bbox.max[0]),
                    rng.gen_range(bbox.min[1]..=bbox.max[1]),
                    rng.gen_range(bbox.min[2]..=bbox.max[2]),
                ];
                let decay_time = rng.gen_range(-half_window..=half_window);
                decays.push(DecayEvent {
                    origin,
                    decay_time,
                    kinetic_energy: 0.0,
                    isotope_id,
                });
            }
            let energies = sampler.sample(count, rng);
            for (decay, energy) in decays[first..].iter_mut().zip(energies) {
                decay.kinetic_energy = energy;
            }
        }

        self.logger.record(&format!(
            "sample volume {:.3e} mm^3, decays per isotope {:?}",
            sample_volume, counts
        ));
        Ok(decays)
    }

    fn cleanup(&mut self) {
        self.params = None;
    }
}
