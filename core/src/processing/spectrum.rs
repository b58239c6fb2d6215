//! Beta-decay kinetic energy sampling.
//!
//! The spectral shape is the allowed Fermi shape without the Fermi-function
//! correction,
//!
//! ```text
//! N(E) ∝ sqrt(E² + 2·E·mₑ) · (Q − E)² · (E + mₑ)
//! ```
//!
//! which differs between isotopes only through the endpoint `Q`.

use rand::{Rng, RngCore};

use crate::config::{IsotopeConfig, ELECTRON_MASS_MEV};
use crate::math::integrate::adaptive_simpson;
use crate::math::interp::InverseCdf;
use crate::prelude::{SimError, SimResult};

const NORMALIZATION_TOLERANCE: f64 = 1e-9;
const NORMALIZATION_MAX_DEPTH: u32 = 50;

/// Unnormalized beta spectrum at `energy` for endpoint `q_value`, both in MeV.
/// Zero outside `[0, q_value]`.
pub fn beta_spectrum_shape(energy: f64, q_value: f64) -> f64 {
    if !(0.0..=q_value).contains(&energy) {
        return 0.0;
    }
    let momentum = (energy * energy + 2.0 * energy * ELECTRON_MASS_MEV).sqrt();
    let remaining = q_value - energy;
    momentum * remaining * remaining * (energy + ELECTRON_MASS_MEV)
}

/// Draws kinetic energies from a normalized beta spectrum by inverse CDF.
#[derive(Debug, Clone)]
pub struct SpectrumSampler {
    q_value: f64,
    normalization: f64,
    table: InverseCdf,
}

impl SpectrumSampler {
    /// Normalize the spectrum for `q_value` and tabulate its CDF with
    /// `resolution` intervals.
    pub fn new(q_value: f64, resolution: usize) -> SimResult<Self> {
        if !(q_value.is_finite() && q_value > 0.0) {
            return Err(SimError::Configuration(format!(
                "beta spectrum needs a positive finite Q-value, got {q_value}"
            )));
        }

        let normalization = adaptive_simpson(
            |e| beta_spectrum_shape(e, q_value),
            0.0,
            q_value,
            NORMALIZATION_TOLERANCE,
            NORMALIZATION_MAX_DEPTH,
        )
        .filter(|n| *n > 0.0)
        .ok_or_else(|| {
            SimError::Configuration(format!(
                "beta spectrum normalization did not converge for Q = {q_value} MeV"
            ))
        })?;

        let table = InverseCdf::from_density(
            |e| beta_spectrum_shape(e, q_value) / normalization,
            0.0,
            q_value,
            resolution,
        )
        .ok_or_else(|| {
            SimError::Configuration(format!(
                "could not tabulate beta spectrum for Q = {q_value} MeV"
            ))
        })?;

        Ok(Self {
            q_value,
            normalization,
            table,
        })
    }

    pub fn for_isotope(isotope: &IsotopeConfig, resolution: usize) -> SimResult<Self> {
        Self::new(isotope.q_value_mev, resolution).map_err(|err| match err {
            SimError::Configuration(msg) => {
                SimError::Configuration(format!("isotope {}: {msg}", isotope.name))
            }
            other => other,
        })
    }

    pub fn q_value(&self) -> f64 {
        self.q_value
    }

    /// Normalized probability density at `energy`.
    pub fn density(&self, energy: f64) -> f64 {
        beta_spectrum_shape(energy, self.q_value) / self.normalization
    }

    /// Draw `count` energies in `[0, Q]`, one uniform draw each.
    pub fn sample(&self, count: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        if count == 0 {
            return Vec::new();
        }
        (0..count)
            .map(|_| {
                let u: f64 = rng.gen();
                self.table.invert(u).clamp(0.0, self.q_value)
            })
            .collect()
    }
}
