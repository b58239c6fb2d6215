use ndarray::Array2;
use rand::RngCore;
use rand_distr::{Distribution, Normal};

use crate::config::{AdcCalibration, ImagingConfig, SimulationConfig};
use crate::math::filter::gaussian_blur_rows;
use crate::math::interp::RangeMap;
use crate::math::stats::StatsHelper;
use crate::prelude::{DriftedSample, ProcessingStage, SimError, SimResult};
use crate::telemetry::log::LogManager;

/// Binning of (arrival time, normalized wire coordinate) into image cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    pub wire_bins: usize,
    pub time_bins: usize,
    pub time_min: f64,
    pub time_max: f64,
    pub time_bin: f64,
}

impl ImageGeometry {
    pub fn from_config(config: &ImagingConfig) -> Self {
        Self {
            wire_bins: config.wire_bins,
            time_bins: config.time_bins(),
            time_min: config.time_min_us,
            time_max: config.time_max_us,
            time_bin: config.time_bin_us,
        }
    }

    /// (rows, columns) = (time bins, wire bins).
    pub fn shape(&self) -> (usize, usize) {
        (self.time_bins, self.wire_bins)
    }

    /// Row for an arrival time, `None` outside `[time_min, time_max)`.
    pub fn time_row(&self, time: f64) -> Option<usize> {
        if !(time >= self.time_min && time < self.time_max) {
            return None;
        }
        let row = ((time - self.time_min) / self.time_bin) as usize;
        Some(row.min(self.time_bins - 1))
    }

    /// Column for a normalized wire coordinate; 1.0 falls in the last column.
    pub fn wire_column(&self, wire: f64) -> Option<usize> {
        if !(0.0..=1.0).contains(&wire) {
            return None;
        }
        let column = (wire * self.wire_bins as f64) as usize;
        Some(column.min(self.wire_bins - 1))
    }
}

/// Output of image formation before it is wrapped into a `DetectorImage`.
#[derive(Debug, Clone)]
pub struct FormedImage {
    pub adc: Array2<f64>,
    pub samples_binned: usize,
    pub samples_out_of_window: usize,
}

/// Shift wire coordinates so the smallest is zero, then rescale onto `[0, 1]`.
/// When every sample shares one coordinate they all map to zero.
pub fn normalize_wire_coordinates(samples: &mut [DriftedSample]) {
    let Some((min, max)) = StatsHelper::min_max(
        samples
            .iter()
            .map(|s| s.wire_coordinate)
            .filter(|w| w.is_finite()),
    ) else {
        return;
    };
    let map = RangeMap::new((0.0, max - min), (0.0, 1.0));
    for sample in samples.iter_mut() {
        sample.wire_coordinate = map.apply(sample.wire_coordinate - min);
    }
}

/// Count samples per cell. Returns the counts and the number of samples that
/// fell outside the image.
pub fn histogram(samples: &[DriftedSample], geometry: &ImageGeometry) -> (Array2<f64>, usize) {
    let mut counts = Array2::<f64>::zeros(geometry.shape());
    let mut outside = 0;
    for sample in samples {
        match (
            geometry.time_row(sample.arrival_time),
            geometry.wire_column(sample.wire_coordinate),
        ) {
            (Some(row), Some(column)) => counts[[row, column]] += 1.0,
            _ => outside += 1,
        }
    }
    (counts, outside)
}

/// Convert hit counts to ADC codes in place, saturating above the calibrated range.
pub fn apply_adc_calibration(image: &mut Array2<f64>, adc: &AdcCalibration) {
    let map = RangeMap::new((0.0, adc.max_hits), (adc.floor, adc.ceiling));
    image.mapv_inplace(|hits| map.apply_saturating(hits));
}

/// Add zero-mean Gaussian noise to every cell, in row-major order.
pub fn add_electronic_noise(
    image: &mut Array2<f64>,
    std_dev: f64,
    rng: &mut dyn RngCore,
) -> SimResult<()> {
    if std_dev == 0.0 {
        return Ok(());
    }
    let normal = Normal::new(0.0, std_dev)
        .map_err(|err| SimError::Configuration(format!("electronic noise: {err}")))?;
    for cell in image.iter_mut() {
        *cell += normal.sample(rng);
    }
    Ok(())
}

struct ImagingParams {
    geometry: ImageGeometry,
    adc: AdcCalibration,
    response_sigma: f64,
    response_truncate: f64,
    noise_std: Option<f64>,
}

/// Bins drifted electrons into a calibrated, blurred and noisy detector image.
pub struct ImagingStage {
    params: Option<ImagingParams>,
    logger: LogManager,
}

impl ImagingStage {
    pub fn new() -> Self {
        Self {
            params: None,
            logger: LogManager::new("imaging"),
        }
    }
}

impl Default for ImagingStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for ImagingStage {
    type Input = Vec<DriftedSample>;
    type Output = FormedImage;

    fn initialize(&mut self, config: &SimulationConfig) -> SimResult<()> {
        let imaging = &config.imaging;
        self.params = Some(ImagingParams {
            geometry: ImageGeometry::from_config(imaging),
            adc: imaging.adc.clone(),
            response_sigma: imaging.response_sigma_bins,
            response_truncate: imaging.response_truncate,
            noise_std: config
                .effects
                .electronic_noise
                .then_some(imaging.noise_std_adc),
        });
        Ok(())
    }

    fn execute(&mut self, input: Self::Input, rng: &mut dyn RngCore) -> SimResult<Self::Output> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| SimError::Internal("stage not initialized".into()))?;

        let mut samples = input;
        if samples.is_empty() {
            log::warn!("no drifted electrons reached the anode; image holds the ADC floor");
        }
        normalize_wire_coordinates(&mut samples);
        let (mut image, outside) = histogram(&samples, &params.geometry);

        apply_adc_calibration(&mut image, &params.adc);
        gaussian_blur_rows(&mut image, params.response_sigma, params.response_truncate);
        if let Some(std_dev) = params.noise_std {
            add_electronic_noise(&mut image, std_dev, rng)?;
        }

        let binned = samples.len() - outside;
        self.logger.detail(&format!(
            "binned {} samples, {} outside the time window",
            binned, outside
        ));
        Ok(FormedImage {
            adc: image,
            samples_binned: binned,
            samples_out_of_window: outside,
        })
    }

    fn cleanup(&mut self) {
        self.params = None;
    }
}
