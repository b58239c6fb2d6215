use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::math::stats::StatsHelper;

/// Per-event bookkeeping collected along the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStats {
    pub event_id: u64,
    pub primary_deposits: usize,
    /// Indexed like the configured isotope list.
    pub decays_per_isotope: Vec<usize>,
    pub background_deposits: usize,
    pub drifted_samples: usize,
    pub samples_binned: usize,
    pub samples_out_of_window: usize,
    pub mean_adc: f64,
    pub peak_adc: f64,
}

/// Simulated readout of one event: ADC codes indexed by (time bin, wire).
#[derive(Debug, Clone)]
pub struct DetectorImage {
    pub event_id: u64,
    pub adc: Array2<f64>,
    pub stats: EventStats,
}

impl DetectorImage {
    /// Wrap an ADC grid, filling the image-level fields of `stats`.
    pub fn new(event_id: u64, adc: Array2<f64>, mut stats: EventStats) -> Self {
        stats.event_id = event_id;
        stats.mean_adc = adc.mean().unwrap_or(0.0);
        stats.peak_adc = StatsHelper::min_max(adc.iter().copied()).map_or(0.0, |(_, hi)| hi);
        Self {
            event_id,
            adc,
            stats,
        }
    }

    pub fn time_bins(&self) -> usize {
        self.adc.nrows()
    }

    pub fn wire_bins(&self) -> usize {
        self.adc.ncols()
    }

    /// Peak ADC on every wire.
    pub fn wire_peaks(&self) -> Vec<f64> {
        self.adc
            .columns()
            .into_iter()
            .map(|column| column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn image_fills_summary_fields() {
        let image = DetectorImage::new(
            4,
            array![[500.0, 700.0], [500.0, 1000.0]],
            EventStats::default(),
        );
        assert_eq!(image.stats.event_id, 4);
        assert_eq!(image.stats.mean_adc, 675.0);
        assert_eq!(image.stats.peak_adc, 1000.0);
        assert_eq!((image.time_bins(), image.wire_bins()), (2, 2));
        assert_eq!(image.wire_peaks(), vec![500.0, 1000.0]);
    }
}
