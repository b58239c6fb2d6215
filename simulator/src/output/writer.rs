use anyhow::Context;
use image::{GrayImage, Luma};
use ndarray::Array2;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tpccore::dataset::{DetectorImage, EventStats};
use tpccore::telemetry::MetricsSnapshot;

/// ADC values mapped to black and white in saved images.
pub const DISPLAY_MIN_ADC: f64 = 450.0;
pub const DISPLAY_MAX_ADC: f64 = 4091.0;

/// Render an ADC grid as 8-bit grayscale, rows as time and columns as wires.
pub fn to_grayscale(adc: &Array2<f64>) -> GrayImage {
    let (rows, cols) = adc.dim();
    let span = DISPLAY_MAX_ADC - DISPLAY_MIN_ADC;
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let value = adc[[y as usize, x as usize]];
        let level = ((value - DISPLAY_MIN_ADC) / span).clamp(0.0, 1.0);
        Luma([(level * 255.0).round() as u8])
    })
}

/// Run summary persisted next to the images of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub seed: u64,
    pub simulated: usize,
    pub skipped: usize,
    pub drifted_samples: usize,
    pub events: Vec<EventStats>,
}

impl RunSummary {
    pub fn new(label: &str, seed: u64, metrics: MetricsSnapshot, mut events: Vec<EventStats>) -> Self {
        events.sort_by_key(|stats| stats.event_id);
        Self {
            label: label.to_string(),
            seed,
            simulated: metrics.simulated,
            skipped: metrics.skipped,
            drifted_samples: metrics.drifted_samples,
            events,
        }
    }
}

/// Writes the images of one dataset into `<root>/<label>/`.
#[derive(Debug, Clone)]
pub struct ImageWriter {
    dir: PathBuf,
}

impl ImageWriter {
    pub fn create(root: &Path, label: &str) -> anyhow::Result<Self> {
        let dir = root.join(label);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, event_id: u64) -> PathBuf {
        self.dir.join(format!("event_{event_id}.png"))
    }

    pub fn write_image(&self, image: &DetectorImage) -> anyhow::Result<PathBuf> {
        let path = self.image_path(image.event_id);
        to_grayscale(&image.adc)
            .save(&path)
            .with_context(|| format!("writing image {}", path.display()))?;
        Ok(path)
    }

    pub fn write_summary(&self, summary: &RunSummary) -> anyhow::Result<PathBuf> {
        let path = self.dir.join("summary.json");
        let json = serde_json::to_string_pretty(summary).context("serializing run summary")?;
        fs::write(&path, json).with_context(|| format!("writing summary {}", path.display()))?;
        Ok(path)
    }
}
