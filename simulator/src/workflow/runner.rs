use crate::generator::primary::generate_tracks;
use crate::output::writer::{ImageWriter, RunSummary};
use crate::workflow::config::WorkflowConfig;
use crate::workflow::sweep::{self, SweepPoint};
use anyhow::{anyhow, Context};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tpccore::config::SeedPolicy;
use tpccore::dataset::{DepositTable, EventStats};
use tpccore::prelude::SimError;
use tpccore::processing::Pipeline;
use tpccore::telemetry::{MetricsRecorder, MetricsSnapshot};

/// Progress message sent by a worker after each event.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub worker_id: usize,
    pub event_id: u64,
    pub completed: u64,
}

/// Outcome of one dataset of a run.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub label: String,
    pub metrics: MetricsSnapshot,
    pub events: Vec<EventStats>,
}

/// Deal event ids to workers round-robin.
pub fn split_round_robin(event_ids: &[u64], workers: usize) -> Vec<Vec<u64>> {
    let workers = workers.max(1);
    let mut chunks = vec![Vec::new(); workers];
    for (index, &event_id) in event_ids.iter().enumerate() {
        chunks[index % workers].push(event_id);
    }
    chunks
}

fn process_events(
    point: &SweepPoint,
    table: &DepositTable,
    event_ids: &[u64],
    worker_id: usize,
    writer: &ImageWriter,
    metrics: &MetricsRecorder,
    tx: &Sender<WorkerStatus>,
) -> anyhow::Result<Vec<EventStats>> {
    let mut pipeline = Pipeline::new(point.config.clone())
        .with_context(|| format!("initializing pipeline for {}", point.label))?;
    let mut run_rng = pipeline.rng_for_worker(worker_id);
    let policy = pipeline.config().seed_policy;
    let ionisation_energy = pipeline.config().ionisation_energy_mev;
    let mut stats = Vec::with_capacity(event_ids.len());

    for (done, &event_id) in event_ids.iter().enumerate() {
        let primaries = match table.select_event(event_id, ionisation_energy) {
            Ok(primaries) => primaries,
            Err(err @ SimError::DataNotFound { .. }) => {
                log::warn!("worker {worker_id}: {err}; skipping");
                metrics.record_skipped();
                continue;
            }
            Err(err) => return Err(err).context(format!("selecting event {event_id}")),
        };

        let image = match policy {
            SeedPolicy::PerEvent => {
                let mut rng = pipeline.rng_for_event(event_id);
                pipeline.simulate_event(event_id, primaries, &mut rng)
            }
            SeedPolicy::PerRun => pipeline.simulate_event(event_id, primaries, &mut run_rng),
        }
        .with_context(|| format!("simulating event {event_id}"))?;

        writer.write_image(&image)?;
        metrics.record_simulated(image.stats.drifted_samples);
        stats.push(image.stats);

        tx.send(WorkerStatus {
            worker_id,
            event_id,
            completed: (done + 1) as u64,
        })
        .context("reporting worker progress")?;
    }

    pipeline.finish();
    Ok(stats)
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    progress: MultiProgress,
}

impl Runner {
    /// Runner without visible progress bars.
    pub fn new(config: WorkflowConfig) -> Self {
        Self::with_progress(
            config,
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        )
    }

    /// Runner drawing one progress bar per worker into `progress`.
    pub fn with_progress(config: WorkflowConfig, progress: MultiProgress) -> Self {
        Self { config, progress }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Deposit table from the configured input, or synthetic tracks.
    pub fn load_primaries(&self) -> anyhow::Result<DepositTable> {
        match &self.config.input_path {
            Some(path) => {
                let table = DepositTable::read(path)
                    .with_context(|| format!("reading deposit table {}", path.display()))?;
                log::info!("loaded {} deposits from {}", table.len(), path.display());
                Ok(table)
            }
            None => generate_tracks(&self.config.generator),
        }
    }

    fn event_ids(&self, table: &DepositTable) -> Vec<u64> {
        if self.config.events.is_empty() {
            table.event_ids()
        } else {
            self.config.events.clone()
        }
    }

    /// Simulate every selected event for every dataset of the sweep.
    pub fn execute(&self) -> anyhow::Result<Vec<DatasetReport>> {
        let table = self.load_primaries()?;
        let event_ids = self.event_ids(&table);
        let points = sweep::expand(&self.config.simulation, self.config.sweep.as_ref())?;

        points
            .iter()
            .map(|point| self.run_dataset(point, &table, &event_ids))
            .collect()
    }

    fn run_dataset(
        &self,
        point: &SweepPoint,
        table: &DepositTable,
        event_ids: &[u64],
    ) -> anyhow::Result<DatasetReport> {
        let writer = ImageWriter::create(&self.config.output_dir, &point.label)?;
        let metrics = MetricsRecorder::new();
        let chunks = split_round_robin(event_ids, self.config.n_workers);
        log::info!(
            "{}: {} events across {} workers",
            point.label,
            event_ids.len(),
            chunks.len()
        );

        let style = ProgressStyle::with_template(
            "{prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .context("building progress bar style")?
        .progress_chars("=> ");
        let bars: Vec<ProgressBar> = chunks
            .iter()
            .enumerate()
            .map(|(worker_id, chunk)| {
                let bar = self.progress.add(ProgressBar::new(chunk.len() as u64));
                bar.set_style(style.clone());
                bar.set_prefix(format!("{} worker {}", point.label, worker_id));
                bar
            })
            .collect();

        let (tx, rx) = mpsc::channel::<WorkerStatus>();
        let results = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .enumerate()
                .map(|(worker_id, chunk)| {
                    let tx = tx.clone();
                    let writer = &writer;
                    let metrics = &metrics;
                    scope.spawn(move || {
                        process_events(point, table, chunk, worker_id, writer, metrics, &tx)
                    })
                })
                .collect();
            drop(tx);

            for status in rx {
                if let Some(bar) = bars.get(status.worker_id) {
                    bar.set_position(status.completed);
                    bar.set_message(format!("event {}", status.event_id));
                }
            }

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("simulation worker panicked")),
                })
                .collect::<anyhow::Result<Vec<_>>>()
        })?;

        for bar in &bars {
            bar.finish();
        }
        let events: Vec<EventStats> = results.into_iter().flatten().collect();
        let snapshot = metrics.snapshot();
        let summary = RunSummary::new(&point.label, point.config.seed, snapshot, events.clone());
        writer.write_summary(&summary)?;
        log::info!(
            "{}: simulated {}, skipped {}, images in {}",
            point.label,
            snapshot.simulated,
            snapshot.skipped,
            writer.dir().display()
        );

        Ok(DatasetReport {
            label: point.label.clone(),
            metrics: snapshot,
            events: summary.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::primary::PrimaryGeneratorConfig;
    use crate::workflow::sweep::{SweepConfig, SweepVariable};

    fn small_config(output_dir: &std::path::Path) -> WorkflowConfig {
        let mut config = WorkflowConfig {
            output_dir: output_dir.to_path_buf(),
            generator: PrimaryGeneratorConfig {
                events: 3,
                track_length_mm: 20.0,
                dedx_mev_per_mm: 0.01,
                ..Default::default()
            },
            ..Default::default()
        };
        config.simulation.effects.radioactivity = false;
        config
    }

    #[test]
    fn round_robin_deals_events_in_turn() {
        let chunks = split_round_robin(&[0, 1, 2, 3, 4], 2);
        assert_eq!(chunks, vec![vec![0, 2, 4], vec![1, 3]]);
        assert_eq!(split_round_robin(&[7], 0), vec![vec![7]]);
    }

    #[test]
    fn progress_bars_track_each_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.n_workers = 2;
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let runner = Runner::with_progress(config, progress);
        let reports = runner.execute().unwrap();
        assert_eq!(reports[0].metrics.simulated, 3);
    }

    #[test]
    fn runner_writes_images_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new(small_config(dir.path()));
        let reports = runner.execute().unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.label, "lifetime_50");
        assert_eq!(report.metrics.simulated, 3);
        let dataset = dir.path().join("lifetime_50");
        for event_id in 0..3 {
            assert!(dataset.join(format!("event_{event_id}.png")).exists());
        }
        assert!(dataset.join("summary.json").exists());
    }

    #[test]
    fn per_event_seeding_does_not_depend_on_worker_count() {
        let single_dir = tempfile::tempdir().unwrap();
        let single = Runner::new(small_config(single_dir.path()))
            .execute()
            .unwrap();

        let multi_dir = tempfile::tempdir().unwrap();
        let mut config = small_config(multi_dir.path());
        config.n_workers = 2;
        let multi = Runner::new(config).execute().unwrap();

        assert_eq!(single[0].events, multi[0].events);
    }

    #[test]
    fn missing_events_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.events = vec![0, 99];
        let reports = Runner::new(config).execute().unwrap();
        assert_eq!(reports[0].metrics.simulated, 1);
        assert_eq!(reports[0].metrics.skipped, 1);
    }

    #[test]
    fn sweep_produces_one_dataset_per_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = small_config(dir.path());
        config.generator.events = 1;
        config.sweep = Some(SweepConfig {
            variable: SweepVariable::Lifetime,
            values: vec![10.0, 100.0],
        });
        let reports = Runner::new(config).execute().unwrap();
        let labels: Vec<_> = reports.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["lifetime_10", "lifetime_100"]);
        assert!(dir.path().join("lifetime_100").join("event_0.png").exists());
    }
}
