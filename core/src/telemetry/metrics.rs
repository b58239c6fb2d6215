use std::sync::Mutex;

/// Batch counters shared between worker threads.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

struct Metrics {
    simulated: usize,
    skipped: usize,
    drifted_samples: usize,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub simulated: usize,
    pub skipped: usize,
    pub drifted_samples: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics {
                simulated: 0,
                skipped: 0,
                drifted_samples: 0,
            }),
        }
    }

    pub fn record_simulated(&self, drifted_samples: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.simulated += 1;
            metrics.drifted_samples += drifted_samples;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.skipped += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                simulated: metrics.simulated,
                skipped: metrics.skipped,
                drifted_samples: metrics.drifted_samples,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let recorder = MetricsRecorder::new();
        recorder.record_simulated(10);
        recorder.record_simulated(5);
        recorder.record_skipped();
        assert_eq!(
            recorder.snapshot(),
            MetricsSnapshot {
                simulated: 2,
                skipped: 1,
                drifted_samples: 15,
            }
        );
    }
}
