use std::sync::Mutex;

/// Counters for the emission loop, readable from another thread.
pub struct MetricsRecorder {
    inner: Mutex<EmissionMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionMetrics {
    pub emitted: usize,
    pub skipped: usize,
    pub write_failures: usize,
    pub overruns: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(EmissionMetrics::default()),
        }
    }

    pub fn record_emitted(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.emitted += 1;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.skipped += 1;
        }
    }

    pub fn record_write_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.write_failures += 1;
        }
    }

    pub fn record_overrun(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.overruns += 1;
        }
    }

    pub fn snapshot(&self) -> EmissionMetrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
