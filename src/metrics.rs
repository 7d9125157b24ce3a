use std::path::Path;

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::ledger::write_atomic;

/// Installed Prometheus recorder. A one-shot run has no scrape endpoint, so the
/// exposition text is dumped to a file at the end instead.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder and stamp the run start time.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        crate::ingest::ensure_metrics_described();
        gauge!("feed_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the exposition text next to the other published artifacts.
    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.render().as_bytes())
            .with_context(|| format!("writing metrics snapshot to {}", path.display()))
    }
}
