//! CPU tick counter source backed by the scheduler statistics file.

use std::path::PathBuf;

use tracing::trace;

use crate::collector::traits::FileSystem;
use crate::collector::CounterSource;
use crate::error::{MetricError, Result};

use super::parser::{parse_cpu_rows, CpuTimes};

const STAT_FILE: &str = "/proc/stat";

/// Reads the `cpu*` tick rows from `/proc/stat`.
///
/// Row 0 is the aggregate, rows `1..N` are the logical CPUs in kernel order.
#[derive(Debug)]
pub struct CpuStatSource<F> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> CpuStatSource<F> {
    pub fn new(fs: F) -> Self {
        Self::with_path(fs, STAT_FILE)
    }

    /// Reads from an alternate stat file (tests, containers).
    pub fn with_path(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// Number of logical CPUs (per-core rows, excluding the aggregate).
    pub fn logical_cpus(&mut self) -> Result<usize> {
        Ok(self.snapshot()?.len().saturating_sub(1))
    }
}

impl<F: FileSystem> CounterSource for CpuStatSource<F> {
    type Snapshot = Vec<CpuTimes>;

    fn snapshot(&mut self) -> Result<Self::Snapshot> {
        let source = self.path.display().to_string();
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| MetricError::from_read(e, "cpu rows", &source))?;
        let rows = parse_cpu_rows(&content)?;
        if rows.is_empty() {
            return Err(MetricError::NoData(format!("no cpu rows in {}", source)));
        }
        trace!(rows = rows.len(), "cpu stat snapshot");
        Ok(rows)
    }
}
