//! CPU load and frequency facades.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::collector::procfs::parser::parse_cpu_mhz;
use crate::collector::procfs::{CpuStatSource, CpuTimes};
use crate::collector::{FileSystem, RealFs};
use crate::error::{MetricError, Result};
use crate::sampler::{delta, RateSampler, Window};
use crate::units::{convert_frequency, round_to, FreqScale};

const CPUINFO_FILE: &str = "/proc/cpuinfo";
const CPUFREQ_DIR: &str = "/sys/devices/system/cpu/cpufreq";

/// Load percentage between two tick snapshots: active delta over total
/// delta. An idle window (zero total delta) is 0.0, not an error.
fn load_between(old: &CpuTimes, new: &CpuTimes, precision: u32) -> f64 {
    let active = delta(new.active(), old.active());
    let total = delta(new.total(), old.total());
    if total == 0 {
        return 0.0;
    }
    round_to(active as f64 / total as f64 * 100.0, precision)
}

/// CPU load measurement over sampled tick windows.
pub struct CpuLoad<F: FileSystem> {
    sampler: RateSampler<CpuStatSource<F>>,
}

impl CpuLoad<RealFs> {
    pub fn new() -> Self {
        Self::with_source(CpuStatSource::new(RealFs::new()))
    }
}

impl Default for CpuLoad<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> CpuLoad<F> {
    pub fn with_source(source: CpuStatSource<F>) -> Self {
        Self {
            sampler: RateSampler::new(source),
        }
    }

    /// Number of logical CPUs.
    pub fn logical_cpus(&mut self) -> Result<usize> {
        self.sampler.source_mut().logical_cpus()
    }

    /// Aggregate load percentage over the sampled window.
    pub fn load_percent(&mut self, interval: Duration, precision: u32) -> Result<f64> {
        let w = self.sampler.sample(interval)?;
        Ok(load_between(&w.old[0], &w.new[0], precision))
    }

    /// Per-core load percentages over one shared sampled window.
    pub fn load_percent_per_core(
        &mut self,
        interval: Duration,
        precision: u32,
    ) -> Result<Vec<f64>> {
        let w = self.sampler.sample(interval)?;
        per_core_loads(&w, precision)
    }
}

fn per_core_loads(w: &Window<Vec<CpuTimes>>, precision: u32) -> Result<Vec<f64>> {
    let loads: Vec<f64> = w.old[1..]
        .iter()
        .zip(&w.new[1..])
        .map(|(old, new)| load_between(old, new, precision))
        .collect();
    if loads.is_empty() {
        return Err(MetricError::NoData("no per-core cpu rows".into()));
    }
    Ok(loads)
}

/// CPU frequency readings: current per-core MHz from the cpuinfo file, the
/// hardware maximum from the cpufreq policy directories.
pub struct CpuFreq<F> {
    fs: F,
    cpuinfo: PathBuf,
    cpufreq_dir: PathBuf,
    /// Hardware maximum in MHz, populated on first use.
    max_mhz: Option<f64>,
}

impl CpuFreq<RealFs> {
    pub fn new() -> Self {
        Self::with_fs(RealFs::new())
    }
}

impl Default for CpuFreq<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> CpuFreq<F> {
    pub fn with_fs(fs: F) -> Self {
        Self::with_paths(fs, CPUINFO_FILE, CPUFREQ_DIR)
    }

    /// Reads from alternate paths (tests, containers).
    pub fn with_paths(fs: F, cpuinfo: impl Into<PathBuf>, cpufreq_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            cpuinfo: cpuinfo.into(),
            cpufreq_dir: cpufreq_dir.into(),
            max_mhz: None,
        }
    }

    fn current_mhz(&self) -> Result<Vec<f64>> {
        let source = self.cpuinfo.display().to_string();
        let content = self
            .fs
            .read_to_string(&self.cpuinfo)
            .map_err(|e| MetricError::from_read(e, "cpu MHz", &source))?;
        let values = parse_cpu_mhz(&content)?;
        if values.is_empty() {
            return Err(MetricError::NoData(format!("no cpu MHz rows in {}", source)));
        }
        Ok(values)
    }

    /// Current frequency of each logical CPU, in processor order.
    pub fn current_per_core(&self, scale: FreqScale, precision: u32) -> Result<Vec<f64>> {
        Ok(self
            .current_mhz()?
            .into_iter()
            .map(|mhz| round_to(convert_frequency(mhz, scale), precision))
            .collect())
    }

    /// Arithmetic mean of the per-core frequencies.
    pub fn current_mean(&self, scale: FreqScale, precision: u32) -> Result<f64> {
        let mhz = self.current_mhz()?;
        let mean = mhz.iter().sum::<f64>() / mhz.len() as f64;
        Ok(round_to(convert_frequency(mean, scale), precision))
    }

    /// Hardware maximum frequency, the largest `cpuinfo_max_freq` across the
    /// cpufreq policy directories. Resolved once and cached.
    pub fn max_frequency(&mut self, scale: FreqScale, precision: u32) -> Result<f64> {
        let mhz = match self.max_mhz {
            Some(mhz) => mhz,
            None => {
                let mhz = self.resolve_max_mhz()?;
                debug!(max_mhz = mhz, "resolved max cpu frequency");
                self.max_mhz = Some(mhz);
                mhz
            }
        };
        Ok(round_to(convert_frequency(mhz, scale), precision))
    }

    fn resolve_max_mhz(&self) -> Result<f64> {
        let source = self.cpufreq_dir.display().to_string();
        let entries = self
            .fs
            .read_dir(&self.cpufreq_dir)
            .map_err(|e| MetricError::from_read(e, "cpufreq policies", &source))?;

        let mut max_khz: Option<u64> = None;
        for entry in entries {
            let is_policy = entry
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("policy"));
            if !is_policy {
                continue;
            }
            let path = entry.join("cpuinfo_max_freq");
            let Ok(content) = self.fs.read_to_string(&path) else {
                continue;
            };
            let khz: u64 = content.trim().parse().map_err(|_| {
                MetricError::DataFormat(format!("non-numeric max frequency in {:?}", path))
            })?;
            max_khz = Some(max_khz.map_or(khz, |m| m.max(khz)));
        }

        match max_khz {
            Some(khz) => Ok(khz as f64 / 1000.0),
            None => Err(MetricError::NotFound {
                value: "cpuinfo_max_freq".into(),
                source,
            }),
        }
    }

    /// Mean current frequency as a percentage of the hardware maximum.
    pub fn percent(&mut self, precision: u32) -> Result<f64> {
        let current = self.current_mean(FreqScale::Mhz, 6)?;
        let max = self.max_frequency(FreqScale::Mhz, 6)?;
        if max == 0.0 {
            return Ok(0.0);
        }
        Ok(round_to(current / max * 100.0, precision))
    }
}
