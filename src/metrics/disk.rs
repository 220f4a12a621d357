//! Disk throughput facade.
//!
//! Values are deltas of the kernel's cumulative byte counters over a sampled
//! window, optionally divided by the window length for a per-second rate,
//! then converted to the caller's byte scale.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::collector::procfs::{DiskBytes, DiskStatSource};
use crate::collector::{FileSystem, RealFs};
use crate::error::{MetricError, Result};
use crate::sampler::{delta, per_second, RateSampler, Window};
use crate::units::{convert_bytes, convert_bytes_pair, ByteScale, ByteValue};

type DiskWindow = Window<BTreeMap<String, DiskBytes>>;

/// Read/write byte deltas for `name` over the window, per second if asked.
fn read_write_deltas(w: &DiskWindow, name: &str, source: &str, rate: bool) -> Result<(f64, f64)> {
    let (Some(old), Some(new)) = (w.old.get(name), w.new.get(name)) else {
        return Err(MetricError::NotFound {
            value: name.to_string(),
            source: source.to_string(),
        });
    };
    let read = delta(new.read, old.read);
    let written = delta(new.written, old.written);
    if rate {
        Ok((per_second(read, w.elapsed), per_second(written, w.elapsed)))
    } else {
        Ok((read as f64, written as f64))
    }
}

/// Disk read/write throughput per partition or block device.
pub struct DiskIo<F: FileSystem> {
    sampler: RateSampler<DiskStatSource<F>>,
}

impl DiskIo<RealFs> {
    pub fn new() -> Self {
        Self::with_source(DiskStatSource::new(RealFs::new()))
    }
}

impl Default for DiskIo<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> DiskIo<F> {
    pub fn with_source(source: DiskStatSource<F>) -> Self {
        Self {
            sampler: RateSampler::new(source),
        }
    }

    /// Partition names known to the kernel.
    pub fn partitions(&self) -> Result<Vec<String>> {
        self.sampler.source().partitions()
    }

    /// Whole block device names.
    pub fn block_devices(&self) -> Result<Vec<String>> {
        self.sampler.source().block_devices()
    }

    /// Bytes read by `name` over the window. With `per_sec` the value is a
    /// bytes-per-second rate instead of a total.
    pub fn bytes_read(
        &mut self,
        name: &str,
        interval: Duration,
        scale: ByteScale,
        precision: u32,
        per_sec: bool,
    ) -> Result<ByteValue> {
        let (read, _) = self.sample_deltas(name, interval, per_sec)?;
        convert_bytes(read, ByteScale::Bytes, scale, precision)
    }

    /// Bytes written by `name` over the window.
    pub fn bytes_write(
        &mut self,
        name: &str,
        interval: Duration,
        scale: ByteScale,
        precision: u32,
        per_sec: bool,
    ) -> Result<ByteValue> {
        let (_, written) = self.sample_deltas(name, interval, per_sec)?;
        convert_bytes(written, ByteScale::Bytes, scale, precision)
    }

    /// Read and write values for `name` over one shared window.
    pub fn bytes_read_write(
        &mut self,
        name: &str,
        interval: Duration,
        scale: ByteScale,
        precision: u32,
        per_sec: bool,
    ) -> Result<(ByteValue, ByteValue)> {
        let deltas = self.sample_deltas(name, interval, per_sec)?;
        convert_bytes_pair(deltas, ByteScale::Bytes, scale, precision)
    }

    /// Read and write values for several devices, all measured over the
    /// same window.
    pub fn bytes_read_write_multi(
        &mut self,
        names: &[&str],
        interval: Duration,
        scale: ByteScale,
        precision: u32,
        per_sec: bool,
    ) -> Result<BTreeMap<String, (ByteValue, ByteValue)>> {
        let source = self.sampler.source().source_path();
        let w = self.sampler.sample(interval)?;

        let mut out = BTreeMap::new();
        for name in names {
            let deltas = read_write_deltas(&w, name, &source, per_sec)?;
            out.insert(
                name.to_string(),
                convert_bytes_pair(deltas, ByteScale::Bytes, scale, precision)?,
            );
        }
        Ok(out)
    }

    fn sample_deltas(
        &mut self,
        name: &str,
        interval: Duration,
        per_sec: bool,
    ) -> Result<(f64, f64)> {
        let source = self.sampler.source().source_path();
        let w = self.sampler.sample(interval)?;
        read_write_deltas(&w, name, &source, per_sec)
    }
}
