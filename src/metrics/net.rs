//! Network throughput facade.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::collector::procfs::{NetBytes, NetDevSource};
use crate::collector::{FileSystem, RealFs};
use crate::error::{MetricError, Result};
use crate::sampler::{delta, per_second, RateSampler, Window};
use crate::units::{convert_bytes, convert_bytes_pair, ByteScale, ByteValue};

type NetWindow = Window<BTreeMap<String, NetBytes>>;

/// Rx/tx byte deltas for `name` over the window, per second if asked.
fn rx_tx_deltas(w: &NetWindow, name: &str, source: &str, rate: bool) -> Result<(f64, f64)> {
    let (Some(old), Some(new)) = (w.old.get(name), w.new.get(name)) else {
        return Err(MetricError::NotFound {
            value: name.to_string(),
            source: source.to_string(),
        });
    };
    let rx = delta(new.rx, old.rx);
    let tx = delta(new.tx, old.tx);
    if rate {
        Ok((per_second(rx, w.elapsed), per_second(tx, w.elapsed)))
    } else {
        Ok((rx as f64, tx as f64))
    }
}

/// Network receive/transmit throughput per interface.
pub struct NetIo<F: FileSystem> {
    sampler: RateSampler<NetDevSource<F>>,
}

impl NetIo<RealFs> {
    pub fn new() -> Self {
        Self::with_source(NetDevSource::new(RealFs::new()))
    }
}

impl Default for NetIo<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> NetIo<F> {
    pub fn with_source(source: NetDevSource<F>) -> Self {
        Self {
            sampler: RateSampler::new(source),
        }
    }

    /// Interface names known to the kernel.
    pub fn interfaces(&self) -> Result<Vec<String>> {
        self.sampler.source().interfaces()
    }

    /// Bytes received on `name` over the window. With `per_sec` the value
    /// is a bytes-per-second rate instead of a total.
    pub fn bytes_recv(
        &mut self,
        name: &str,
        interval: Duration,
        scale: ByteScale,
        precision: u32,
        per_sec: bool,
    ) -> Result<ByteValue> {
        let (rx, _) = self.sample_deltas(name, interval, per_sec)?;
        convert_bytes(rx, ByteScale::Bytes, scale, precision)
    }

    /// Bytes transmitted on `name` over the window.
    pub fn bytes_sent(
        &mut self,
        name: &str,
        interval: Duration,
        scale: ByteScale,
        precision: u32,
        per_sec: bool,
    ) -> Result<ByteValue> {
        let (_, tx) = self.sample_deltas(name, interval, per_sec)?;
        convert_bytes(tx, ByteScale::Bytes, scale, precision)
    }

    /// Received and transmitted values for `name` over one shared window.
    pub fn bytes_recv_sent(
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

    /// Received and transmitted values for several interfaces, all measured
    /// over the same window.
    pub fn bytes_recv_sent_multi(
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
            let deltas = rx_tx_deltas(&w, name, &source, per_sec)?;
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
        rx_tx_deltas(&w, name, &source, per_sec)
    }
}
