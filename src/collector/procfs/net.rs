//! Network byte counter source backed by the network device stats file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::trace;

use crate::collector::traits::FileSystem;
use crate::collector::CounterSource;
use crate::error::{MetricError, Result};

use super::parser::parse_net_dev;

const NET_DEV_FILE: &str = "/proc/net/dev";

/// Cumulative bytes received and transmitted by one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NetBytes {
    pub rx: u64,
    pub tx: u64,
}

/// Reads per-interface rx/tx byte counters from `/proc/net/dev`.
#[derive(Debug)]
pub struct NetDevSource<F> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> NetDevSource<F> {
    pub fn new(fs: F) -> Self {
        Self::with_path(fs, NET_DEV_FILE)
    }

    /// Reads from an alternate stats file (tests, containers).
    pub fn with_path(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// Path of the stats file, for error reporting by callers.
    pub fn source_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Interface names in file order.
    pub fn interfaces(&self) -> Result<Vec<String>> {
        let source = self.source_path();
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| MetricError::from_read(e, "interfaces", &source))?;
        Ok(parse_net_dev(&content)?
            .into_iter()
            .map(|row| row.interface)
            .collect())
    }
}

impl<F: FileSystem> CounterSource for NetDevSource<F> {
    type Snapshot = BTreeMap<String, NetBytes>;

    fn snapshot(&mut self) -> Result<Self::Snapshot> {
        let source = self.source_path();
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| MetricError::from_read(e, "net counters", &source))?;
        let rows = parse_net_dev(&content)?;
        if rows.is_empty() {
            return Err(MetricError::NoData(format!(
                "no interface rows in {}",
                source
            )));
        }

        let map: BTreeMap<String, NetBytes> = rows
            .into_iter()
            .map(|row| {
                (
                    row.interface,
                    NetBytes {
                        rx: row.rx_bytes,
                        tx: row.tx_bytes,
                    },
                )
            })
            .collect();
        trace!(interfaces = map.len(), "net dev snapshot");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn snapshot_keys_by_interface() {
        let fs = MockFs::typical_system();
        let mut src = NetDevSource::new(fs);
        let map = src.snapshot().unwrap();

        let eth0 = map.get("eth0").unwrap();
        assert_eq!(eth0.rx, 9876543);
        assert_eq!(eth0.tx, 87654321);
        assert!(map.contains_key("lo"));
    }

    #[test]
    fn interfaces_in_file_order() {
        let fs = MockFs::typical_system();
        let src = NetDevSource::new(fs);
        assert_eq!(src.interfaces().unwrap(), vec!["lo", "eth0"]);
    }

    #[test]
    fn missing_net_dev_is_not_found() {
        let mut src = NetDevSource::new(MockFs::new());
        assert!(matches!(
            src.snapshot().unwrap_err(),
            MetricError::NotFound { .. }
        ));
    }

    #[test]
    fn headers_only_is_no_data() {
        let fs = MockFs::new();
        fs.add_file(
            "/proc/net/dev",
            "Inter-|   Receive |  Transmit\n face |bytes|bytes\n",
        );
        let mut src = NetDevSource::new(fs);
        assert!(matches!(
            src.snapshot().unwrap_err(),
            MetricError::NoData(_)
        ));
    }
}
