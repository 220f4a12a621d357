//! Disk sector counter source backed by the disk statistics file.
//!
//! Sector counts are converted to bytes at snapshot time using the logical
//! block size of the owning block device, read once per device from sysfs
//! and cached for the source's lifetime.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, trace};

use crate::collector::traits::FileSystem;
use crate::collector::CounterSource;
use crate::error::{MetricError, Result};

use super::parser::{parse_diskstats, parse_partitions};

const DISKSTATS_FILE: &str = "/proc/diskstats";
const PARTITIONS_FILE: &str = "/proc/partitions";
const SYS_BLOCK_DIR: &str = "/sys/block";

/// Fallback when the sysfs queue attribute cannot be resolved.
const DEFAULT_BLOCK_SIZE: u64 = 512;

/// Cumulative bytes read and written by one device or partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskBytes {
    pub read: u64,
    pub written: u64,
}

/// Reads per-device sector counters and scales them to bytes.
#[derive(Debug)]
pub struct DiskStatSource<F> {
    fs: F,
    diskstats: PathBuf,
    partitions: PathBuf,
    sys_block: PathBuf,
    block_sizes: HashMap<String, u64>,
}

impl<F: FileSystem> DiskStatSource<F> {
    pub fn new(fs: F) -> Self {
        Self::with_paths(fs, DISKSTATS_FILE, PARTITIONS_FILE, SYS_BLOCK_DIR)
    }

    /// Reads from alternate paths (tests, containers).
    pub fn with_paths(
        fs: F,
        diskstats: impl Into<PathBuf>,
        partitions: impl Into<PathBuf>,
        sys_block: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            diskstats: diskstats.into(),
            partitions: partitions.into(),
            sys_block: sys_block.into(),
            block_sizes: HashMap::new(),
        }
    }

    /// Path of the stats file, for error reporting by callers.
    pub fn source_path(&self) -> String {
        self.diskstats.display().to_string()
    }

    /// Partition names from the partitions file, in file order.
    pub fn partitions(&self) -> Result<Vec<String>> {
        let source = self.partitions.display().to_string();
        let content = self
            .fs
            .read_to_string(&self.partitions)
            .map_err(|e| MetricError::from_read(e, "partitions", &source))?;
        Ok(parse_partitions(&content))
    }

    /// Block device names from sysfs, sorted.
    pub fn block_devices(&self) -> Result<Vec<String>> {
        let source = self.sys_block.display().to_string();
        let entries = self
            .fs
            .read_dir(&self.sys_block)
            .map_err(|e| MetricError::from_read(e, "block devices", &source))?;
        let mut names: Vec<String> = entries
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    /// The block device whose name is the longest prefix of `name`.
    ///
    /// `sda1` and `sda2` resolve to `sda`; `nvme0n1p2` resolves to `nvme0n1`.
    /// A whole-device row resolves to itself. Falls back to `name` when
    /// sysfs cannot be listed.
    fn owning_device(&self, name: &str) -> String {
        match self.block_devices() {
            Ok(devices) => devices
                .into_iter()
                .filter(|d| name.starts_with(d.as_str()))
                .max_by_key(|d| d.len())
                .unwrap_or_else(|| name.to_string()),
            Err(_) => name.to_string(),
        }
    }

    /// Logical block size in bytes for the device owning `name`.
    fn block_size(&mut self, name: &str) -> u64 {
        let device = self.owning_device(name);
        if let Some(&size) = self.block_sizes.get(&device) {
            return size;
        }

        let path = self
            .sys_block
            .join(&device)
            .join("queue/logical_block_size");
        let size = match self
            .fs
            .read_to_string(&path)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            Some(size) => size,
            None => {
                debug!(device = %device, "logical block size unresolved, assuming 512");
                DEFAULT_BLOCK_SIZE
            }
        };
        self.block_sizes.insert(device, size);
        size
    }
}

impl<F: FileSystem> CounterSource for DiskStatSource<F> {
    type Snapshot = BTreeMap<String, DiskBytes>;

    fn snapshot(&mut self) -> Result<Self::Snapshot> {
        let source = self.source_path();
        let content = self
            .fs
            .read_to_string(&self.diskstats)
            .map_err(|e| MetricError::from_read(e, "disk counters", &source))?;
        let rows = parse_diskstats(&content)?;
        if rows.is_empty() {
            return Err(MetricError::NoData(format!("no disk rows in {}", source)));
        }

        let mut map = BTreeMap::new();
        for row in rows {
            let block = self.block_size(&row.device);
            map.insert(
                row.device,
                DiskBytes {
                    read: row.sectors_read.saturating_mul(block),
                    written: row.sectors_written.saturating_mul(block),
                },
            );
        }
        trace!(devices = map.len(), "diskstats snapshot");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn snapshot_scales_sectors_by_block_size() {
        let fs = MockFs::typical_system();
        let mut src = DiskStatSource::new(fs);
        let map = src.snapshot().unwrap();

        let sda1 = map.get("sda1").unwrap();
        assert_eq!(sda1.read, 50000 * 512);
        assert_eq!(sda1.written, 90000 * 512);
        assert!(map.contains_key("sda"));
        assert!(map.contains_key("sda2"));
    }

    #[test]
    fn partition_resolves_to_owning_device() {
        let fs = MockFs::typical_system();
        let src = DiskStatSource::new(fs);
        assert_eq!(src.owning_device("sda2"), "sda");
        assert_eq!(src.owning_device("sda"), "sda");
    }

    #[test]
    fn block_size_is_cached_after_first_read() {
        let fs = MockFs::typical_system();
        let mut src = DiskStatSource::new(fs.clone());
        assert_eq!(src.block_size("sda1"), 512);

        // changing sysfs afterwards does not affect the cached value
        fs.add_file("/sys/block/sda/queue/logical_block_size", "4096\n");
        assert_eq!(src.block_size("sda2"), 512);
    }

    #[test]
    fn unresolvable_block_size_falls_back_to_512() {
        let fs = MockFs::new();
        fs.add_file(
            "/proc/diskstats",
            "   8       0 vda 10 0 100 5 10 0 200 6 0 8 11 0 0 0 0\n",
        );
        let mut src = DiskStatSource::new(fs);
        let map = src.snapshot().unwrap();
        assert_eq!(map.get("vda").unwrap().read, 100 * 512);
    }

    #[test]
    fn partitions_and_block_devices_listing() {
        let fs = MockFs::typical_system();
        let src = DiskStatSource::new(fs);
        assert_eq!(src.partitions().unwrap(), vec!["sda", "sda1", "sda2"]);
        assert_eq!(src.block_devices().unwrap(), vec!["sda"]);
    }

    #[test]
    fn missing_diskstats_is_not_found() {
        let mut src = DiskStatSource::new(MockFs::new());
        assert!(matches!(
            src.snapshot().unwrap_err(),
            MetricError::NotFound { .. }
        ));
    }
}
