//! Memory usage facade over `/proc/meminfo`.
//!
//! The kernel reports KiB; conversions to the caller's scale go through the
//! byte scale engine. Used memory follows the `free(1)` accounting: total
//! minus free, buffers, cached, and slab.

use std::path::PathBuf;

use crate::collector::procfs::parser::{parse_meminfo, MemInfo};
use crate::collector::{FileSystem, RealFs};
use crate::error::{MetricError, Result};
use crate::units::{convert_bytes, round_to, ByteScale, ByteValue};

const MEMINFO_FILE: &str = "/proc/meminfo";

/// Memory and swap readings.
pub struct Memory<F> {
    fs: F,
    path: PathBuf,
}

impl Memory<RealFs> {
    pub fn new() -> Self {
        Self::with_fs(RealFs::new())
    }
}

impl Default for Memory<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> Memory<F> {
    pub fn with_fs(fs: F) -> Self {
        Self::with_path(fs, MEMINFO_FILE)
    }

    /// Reads from an alternate meminfo file (tests, containers).
    pub fn with_path(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    fn info(&self) -> Result<MemInfo> {
        let source = self.path.display().to_string();
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| MetricError::from_read(e, "meminfo", &source))?;
        let info = parse_meminfo(&content)?;
        if info.mem_total == 0 {
            return Err(MetricError::NoData(format!("no MemTotal in {}", source)));
        }
        Ok(info)
    }

    fn convert_kib(&self, kib: u64, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        convert_bytes(kib as f64, ByteScale::Kib, scale, precision)
    }

    /// Total installed memory.
    pub fn total(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        self.convert_kib(self.info()?.mem_total, scale, precision)
    }

    /// Completely unused memory.
    pub fn free(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        self.convert_kib(self.info()?.mem_free, scale, precision)
    }

    pub fn free_percent(&self, precision: u32) -> Result<f64> {
        let info = self.info()?;
        Ok(round_to(
            info.mem_free as f64 / info.mem_total as f64 * 100.0,
            precision,
        ))
    }

    /// Memory available for new workloads without swapping.
    pub fn available(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        self.convert_kib(self.info()?.mem_available, scale, precision)
    }

    pub fn available_percent(&self, precision: u32) -> Result<f64> {
        let info = self.info()?;
        Ok(round_to(
            info.mem_available as f64 / info.mem_total as f64 * 100.0,
            precision,
        ))
    }

    fn used_kib(info: &MemInfo) -> u64 {
        info.mem_total
            .saturating_sub(info.mem_free)
            .saturating_sub(info.buffers)
            .saturating_sub(info.cached)
            .saturating_sub(info.slab)
    }

    /// Memory in active use.
    pub fn used(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        let info = self.info()?;
        self.convert_kib(Self::used_kib(&info), scale, precision)
    }

    pub fn used_percent(&self, precision: u32) -> Result<f64> {
        let info = self.info()?;
        Ok(round_to(
            Self::used_kib(&info) as f64 / info.mem_total as f64 * 100.0,
            precision,
        ))
    }

    /// Buffers, page cache, and reclaimable plus unreclaimable slab.
    pub fn buff_cache(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        let info = self.info()?;
        let kib = info.buffers + info.cached + info.s_reclaimable + info.s_unreclaim;
        self.convert_kib(kib, scale, precision)
    }

    /// Total swap space.
    pub fn swap_total(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        self.convert_kib(self.info()?.swap_total, scale, precision)
    }

    /// Unused swap space.
    pub fn swap_free(&self, scale: ByteScale, precision: u32) -> Result<ByteValue> {
        self.convert_kib(self.info()?.swap_free, scale, precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn mem() -> Memory<MockFs> {
        Memory::with_fs(MockFs::typical_system())
    }

    #[test]
    fn total_in_requested_scale() {
        // 16384000 KiB = 15.625 GiB
        assert_eq!(
            mem().total(ByteScale::Gib, 3).unwrap(),
            ByteValue::Scaled(15.625)
        );
        assert_eq!(
            mem().total(ByteScale::Bytes, 2).unwrap(),
            ByteValue::Bytes(16384000 * 1024)
        );
    }

    #[test]
    fn free_and_available_percent() {
        assert_eq!(mem().free_percent(2).unwrap(), 50.0);
        // 12000000 / 16384000
        assert_eq!(mem().available_percent(2).unwrap(), 73.24);
    }

    #[test]
    fn used_subtracts_free_buffers_cache_slab() {
        // 16384000 - 8192000 - 512000 - 2048000 - 512000 = 5120000 KiB
        assert_eq!(
            mem().used(ByteScale::Kib, 2).unwrap(),
            ByteValue::Scaled(5120000.0)
        );
        assert_eq!(mem().used_percent(2).unwrap(), 31.25);
    }

    #[test]
    fn buff_cache_includes_slab_halves() {
        // 512000 + 2048000 + 256000 + 256000 = 3072000 KiB = 3000 MiB
        assert_eq!(
            mem().buff_cache(ByteScale::Mib, 2).unwrap(),
            ByteValue::Scaled(3000.0)
        );
    }

    #[test]
    fn swap_figures() {
        assert_eq!(
            mem().swap_total(ByteScale::Gib, 2).unwrap(),
            ByteValue::Scaled(3.91)
        );
        assert_eq!(mem().swap_free(ByteScale::Kib, 0).unwrap(), ByteValue::Scaled(4096000.0));
    }

    #[test]
    fn missing_meminfo_is_not_found() {
        let m = Memory::with_fs(MockFs::new());
        assert!(matches!(
            m.total(ByteScale::Mib, 2).unwrap_err(),
            MetricError::NotFound { .. }
        ));
    }

    #[test]
    fn empty_meminfo_is_no_data() {
        let fs = MockFs::new();
        fs.add_file("/proc/meminfo", "HugePages_Total: 0\n");
        let m = Memory::with_fs(fs);
        assert!(matches!(
            m.total(ByteScale::Mib, 2).unwrap_err(),
            MetricError::NoData(_)
        ));
    }
}
