//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! `MockFs` clones share one underlying tree, so a test can keep a handle,
//! hand a clone to a sampler, and rewrite counter files between reads to
//! simulate activity.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::collector::traits::FileSystem;

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    inner: Arc<RwLock<Inner>>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file. Parent directories are created automatically.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut inner = self.inner.write().unwrap();

        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                inner.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }

        inner.files.insert(path, content.into());
    }

    /// Adds an empty directory (and its parents).
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut inner = self.inner.write().unwrap();
        inner.directories.insert(path.clone());

        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                inner.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Removes a file, if present.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.inner.write().unwrap().files.remove(path.as_ref());
    }

    /// A fixture resembling a small laptop: two logical CPUs, one disk with
    /// two partitions, loopback plus one NIC, coretemp sensors, one battery.
    pub fn typical_system() -> Self {
        let fs = Self::new();
        fs.add_file(
            "/proc/stat",
            "cpu  10000 500 3000 80000 1000 200 100 0 0 0\n\
             cpu0 5000 250 1500 40000 500 100 50 0 0 0\n\
             cpu1 5000 250 1500 40000 500 100 50 0 0 0\n\
             ctxt 500000\n\
             btime 1700000000\n\
             processes 10000\n",
        );
        fs.add_file(
            "/proc/diskstats",
            "   8       0 sda 1234 0 56789 100 5678 0 98765 200 0 150 300 0 0 0 0\n\
             \x20  8       1 sda1 1000 0 50000 80 5000 0 90000 180 0 130 260 0 0 0 0\n\
             \x20  8       2 sda2 200 0 6000 15 600 0 8000 18 0 15 30 0 0 0 0\n",
        );
        fs.add_file(
            "/proc/partitions",
            "major minor  #blocks  name\n\
             \n\
             \x20  8        0  488386584 sda\n\
             \x20  8        1  102400000 sda1\n\
             \x20  8        2  385985560 sda2\n",
        );
        fs.add_file("/sys/block/sda/queue/logical_block_size", "512\n");
        fs.add_file(
            "/proc/net/dev",
            "Inter-|   Receive                                                |  Transmit\n\
             \x20face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n\
             \x20   lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0\n\
             \x20 eth0: 9876543     5678    1    2    0     0          0        10 87654321     4321    3    4    0     0       0          0\n",
        );
        fs.add_file(
            "/proc/meminfo",
            "MemTotal:       16384000 kB\n\
             MemFree:         8192000 kB\n\
             MemAvailable:   12000000 kB\n\
             Buffers:          512000 kB\n\
             Cached:          2048000 kB\n\
             SwapCached:            0 kB\n\
             SwapTotal:       4096000 kB\n\
             SwapFree:        4096000 kB\n\
             Slab:             512000 kB\n\
             SReclaimable:     256000 kB\n\
             SUnreclaim:       256000 kB\n",
        );
        fs.add_file(
            "/proc/cpuinfo",
            "processor\t: 0\n\
             model name\t: Mock CPU @ 3.60GHz\n\
             cpu MHz\t\t: 2400.000\n\
             \n\
             processor\t: 1\n\
             model name\t: Mock CPU @ 3.60GHz\n\
             cpu MHz\t\t: 2600.000\n",
        );
        fs.add_file(
            "/sys/devices/system/cpu/cpufreq/policy0/cpuinfo_max_freq",
            "3600000\n",
        );
        fs.add_file(
            "/sys/devices/system/cpu/cpufreq/policy1/cpuinfo_max_freq",
            "3600000\n",
        );
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_label", "Package id 0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "45000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_label", "Core 0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_input", "41000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_label", "Core 1\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_input", "43000\n");
        fs.add_file(
            "/sys/class/power_supply/BAT0/uevent",
            "POWER_SUPPLY_NAME=BAT0\n\
             POWER_SUPPLY_STATUS=Discharging\n\
             POWER_SUPPLY_PRESENT=1\n\
             POWER_SUPPLY_TECHNOLOGY=Li-ion\n\
             POWER_SUPPLY_VOLTAGE_NOW=12100000\n\
             POWER_SUPPLY_CURRENT_NOW=1500000\n\
             POWER_SUPPLY_CHARGE_FULL_DESIGN=5000000\n\
             POWER_SUPPLY_CHARGE_FULL=4500000\n\
             POWER_SUPPLY_CHARGE_NOW=3000000\n\
             POWER_SUPPLY_CAPACITY=66\n\
             POWER_SUPPLY_CAPACITY_LEVEL=Normal\n\
             POWER_SUPPLY_MANUFACTURER=MockCell\n\
             POWER_SUPPLY_MODEL_NAME=MC-1\n\
             POWER_SUPPLY_SERIAL_NUMBER=0042\n",
        );
        fs.add_file("/sys/class/power_supply/BAT0/type", "Battery\n");
        fs
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.inner
            .read()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("file not found: {:?}", path))
            })
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.read().unwrap();
        inner.files.contains_key(path) || inner.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let inner = self.inner.read().unwrap();
        if !inner.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();
        for file_path in inner.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }
        for dir_path in &inner.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_file_creates_parents() {
        let fs = MockFs::new();
        fs.add_file("/proc/net/dev", "header\n");

        assert!(fs.exists(Path::new("/proc/net/dev")));
        assert!(fs.exists(Path::new("/proc/net")));
        assert!(fs.exists(Path::new("/proc")));
    }

    #[test]
    fn clones_share_the_tree() {
        let fs = MockFs::new();
        let handle = fs.clone();
        fs.add_file("/proc/stat", "cpu  1 0 0 0 0 0 0 0 0 0\n");

        let content = handle.read_to_string(Path::new("/proc/stat")).unwrap();
        assert!(content.starts_with("cpu "));

        handle.add_file("/proc/stat", "cpu  2 0 0 0 0 0 0 0 0 0\n");
        assert!(
            fs.read_to_string(Path::new("/proc/stat"))
                .unwrap()
                .starts_with("cpu  2")
        );
    }

    #[test]
    fn read_dir_lists_direct_children() {
        let fs = MockFs::new();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon1/name", "acpitz\n");

        let entries = fs.read_dir(Path::new("/sys/class/hwmon")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn missing_file_is_not_found() {
        let fs = MockFs::new();
        let err = fs.read_to_string(Path::new("/nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn typical_system_is_complete() {
        let fs = MockFs::typical_system();
        for path in [
            "/proc/stat",
            "/proc/diskstats",
            "/proc/partitions",
            "/proc/net/dev",
            "/proc/meminfo",
            "/proc/cpuinfo",
            "/sys/block/sda/queue/logical_block_size",
            "/sys/class/hwmon/hwmon0/name",
            "/sys/class/power_supply/BAT0/uevent",
        ] {
            assert!(fs.exists(Path::new(path)), "missing {}", path);
        }
    }
}
