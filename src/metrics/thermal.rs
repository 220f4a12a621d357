//! CPU temperature facade over the hwmon sensor tree.
//!
//! Sensors are label/input pairs under a hwmon device. The `coretemp`
//! device is preferred; otherwise the first device exposing any labeled
//! temperature input is used. Inputs are milli-degrees Celsius.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::collector::{FileSystem, RealFs};
use crate::error::{MetricError, Result};
use crate::units::{convert_temperature, TempScale};

const HWMON_DIR: &str = "/sys/class/hwmon";
const PREFERRED_DEVICE: &str = "coretemp";

/// One labeled temperature reading, in milli-degrees Celsius.
#[derive(Debug, Clone, PartialEq)]
struct Sensor {
    label: String,
    milli_c: f64,
}

/// CPU package and per-core temperatures.
pub struct Thermal<F> {
    fs: F,
    hwmon_dir: PathBuf,
}

impl Thermal<RealFs> {
    pub fn new() -> Self {
        Self::with_fs(RealFs::new())
    }
}

impl Default for Thermal<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> Thermal<F> {
    pub fn with_fs(fs: F) -> Self {
        Self::with_path(fs, HWMON_DIR)
    }

    /// Reads from an alternate hwmon tree (tests, containers).
    pub fn with_path(fs: F, hwmon_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            hwmon_dir: hwmon_dir.into(),
        }
    }

    fn device_name(&self, device: &Path) -> Option<String> {
        self.fs
            .read_to_string(&device.join("name"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// Label/input pairs of one hwmon device. Inputs that fail to read or
    /// parse are skipped with a warning.
    fn device_sensors(&self, device: &Path) -> Vec<Sensor> {
        let Ok(entries) = self.fs.read_dir(device) else {
            return Vec::new();
        };

        let mut sensors = Vec::new();
        for entry in entries {
            let name = entry.file_name().map(|n| n.to_string_lossy().into_owned());
            let Some(name) = name else { continue };
            let Some(stem) = name.strip_suffix("_label") else {
                continue;
            };

            let Ok(label) = self.fs.read_to_string(&entry) else {
                continue;
            };
            let input_path = device.join(format!("{}_input", stem));
            let milli_c = self
                .fs
                .read_to_string(&input_path)
                .ok()
                .and_then(|s| s.trim().parse::<f64>().ok());
            match milli_c {
                Some(milli_c) => sensors.push(Sensor {
                    label: label.trim().to_string(),
                    milli_c,
                }),
                None => warn!(path = %input_path.display(), "skipping unreadable sensor input"),
            }
        }
        sensors
    }

    /// Sensors of the selected hwmon device.
    fn sensors(&self) -> Result<Vec<Sensor>> {
        let source = self.hwmon_dir.display().to_string();
        let devices = self
            .fs
            .read_dir(&self.hwmon_dir)
            .map_err(|e| MetricError::from_read(e, "hwmon devices", &source))?;

        let mut fallback: Option<Vec<Sensor>> = None;
        for device in devices {
            let sensors = self.device_sensors(&device);
            if sensors.is_empty() {
                continue;
            }
            if self.device_name(&device).as_deref() == Some(PREFERRED_DEVICE) {
                return Ok(sensors);
            }
            fallback.get_or_insert(sensors);
        }

        fallback.ok_or(MetricError::NotFound {
            value: "temperature sensors".into(),
            source,
        })
    }

    /// Per-core temperatures, ordered by core number.
    pub fn cores(&self, scale: TempScale, precision: u32) -> Result<Vec<f64>> {
        let mut cores: Vec<(u32, f64)> = self
            .sensors()?
            .into_iter()
            .filter_map(|s| {
                let n: u32 = s.label.strip_prefix("Core ")?.trim().parse().ok()?;
                Some((n, s.milli_c))
            })
            .collect();
        if cores.is_empty() {
            return Err(MetricError::NoData("no per-core temperature sensors".into()));
        }
        cores.sort_by_key(|&(n, _)| n);
        Ok(cores
            .into_iter()
            .map(|(_, milli_c)| convert_temperature(milli_c, scale, precision))
            .collect())
    }

    /// Package-level sensor value, the heat spreader temperature.
    pub fn package(&self, scale: TempScale, precision: u32) -> Result<f64> {
        let sensors = self.sensors()?;
        let pkg = sensors
            .iter()
            .find(|s| s.label.starts_with("Package"))
            .or_else(|| sensors.iter().find(|s| !s.label.starts_with("Core")))
            .ok_or_else(|| MetricError::NotFound {
                value: "package sensor".into(),
                source: self.hwmon_dir.display().to_string(),
            })?;
        Ok(convert_temperature(pkg.milli_c, scale, precision))
    }

    /// Hottest per-core reading.
    pub fn max_core(&self, scale: TempScale, precision: u32) -> Result<f64> {
        let cores = self.cores(scale, precision)?;
        Ok(cores.into_iter().fold(f64::MIN, f64::max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn cores_sorted_by_core_number() {
        let t = Thermal::with_fs(MockFs::typical_system());
        assert_eq!(t.cores(TempScale::Celsius, 2).unwrap(), vec![41.0, 43.0]);
    }

    #[test]
    fn package_sensor_in_requested_scale() {
        let t = Thermal::with_fs(MockFs::typical_system());
        assert_eq!(t.package(TempScale::Celsius, 2).unwrap(), 45.0);
        assert_eq!(t.package(TempScale::Fahrenheit, 2).unwrap(), 113.0);
    }

    #[test]
    fn max_core_is_hottest() {
        let t = Thermal::with_fs(MockFs::typical_system());
        assert_eq!(t.max_core(TempScale::Celsius, 2).unwrap(), 43.0);
    }

    #[test]
    fn two_digit_core_labels_sort_numerically() {
        let fs = MockFs::new();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_label", "Core 2\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "42000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_label", "Core 10\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_input", "50000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_label", "Core 1\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_input", "40000\n");

        let t = Thermal::with_fs(fs);
        assert_eq!(
            t.cores(TempScale::Celsius, 2).unwrap(),
            vec![40.0, 42.0, 50.0]
        );
    }

    #[test]
    fn coretemp_preferred_over_other_devices() {
        let fs = MockFs::new();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "acpitz\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_label", "Ambient\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "30000\n");
        fs.add_file("/sys/class/hwmon/hwmon1/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon1/temp1_label", "Package id 0\n");
        fs.add_file("/sys/class/hwmon/hwmon1/temp1_input", "55000\n");

        let t = Thermal::with_fs(fs);
        assert_eq!(t.package(TempScale::Celsius, 2).unwrap(), 55.0);
    }

    #[test]
    fn unreadable_input_is_skipped() {
        let fs = MockFs::new();
        fs.add_file("/sys/class/hwmon/hwmon0/name", "coretemp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_label", "Package id 0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "45000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp2_label", "Core 0\n");
        // temp2_input missing

        let t = Thermal::with_fs(fs);
        assert_eq!(t.package(TempScale::Celsius, 2).unwrap(), 45.0);
        assert!(t.cores(TempScale::Celsius, 2).is_err());
    }

    #[test]
    fn no_hwmon_tree_is_not_found() {
        let t = Thermal::with_fs(MockFs::new());
        assert!(matches!(
            t.package(TempScale::Celsius, 2).unwrap_err(),
            MetricError::NotFound { .. }
        ));
    }
}
