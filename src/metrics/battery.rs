//! Battery facade over the power-supply uevent tree.
//!
//! Readings come from the `uevent` file of the first `BAT*` supply.
//! Electrical values are scaled from the kernel's micro-units: voltage in
//! mV, current in mA, charge in mAh, power in mW.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::collector::procfs::parser::parse_uevent;
use crate::collector::{FileSystem, RealFs};
use crate::error::{MetricError, Result};
use crate::units::round_to;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Static identity of the battery pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryIdentity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

/// Battery state and health readings.
pub struct Battery<F> {
    fs: F,
    supply_dir: PathBuf,
}

impl Battery<RealFs> {
    pub fn new() -> Self {
        Self::with_fs(RealFs::new())
    }
}

impl Default for Battery<RealFs> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> Battery<F> {
    pub fn with_fs(fs: F) -> Self {
        Self::with_path(fs, POWER_SUPPLY_DIR)
    }

    /// Reads from an alternate power-supply tree (tests, containers).
    pub fn with_path(fs: F, supply_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            supply_dir: supply_dir.into(),
        }
    }

    /// Directory of the first `BAT*` supply.
    fn battery_dir(&self) -> Result<PathBuf> {
        let source = self.supply_dir.display().to_string();
        let entries = self
            .fs
            .read_dir(&self.supply_dir)
            .map_err(|e| MetricError::from_read(e, "battery", &source))?;
        entries
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("BAT"))
            })
            .min()
            .ok_or(MetricError::NotFound {
                value: "BAT*".into(),
                source,
            })
    }

    fn uevent(&self) -> Result<HashMap<String, String>> {
        let path = self.battery_dir()?.join("uevent");
        let source = path.display().to_string();
        let content = self
            .fs
            .read_to_string(&path)
            .map_err(|e| MetricError::from_read(e, "uevent", &source))?;
        Ok(parse_uevent(&content))
    }

    fn str_field(&self, key: &str) -> Result<String> {
        self.uevent()?
            .remove(key)
            .ok_or_else(|| MetricError::NotFound {
                value: key.to_string(),
                source: self.supply_dir.display().to_string(),
            })
    }

    fn micro_field(&self, key: &str) -> Result<u64> {
        let raw = self.str_field(key)?;
        raw.parse().map_err(|_| {
            MetricError::DataFormat(format!("non-numeric {} value {:?}", key, raw))
        })
    }

    /// Manufacturer, model, and serial number.
    pub fn identity(&self) -> Result<BatteryIdentity> {
        let mut fields = self.uevent()?;
        let mut take = |key: &str| {
            fields.remove(key).ok_or_else(|| MetricError::NotFound {
                value: key.to_string(),
                source: self.supply_dir.display().to_string(),
            })
        };
        Ok(BatteryIdentity {
            manufacturer: take("manufacturer")?,
            model: take("model_name")?,
            serial_number: take("serial_number")?,
        })
    }

    /// Charging status: Full, Charging, or Discharging.
    pub fn status(&self) -> Result<String> {
        self.str_field("status")
    }

    pub fn is_present(&self) -> Result<bool> {
        Ok(self.str_field("present")? != "0")
    }

    /// Charge as a percentage of the current full capacity.
    pub fn capacity_percent(&self) -> Result<u8> {
        let raw = self.str_field("capacity")?;
        raw.parse().map_err(|_| {
            MetricError::DataFormat(format!("non-numeric capacity value {:?}", raw))
        })
    }

    /// Capacity level: Full, Normal, Low, or Critical.
    pub fn capacity_level(&self) -> Result<String> {
        self.str_field("capacity_level")
    }

    /// Battery voltage in millivolts.
    pub fn voltage_mv(&self) -> Result<u64> {
        Ok(self.micro_field("voltage_now")? / 1000)
    }

    /// Discharge/charge current in milliamps.
    pub fn current_ma(&self) -> Result<u64> {
        Ok(self.micro_field("current_now")? / 1000)
    }

    /// Instantaneous power draw in milliwatts.
    pub fn power_mw(&self) -> Result<u64> {
        Ok(self.voltage_mv()? * self.current_ma()? / 1000)
    }

    /// Current charge in milliamp-hours.
    pub fn charge_mah(&self) -> Result<u64> {
        Ok(self.micro_field("charge_now")? / 1000)
    }

    /// Capacity lost to ageing, as a percentage of the design capacity.
    /// Lower is better.
    pub fn wear_percent(&self) -> Result<f64> {
        let full = self.micro_field("charge_full")?;
        let design = self.micro_field("charge_full_design")?;
        if design == 0 {
            return Err(MetricError::NoData("zero design capacity".into()));
        }
        Ok(round_to(100.0 - full as f64 / design as f64 * 100.0, 2))
    }

    /// Battery chemistry, e.g. Li-ion.
    pub fn technology(&self) -> Result<String> {
        self.str_field("technology")
    }

    /// Seconds of battery life left at the present current draw, or `None`
    /// when no current is flowing.
    pub fn remaining_seconds(&self) -> Result<Option<u64>> {
        let current = self.current_ma()?;
        if current == 0 {
            return Ok(None);
        }
        let hours = self.charge_mah()? as f64 / current as f64;
        Ok(Some((hours * 3600.0).round() as u64))
    }

    /// Remaining battery life formatted `H:MM`, or `None` when no current
    /// is flowing.
    pub fn remaining_time(&self) -> Result<Option<String>> {
        Ok(self.remaining_seconds()?.map(|secs| {
            let minutes = (secs + 30) / 60;
            format!("{}:{:02}", minutes / 60, minutes % 60)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    fn battery() -> Battery<MockFs> {
        Battery::with_fs(MockFs::typical_system())
    }

    #[test]
    fn status_and_presence() {
        assert_eq!(battery().status().unwrap(), "Discharging");
        assert!(battery().is_present().unwrap());
    }

    #[test]
    fn electrical_values_in_milli_units() {
        assert_eq!(battery().voltage_mv().unwrap(), 12100);
        assert_eq!(battery().current_ma().unwrap(), 1500);
        assert_eq!(battery().charge_mah().unwrap(), 3000);
        // 12100 mV * 1500 mA = 18150 mW
        assert_eq!(battery().power_mw().unwrap(), 18150);
    }

    #[test]
    fn capacity_and_level() {
        assert_eq!(battery().capacity_percent().unwrap(), 66);
        assert_eq!(battery().capacity_level().unwrap(), "Normal");
    }

    #[test]
    fn wear_from_full_versus_design() {
        // 100 - 4500000/5000000 * 100
        assert_eq!(battery().wear_percent().unwrap(), 10.0);
    }

    #[test]
    fn remaining_time_from_charge_and_current() {
        // 3000 mAh / 1500 mA = 2 hours
        assert_eq!(battery().remaining_seconds().unwrap(), Some(7200));
        assert_eq!(battery().remaining_time().unwrap().unwrap(), "2:00");
    }

    #[test]
    fn zero_current_has_no_remaining_time() {
        let fs = MockFs::new();
        fs.add_file(
            "/sys/class/power_supply/BAT0/uevent",
            "POWER_SUPPLY_STATUS=Full\n\
             POWER_SUPPLY_CURRENT_NOW=0\n\
             POWER_SUPPLY_CHARGE_NOW=4500000\n",
        );
        let b = Battery::with_fs(fs);
        assert_eq!(b.remaining_seconds().unwrap(), None);
    }

    #[test]
    fn identity_fields() {
        let id = battery().identity().unwrap();
        assert_eq!(id.manufacturer, "MockCell");
        assert_eq!(id.model, "MC-1");
        assert_eq!(id.serial_number, "0042");
    }

    #[test]
    fn no_battery_is_not_found() {
        let fs = MockFs::new();
        fs.add_dir("/sys/class/power_supply/AC0");
        let b = Battery::with_fs(fs);
        let err = b.status().unwrap_err();
        assert!(matches!(err, MetricError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "BAT* not found in /sys/class/power_supply"
        );
    }

    #[test]
    fn missing_key_names_the_key() {
        let fs = MockFs::new();
        fs.add_file(
            "/sys/class/power_supply/BAT0/uevent",
            "POWER_SUPPLY_STATUS=Charging\n",
        );
        let b = Battery::with_fs(fs);
        assert!(matches!(
            b.technology().unwrap_err(),
            MetricError::NotFound { .. }
        ));
    }
}
