//! Parsers for `/proc` and `/sys` file contents.
//!
//! These are pure functions over strings so they can be tested without any
//! filesystem. Truncated rows and non-numeric counters are
//! [`MetricError::DataFormat`] errors; absent resources are reported by the
//! callers, which know the source path.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{MetricError, Result};

/// One row of CPU time counters from the scheduler statistics file.
///
/// Fields are cumulative ticks since boot. Rows appear in file order:
/// the aggregate `cpu` row first, then `cpu0..cpuN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Sum of all time buckets.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
            + self.guest
            + self.guest_nice
    }

    /// Sum of all buckets except idle and iowait.
    pub fn active(&self) -> u64 {
        self.total() - self.idle - self.iowait
    }
}

/// Parses the `cpu*` rows of `/proc/stat`.
///
/// Rows must carry at least the first four buckets (user, nice, system,
/// idle); buckets absent on old kernels default to zero.
pub fn parse_cpu_rows(content: &str) -> Result<Vec<CpuTimes>> {
    let mut rows = Vec::new();

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else { continue };
        if !label.starts_with("cpu") {
            continue;
        }

        let fields: Vec<u64> = parts
            .map(|s| {
                s.parse::<u64>().map_err(|_| {
                    MetricError::DataFormat(format!("non-numeric CPU counter {:?} in {:?}", s, line))
                })
            })
            .collect::<Result<_>>()?;
        if fields.len() < 4 {
            return Err(MetricError::DataFormat(format!(
                "truncated CPU row: {:?}",
                line
            )));
        }

        let get = |idx: usize| -> u64 { fields.get(idx).copied().unwrap_or(0) };
        rows.push(CpuTimes {
            user: get(0),
            nice: get(1),
            system: get(2),
            idle: get(3),
            iowait: get(4),
            irq: get(5),
            softirq: get(6),
            steal: get(7),
            guest: get(8),
            guest_nice: get(9),
        });
    }

    Ok(rows)
}

/// Sector counters for one device row of the disk statistics file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskCounters {
    pub device: String,
    pub sectors_read: u64,
    pub sectors_written: u64,
}

/// Parses `/proc/diskstats`.
///
/// Columns (1-indexed): device name in 3, sectors read in 6, sectors
/// written in 10.
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskCounters>> {
    let mut rows = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            return Err(MetricError::DataFormat(format!(
                "truncated diskstats row: {:?}",
                line
            )));
        }

        let counter = |idx: usize| -> Result<u64> {
            parts[idx].parse().map_err(|_| {
                MetricError::DataFormat(format!(
                    "non-numeric diskstats counter {:?} in {:?}",
                    parts[idx], line
                ))
            })
        };

        rows.push(DiskCounters {
            device: parts[2].to_string(),
            sectors_read: counter(5)?,
            sectors_written: counter(9)?,
        });
    }

    Ok(rows)
}

/// Byte counters for one interface row of the network device stats file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetCounters {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Parses `/proc/net/dev`: two header lines, then
/// `ifname: rx_bytes ... tx_bytes ...` with rx in value column 1 and tx in
/// value column 9.
pub fn parse_net_dev(content: &str) -> Result<Vec<NetCounters>> {
    let mut rows = Vec::new();

    for line in content.lines() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }
        let Some((name, rest)) = line.split_once(':') else {
            return Err(MetricError::DataFormat(format!(
                "malformed net device row: {:?}",
                line
            )));
        };

        let values: Vec<&str> = rest.split_whitespace().collect();
        if values.len() < 9 {
            return Err(MetricError::DataFormat(format!(
                "truncated net device row: {:?}",
                line
            )));
        }

        let counter = |idx: usize| -> Result<u64> {
            values[idx].parse().map_err(|_| {
                MetricError::DataFormat(format!(
                    "non-numeric net counter {:?} in {:?}",
                    values[idx], line
                ))
            })
        };

        rows.push(NetCounters {
            interface: name.trim().to_string(),
            rx_bytes: counter(0)?,
            tx_bytes: counter(8)?,
        });
    }

    Ok(rows)
}

/// Memory figures from `/proc/meminfo`, all in KiB as the kernel reports
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub slab: u64,
    pub s_reclaimable: u64,
    pub s_unreclaim: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo`. Unknown keys are ignored.
pub fn parse_meminfo(content: &str) -> Result<MemInfo> {
    let mut info = MemInfo::default();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let field = match key.trim() {
            "MemTotal" => &mut info.mem_total,
            "MemFree" => &mut info.mem_free,
            "MemAvailable" => &mut info.mem_available,
            "Buffers" => &mut info.buffers,
            "Cached" => &mut info.cached,
            "Slab" => &mut info.slab,
            "SReclaimable" => &mut info.s_reclaimable,
            "SUnreclaim" => &mut info.s_unreclaim,
            "SwapTotal" => &mut info.swap_total,
            "SwapFree" => &mut info.swap_free,
            _ => continue,
        };
        *field = rest
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                MetricError::DataFormat(format!("non-numeric meminfo value in {:?}", line))
            })?;
    }

    Ok(info)
}

/// Extracts the per-core `cpu MHz` values from `/proc/cpuinfo`, in
/// processor order.
pub fn parse_cpu_mhz(content: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();

    for line in content.lines() {
        if !line.starts_with("cpu MHz") {
            continue;
        }
        let value = line.split_whitespace().next_back().ok_or_else(|| {
            MetricError::DataFormat(format!("malformed cpu MHz row: {:?}", line))
        })?;
        values.push(value.parse::<f64>().map_err(|_| {
            MetricError::DataFormat(format!("non-numeric cpu MHz value {:?}", value))
        })?);
    }

    Ok(values)
}

/// Parses `/proc/partitions`: two header lines, then partition name in
/// column 4.
pub fn parse_partitions(content: &str) -> Vec<String> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| line.split_whitespace().nth(3))
        .map(|s| s.to_string())
        .collect()
}

/// Parses a power-supply `uevent` file into a key/value map.
///
/// The `POWER_SUPPLY_` prefix is stripped and keys are lowercased, so
/// `POWER_SUPPLY_CHARGE_NOW=3000000` becomes `charge_now -> 3000000`.
pub fn parse_uevent(content: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim_start_matches("POWER_SUPPLY_").to_ascii_lowercase();
            map.insert(key, value.trim().to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_rows_aggregate_and_per_core() {
        let content = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 5000 250 1500 40000 500 100 50 0 0 0
cpu1 5000 250 1500 40000 500 100 50 0 0 0
ctxt 500000
btime 1700000000
";
        let rows = parse_cpu_rows(content).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].user, 10000);
        assert_eq!(rows[0].idle, 80000);
        assert_eq!(rows[1].system, 1500);
        assert_eq!(rows[0].total(), 94800);
        assert_eq!(rows[0].active(), 94800 - 80000 - 1000);
    }

    #[test]
    fn cpu_row_short_kernel_defaults_missing_buckets() {
        // pre-2.6.11 format: no iowait and later buckets
        let rows = parse_cpu_rows("cpu  100 0 50 850\n").unwrap();
        assert_eq!(rows[0].iowait, 0);
        assert_eq!(rows[0].steal, 0);
        assert_eq!(rows[0].total(), 1000);
    }

    #[test]
    fn cpu_row_non_numeric_is_data_format() {
        let err = parse_cpu_rows("cpu  100 x 50 850 0 0 0 0 0 0\n").unwrap_err();
        assert!(matches!(err, MetricError::DataFormat(_)));
    }

    #[test]
    fn cpu_row_truncated_is_data_format() {
        let err = parse_cpu_rows("cpu  100 0\n").unwrap_err();
        assert!(matches!(err, MetricError::DataFormat(_)));
    }

    #[test]
    fn diskstats_extracts_sector_columns() {
        let content = "\
   8       0 sda 1234 0 56789 100 5678 0 98765 200 0 150 300 0 0 0 0
   8       1 sda1 1000 0 50000 80 5000 0 90000 180 0 130 260 0 0 0 0
";
        let rows = parse_diskstats(content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].device, "sda");
        assert_eq!(rows[0].sectors_read, 56789);
        assert_eq!(rows[0].sectors_written, 98765);
        assert_eq!(rows[1].device, "sda1");
        assert_eq!(rows[1].sectors_read, 50000);
    }

    #[test]
    fn diskstats_truncated_row_is_data_format() {
        let err = parse_diskstats("   8       0 sda 1234 0 56789\n").unwrap_err();
        assert!(matches!(err, MetricError::DataFormat(_)));
    }

    #[test]
    fn net_dev_skips_headers_and_extracts_rx_tx() {
        let content = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
  eth0: 9876543     5678    1    2    0     0          0        10 87654321     4321    3    4    0     0       0          0
";
        let rows = parse_net_dev(content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].interface, "lo");
        assert_eq!(rows[0].rx_bytes, 1234567);
        assert_eq!(rows[0].tx_bytes, 1234567);
        assert_eq!(rows[1].interface, "eth0");
        assert_eq!(rows[1].rx_bytes, 9876543);
        assert_eq!(rows[1].tx_bytes, 87654321);
    }

    #[test]
    fn net_dev_truncated_row_is_data_format() {
        let err = parse_net_dev("eth0: 1 2 3\n").unwrap_err();
        assert!(matches!(err, MetricError::DataFormat(_)));
    }

    #[test]
    fn meminfo_values_in_kib() {
        let content = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
Slab:             512000 kB
SReclaimable:     256000 kB
SUnreclaim:       256000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
HugePages_Total:       0
";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.mem_total, 16384000);
        assert_eq!(info.mem_available, 12000000);
        assert_eq!(info.s_unreclaim, 256000);
        assert_eq!(info.swap_free, 4096000);
    }

    #[test]
    fn cpu_mhz_per_core_in_order() {
        let content = "\
processor\t: 0
cpu MHz\t\t: 2400.000
processor\t: 1
cpu MHz\t\t: 2600.000
";
        let values = parse_cpu_mhz(content).unwrap();
        assert_eq!(values, vec![2400.0, 2600.0]);
    }

    #[test]
    fn partitions_column_four() {
        let content = "\
major minor  #blocks  name

   8        0  488386584 sda
   8        1  102400000 sda1
";
        assert_eq!(parse_partitions(content), vec!["sda", "sda1"]);
    }

    #[test]
    fn uevent_strips_prefix_and_lowercases() {
        let map = parse_uevent(
            "POWER_SUPPLY_STATUS=Charging\nPOWER_SUPPLY_CHARGE_NOW=3000000\n",
        );
        assert_eq!(map.get("status").unwrap(), "Charging");
        assert_eq!(map.get("charge_now").unwrap(), "3000000");
    }
}
