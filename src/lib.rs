//! Linux system metrics from `/proc` and `/sys`.
//!
//! The crate reads kernel pseudo-files and turns their raw counters into
//! usable figures: CPU load and frequency, disk and network throughput,
//! memory usage, temperatures, and battery state.
//!
//! Three layers compose into each metric:
//!
//! * [`collector`] — sources that read and parse one pseudo-file per call,
//!   generic over a [`collector::FileSystem`] seam so tests run against an
//!   in-memory tree.
//! * [`sampler`] — turns consecutive counter snapshots into windows with a
//!   measured elapsed time. Pass a nonzero interval for a blocking
//!   read-sleep-read measurement, or zero to measure since the previous
//!   call.
//! * [`units`] — byte, frequency, and temperature scale conversion applied
//!   to the deltas, including an `auto` unit picker.
//!
//! ```no_run
//! use std::time::Duration;
//! use procglot::metrics::CpuLoad;
//!
//! let mut cpu = CpuLoad::new();
//! let load = cpu.load_percent(Duration::from_millis(200), 2)?;
//! println!("cpu: {load}%");
//! # Ok::<(), procglot::MetricError>(())
//! ```

pub mod collector;
pub mod error;
pub mod metrics;
pub mod sampler;
pub mod units;

pub use error::{MetricError, Result};
pub use units::{ByteScale, ByteValue, FreqScale, TempScale};
