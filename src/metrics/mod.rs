//! Metric facades: counter source, sampler, and scale conversion composed
//! behind one type per subsystem.

pub mod battery;
pub mod cpu;
pub mod disk;
pub mod memory;
pub mod net;
pub mod thermal;

pub use battery::{Battery, BatteryIdentity};
pub use cpu::{CpuFreq, CpuLoad};
pub use disk::DiskIo;
pub use memory::Memory;
pub use net::NetIo;
pub use thermal::Thermal;
