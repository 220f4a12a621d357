//! Counter sources reading Linux `/proc` and `/sys` pseudo-files.

pub mod cpu;
pub mod disk;
pub mod net;
pub mod parser;

pub use cpu::CpuStatSource;
pub use disk::{DiskBytes, DiskStatSource};
pub use net::{NetBytes, NetDevSource};
pub use parser::CpuTimes;
