//! Counter collection: the filesystem seam and the `/proc`//`/sys` readers.

pub mod mock;
pub mod procfs;
pub mod traits;

pub use traits::{FileSystem, RealFs};

use crate::error::Result;

/// A reader of monotonically increasing kernel counters.
///
/// Every call re-reads the underlying pseudo-file; sources hold no history.
/// Rate computation over consecutive snapshots is the sampler's job.
pub trait CounterSource {
    /// One full read of the source's counters.
    type Snapshot: Clone;

    /// Reads the current counter values.
    ///
    /// Takes `&mut self` so a source can populate lazily derived constants
    /// (e.g. per-device block sizes) on first use.
    fn snapshot(&mut self) -> Result<Self::Snapshot>;
}
