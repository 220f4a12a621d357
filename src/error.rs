//! Error taxonomy shared by all collectors, samplers, and facades.
//!
//! File-read and parse failures are wrapped into these variants at the
//! collector boundary; the sampler and the facades propagate them unchanged.

use std::io;

/// Error type for metric collection and conversion failures.
#[derive(Debug)]
pub enum MetricError {
    /// Requested resource (partition, interface, sensor, CPU row) was absent
    /// from the source file at read time.
    NotFound {
        /// What was looked for (e.g. "sda1", "eth0", "coretemp").
        value: String,
        /// The pseudo-file or directory that was searched.
        source: String,
    },
    /// A line or field did not parse as expected (non-numeric counter,
    /// truncated row).
    DataFormat(String),
    /// A scale token outside the recognized enumeration.
    UnsupportedScale(String),
    /// A sampling pass produced zero usable rows.
    NoData(String),
    /// I/O error other than not-found while reading a source file.
    Io(io::Error),
}

impl std::fmt::Display for MetricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricError::NotFound { value, source } => {
                write!(f, "{} not found in {}", value, source)
            }
            MetricError::DataFormat(msg) => write!(f, "data format error: {}", msg),
            MetricError::UnsupportedScale(token) => write!(f, "unsupported scale: {}", token),
            MetricError::NoData(what) => write!(f, "no data: {}", what),
            MetricError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for MetricError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MetricError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MetricError {
    fn from(e: io::Error) -> Self {
        MetricError::Io(e)
    }
}

impl MetricError {
    /// Wraps an I/O error from reading `source` while looking for `value`.
    ///
    /// `NotFound` I/O errors become the domain `NotFound` variant so callers
    /// see the resource name rather than a bare OS error.
    pub(crate) fn from_read(e: io::Error, value: &str, source: &str) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            MetricError::NotFound {
                value: value.to_string(),
                source: source.to_string(),
            }
        } else {
            MetricError::Io(e)
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MetricError>;
