//! Unit and scale conversion engine.
//!
//! All pure conversion functions (no I/O, no state) live here. Every metric
//! facade funnels its output through these so rounding and scale logic exist
//! in exactly one place.
//!
//! Byte scales cover decimal (kB/MB/GB/TB), binary (KiB/MiB/GiB/TiB), raw
//! bytes, and an `auto` policy that picks the largest binary unit for which
//! the magnitude is still >= 1. Frequency conversion takes MHz input,
//! temperature conversion takes milli-degrees Celsius input.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{MetricError, Result};

/// Rounds `value` to `precision` decimal places.
pub(crate) fn round_to(value: f64, precision: u32) -> f64 {
    let p = 10f64.powi(precision as i32);
    (value * p).round() / p
}

// ---------------------------------------------------------------------------
// Byte scales
// ---------------------------------------------------------------------------

/// Recognized byte scale tokens. Parses case-insensitively from strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteScale {
    /// Raw bytes.
    Bytes,
    /// Decimal kilobyte, 10^3 bytes.
    Kb,
    /// Decimal megabyte, 10^6 bytes.
    Mb,
    /// Decimal gigabyte, 10^9 bytes.
    Gb,
    /// Decimal terabyte, 10^12 bytes.
    Tb,
    /// Binary kibibyte, 2^10 bytes.
    Kib,
    /// Binary mebibyte, 2^20 bytes.
    Mib,
    /// Binary gibibyte, 2^30 bytes.
    Gib,
    /// Binary tebibyte, 2^40 bytes.
    Tib,
    /// Per-value unit selection; only valid as an output scale.
    Auto,
}

impl ByteScale {
    /// Bytes per unit, or `None` for [`ByteScale::Auto`].
    fn factor(self) -> Option<f64> {
        match self {
            ByteScale::Bytes => Some(1.0),
            ByteScale::Kb => Some(1e3),
            ByteScale::Mb => Some(1e6),
            ByteScale::Gb => Some(1e9),
            ByteScale::Tb => Some(1e12),
            ByteScale::Kib => Some(1024.0),
            ByteScale::Mib => Some(1024.0 * 1024.0),
            ByteScale::Gib => Some(1024.0 * 1024.0 * 1024.0),
            ByteScale::Tib => Some(1024.0 * 1024.0 * 1024.0 * 1024.0),
            ByteScale::Auto => None,
        }
    }

    /// Canonical unit label for display.
    pub fn label(self) -> &'static str {
        match self {
            ByteScale::Bytes => "bytes",
            ByteScale::Kb => "kB",
            ByteScale::Mb => "MB",
            ByteScale::Gb => "GB",
            ByteScale::Tb => "TB",
            ByteScale::Kib => "KiB",
            ByteScale::Mib => "MiB",
            ByteScale::Gib => "GiB",
            ByteScale::Tib => "TiB",
            ByteScale::Auto => "auto",
        }
    }
}

impl FromStr for ByteScale {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "bytes" => Ok(ByteScale::Bytes),
            "kb" => Ok(ByteScale::Kb),
            "mb" => Ok(ByteScale::Mb),
            "gb" => Ok(ByteScale::Gb),
            "tb" => Ok(ByteScale::Tb),
            "kib" => Ok(ByteScale::Kib),
            "mib" => Ok(ByteScale::Mib),
            "gib" => Ok(ByteScale::Gib),
            "tib" => Ok(ByteScale::Tib),
            "auto" => Ok(ByteScale::Auto),
            _ => Err(MetricError::UnsupportedScale(s.to_string())),
        }
    }
}

/// A converted byte magnitude, tagged by how it was produced.
///
/// Raw-byte output keeps the integer type, fixed scales yield a rounded
/// float, and `auto` output carries the unit that was picked for the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ByteValue {
    /// Integer magnitude, output scale was raw bytes.
    Bytes(u64),
    /// Rounded magnitude in the fixed output scale the caller requested.
    Scaled(f64),
    /// Rounded magnitude plus the auto-selected unit label.
    Auto { value: f64, unit: &'static str },
}

impl ByteValue {
    /// The numeric magnitude regardless of variant.
    pub fn magnitude(&self) -> f64 {
        match self {
            ByteValue::Bytes(v) => *v as f64,
            ByteValue::Scaled(v) => *v,
            ByteValue::Auto { value, .. } => *value,
        }
    }
}

impl fmt::Display for ByteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteValue::Bytes(v) => write!(f, "{}", v),
            ByteValue::Scaled(v) => write!(f, "{}", v),
            ByteValue::Auto { value, unit } => write!(f, "{} {}", value, unit),
        }
    }
}

/// Picks the auto-scale unit for a raw byte magnitude: largest-first
/// thresholds at 2^40, 2^30, 2^20, 2^10, else raw bytes.
fn auto_scale(bytes: f64) -> ByteScale {
    if bytes >= (1u64 << 40) as f64 {
        ByteScale::Tib
    } else if bytes >= (1u64 << 30) as f64 {
        ByteScale::Gib
    } else if bytes >= (1u64 << 20) as f64 {
        ByteScale::Mib
    } else if bytes >= (1u64 << 10) as f64 {
        ByteScale::Kib
    } else {
        ByteScale::Bytes
    }
}

/// Converts a magnitude from `scale_in` to `scale_out`, rounding to
/// `precision` decimals last.
///
/// `Auto` as the input scale is an [`MetricError::UnsupportedScale`] error;
/// as the output scale it selects the unit per value and yields
/// [`ByteValue::Auto`].
pub fn convert_bytes(
    value: f64,
    scale_in: ByteScale,
    scale_out: ByteScale,
    precision: u32,
) -> Result<ByteValue> {
    let Some(factor_in) = scale_in.factor() else {
        return Err(MetricError::UnsupportedScale(scale_in.label().to_string()));
    };
    let bytes = value * factor_in;

    let out = if scale_out == ByteScale::Auto {
        auto_scale(bytes)
    } else {
        scale_out
    };
    // factor() is Some for everything except Auto, which was just resolved
    let scaled = bytes / out.factor().unwrap_or(1.0);

    Ok(match (out, scale_out) {
        (ByteScale::Bytes, ByteScale::Auto) => ByteValue::Auto {
            value: bytes.max(0.0).trunc(),
            unit: "bytes",
        },
        (_, ByteScale::Auto) => ByteValue::Auto {
            value: round_to(scaled, precision),
            unit: out.label(),
        },
        (ByteScale::Bytes, _) => ByteValue::Bytes(bytes.max(0.0) as u64),
        _ => ByteValue::Scaled(round_to(scaled, precision)),
    })
}

/// Converts a same-window pair (read/write, rx/tx) in one call. The auto
/// unit, if requested, is still chosen independently per value.
pub fn convert_bytes_pair(
    values: (f64, f64),
    scale_in: ByteScale,
    scale_out: ByteScale,
    precision: u32,
) -> Result<(ByteValue, ByteValue)> {
    Ok((
        convert_bytes(values.0, scale_in, scale_out, precision)?,
        convert_bytes(values.1, scale_in, scale_out, precision)?,
    ))
}

// ---------------------------------------------------------------------------
// Frequency scales
// ---------------------------------------------------------------------------

/// Recognized frequency scale tokens. Input values are always MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FreqScale {
    Hz,
    Khz,
    Mhz,
    Ghz,
}

impl FromStr for FreqScale {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hz" => Ok(FreqScale::Hz),
            "khz" => Ok(FreqScale::Khz),
            "mhz" => Ok(FreqScale::Mhz),
            "ghz" => Ok(FreqScale::Ghz),
            _ => Err(MetricError::UnsupportedScale(s.to_string())),
        }
    }
}

/// Converts a frequency from MHz to the requested scale.
pub fn convert_frequency(mhz: f64, scale: FreqScale) -> f64 {
    match scale {
        FreqScale::Mhz => mhz,
        FreqScale::Ghz => mhz / 1e3,
        FreqScale::Khz => mhz * 1e3,
        FreqScale::Hz => mhz * 1e6,
    }
}

// ---------------------------------------------------------------------------
// Temperature scales
// ---------------------------------------------------------------------------

/// Recognized temperature scale tokens. Input values are milli-degrees
/// Celsius, as exposed by hwmon input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TempScale {
    Celsius,
    Fahrenheit,
    Kelvin,
    Rankine,
}

impl FromStr for TempScale {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "celsius" => Ok(TempScale::Celsius),
            "fahrenheit" => Ok(TempScale::Fahrenheit),
            "kelvin" => Ok(TempScale::Kelvin),
            "rankine" => Ok(TempScale::Rankine),
            _ => Err(MetricError::UnsupportedScale(s.to_string())),
        }
    }
}

/// Converts milli-degrees Celsius to the requested scale, rounded to
/// `precision` decimals.
pub fn convert_temperature(milli_degrees_c: f64, scale: TempScale, precision: u32) -> f64 {
    let c = milli_degrees_c / 1000.0;
    let r = match scale {
        TempScale::Celsius => c,
        TempScale::Fahrenheit => 9.0 / 5.0 * c + 32.0,
        TempScale::Kelvin => c + 273.15,
        TempScale::Rankine => 9.0 / 5.0 * c + 482.67,
    };
    round_to(r, precision)
}
