use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_envelope, EnvelopeAnalysis, EnvelopeConfig};
use crate::error::{AnalysisError, LoadError};

// ---------------------------------------------------------------------------
// TimeUnit – unit of a numeric time column
// ---------------------------------------------------------------------------

/// Unit of a numeric time column. Everything is converted to milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Length of one unit in milliseconds.
    pub fn millis_per_unit(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1e3,
            TimeUnit::Milliseconds => 1.0,
            TimeUnit::Microseconds => 1e-3,
            TimeUnit::Nanoseconds => 1e-6,
            TimeUnit::Minutes => 60e3,
            TimeUnit::Hours => 3600e3,
        }
    }

    pub fn to_millis(self, value: f64) -> f64 {
        value * self.millis_per_unit()
    }
}

impl FromStr for TimeUnit {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" => Ok(TimeUnit::Seconds),
            "ms" => Ok(TimeUnit::Milliseconds),
            "us" | "µs" => Ok(TimeUnit::Microseconds),
            "ns" => Ok(TimeUnit::Nanoseconds),
            "m" | "min" => Ok(TimeUnit::Minutes),
            "h" | "hr" | "hrs" => Ok(TimeUnit::Hours),
            _ => Err(LoadError::UnsupportedTimeUnit(s.to_string())),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "us",
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Minutes => "min",
            TimeUnit::Hours => "h",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// TorqueTrace – the loaded signal
// ---------------------------------------------------------------------------

/// Time (ms) and torque columns, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorqueTrace {
    pub time_ms: Vec<f64>,
    /// Same length as `time_ms`.
    pub torque: Vec<f64>,
}

impl TorqueTrace {
    pub fn push(&mut self, time_ms: f64, torque: f64) {
        self.time_ms.push(time_ms);
        self.torque.push(torque);
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time_ms.len()
    }

    /// Whether the trace is empty.
    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }

    /// Run the envelope analysis on this trace.
    pub fn analyze(&self, config: &EnvelopeConfig) -> Result<EnvelopeAnalysis, AnalysisError> {
        analyze_envelope(&self.time_ms, &self.torque, config)
    }
}
