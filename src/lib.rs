//! Mean-envelope analysis of torque-vs-time traces.
//!
//! [`data`] turns CSV/JSON/Parquet files into a [`TorqueTrace`] and writes
//! results back out; [`analysis`] does the numeric work.

pub mod analysis;
pub mod data;
pub mod error;

pub use analysis::{analyze_envelope, EnvelopeAnalysis, EnvelopeConfig, PlateauPolicy};
pub use data::model::{TimeUnit, TorqueTrace};
pub use error::{AnalysisError, LoadError};
