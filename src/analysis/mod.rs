/// Envelope analysis core: extrema, interpolation, mean envelope, filtering.
///
/// Architecture:
/// ```text
///   time_ms[], torque[]
///        │
///        ▼
///   ┌──────────┐
///   │ extrema  │  distance-suppressed peaks / troughs
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  pchip   │  one monotone cubic per polarity
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ envelope │  upper, lower, mean at every sample
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  extrema outside the mean envelope
///   └──────────┘
/// ```

pub mod envelope;
pub mod extrema;
pub mod filter;
pub mod pchip;

pub use envelope::{analyze_envelope, Envelope, EnvelopeAnalysis, EnvelopeConfig};
pub use extrema::{find_peaks, find_troughs, PlateauPolicy};
pub use filter::{filter_peaks, filter_troughs, ExtremePoint};
pub use pchip::MonotoneCubic;
