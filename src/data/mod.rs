/// Data layer: trace model, loading, and result export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  lenient rows → TorqueTrace (time in ms)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ TorqueTrace │  time_ms[], torque[]  ──▶  analysis
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export  │  envelope CSV, extremes CSV, JSON report, data_mod.csv
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
