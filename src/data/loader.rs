use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{TimeUnit, TorqueTrace};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a torque trace from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` / no extension – first column time, second column torque
/// * `.json`    – `[{ "time": ..., "torque": ... }, ...]`
/// * `.parquet` – first column time, second column torque
///
/// Rows that cannot be read are skipped rather than failing the load.
pub fn load_file(path: &Path, unit: TimeUnit) -> Result<TorqueTrace> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let trace = match ext.as_str() {
        "" | "csv" | "txt" => load_csv(path, unit)?,
        "json" => load_json(path, unit)?,
        "parquet" | "pq" => load_parquet(path, unit)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string()).into()),
    };
    log::info!(
        "loaded {} samples from {} (numeric time in {unit})",
        trace.len(),
        path.display()
    );
    Ok(trace)
}

// ---------------------------------------------------------------------------
// Row parsing shared by every format
// ---------------------------------------------------------------------------

/// Timestamps may carry an offset or not; the two kinds cannot be subtracted.
#[derive(Debug, Clone, Copy)]
enum Stamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M%:z",
];

fn parse_stamp(s: &str) -> Option<Stamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Stamp::Aware(dt));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(Stamp::Aware(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Stamp::Naive(dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Stamp::Naive)
}

/// Turns raw (time, torque) cells into samples.
///
/// The first timestamp seen anchors t = 0; later timestamps become elapsed
/// milliseconds. Cells that are not timestamps are numbers in `unit`.
#[derive(Debug)]
pub struct RowReader {
    unit: TimeUnit,
    anchor: Option<Stamp>,
    skipped: usize,
}

impl RowReader {
    pub fn new(unit: TimeUnit) -> Self {
        Self {
            unit,
            anchor: None,
            skipped: 0,
        }
    }

    /// Rows rejected so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Parse one row; `None` (and a bump of the skip counter) if either cell
    /// is unusable.
    pub fn read(&mut self, time: &str, torque: &str) -> Option<(f64, f64)> {
        let sample = self
            .time_ms(time)
            .and_then(|t| torque.trim().parse::<f64>().ok().map(|q| (t, q)));
        if sample.is_none() {
            self.skipped += 1;
            log::debug!("skipping row ({time:?}, {torque:?})");
        }
        sample
    }

    fn time_ms(&mut self, cell: &str) -> Option<f64> {
        let cell = cell.trim();
        if let Some(stamp) = parse_stamp(cell) {
            let anchor = *self.anchor.get_or_insert(stamp);
            let elapsed = match (anchor, stamp) {
                (Stamp::Naive(a), Stamp::Naive(b)) => b - a,
                (Stamp::Aware(a), Stamp::Aware(b)) => b - a,
                // Mixed kinds have no defined difference; the row is dropped.
                _ => return None,
            };
            return elapsed
                .num_microseconds()
                .map(|us| us as f64 / 1000.0);
        }
        cell.parse::<f64>().ok().map(|v| self.unit.to_millis(v))
    }

    fn finish(&self, trace: &TorqueTrace) {
        if self.skipped > 0 {
            log::warn!(
                "skipped {} unreadable rows ({} samples kept)",
                self.skipped,
                trace.len()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: no header required, first column time, second torque.
/// Extra columns are ignored; header and malformed rows are skipped.
fn load_csv(path: &Path, unit: TimeUnit) -> Result<TorqueTrace> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    read_csv(file, unit)
}

/// Parse CSV text from any reader with the lenient row rules of [`RowReader`].
pub fn read_csv<R: std::io::Read>(input: R, unit: TimeUnit) -> Result<TorqueTrace> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = RowReader::new(unit);
    let mut trace = TorqueTrace::default();

    for (row_no, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(e).with_context(|| format!("CSV row {row_no}"));
            }
            Err(e) => {
                log::debug!("CSV row {row_no}: {e}");
                rows.skipped += 1;
                continue;
            }
        };
        if record.len() < 2 {
            rows.skipped += 1;
            continue;
        }

        let mut time = record.get(0).unwrap_or("");
        if row_no == 0 {
            time = time.trim_start_matches('\u{feff}');
        }
        if let Some((t, q)) = rows.read(time, record.get(1).unwrap_or("")) {
            trace.push(t, q);
        }
    }

    rows.finish(&trace);
    Ok(trace)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "time": 0.000, "torque": 12.5 },
///   { "time": "2024-05-01T10:00:00.010", "torque": 12.7 },
///   ...
/// ]
/// ```
fn load_json(path: &Path, unit: TimeUnit) -> Result<TorqueTrace> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut rows = RowReader::new(unit);
    let mut trace = TorqueTrace::default();

    for rec in records {
        let time = rec.get("time").map(json_cell).unwrap_or_default();
        let torque = rec.get("torque").map(json_cell).unwrap_or_default();
        if let Some((t, q)) = rows.read(&time, &torque) {
            trace.push(t, q);
        }
    }

    rows.finish(&trace);
    Ok(trace)
}

fn json_cell(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        // Anything else fails to parse and the record is skipped.
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file whose first two columns hold time and torque.
///
/// Numeric columns (Float64/Float32/Int64/Int32) and string columns are
/// accepted; string time cells may be timestamps.
fn load_parquet(path: &Path, unit: TimeUnit) -> Result<TorqueTrace> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = RowReader::new(unit);
    let mut trace = TorqueTrace::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        if batch.num_columns() < 2 {
            anyhow::bail!("Parquet file needs at least two columns, found {}", batch.num_columns());
        }
        let time_col = batch.column(0);
        let torque_col = batch.column(1);

        for row in 0..batch.num_rows() {
            let time = arrow_cell(time_col, row);
            let torque = arrow_cell(torque_col, row);
            if let Some((t, q)) = rows.read(&time, &torque) {
                trace.push(t, q);
            }
        }
    }

    rows.finish(&trace);
    Ok(trace)
}

/// Render a single Arrow cell as text for the shared row parser.
fn arrow_cell(col: &ArrayRef, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        _ => None,
    }
    .unwrap_or_default()
}
