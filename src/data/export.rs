use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::{TimeUnit, TorqueTrace};
use crate::analysis::{EnvelopeAnalysis, EnvelopeConfig, ExtremePoint};

// ---------------------------------------------------------------------------
// Envelope / extrema CSV
// ---------------------------------------------------------------------------

/// One row per sample: the trace next to its upper, lower and mean envelopes.
pub fn write_envelope_csv(trace: &TorqueTrace, analysis: &EnvelopeAnalysis, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_envelope_rows(trace, analysis, file)
}

pub fn write_envelope_rows<W: Write>(trace: &TorqueTrace, analysis: &EnvelopeAnalysis, out: W) -> Result<()> {
    let env = &analysis.envelope;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "time_ms",
        "torque",
        "upper_envelope",
        "lower_envelope",
        "mean_envelope",
    ])?;
    for i in 0..trace.len() {
        writer.write_record([
            trace.time_ms[i].to_string(),
            trace.torque[i].to_string(),
            env.upper[i].to_string(),
            env.lower[i].to_string(),
            env.mean[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Filtered peaks followed by filtered troughs, each in time order.
pub fn write_extremes_csv(analysis: &EnvelopeAnalysis, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_extremes_rows(analysis, file)
}

pub fn write_extremes_rows<W: Write>(analysis: &EnvelopeAnalysis, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["kind", "index", "time_ms", "torque"])?;
    let tagged = analysis
        .filtered_peaks
        .iter()
        .map(|p| ("peak", p))
        .chain(analysis.filtered_troughs.iter().map(|p| ("trough", p)));
    for (kind, p) in tagged {
        writer.write_record([
            kind.to_string(),
            p.index.to_string(),
            p.time_ms.to_string(),
            p.value.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

/// Summary of one run, without the per-sample envelope arrays.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub source: String,
    pub time_unit: TimeUnit,
    pub config: &'a EnvelopeConfig,
    pub samples: usize,
    pub peaks_detected: usize,
    pub troughs_detected: usize,
    pub filtered_peaks: &'a [ExtremePoint],
    pub filtered_troughs: &'a [ExtremePoint],
}

impl<'a> AnalysisReport<'a> {
    pub fn new(
        source: &Path,
        time_unit: TimeUnit,
        config: &'a EnvelopeConfig,
        analysis: &'a EnvelopeAnalysis,
    ) -> Self {
        Self {
            source: source.display().to_string(),
            time_unit,
            config,
            samples: analysis.envelope.len(),
            peaks_detected: analysis.peaks.len(),
            troughs_detected: analysis.troughs.len(),
            filtered_peaks: &analysis.filtered_peaks,
            filtered_troughs: &analysis.filtered_troughs,
        }
    }
}

pub fn write_report_json(report: &AnalysisReport<'_>, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, report).context("writing JSON report")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// All requested outputs of one run
// ---------------------------------------------------------------------------

/// Destinations for the analysis outputs; `None` skips that file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputPaths {
    pub envelope_csv: Option<PathBuf>,
    pub extremes_csv: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl OutputPaths {
    pub fn is_empty(&self) -> bool {
        self.envelope_csv.is_none() && self.extremes_csv.is_none() && self.report.is_none()
    }
}

/// Write every file named in `paths`; stops at the first failure.
pub fn write_outputs(
    paths: &OutputPaths,
    source: &Path,
    trace: &TorqueTrace,
    time_unit: TimeUnit,
    config: &EnvelopeConfig,
    analysis: &EnvelopeAnalysis,
) -> Result<()> {
    if let Some(path) = &paths.envelope_csv {
        write_envelope_csv(trace, analysis, path)?;
        log::info!("wrote envelope to {}", path.display());
    }
    if let Some(path) = &paths.extremes_csv {
        write_extremes_csv(analysis, path)?;
        log::info!("wrote filtered extremes to {}", path.display());
    }
    if let Some(path) = &paths.report {
        let report = AnalysisReport::new(source, time_unit, config, analysis);
        write_report_json(&report, path)?;
        log::info!("wrote report to {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Normalized trace
// ---------------------------------------------------------------------------

/// `time_ms,torque` with 3 and 20 decimal places.
pub fn write_normalized_csv(trace: &TorqueTrace, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_normalized_rows(trace, file)
}

pub fn write_normalized_rows<W: Write>(trace: &TorqueTrace, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["time_ms", "torque"])?;
    for (t, q) in trace.time_ms.iter().zip(&trace.torque) {
        writer.write_record([format!("{t:.3}"), format!("{q:.20}")])?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Column dump
// ---------------------------------------------------------------------------

/// Tab-separated `time_ms<TAB>torque` lines. `None` prints the raw value.
pub fn print_columns<W: Write>(
    trace: &TorqueTrace,
    time_precision: Option<usize>,
    torque_precision: Option<usize>,
    mut out: W,
) -> Result<()> {
    for (&t, &q) in trace.time_ms.iter().zip(&trace.torque) {
        writeln!(out, "{}\t{}", fmt_value(t, time_precision), fmt_value(q, torque_precision))?;
    }
    Ok(())
}

fn fmt_value(v: f64, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{v:.p$}"),
        None => fmt_raw(v),
    }
}

/// Shortest round-trip text with a fixed/scientific switch at 1e-4 and 1e16,
/// and a signed exponent of at least two digits (`1e+20`, `1.5e-07`).
fn fmt_raw(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        let text = if v > 0.0 { "inf" } else { "-inf" };
        return text.to_string();
    }

    let sci = format!("{v:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if v != 0.0 && !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exp.abs());
    }

    let fixed = v.to_string();
    if fixed.contains('.') {
        fixed
    } else {
        fixed + ".0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Envelope;

    fn sample() -> (TorqueTrace, EnvelopeAnalysis) {
        let trace = TorqueTrace {
            time_ms: vec![0.0, 1.0, 2.0],
            torque: vec![1.0, -1.0, 1.5],
        };
        let analysis = EnvelopeAnalysis {
            peaks: vec![0, 2],
            troughs: vec![1],
            envelope: Envelope {
                upper: vec![1.0, 1.25, 1.5],
                lower: vec![-1.0, -1.0, -1.0],
                mean: vec![0.0, 0.125, 0.25],
            },
            filtered_peaks: vec![ExtremePoint {
                index: 2,
                time_ms: 2.0,
                value: 1.5,
            }],
            filtered_troughs: vec![ExtremePoint {
                index: 1,
                time_ms: 1.0,
                value: -1.0,
            }],
        };
        (trace, analysis)
    }

    #[test]
    fn test_envelope_rows() {
        let (trace, analysis) = sample();
        let mut buf = Vec::new();
        write_envelope_rows(&trace, &analysis, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_ms,torque,upper_envelope,lower_envelope,mean_envelope");
        assert_eq!(lines[2], "1,-1,1.25,-1,0.125");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_extremes_rows() {
        let (_, analysis) = sample();
        let mut buf = Vec::new();
        write_extremes_rows(&analysis, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "kind,index,time_ms,torque\npeak,2,2,1.5\ntrough,1,1,-1\n");
    }

    #[test]
    fn test_normalized_rows() {
        let trace = TorqueTrace {
            time_ms: vec![1.23456],
            torque: vec![0.5],
        };
        let mut buf = Vec::new();
        write_normalized_rows(&trace, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "time_ms,torque\n1.235,0.50000000000000000000\n"
        );
    }

    #[test]
    fn test_print_columns_precision() {
        let trace = TorqueTrace {
            time_ms: vec![1000.0],
            torque: vec![2.5],
        };
        let mut buf = Vec::new();
        print_columns(&trace, Some(3), None, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1000.000\t2.5\n");

        let mut buf = Vec::new();
        print_columns(&trace, None, Some(1), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1000.0\t2.5\n");
    }

    #[test]
    fn test_raw_values_use_signed_two_digit_exponents() {
        assert_eq!(fmt_raw(1e20), "1e+20");
        assert_eq!(fmt_raw(1e-7), "1e-07");
        assert_eq!(fmt_raw(-1.5e-7), "-1.5e-07");
        assert_eq!(fmt_raw(1e16), "1e+16");
        assert_eq!(fmt_raw(1.234e100), "1.234e+100");
        assert_eq!(fmt_raw(1e15), "1000000000000000.0");
        assert_eq!(fmt_raw(0.0001), "0.0001");
        assert_eq!(fmt_raw(0.1), "0.1");
        assert_eq!(fmt_raw(1000.0), "1000.0");
        assert_eq!(fmt_raw(0.0), "0.0");
        assert_eq!(fmt_raw(-0.0), "-0.0");
        assert_eq!(fmt_raw(f64::NAN), "nan");
        assert_eq!(fmt_raw(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_write_outputs_creates_requested_files() {
        let (trace, analysis) = sample();
        let config = EnvelopeConfig::default();
        let dir = std::env::temp_dir().join(format!("torque_envelope_outputs_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let paths = OutputPaths {
            envelope_csv: Some(dir.join("envelope.csv")),
            extremes_csv: None,
            report: Some(dir.join("report.json")),
        };
        assert!(!paths.is_empty());
        write_outputs(&paths, Path::new("data.csv"), &trace, TimeUnit::Seconds, &config, &analysis).unwrap();

        let envelope = std::fs::read_to_string(dir.join("envelope.csv")).unwrap();
        assert_eq!(envelope.lines().count(), 4);
        assert!(!dir.join("extremes.csv").exists());
        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("report.json")).unwrap()).unwrap();
        assert_eq!(report["source"], "data.csv");
        assert_eq!(report["filtered_peaks"][0]["index"], 2);

        let missing_dir = OutputPaths {
            extremes_csv: Some(dir.join("no_such_dir").join("extremes.csv")),
            ..Default::default()
        };
        assert!(write_outputs(&missing_dir, Path::new("data.csv"), &trace, TimeUnit::Seconds, &config, &analysis).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_report_serializes() {
        let (_, analysis) = sample();
        let config = EnvelopeConfig::default();
        let report = AnalysisReport::new(Path::new("data.csv"), TimeUnit::Seconds, &config, &analysis);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["samples"], 3);
        assert_eq!(json["peaks_detected"], 2);
        assert_eq!(json["config"]["min_peak_distance"], 50);
        assert_eq!(json["config"]["plateaus"], "strict");
        assert_eq!(json["filtered_troughs"][0]["index"], 1);
    }
}
