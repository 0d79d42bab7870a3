use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

use torque_envelope::data::export::{print_columns, write_normalized_csv, write_outputs, OutputPaths};
use torque_envelope::data::loader::load_file;
use torque_envelope::{
    AnalysisError, EnvelopeAnalysis, EnvelopeConfig, PlateauPolicy, TimeUnit, TorqueTrace,
};

const NO_DATA_EXIT: i32 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mean envelope and filtered extremes of torque traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the mean envelope and the extrema lying outside it
    Analyze(AnalyzeArgs),
    /// Print time (ms) and torque, write data_mod.csv, then analyze
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// CSV/JSON/Parquet file; first column time, second torque
    #[arg(default_value = "data.csv", value_hint = ValueHint::FilePath)]
    path: PathBuf,

    /// Unit of the time column when numeric: s, ms, us, ns, min, h
    #[arg(long, default_value = "s")]
    time_unit: String,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Per-sample envelope CSV output
    #[arg(long, value_hint = ValueHint::FilePath)]
    envelope_csv: Option<PathBuf>,

    /// Filtered peaks/troughs CSV output
    #[arg(long, value_hint = ValueHint::FilePath)]
    extremes_csv: Option<PathBuf>,

    /// JSON summary output
    #[arg(long, value_hint = ValueHint::FilePath)]
    report: Option<PathBuf>,
}

impl OutputArgs {
    fn paths(&self) -> OutputPaths {
        OutputPaths {
            envelope_csv: self.envelope_csv.clone(),
            extremes_csv: self.extremes_csv.clone(),
            report: self.report.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Plateaus {
    Strict,
    Midpoint,
}

impl From<Plateaus> for PlateauPolicy {
    fn from(p: Plateaus) -> Self {
        match p {
            Plateaus::Strict => PlateauPolicy::Strict,
            Plateaus::Midpoint => PlateauPolicy::Midpoint,
        }
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Minimum distance between peaks (in samples)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    min_peak_distance: u64,

    /// Treatment of flat-topped extrema
    #[arg(long, value_enum, default_value_t = Plateaus::Strict)]
    plateaus: Plateaus,

    /// Build the upper and lower envelopes on one thread
    #[arg(long)]
    sequential: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct DumpArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Decimal places for both columns; overrides the per-column options
    #[arg(long, allow_negative_numbers = true)]
    precision: Option<i32>,

    /// Decimal places for time in ms; -1 for raw
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    time_precision: i32,

    /// Decimal places for torque; -1 for raw
    #[arg(long, default_value_t = 18, allow_negative_numbers = true)]
    torque_precision: i32,

    /// Minimum distance between peaks (in samples) for the envelope analysis
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    min_peak_distance: u64,

    /// Skip writing data_mod.csv
    #[arg(long)]
    no_normalized: bool,

    /// Skip the envelope analysis
    #[arg(long)]
    no_analysis: bool,

    #[command(flatten)]
    output: OutputArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Dump(args) => handle_dump(args),
    }
}

fn load_input(input: &InputArgs) -> Result<(TorqueTrace, TimeUnit)> {
    if !input.path.exists() {
        bail!("input file not found: {}", input.path.display());
    }
    let unit: TimeUnit = input.time_unit.parse()?;
    let trace = load_file(&input.path, unit)
        .with_context(|| format!("loading {}", input.path.display()))?;
    if trace.is_empty() {
        log::error!("No data found to analyze.");
        std::process::exit(NO_DATA_EXIT);
    }
    Ok((trace, unit))
}

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let (trace, unit) = load_input(&args.input)?;
    let config = EnvelopeConfig {
        min_peak_distance: args.min_peak_distance as usize,
        plateaus: args.plateaus.into(),
        parallel: !args.sequential,
    };

    let analysis = match trace.analyze(&config) {
        Ok(analysis) => analysis,
        Err(AnalysisError::InsufficientExtrema { peaks, troughs }) => {
            log::warn!(
                "Not enough peaks/troughs to interpolate envelopes ({peaks} peaks, {troughs} troughs). \
                 Try lowering min_peak_distance."
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("envelope analysis failed"),
    };

    save_outputs(&args.output, &args.input, &trace, unit, &config, &analysis)
}

fn save_outputs(
    output: &OutputArgs,
    input: &InputArgs,
    trace: &TorqueTrace,
    unit: TimeUnit,
    config: &EnvelopeConfig,
    analysis: &EnvelopeAnalysis,
) -> Result<()> {
    write_outputs(&output.paths(), &input.path, trace, unit, config, analysis)
        .context("writing analysis outputs")
}

fn handle_dump(args: DumpArgs) -> Result<()> {
    let (trace, unit) = load_input(&args.input)?;

    let (time_precision, torque_precision) = match args.precision {
        Some(p) => (p, p),
        None => (args.time_precision, args.torque_precision),
    };
    print_columns(
        &trace,
        non_negative(time_precision),
        non_negative(torque_precision),
        io::stdout().lock(),
    )?;

    if !args.no_normalized {
        let out_path = normalized_path(&args.input.path);
        match write_normalized_csv(&trace, &out_path) {
            Ok(()) => log::info!("wrote {}", out_path.display()),
            Err(e) => log::error!("Failed to write {}: {e:#}", out_path.display()),
        }
    }

    if !args.no_analysis {
        let config = EnvelopeConfig {
            min_peak_distance: args.min_peak_distance as usize,
            ..EnvelopeConfig::default()
        };
        match trace.analyze(&config) {
            Ok(analysis) => {
                if let Err(e) = save_outputs(&args.output, &args.input, &trace, unit, &config, &analysis) {
                    log::error!("{e:#}");
                }
            }
            Err(AnalysisError::InsufficientExtrema { .. }) => log::warn!(
                "Not enough peaks/troughs to interpolate envelopes. Try lowering min_peak_distance."
            ),
            Err(e) => log::error!("Envelope analysis failed: {e}"),
        }
    }
    Ok(())
}

fn non_negative(precision: i32) -> Option<usize> {
    usize::try_from(precision).ok()
}

/// `data_mod.csv` next to the input file.
fn normalized_path(input: &Path) -> PathBuf {
    input.with_file_name("data_mod.csv")
}
