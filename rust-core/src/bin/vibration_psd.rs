use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vibration_psd::{
    AnalysisConfig, AnalysisSession, FrequencyRange, PowerUnit, SpectrumResult, TimeRange,
    WelchParameters, WindowType,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Accelerometer recording PSD analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the calibrated g-level trace of a channel as CSV
    Series(SeriesArgs),
    /// Estimate the Welch PSD of one or all channels and write it as CSV
    Psd(PsdArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Recording CSV: time column followed by channel columns
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// JSON file with calibration/Welch/unit defaults
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Sensor sensitivity applied to every channel (raw / sensitivity)
    #[arg(short, long)]
    sensitivity: Option<f64>,

    /// Start of the time span in seconds (inclusive)
    #[arg(long)]
    start: Option<f64>,

    /// End of the time span in seconds (inclusive)
    #[arg(long)]
    end: Option<f64>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Zero-based channel index
    #[arg(short, long, default_value_t = 0)]
    channel: usize,
}

#[derive(Args, Debug)]
struct PsdArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Zero-based channel index (all channels when omitted)
    #[arg(short, long)]
    channel: Option<usize>,

    /// Sampling frequency in Hz
    #[arg(long)]
    fs: Option<f64>,

    /// Segment length
    #[arg(long)]
    nperseg: Option<usize>,

    /// Samples shared by consecutive segments (default nperseg / 2)
    #[arg(long)]
    noverlap: Option<usize>,

    /// FFT length (default nperseg)
    #[arg(long)]
    nfft: Option<usize>,

    /// Window (rectangular, hann, hamming, blackman, bartlett, flattop)
    #[arg(long)]
    window: Option<WindowType>,

    /// Output unit (linear, db, db_re_sensitivity)
    #[arg(long)]
    unit: Option<PowerUnit>,

    /// Lowest frequency to write, Hz
    #[arg(long)]
    fmin: Option<f64>,

    /// Highest frequency to write, Hz
    #[arg(long)]
    fmax: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Series(args) => args.common.verbose,
        Command::Psd(args) => args.common.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Series(args) => handle_series(args),
        Command::Psd(args) => handle_psd(args),
    }
}

fn load_config(common: &CommonArgs) -> Result<AnalysisConfig> {
    let mut config = match common.config.as_ref() {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(sensitivity) = common.sensitivity {
        config.calibration.sensitivity = sensitivity;
    }
    config.validate().context("invalid analysis settings")?;
    Ok(config)
}

fn open_session(common: &CommonArgs, config: AnalysisConfig) -> Result<AnalysisSession> {
    let mut session = AnalysisSession::with_config(config);
    let file = File::open(&common.input)
        .with_context(|| format!("failed to open {}", common.input.display()))?;
    let table = session
        .load_csv(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", common.input.display()))?;

    let (first, last) = table.time_span();
    info!(
        "loaded {} rows x {} channels from {} ({:.3}s to {:.3}s)",
        table.len(),
        table.channel_count(),
        common.input.display(),
        first,
        last
    );
    Ok(session)
}

/// Open-ended spans extend to the edge of the recording
fn time_range(common: &CommonArgs) -> Result<Option<TimeRange>> {
    if common.start.is_none() && common.end.is_none() {
        return Ok(None);
    }
    let range = TimeRange::new(
        common.start.unwrap_or(f64::NEG_INFINITY),
        common.end.unwrap_or(f64::INFINITY),
    )?;
    Ok(Some(range))
}

fn frequency_band(args: &PsdArgs) -> Result<Option<FrequencyRange>> {
    if args.fmin.is_none() && args.fmax.is_none() {
        return Ok(None);
    }
    let band = FrequencyRange::new(
        args.fmin.unwrap_or(0.0),
        args.fmax.unwrap_or(f64::INFINITY),
    )?;
    Ok(Some(band))
}

fn open_output(path: &Path) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = if path.as_os_str() == "-" {
        Box::new(io::stdout().lock())
    } else {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Box::new(file)
    };
    Ok(csv::Writer::from_writer(sink))
}

fn handle_series(args: SeriesArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    let session = open_session(&args.common, config)?;

    let series = match time_range(&args.common)? {
        Some(range) => session.calibrated_series_in(args.channel, range)?,
        None => session.calibrated_series(args.channel)?,
    };
    if series.is_empty() {
        warn!("time span selects no samples; writing header only");
    }

    let time_name = session.table()?.time_name().to_string();
    let mut writer = open_output(&args.common.output)?;
    writer.write_record([time_name.as_str(), series.channel_name.as_str()])?;
    for (t, g) in series.time.iter().zip(series.values.iter()) {
        writer.write_record([t.to_string(), g.to_string()])?;
    }
    writer.flush()?;

    info!(
        "{}: {} samples, sensitivity {}, peak |g| {}",
        series.channel_name,
        series.len(),
        series.sensitivity,
        series
            .peak_abs()
            .map(|p| format!("{:.6}", p))
            .unwrap_or_else(|| "-".into())
    );
    Ok(())
}

fn welch_parameters(args: &PsdArgs, base: &WelchParameters) -> WelchParameters {
    let mut params = base.clone();
    if let Some(fs) = args.fs {
        params.sample_rate = fs;
    }
    if let Some(nperseg) = args.nperseg {
        params.nperseg = nperseg;
    }
    if args.noverlap.is_some() {
        params.noverlap = args.noverlap;
    }
    if args.nfft.is_some() {
        params.nfft = args.nfft;
    }
    if let Some(window) = args.window {
        params.window = window;
    }
    params
}

fn handle_psd(args: PsdArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    if let Some(unit) = args.unit {
        config.unit = unit;
    }
    let params = welch_parameters(&args, &config.welch);
    if args.fs.is_none() && args.common.config.is_none() {
        warn!("no --fs given; assuming {} Hz sampling", params.sample_rate);
    }

    let mut session = open_session(&args.common, config)?;
    if let Some(estimated) = session.table()?.estimated_sample_rate() {
        if (estimated - params.sample_rate).abs() > 0.01 * params.sample_rate {
            warn!(
                "time column implies {:.1} Hz but estimating with fs = {} Hz",
                estimated, params.sample_rate
            );
        }
    }
    let range = time_range(&args.common)?;

    let results = match args.channel {
        Some(channel) => vec![session.compute_spectrum(channel, range, &params)?],
        None => session.compute_all_spectra(range, &params)?,
    };

    let band = frequency_band(&args)?;
    let results: Vec<SpectrumResult> = match band {
        Some(band) => results.iter().map(|r| r.select_frequency(&band)).collect(),
        None => results,
    };

    for result in &results {
        report(result, band.as_ref());
    }
    write_spectra(&results, &args.common.output)
}

fn report(result: &SpectrumResult, band: Option<&FrequencyRange>) {
    let name = result.channel_name.as_deref().unwrap_or("?");
    match result.peak() {
        Some((freq, value)) => info!(
            "{}: {} segments, {} bins of {:.4} Hz, peak {:.6e} {} at {:.3} Hz",
            name,
            result.segments,
            result.len(),
            result.bin_width(),
            value,
            result.unit,
            freq
        ),
        None => warn!("{}: no bins in the requested band", name),
    }
    if let Some(band) = band {
        if let Ok(rms) = result.band_rms(band) {
            info!(
                "{}: band RMS {:.6} over {}..{} Hz",
                name,
                rms,
                band.start(),
                band.end()
            );
        }
    }
}

fn write_spectra(results: &[SpectrumResult], path: &Path) -> Result<()> {
    let first = results
        .first()
        .ok_or_else(|| anyhow!("recording has no channels"))?;
    if results.iter().any(|r| r.frequencies != first.frequencies) {
        bail!("channel spectra do not share a frequency axis");
    }

    let mut writer = open_output(path)?;
    let mut header = vec!["frequency_hz".to_string()];
    header.extend(
        results
            .iter()
            .map(|r| r.channel_name.clone().unwrap_or_default()),
    );
    writer.write_record(&header)?;

    for (bin, freq) in first.frequencies.iter().enumerate() {
        let mut record = vec![freq.to_string()];
        record.extend(results.iter().map(|r| r.values[bin].to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
