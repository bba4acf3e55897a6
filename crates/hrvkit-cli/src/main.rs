use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use hrvkit_lib::{
    config::ToolkitConfig,
    io::{
        csv::{self as csv_io, MergedFormat},
        heart_rate::decode_hex_measurement,
        text::{self as text_io, TimedMeasurement},
    },
    metrics::hrv::{hrv_time, HRVTime},
    plot::{figure_from_affect, figure_from_hrv, Figure, PlotBackend, Series},
    session::{
        compare_windows, window::MetricComparison, RecordKind, SessionFileKind, SessionStore,
        TimeWindow, WindowComparison,
    },
    signal::RRSeries,
    stream::{LiveSession, LiveUpdate},
};
use log::{info, warn};
use plotters::prelude::*;
use serde_json::json;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "hrvkit",
    version,
    about = "HRV toolkit: streaming SDNN/RMSSD and HRV/affect session merging"
)]
struct Cli {
    /// TOML file with reference date, baseline length and file-name markers
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

impl From<ExportFormat> for MergedFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => MergedFormat::Csv,
            ExportFormat::Json => MergedFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// SDNN/RMSSD from RR intervals in ms read from stdin or --input file
    Metrics {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Decode one Heart Rate Measurement payload given as hex
    DecodeHr {
        #[arg(long)]
        hex: String,
    },
    /// Replay `<elapsed_seconds> <hex payload>` lines through a baseline session
    Live {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        baseline_minutes: Option<u64>,
        /// Write the baseline result as a Parameter,Value CSV
        #[arg(long)]
        baseline_out: Option<PathBuf>,
    },
    /// Merge HRV exports with affective slider ratings by nearest timestamp
    Merge {
        #[arg(long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
    },
    /// Welch t-test of SDNN and RMSSD between two time windows of an HRV export
    Compare {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, num_args = 2, value_names = ["START", "END"], required = true)]
        window1: Vec<String>,
        #[arg(long, num_args = 2, value_names = ["START", "END"], required = true)]
        window2: Vec<String>,
    },
    /// Print the parameters of a BaselineResults file
    Baseline {
        #[arg(long)]
        input: PathBuf,
    },
    /// Render an HRV or affective slider export to a PNG via plotters
    Plot {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 2048)]
        max_points: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let config = match &cli.config {
        Some(path) => {
            info!("loading config {}", path.display());
            ToolkitConfig::load(path)?
        }
        None => ToolkitConfig::default(),
    };

    match cli.command {
        Commands::Metrics { input } => cmd_metrics(input.as_deref())?,
        Commands::DecodeHr { hex } => cmd_decode_hr(&hex)?,
        Commands::Live {
            input,
            baseline_minutes,
            baseline_out,
        } => cmd_live(
            input.as_deref(),
            baseline_minutes.unwrap_or(config.baseline_minutes),
            baseline_out.as_deref(),
        )?,
        Commands::Merge { input, out, format } => cmd_merge(&config, &input, &out, format)?,
        Commands::Compare {
            input,
            window1,
            window2,
        } => cmd_compare(&config, &input, &window1, &window2)?,
        Commands::Baseline { input } => cmd_baseline(&input)?,
        Commands::Plot {
            input,
            out,
            max_points,
        } => cmd_plot(&config, &input, &out, max_points)?,
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_rr(input: Option<&Path>) -> Result<RRSeries> {
    let rr = match input {
        Some(path) => text_io::read_rr_millis(path)?,
        None => text_io::parse_rr_millis(&read_stdin()?)?,
    };
    Ok(RRSeries::from_millis(rr))
}

fn read_stream(input: Option<&Path>) -> Result<Vec<TimedMeasurement>> {
    match input {
        Some(path) => text_io::read_measurement_stream(path),
        None => text_io::parse_measurement_stream(&read_stdin()?),
    }
}

fn cmd_metrics(input: Option<&Path>) -> Result<()> {
    let rr = read_rr(input)?;
    println!("{}", serde_json::to_string(&hrv_time(&rr))?);
    Ok(())
}

fn cmd_decode_hr(hex: &str) -> Result<()> {
    let measurement = decode_hex_measurement(hex)?;
    println!("{}", serde_json::to_string(&measurement)?);
    Ok(())
}

fn display_metrics(metrics: Option<&HRVTime>) -> (String, String) {
    metrics
        .and_then(HRVTime::formatted)
        .unwrap_or_else(|| ("--".into(), "--".into()))
}

fn live_line(update: &LiveUpdate) -> Result<serde_json::Value> {
    let (sdnn, rmssd) = display_metrics(update.realtime.as_ref());
    let mut line = json!({
        "elapsed_s": update.elapsed_s,
        "phase": update.phase,
        "heart_rate": update.heart_rate,
        "sdnn": sdnn,
        "rmssd": rmssd,
    });
    if let Some(baseline) = &update.baseline {
        line["baseline"] = serde_json::to_value(baseline.entries())?;
    }
    Ok(line)
}

fn cmd_live(
    input: Option<&Path>,
    baseline_minutes: u64,
    baseline_out: Option<&Path>,
) -> Result<()> {
    let stream = read_stream(input)?;
    let mut session = LiveSession::new(baseline_minutes)?;
    session.start(std::time::Duration::ZERO);
    for sample in &stream {
        let update = session.on_measurement(sample.elapsed, &sample.measurement)?;
        println!("{}", serde_json::to_string(&live_line(&update)?)?);
    }
    match (session.baseline(), baseline_out) {
        (Some(result), Some(path)) => {
            csv_io::write_baseline_results(&result.entries(), path)?;
            info!("wrote baseline results to {}", path.display());
        }
        (None, _) => warn!(
            "stream ended before the {} minute baseline finished",
            baseline_minutes
        ),
        (Some(_), None) => {}
    }
    Ok(())
}

fn cmd_merge(
    config: &ToolkitConfig,
    inputs: &[PathBuf],
    out: &Path,
    format: ExportFormat,
) -> Result<()> {
    let mut store = SessionStore::new(config.parser()?);
    let summary = csv_io::load_session_files(inputs, &config.markers, &mut store)?;
    if summary.hrv_files.is_empty() {
        bail!("no HRV file among the inputs");
    }
    if summary.affect_files.is_empty() {
        warn!("no affective slider file; arousal and pleasure stay empty");
    }
    let merged = store.merge();
    csv_io::export_merged(&merged, out, format.into())?;
    println!(
        "{}",
        serde_json::to_string(&json!({
            "rows": merged.len(),
            "matched": merged.iter().filter(|m| m.arousal.is_some()).count(),
            "files": summary,
            "out": out,
        }))?
    );
    Ok(())
}

fn window_from_args(bounds: &[String], config: &ToolkitConfig) -> Result<TimeWindow> {
    let [start, end] = bounds else {
        bail!("a window needs START and END");
    };
    Ok(TimeWindow::parse(start, end, &config.parser()?)?)
}

fn metric_json(metric: &MetricComparison) -> serde_json::Value {
    json!({
        "n1": metric.n1,
        "n2": metric.n2,
        "mean1": metric.mean1,
        "mean2": metric.mean2,
        "t": metric.t,
        "df": metric.df,
        "p_value": metric.formatted_p(),
    })
}

fn cmd_compare(
    config: &ToolkitConfig,
    input: &Path,
    window1: &[String],
    window2: &[String],
) -> Result<()> {
    let w1 = window_from_args(window1, config)?;
    let w2 = window_from_args(window2, config)?;
    let mut store = SessionStore::new(config.parser()?);
    store.load_rows(RecordKind::Hrv, &csv_io::read_rows(input)?);
    let report = match compare_windows(store.hrv(), &w1, &w2) {
        WindowComparison::Insufficient { n1, n2 } => json!({
            "outcome": "insufficient",
            "message": "insufficient data",
            "n1": n1,
            "n2": n2,
        }),
        WindowComparison::Compared { sdnn, rmssd } => json!({
            "outcome": "compared",
            "sdnn": metric_json(&sdnn),
            "rmssd": metric_json(&rmssd),
        }),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_baseline(input: &Path) -> Result<()> {
    let entries = csv_io::read_baseline_results(input)?;
    if entries.is_empty() {
        bail!("{} has no baseline parameters", input.display());
    }
    println!("{}", serde_json::to_string(&entries)?);
    Ok(())
}

fn cmd_plot(config: &ToolkitConfig, input: &Path, out: &Path, max_points: usize) -> Result<()> {
    let mut store = SessionStore::new(config.parser()?);
    let rows = csv_io::read_rows(input)?;
    let fig = match config.markers.classify_path(input) {
        SessionFileKind::Hrv => {
            store.load_rows(RecordKind::Hrv, &rows);
            figure_from_hrv(store.hrv(), max_points)
        }
        SessionFileKind::Affect => {
            store.load_rows(RecordKind::Affect, &rows);
            figure_from_affect(store.affect(), max_points)
        }
        other => bail!("cannot plot {} (classified as {:?})", input.display(), other),
    };
    PngBackend::new(out).draw(&fig)?;
    info!("wrote {}", out.display());
    Ok(())
}

struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            size: (960, 540),
        }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        draw_plotters_figure(self.path, self.size, fig)
    }
}

fn padded(min: f64, max: f64) -> std::ops::Range<f64> {
    if max > min {
        min..max
    } else {
        (min - 1.0)..(max + 1.0)
    }
}

fn draw_plotters_figure(path: &Path, size: (u32, u32), fig: &Figure) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = fig
        .bounds()
        .ok_or_else(|| anyhow!("no plottable rows for {}", path.display()))?;
    let backend = BitMapBackend::new(path, size);
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(padded(x_min, x_max), padded(y_min, y_max))?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let color = RGBColor(r, g, b);
                chart
                    .draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        color.stroke_width(line.style.width.round().max(1.0) as u32),
                    ))?
                    .label(line.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
