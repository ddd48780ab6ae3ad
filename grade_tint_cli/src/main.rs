use std::fs;
use std::fs::File;
use std::io::{self, Read, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use grade_tint::{
    assess, decode_payload, filter_baseline, fingerprint, process_curve, ColorScale,
    CurveGradients, Direction, ElevationSeries, GradientSample, Palette, Params, ScreenPoint,
};
use plotters::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recolor elevation profile curves by road gradient", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute per-segment gradients (and colors) for one or more drawn curves
    Segments(SegmentsArgs),
    /// Report which way along the route each drawn curve runs
    Direction(DirectionArgs),
}

#[derive(Parser, Debug)]
struct SegmentsArgs {
    /// Route payload JSON (nested-array or object form)
    #[arg(value_hint = ValueHint::FilePath)]
    route: PathBuf,

    /// Drawn curve CSV files with `x,y` columns in normalized chart space
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    curves: Vec<PathBuf>,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "segments.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Also render the recolored curves to this SVG file
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// JSON settings file with `params` and `colors` sections
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Direction the curves run along the route
    #[arg(long, value_enum, default_value_t = DirectionOpt::Auto)]
    direction: DirectionOpt,

    /// Gradient window half-width in meters
    #[arg(long)]
    window: Option<f64>,

    /// Gradient between neighbouring color stops (percentage points)
    #[arg(long)]
    band_width: Option<f64>,

    /// Use only the route's elevation extremes, as a coarse payload would
    #[arg(long, action = ArgAction::SetTrue)]
    coarse: bool,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct DirectionArgs {
    /// Route payload JSON (nested-array or object form)
    #[arg(value_hint = ValueHint::FilePath)]
    route: PathBuf,

    /// Drawn curve CSV files with `x,y` columns
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    curves: Vec<PathBuf>,

    /// JSON settings file with a `params` section
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum DirectionOpt {
    Auto,
    Forward,
    Reverse,
}

impl From<DirectionOpt> for Option<Direction> {
    fn from(value: DirectionOpt) -> Self {
        match value {
            DirectionOpt::Auto => None,
            DirectionOpt::Forward => Some(Direction::Forward),
            DirectionOpt::Reverse => Some(Direction::Reverse),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    params: Params,
    colors: ColorScale,
}

struct ProcessedCurve {
    label: String,
    points: Vec<ScreenPoint>,
    result: CurveGradients,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Segments(args) => args.verbose,
        Command::Direction(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Segments(args) => handle_segments(args),
        Command::Direction(args) => handle_direction(args),
    }
}

fn handle_segments(args: SegmentsArgs) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(window) = args.window {
        settings.params.window_m = window;
    }
    if let Some(band_width) = args.band_width {
        settings.colors.band_width_pct = band_width;
    }
    settings.params.validate()?;
    let palette = settings.colors.palette()?;

    let mut series = load_route(&args.route)?;
    if args.coarse {
        series = series.to_coarse();
    }
    let override_direction: Option<Direction> = args.direction.into();

    let t_compute = Instant::now();
    let processed = args
        .curves
        .par_iter()
        .map(|path| -> Result<ProcessedCurve> {
            let points = load_curve(path)?;
            let result = process_curve(&points, Some(&series), override_direction, &settings.params);
            Ok(ProcessedCurve {
                label: curve_label(path),
                points,
                result,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for curve in &processed {
        if curve.result.samples.is_empty() {
            warn!("{}: no segments produced (curve empty or route degenerate)", curve.label);
            continue;
        }
        info!(
            "{}: {} segments, direction {}, fingerprint {}",
            curve.label,
            curve.result.samples.len(),
            curve
                .result
                .direction
                .map(|d| d.to_string())
                .unwrap_or_else(|| "n/a (coarse)".into()),
            &fingerprint(&curve.result.samples)[..12]
        );
    }
    if args.verbose {
        info!(
            "Compute stage: {:.1} ms ({} curves)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            processed.len()
        );
    }

    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut writer = csv::Writer::from_writer(stdout.lock());
        write_segment_rows(&processed, &palette, &mut writer)?;
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        write_segment_rows(&processed, &palette, &mut writer)?;
        info!("Wrote segment CSV: {}", args.output.display());
    }

    if let Some(path) = args.svg.as_ref() {
        match render_svg_guard(&processed, &palette, settings.params.baseline_y, path) {
            Ok(()) => info!("Wrote plot: {}", path.display()),
            Err(err) => warn!("Skipping SVG render ({}): {}", path.display(), err),
        }
    }

    Ok(())
}

fn handle_direction(args: DirectionArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    settings.params.validate()?;
    let series = load_route(&args.route)?;
    if !series.is_full_resolution() {
        return Err(anyhow!(
            "{} carries only elevation extremes; direction needs a full profile",
            args.route.display()
        ));
    }

    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    writer.write_record([
        "curve",
        "direction",
        "symmetric",
        "max_asymmetry_m",
        "forward_error",
        "reverse_error",
    ])?;
    for path in &args.curves {
        let points = load_curve(path)?;
        let verdict = assess(&points, &series, &settings.params);
        debug!(probes = ?verdict.probes, "{}", path.display());
        writer.write_record([
            curve_label(path),
            verdict.direction.to_string(),
            verdict.symmetric.to_string(),
            format!("{:.3}", verdict.max_asymmetry_m),
            format!("{:.6}", verdict.forward_error),
            format!("{:.6}", verdict.reverse_error),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_settings(&text).with_context(|| format!("invalid settings in {}", path.display()))
}

fn parse_settings(text: &str) -> Result<Settings> {
    Ok(serde_json::from_str(text)?)
}

fn load_route(path: &Path) -> Result<ElevationSeries> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let series =
        decode_payload(&text).with_context(|| format!("failed to decode {}", path.display()))?;
    info!(
        "Route {}: {:.0} m, {} points, elevation {:.0}..{:.0} m",
        path.display(),
        series.total_distance,
        series.points.len(),
        series.min_elevation,
        series.max_elevation
    );
    Ok(series)
}

fn load_curve(path: &Path) -> Result<Vec<ScreenPoint>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_curve(file).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_curve<R: Read>(input: R) -> Result<Vec<ScreenPoint>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut points = Vec::new();
    for row in reader.deserialize() {
        let point: ScreenPoint = row?;
        points.push(point);
    }
    Ok(points)
}

fn curve_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("curve")
        .to_string()
}

fn write_segment_rows<W: Write>(
    curves: &[ProcessedCurve],
    palette: &Palette,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record(["curve", "index", "center_x", "gradient_pct", "color"])?;
    for curve in curves {
        for (index, sample) in curve.result.samples.iter().enumerate() {
            writer.write_record([
                curve.label.clone(),
                index.to_string(),
                format!("{:.5}", sample.center_position),
                format!("{:.2}", sample.gradient_percent),
                palette.color_for(sample.gradient_percent).to_hex(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Pairs each sample with the curve segment it was computed for.
fn colored_segments(
    points: &[ScreenPoint],
    samples: &[GradientSample],
) -> Vec<(ScreenPoint, ScreenPoint, f64)> {
    points
        .windows(2)
        .filter(|w| w[1].x > w[0].x)
        .zip(samples)
        .map(|(w, sample)| (w[0], w[1], sample.gradient_percent))
        .collect()
}

fn render_svg_guard(
    curves: &[ProcessedCurve],
    palette: &Palette,
    baseline_y: f64,
    path: &Path,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        let root = SVGBackend::new(path, (1200, 400)).into_drawing_area();
        draw_profiles(root, curves, palette, baseline_y)
            .map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn draw_profiles<DB>(
    area: DrawingArea<DB, plotters::coord::Shift>,
    curves: &[ProcessedCurve],
    palette: &Palette,
    baseline_y: f64,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&WHITE)?;
    let rows = area.split_evenly((curves.len().max(1), 1));
    for (panel, curve) in rows.iter().zip(curves) {
        let mut chart = ChartBuilder::on(panel)
            .margin(10)
            .build_cartesian_2d(0.0..1.0, 0.0..1.0)?;

        // host charts put higher ground at smaller y
        let height = |p: &ScreenPoint| 1.0 - p.y;
        let filtered = filter_baseline(&curve.points, baseline_y);
        chart.draw_series(LineSeries::new(
            filtered.iter().map(|p| (p.x, height(p))),
            BLACK.mix(0.15).stroke_width(6),
        ))?;
        for (a, b, gradient) in colored_segments(&filtered, &curve.result.samples) {
            let rgb = palette.color_for(gradient);
            chart.draw_series(LineSeries::new(
                [(a.x, height(&a)), (b.x, height(&b))],
                RGBColor(rgb.0, rgb.1, rgb.2).stroke_width(3),
            ))?;
        }
    }
    area.present()?;
    Ok(())
}
