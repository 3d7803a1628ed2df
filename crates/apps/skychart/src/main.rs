use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tokio::task::LocalSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chart::{Chart, ChartConfig, HttpTileSource};
use foundation::math::Vec2;
use layers::DisplayOption;
use overlay::{DisplayScale, ImageOverlay, MarkerSamples, VideoOverlay, VideoPath};
use scene::{PickEvent, PointerInput, PointerKind};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Render and query gnomonic sky charts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ChartArgs {
    /// Chart config JSON (same shape the host page supplies)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tile server base URL (overrides the config and SKYCHART_TILES)
    #[arg(long)]
    tiles: Option<String>,

    /// Center right ascension in degrees
    #[arg(long, allow_hyphen_values = true)]
    ra: Option<f64>,

    /// Center declination in degrees
    #[arg(long, allow_hyphen_values = true)]
    dec: Option<f64>,

    /// Horizontal field of view in degrees
    #[arg(long)]
    fov: Option<f64>,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,

    /// Layer to switch off (grid, lines, boundaries, labels, dsos, star_names)
    #[arg(long = "hide")]
    hide: Vec<DisplayOption>,

    /// Seconds to wait for tiles before giving up
    #[arg(long, default_value_t = 30.0)]
    timeout: f64,
}

impl ChartArgs {
    fn config(&self) -> CliResult<ChartConfig> {
        let mut config = match &self.config {
            Some(path) => ChartConfig::from_json(&std::fs::read_to_string(path)?)?,
            None => ChartConfig::default(),
        };
        if let Some(tiles) = &self.tiles {
            config.tile_base = Some(tiles.clone());
        }
        if let Some(ra) = self.ra {
            config.ra_deg = ra;
        }
        if let Some(dec) = self.dec {
            config.dec_deg = dec;
        }
        if let Some(fov) = self.fov {
            config.fov_deg = fov;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        config.validate()?;
        Ok(config)
    }

    fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout).unwrap_or(Duration::from_secs(30))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a chart to SVG once every visible tile has loaded
    Render {
        #[command(flatten)]
        chart: ChartArgs,

        /// Output SVG file
        #[arg(long, default_value = "chart.svg")]
        out: PathBuf,
    },

    /// Report what is drawn under a canvas pixel
    Pick {
        #[command(flatten)]
        chart: ChartArgs,

        #[arg(long)]
        x: f64,

        #[arg(long)]
        y: f64,
    },

    /// Sample overlay markers from a track file
    Track {
        /// JSON with `original`, `paths` and/or `markers`
        #[arg(long)]
        file: PathBuf,

        /// Displayed size as WIDTHxHEIGHT; defaults to the capture size
        #[arg(long)]
        rendered: Option<String>,

        /// Video playback times to sample
        #[arg(long = "at", allow_hyphen_values = true)]
        times: Vec<f64>,

        /// Number of phase steps to walk the image markers through
        #[arg(long, default_value_t = 0)]
        steps: u32,
    },
}

#[derive(Debug, Deserialize)]
struct TrackFile {
    original: [f64; 2],
    #[serde(default)]
    paths: Vec<VideoPath>,
    #[serde(default)]
    markers: Vec<MarkerSamples>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Render { chart, out } => render(&chart, &out).await,
        Command::Pick { chart, x, y } => pick(&chart, x, y).await,
        Command::Track {
            file,
            rendered,
            times,
            steps,
        } => track(&file, rendered.as_deref(), &times, steps),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "skychart failed");
            ExitCode::FAILURE
        }
    }
}

async fn settled_chart(args: &ChartArgs) -> CliResult<Chart<HttpTileSource>> {
    let mut config = args.config()?;
    let base = config.tile_base()?;
    for option in &args.hide {
        config.display.set(*option, false);
    }
    info!(%base, "loading chart");

    let chart = Chart::new(&config, HttpTileSource::new(base))?;
    LocalSet::new()
        .run_until(chart.run_until_settled(args.timeout()))
        .await?;
    Ok(chart)
}

async fn render(args: &ChartArgs, out: &Path) -> CliResult<()> {
    let chart = settled_chart(args).await?;
    std::fs::write(out, chart.to_svg())?;
    info!(path = %out.display(), "chart written");
    println!("{}", serde_json::to_string_pretty(&chart.summary())?);
    Ok(())
}

async fn pick(args: &ChartArgs, x: f64, y: f64) -> CliResult<()> {
    let chart = settled_chart(args).await?;
    let event = chart.pointer(&PointerInput::Mouse { x, y }, PointerKind::Click);
    let target = match event {
        Some(PickEvent::Click {
            feature: Some(id), ..
        }) => chart.pick_target(id),
        _ => None,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "x": x, "y": y, "target": target }))?
    );
    Ok(())
}

fn parse_size(text: &str) -> CliResult<[f64; 2]> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))?;
    Ok([w.trim().parse()?, h.trim().parse()?])
}

fn point(p: Option<Vec2>) -> serde_json::Value {
    match p {
        Some(p) => json!([p.x, p.y]),
        None => serde_json::Value::Null,
    }
}

fn track(file: &Path, rendered: Option<&str>, times: &[f64], steps: u32) -> CliResult<()> {
    let track: TrackFile = serde_json::from_str(&std::fs::read_to_string(file)?)?;
    let rendered = match rendered {
        Some(text) => parse_size(text)?,
        None => track.original,
    };
    let scale = DisplayScale::new(track.original, rendered);
    info!(scale_x = scale.scale_x, scale_y = scale.scale_y, "display scale");

    let mut video = VideoOverlay::new(track.original, track.paths);
    video.resize(rendered);
    let samples: Vec<_> = times
        .iter()
        .map(|&t| {
            let markers: Vec<_> = video.markers_at(t).into_iter().map(point).collect();
            json!({ "t": t, "markers": markers })
        })
        .collect();

    let mut image = ImageOverlay::new(track.original, &track.markers);
    image.resize(rendered);
    let mut phases = Vec::new();
    for step in 0..steps {
        if step == 0 {
            image.set_phase(0.0);
        } else {
            image.step();
        }
        // Treat each step as one poll period of fade-in.
        image.advance(0.25);
        let visible: Vec<_> = image
            .visible()
            .into_iter()
            .map(|(p, opacity)| json!({ "at": [p.x, p.y], "opacity": opacity }))
            .collect();
        phases.push(json!({ "phase": image.phase(), "visible": visible }));
    }

    let report = json!({ "video": samples, "image": phases });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
