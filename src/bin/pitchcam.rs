//! pitchcam CLI: camera movement estimation and track compensation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pitchcam_rs::frame::save_frames;
use pitchcam_rs::pipeline::PrecomputedTracks;
use pitchcam_rs::tracks::{load_tracks, save_tracks};
use pitchcam_rs::{
    CacheKey, CameraMotionConfig, CameraMovementEstimator, FrameSource, ImageSequence,
    MotionSequence, OverlayRenderer, Pipeline, PositionAdjuster,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "pitchcam")]
#[command(about = "Estimate broadcast camera pan and remove it from tracked positions")]
#[command(version)]
struct Cli {
    /// JSON configuration file (defaults are used for missing fields).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate per-frame camera movement for a frame directory.
    Estimate {
        /// Directory of numbered frame images.
        #[arg(long)]
        frames: PathBuf,

        /// Path to write the movement sequence (JSON).
        #[arg(long)]
        out: PathBuf,

        /// Stub cache path, overriding the configuration.
        #[arg(long)]
        stub: Option<PathBuf>,

        /// Ignore an existing stub and recompute.
        #[arg(long)]
        no_read_stub: bool,
    },

    /// Add camera-compensated positions to a tracks file.
    Adjust {
        /// Tracks JSON produced by the object tracker.
        #[arg(long)]
        tracks: PathBuf,

        /// Movement sequence JSON written by `estimate`.
        #[arg(long)]
        movements: PathBuf,

        /// Path to write the adjusted tracks.
        #[arg(long)]
        out: PathBuf,

        /// Subtract the total camera offset since the first frame.
        #[arg(long)]
        accumulate: bool,
    },

    /// Burn camera movement into frames.
    Render {
        #[arg(long)]
        frames: PathBuf,

        #[arg(long)]
        movements: PathBuf,

        /// Output directory for annotated frames.
        #[arg(long)]
        out: PathBuf,
    },

    /// Estimate, adjust and optionally render in one pass.
    Run {
        #[arg(long)]
        frames: PathBuf,

        #[arg(long)]
        tracks: PathBuf,

        /// Path to write the adjusted tracks.
        #[arg(long)]
        out_tracks: PathBuf,

        /// Path to write the movement sequence (JSON).
        #[arg(long)]
        out_movements: Option<PathBuf>,

        /// Output directory for annotated frames.
        #[arg(long)]
        render: Option<PathBuf>,

        #[arg(long)]
        stub: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => CameraMotionConfig::from_json_file(path)?,
        None => CameraMotionConfig::default(),
    };

    match cli.command {
        Commands::Estimate {
            frames,
            out,
            stub,
            no_read_stub,
        } => {
            if stub.is_some() {
                config.cache.path = stub;
            }
            if no_read_stub {
                config.cache.read = false;
            }
            run_estimate(config, &frames, &out)
        }
        Commands::Adjust {
            tracks,
            movements,
            out,
            accumulate,
        } => {
            if accumulate {
                config.adjust.accumulate = true;
            }
            run_adjust(config, &tracks, &movements, &out)
        }
        Commands::Render {
            frames,
            movements,
            out,
        } => run_render(config, &frames, &movements, &out),
        Commands::Run {
            frames,
            tracks,
            out_tracks,
            out_movements,
            render,
            stub,
        } => {
            if stub.is_some() {
                config.cache.path = stub;
            }
            run_pipeline(
                config,
                &frames,
                &tracks,
                &out_tracks,
                out_movements.as_deref(),
                render.as_deref(),
            )
        }
    }
}

fn read_movements(path: &Path) -> CliResult<MotionSequence> {
    let raw = fs::read(path).map_err(|e| -> CliError {
        format!("Failed to read movements {}: {}", path.display(), e).into()
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

fn write_movements(movements: &MotionSequence, path: &Path) -> CliResult<()> {
    fs::write(path, serde_json::to_string_pretty(movements)?)?;
    tracing::info!("Movements written to {}", path.display());
    Ok(())
}

fn run_estimate(config: CameraMotionConfig, frames_dir: &Path, out: &Path) -> CliResult<()> {
    let mut source = ImageSequence::new(frames_dir);
    let key = CacheKey::compute(&source.identity()?, &config)?;
    let estimator = CameraMovementEstimator::new(config)?;

    let movements = estimator.get_camera_movement_from(&mut source, Some(&key))?;

    tracing::info!(
        "{} of {} frames show camera movement",
        movements.moving_frames(),
        movements.len()
    );
    write_movements(&movements, out)
}

fn run_adjust(
    config: CameraMotionConfig,
    tracks_path: &Path,
    movements_path: &Path,
    out: &Path,
) -> CliResult<()> {
    let mut tracks = load_tracks(tracks_path)?;
    let movements = read_movements(movements_path)?;
    PositionAdjuster::new(config.adjust).add_adjusted_positions(&mut tracks, &movements)?;
    save_tracks(&tracks, out)?;
    tracing::info!("Adjusted tracks written to {}", out.display());
    Ok(())
}

fn run_render(
    config: CameraMotionConfig,
    frames_dir: &Path,
    movements_path: &Path,
    out: &Path,
) -> CliResult<()> {
    let frames = ImageSequence::new(frames_dir).read_frames()?;
    let movements = read_movements(movements_path)?;
    let rendered = OverlayRenderer::new(config.overlay)?.draw(&frames, &movements)?;
    save_frames(&rendered, out)?;
    Ok(())
}

fn run_pipeline(
    config: CameraMotionConfig,
    frames_dir: &Path,
    tracks_path: &Path,
    out_tracks: &Path,
    out_movements: Option<&Path>,
    render_dir: Option<&Path>,
) -> CliResult<()> {
    let mut source = ImageSequence::new(frames_dir);
    let key = CacheKey::compute(&source.identity()?, &config)?;
    let frames = source.read_frames()?;
    let tracker = PrecomputedTracks::from_json_file(tracks_path)?;

    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(&frames, &tracker, Some(&key))?;

    save_tracks(&output.tracks, out_tracks)?;
    tracing::info!("Adjusted tracks written to {}", out_tracks.display());
    if let Some(path) = out_movements {
        write_movements(&output.movements, path)?;
    }
    if let Some(dir) = render_dir {
        let rendered = pipeline.render(&frames, &output)?;
        save_frames(&rendered, dir)?;
    }
    Ok(())
}
