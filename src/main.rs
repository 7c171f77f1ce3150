use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, unbounded};
use depth_lens::{
    depth_filter::DepthFilter,
    gesture::{GestureTracker, Sensitivity, TrackerConfig},
    pipeline::{
        CommandKeys, SceneMessage, TrackerCommand, TrackingAvailability, signal_channel,
        start_tracking,
    },
    raster::{self, DEFAULT_MAX_DIMENSION},
    reconstruct::{self, PointCloud, ReconstructOptions, StylizationMode},
    session::{SessionRecord, SessionSettings},
    types::HandSkeleton,
    view::{ViewAnimator, ViewConfig},
};

const RENDER_INTERVAL: Duration = Duration::from_micros(16_667);

#[derive(Parser, Debug)]
#[command(name = "depth-lens", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild a point cloud from a color image and its depth map.
    Build(BuildArgs),
    /// Regenerate the cloud stored in a saved session.
    Open(OpenArgs),
    /// Write the filtered depth map as a PNG.
    Preview(PreviewArgs),
    /// Feed recorded hand frames through the gesture tracker.
    Replay(ReplayArgs),
    /// Run live hand tracking against the view animator.
    Track(TrackArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    #[arg(long)]
    color: PathBuf,

    /// Grayscale depth map; resampled to the color image size.
    #[arg(long)]
    depth: PathBuf,

    #[arg(long, default_value_t = 1.0)]
    density: f32,

    /// Posterised voxel look instead of the smooth point cloud.
    #[arg(long, default_value_t = false)]
    voxel: bool,

    #[arg(long = "max-dim", default_value_t = DEFAULT_MAX_DIMENSION)]
    max_dim: u32,

    /// Skip pixels whose normalised depth falls below this value.
    #[arg(long)]
    background: Option<f32>,

    /// Save a session record to this JSON file.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct OpenArgs {
    session: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[arg(long)]
    depth: PathBuf,

    #[arg(long, default_value_t = 1.0)]
    contrast: f32,

    #[arg(long, default_value_t = 1.0)]
    intensity: f32,

    #[arg(long, default_value_t = false)]
    colorize: bool,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// JSON array of frames, each an array of hand skeletons.
    frames: PathBuf,

    /// Keep the camera image as captured instead of selfie-mirrored.
    #[arg(long, default_value_t = false)]
    no_mirror: bool,

    #[arg(long, default_value_t = false)]
    precise: bool,
}

#[derive(Parser, Debug)]
struct TrackArgs {
    #[arg(long, default_value_t = 0)]
    camera: u32,

    #[arg(long, default_value_t = false)]
    no_mirror: bool,

    #[arg(long, default_value_t = false)]
    precise: bool,

    #[arg(long, default_value_t = 10)]
    seconds: u64,
}

fn tracker_config(no_mirror: bool, precise: bool) -> TrackerConfig {
    TrackerConfig {
        mirror: TrackerConfig::default().mirror && !no_mirror,
        sensitivity: if precise {
            Sensitivity::Precise
        } else {
            Sensitivity::Normal
        },
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Build(args) => cmd_build(args),
        Command::Open(args) => cmd_open(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Replay(args) => cmd_replay(args),
        Command::Track(args) => cmd_track(args),
    }
}

fn cmd_build(args: BuildArgs) -> Result<()> {
    let color = raster::load_path(&args.color)
        .with_context(|| format!("load color image '{}'", args.color.display()))?;
    let depth = raster::load_path(&args.depth)
        .with_context(|| format!("load depth map '{}'", args.depth.display()))?;

    let color = raster::resize(&color, args.max_dim)?;
    let depth = raster::resize_exact(&depth, color.width(), color.height())?;

    let mode = if args.voxel {
        StylizationMode::Voxel
    } else {
        StylizationMode::PointCloud
    };
    let options = ReconstructOptions {
        density: args.density,
        mode,
        background_threshold: args.background,
    };
    let cloud = reconstruct::reconstruct(&color, &depth, &options)?;
    print_summary(&cloud);

    if let Some(path) = args.save {
        let settings = SessionSettings {
            density: args.density,
            max_dimension: args.max_dim,
            mode,
            background_threshold: args.background,
        };
        SessionRecord::capture(&color, &depth, settings)?
            .save(&path)
            .with_context(|| format!("save session '{}'", path.display()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_open(args: OpenArgs) -> Result<()> {
    let record = SessionRecord::load(&args.session)
        .with_context(|| format!("load session '{}'", args.session.display()))?;
    log::info!(
        "session created at {} ms, mode {:?}",
        record.created_at_ms,
        record.settings.mode
    );
    let cloud = record.regenerate()?;
    print_summary(&cloud);
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> Result<()> {
    let depth = raster::load_path(&args.depth)
        .with_context(|| format!("load depth map '{}'", args.depth.display()))?;
    let filter = DepthFilter {
        contrast: args.contrast,
        intensity: args.intensity,
        colorize: args.colorize,
    };
    let filtered = filter.apply(&depth)?;
    let png = raster::encode_png(&filtered)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_replay(args: ReplayArgs) -> Result<()> {
    let bytes = std::fs::read(&args.frames)
        .with_context(|| format!("read frames '{}'", args.frames.display()))?;
    let frames: Vec<Vec<HandSkeleton>> =
        serde_json::from_slice(&bytes).context("parse recorded hand frames")?;

    let mut tracker = GestureTracker::new(tracker_config(args.no_mirror, args.precise));
    for hands in &frames {
        let message = SceneMessage::Gesture(tracker.update(hands));
        println!("{}", message.to_json()?);
    }
    log::info!("replayed {} frames", frames.len());
    Ok(())
}

fn cmd_track(args: TrackArgs) -> Result<()> {
    let (publisher, mut reader) = signal_channel(8);
    let (availability, session) = start_tracking(
        args.camera,
        tracker_config(args.no_mirror, args.precise),
        publisher.clone(),
    );
    if let TrackingAvailability::Unavailable(reason) = &availability {
        eprintln!("hand tracking unavailable: {reason}");
    }
    eprintln!("type `e` + enter to toggle explode, `r` + enter to reset zoom");
    let key_rx = spawn_key_reader();
    // Commands still drive the view when no camera worker is running.
    let mut fallback = GestureTracker::new(tracker_config(args.no_mirror, args.precise));

    let mut animator = ViewAnimator::new(ViewConfig::default());
    let started = Instant::now();
    let run_for = Duration::from_secs(args.seconds);
    let mut last_tick = started;
    let mut last_report = started;

    while started.elapsed() < run_for {
        thread::sleep(RENDER_INTERVAL);
        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32();
        last_tick = now;

        while let Ok(command) = key_rx.try_recv() {
            match &session {
                Some(session) => session.send(command),
                None => publisher.publish(command.apply(&mut fallback)),
            }
        }

        let signal = reader.latest();
        let state = animator.tick(&signal, dt);
        if now.duration_since(last_report) >= Duration::from_secs(1) {
            last_report = now;
            log::info!(
                "tracking={} yaw={:.3} pitch={:.3} scale={:.3} explosion={:.3}",
                signal.is_tracking,
                state.yaw,
                state.pitch,
                state.scale,
                state.explosion
            );
        }
    }

    if let Some(session) = session {
        session.stop();
    }
    Ok(())
}

fn spawn_key_reader() -> Receiver<TrackerCommand> {
    let (key_tx, key_rx) = unbounded();
    thread::spawn(move || {
        let mut keys = CommandKeys::default();
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if let Some(command) = keys.map(&line) {
                if key_tx.send(command).is_err() {
                    break;
                }
            }
        }
    });
    key_rx
}

fn print_summary(cloud: &PointCloud) {
    println!(
        "{} points from a {}x{} raster",
        cloud.count(),
        cloud.width(),
        cloud.height()
    );
    if let Some((min, max)) = cloud.bounds() {
        println!("bounds min={min:?} max={max:?}");
    }
    println!("normalization scale {:.6}", cloud.normalization_scale());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_config(args: &[&str]) -> TrackerConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.cmd {
            Command::Track(args) => tracker_config(args.no_mirror, args.precise),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn tracking_is_mirrored_unless_opted_out() {
        assert_eq!(track_config(&["depth-lens", "track"]), TrackerConfig::default());
        assert!(!track_config(&["depth-lens", "track", "--no-mirror"]).mirror);

        let precise = track_config(&["depth-lens", "track", "--precise"]);
        assert!(precise.mirror);
        assert_eq!(precise.sensitivity, Sensitivity::Precise);
    }

    #[test]
    fn build_accepts_background_for_saved_sessions() {
        let cli = Cli::try_parse_from([
            "depth-lens",
            "build",
            "--color",
            "c.png",
            "--depth",
            "d.png",
            "--background",
            "0.1",
            "--save",
            "s.json",
        ])
        .unwrap();
        let Command::Build(args) = cli.cmd else {
            panic!("expected build");
        };
        assert_eq!(args.background, Some(0.1));
        assert_eq!(args.save, Some(PathBuf::from("s.json")));
    }
}
