//! Agesphere host - headless driver for the visualization engine
//!
//! Runs one scene at a target frame rate, applies parameter overrides through
//! the config panel, simulates a click, and writes the last frame as a PPM
//! snapshot.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agesphere::camera::Viewport;
use agesphere::prng::SeedPolicy;
use agesphere::raster::SoftwareBackend;
use agesphere::render::RenderBackend;
use agesphere::{
    AgeInputs, HostConfig, ParamError, ParameterSet, RenderError, SceneKind, SceneOptions,
    VisualizationHost,
};
use glam::Vec2;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
enum HostError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("snapshot: {0}")]
    Io(#[from] std::io::Error),
}

fn usage() {
    eprintln!("agesphere_host (headless biological-age visualization)");
    eprintln!("Usage: agesphere_host <command> [options]\n");
    eprintln!("Commands:");
    eprintln!("  run                         Animate a scene and optionally snapshot it");
    eprintln!("  params                      Print the default parameter JSON");
    eprintln!("  help                        Show this message\n");
    eprintln!("Options:");
    eprintln!("  --kind <K>                  point-cloud | shader-field | nucleus-orbit | wireframe-network");
    eprintln!("  --bio <N> --chrono <N>      Biological and chronological age");
    eprintln!("  --frames <N>                Frames to render (default 180)");
    eprintln!("  --fps <1-240>               Target frame rate (default 60)");
    eprintln!("  --seed <N>                  Fixed layout seed (default: reshuffle)");
    eprintln!("  --width <W> --height <H>    Viewport size (default 800x600)");
    eprintln!("  --snapshot <PATH>           Write the last frame as binary PPM");
    eprintln!("  --config <PATH>             Start from a parameter JSON (as printed by `params`)");
    eprintln!("  --set key=value             Parameter override, repeatable");
    eprintln!("  --click X,Y                 Press the pointer after the first frame");
}

#[derive(Debug)]
struct RunArgs {
    kind: SceneKind,
    bio: u32,
    chrono: u32,
    frames: u64,
    fps: u32,
    seed: Option<u64>,
    width: u32,
    height: u32,
    snapshot: Option<PathBuf>,
    config: Option<PathBuf>,
    sets: Vec<(String, String)>,
    click: Option<Vec2>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            kind: SceneKind::PointCloud,
            bio: 35,
            chrono: 40,
            frames: 180,
            fps: 60,
            seed: None,
            width: 800,
            height: 600,
            snapshot: None,
            config: None,
            sets: Vec::new(),
            click: None,
        }
    }
}

fn parse_num<T: std::str::FromStr>(flag: &str, raw: Option<&String>) -> Result<T, HostError> {
    let raw = raw.ok_or_else(|| HostError::Usage(format!("{flag} needs a value")))?;
    raw.parse()
        .map_err(|_| HostError::Usage(format!("invalid value for {flag}: {raw}")))
}

fn parse_click(raw: &str) -> Result<Vec2, HostError> {
    let bad = || HostError::Usage(format!("invalid --click (expected X,Y): {raw}"));
    let (x, y) = raw.split_once(',').ok_or_else(bad)?;
    let x: f32 = x.trim().parse().map_err(|_| bad())?;
    let y: f32 = y.trim().parse().map_err(|_| bad())?;
    Ok(Vec2::new(x, y))
}

fn parse_run(args: &[String]) -> Result<RunArgs, HostError> {
    let mut out = RunArgs::default();
    let mut it = args.iter();
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--kind" => {
                let raw = it
                    .next()
                    .ok_or_else(|| HostError::Usage("--kind needs a value".into()))?;
                out.kind = raw.parse().map_err(HostError::Usage)?;
            }
            "--bio" => out.bio = parse_num(flag, it.next())?,
            "--chrono" => out.chrono = parse_num(flag, it.next())?,
            "--frames" => out.frames = parse_num(flag, it.next())?,
            "--fps" => out.fps = parse_num::<u32>(flag, it.next())?.clamp(1, 240),
            "--seed" => out.seed = Some(parse_num(flag, it.next())?),
            "--width" => out.width = parse_num(flag, it.next())?,
            "--height" => out.height = parse_num(flag, it.next())?,
            "--snapshot" => {
                let raw = it
                    .next()
                    .ok_or_else(|| HostError::Usage("--snapshot needs a path".into()))?;
                out.snapshot = Some(PathBuf::from(raw));
            }
            "--config" => {
                let raw = it
                    .next()
                    .ok_or_else(|| HostError::Usage("--config needs a path".into()))?;
                out.config = Some(PathBuf::from(raw));
            }
            "--set" => {
                let raw = it
                    .next()
                    .ok_or_else(|| HostError::Usage("--set needs key=value".into()))?;
                let (key, value) = raw
                    .split_once('=')
                    .ok_or_else(|| HostError::Usage(format!("invalid --set (expected key=value): {raw}")))?;
                out.sets.push((key.trim().to_string(), value.trim().to_string()));
            }
            "--click" => {
                let raw = it
                    .next()
                    .ok_or_else(|| HostError::Usage("--click needs X,Y".into()))?;
                out.click = Some(parse_click(raw)?);
            }
            other => return Err(HostError::Usage(format!("unknown option: {other}"))),
        }
    }
    Ok(out)
}

fn parse_kind(args: &[String]) -> Result<SceneKind, HostError> {
    match args {
        [] => Ok(SceneKind::PointCloud),
        [flag, raw] if flag == "--kind" => raw.parse().map_err(HostError::Usage),
        _ => Err(HostError::Usage("params takes only --kind <K>".into())),
    }
}

fn load_config(path: &Path) -> Result<ParameterSet, HostError> {
    let text = std::fs::read_to_string(path)?;
    ParameterSet::from_json(&text)
        .map_err(|e| HostError::Usage(format!("invalid --config {}: {e}", path.display())))
}

fn backend(width: u32, height: u32) -> Box<dyn RenderBackend> {
    #[cfg(feature = "gpu")]
    match agesphere::gpu::GpuBackend::new(width, height) {
        Ok(gpu) => return Box::new(gpu),
        Err(e) => warn!("GPU backend unavailable, using software: {}", e),
    }
    Box::new(SoftwareBackend::new(width, height))
}

async fn run(args: RunArgs) -> Result<(), HostError> {
    let viewport = Viewport::new(args.width, args.height);
    let config = HostConfig {
        ages: AgeInputs::new(args.bio, args.chrono),
        viewport,
        options: SceneOptions {
            seed: args.seed.map_or(SeedPolicy::Entropy, SeedPolicy::Fixed),
            ..SceneOptions::default()
        },
        ..HostConfig::default()
    };
    let mut host = VisualizationHost::new(
        args.kind,
        None,
        config,
        backend(viewport.width, viewport.height),
    );
    info!(
        "Mounted {} ({} backend, {}x{})",
        host.kind(),
        host.renderer().backend_name(),
        viewport.width,
        viewport.height
    );

    host.on_click(|| info!("Scene clicked"));

    if let Some(path) = &args.config {
        host.set_params(load_config(path)?);
        info!("Loaded {} parameters from {}", host.kind(), path.display());
    }

    for (key, value) in &args.sets {
        host.edit_text(key, value)?;
        info!("Set {} = {}", key, host.params().get(key).map(|v| v.to_string()).unwrap_or_default());
    }

    let period = Duration::from_secs_f64(1.0 / args.fps as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut rendered = 0u64;
    while rendered < args.frames {
        tokio::select! {
            _ = interval.tick() => {
                host.tick_by(period)?;
                rendered += 1;
                if rendered == 1 {
                    if let Some(pos) = args.click {
                        host.pointer_down(pos);
                        info!("Pointer down at ({}, {}), clicks: {}", pos.x, pos.y, host.clicks());
                    }
                }
            }
            _ = &mut ctrl_c => {
                warn!("Ctrl-C: stopping after {} frames", rendered);
                break;
            }
        }
    }

    let overlay = host.overlay();
    info!("Rendered {} frames; overlay: {}", rendered, overlay);

    if let Some(path) = &args.snapshot {
        match host.framebuffer() {
            Some(fb) => {
                fb.write_ppm(BufWriter::new(File::create(path)?))?;
                info!("Snapshot written to {}", path.display());
            }
            None => warn!("Backend {} keeps no pixels; no snapshot", host.renderer().backend_name()),
        }
    }

    host.unmount();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cmd) = args.first() else {
        usage();
        std::process::exit(2);
    };

    let result = match cmd.as_str() {
        "run" => match parse_run(&args[1..]) {
            Ok(run_args) => run(run_args).await,
            Err(e) => Err(e),
        },
        "params" => parse_kind(&args[1..]).map(|kind| {
            println!("{}", ParameterSet::default_for(kind).to_pretty_json());
        }),
        "help" | "--help" | "-h" => {
            usage();
            Ok(())
        }
        other => Err(HostError::Usage(format!("unknown command: {other}"))),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if matches!(e, HostError::Usage(_)) {
            usage();
            std::process::exit(2);
        }
        std::process::exit(1);
    }
}
