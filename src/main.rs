use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facemetrics::{config, replay, FaceDetectorProcessor, FaceReport, GraphicOverlay};
use facemetrics_vision::{FaceDetector, YuNetDetector};
use image::{DynamicImage, RgbImage};
use log::{info, warn};

/// Canvas used for replays without a background image.
const BLANK_CANVAS: (u32, u32) = (640, 480);

#[derive(Parser)]
#[command(name = "facemetrics")]
#[command(version, about = "Face detection diagnostics and eye-distance ratio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect faces in images, processed as consecutive frames
    Detect {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// YuNet model (defaults to the configured one)
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Directory for annotated frames
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Feed recorded detections through the processor
    Replay {
        file: PathBuf,
        /// Image to draw the overlay on
        #[arg(short, long)]
        background: Option<PathBuf>,
        /// Directory for annotated frames
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    run(Cli::parse(), None)
}

/// Dispatch a command. Only `detect` reads the config file.
fn run(cli: Cli, config_path: Option<&Path>) -> Result<()> {
    match cli.command {
        Commands::Detect {
            images,
            model,
            output,
        } => {
            let cfg = config::load_config(config_path)?;
            let model = model.unwrap_or_else(|| cfg.model.clone());
            run_detect(&cfg, &model, &images, output.as_deref())
        }
        Commands::Replay {
            file,
            background,
            output,
        } => run_replay(&file, background.as_deref(), output.as_deref()),
        Commands::Config => open_config(config_path.unwrap_or(&config::CONFIG_PATH)),
    }
}

fn run_detect(
    cfg: &config::Config,
    model: &Path,
    images: &[PathBuf],
    output: Option<&Path>,
) -> Result<()> {
    info!("Loading face detector: {}", model.display());
    let detector = YuNetDetector::new(model, cfg.detector_options())
        .context("Failed to initialize face detector")?;
    let mut processor = FaceDetectorProcessor::new(detector);

    for (i, path) in images.iter().enumerate() {
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Frame {}: cannot read {}: {}", i + 1, path.display(), e);
                continue;
            }
        };

        let mut overlay = GraphicOverlay::new();
        let reports = processor.process_frame(&img, &mut overlay)?;
        summarize(i, &reports);

        if let Some(dir) = output {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("frame_{:04}", i + 1));
            save_frame(img.to_rgb8(), &overlay, &dir.join(format!("{}_faces.png", name)))?;
        }
    }

    finish(processor)
}

fn run_replay(file: &Path, background: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let frames = replay::load_frames(file).context("Failed to load replay")?;
    info!("Replaying {} frame(s) from {}", frames.len(), file.display());

    let canvas = match background {
        Some(path) => image::open(path)
            .with_context(|| format!("opening background {}", path.display()))?,
        None => DynamicImage::ImageRgb8(RgbImage::new(BLANK_CANVAS.0, BLANK_CANVAS.1)),
    };

    let count = frames.len();
    let mut processor = FaceDetectorProcessor::new(replay::ReplayDetector::new(frames));
    for i in 0..count {
        let mut overlay = GraphicOverlay::new();
        let reports = processor.process_frame(&canvas, &mut overlay)?;
        summarize(i, &reports);

        if let Some(dir) = output {
            save_frame(
                canvas.to_rgb8(),
                &overlay,
                &dir.join(format!("frame_{:04}.png", i + 1)),
            )?;
        }
    }

    finish(processor)
}

fn summarize(frame: usize, reports: &[FaceReport]) {
    info!("Frame {}: {} face(s)", frame + 1, reports.len());
    for report in reports {
        if let Some(ratio) = report.ratio() {
            info!(
                "  face {}: en-en/ex-ex {:.4}",
                report
                    .tracking_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
                ratio
            );
        }
    }
}

fn save_frame(mut canvas: RgbImage, overlay: &GraphicOverlay, path: &Path) -> Result<()> {
    overlay.render(&mut canvas);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn finish<D: FaceDetector>(mut processor: FaceDetectorProcessor<D>) -> Result<()> {
    match processor.latest_ratio() {
        Some(ratio) => info!("Latest en-en/ex-ex ratio: {:.4}", ratio),
        None => info!("No face with usable eye contours"),
    }
    processor.stop();
    Ok(())
}

fn open_config(path: &Path) -> Result<()> {
    let config_path = path.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, "score_threshold = [").unwrap();
        path
    }

    #[test]
    fn test_replay_ignores_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = broken_config(dir.path());
        let replay = dir.path().join("replay.json");
        std::fs::write(&replay, r#"[{ "faces": [] }]"#).unwrap();

        let cli = Cli::try_parse_from(["facemetrics", "replay", replay.to_str().unwrap()]).unwrap();
        run(cli, Some(&cfg)).unwrap();
    }

    #[test]
    fn test_detect_reports_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = broken_config(dir.path());

        let cli = Cli::try_parse_from(["facemetrics", "detect", "frame.png"]).unwrap();
        let err = run(cli, Some(&cfg)).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
    }
}
