use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use facepin_core::{
    estimate_pose, pinning, pinned_start_shape_and_roi_with, template_bank, DetectorParameter,
    LandmarkScheme, ModelSelection, Point, PoseEstimate, Shape, UprightRoi,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(name = "facepin", about = "Start shape and face ROI from pinned landmarks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the start shape and face ROI
    Start {
        /// Grayscale (or colour, converted) input image
        #[arg(short, long)]
        image: PathBuf,
        /// JSON array of pinned points: `[x, y]` or `null` per landmark
        #[arg(short, long)]
        pinned: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Scheme::Canonical17)]
        scheme: Scheme,
        /// Where to write the ROI image
        #[arg(long)]
        roi_out: Option<PathBuf>,
    },
    /// Estimate rotation and yaw only
    Pose {
        #[arg(short, long)]
        pinned: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Scheme::Canonical17)]
        scheme: Scheme,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scheme {
    Pose5,
    Canonical17,
    Ibug68,
}

impl Scheme {
    fn landmarks(self) -> LandmarkScheme {
        match self {
            Scheme::Pose5 => LandmarkScheme::pose5(),
            Scheme::Canonical17 => LandmarkScheme::canonical17(),
            Scheme::Ibug68 => LandmarkScheme::ibug68(),
        }
    }
}

#[derive(Serialize)]
struct PoseReport {
    pose: PoseEstimate,
    selection: ModelSelection,
    bucket: String,
}

#[derive(Serialize)]
struct StartReport {
    pose: PoseEstimate,
    selection: ModelSelection,
    detpar: DetectorParameter,
    detpar_roi: DetectorParameter,
    start_shape: Shape,
    pinned_roi: Shape,
    roi_image: PathBuf,
}

/// Read pinned points and map them onto the canonical 17 slots the template
/// bank is built on.
fn load_pinned(path: &Path, scheme: Scheme) -> Result<Shape> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading pinned points from {}", path.display()))?;
    let raw: Vec<Option<[f64; 2]>> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let shape = Shape::new(
        raw.into_iter()
            .map(|p| p.map_or(Point::UNUSED, |[x, y]| Point::new(x, y)))
            .collect(),
    );
    let scheme = scheme.landmarks();
    scheme
        .to_canonical17(&shape)
        .with_context(|| format!("pinned points do not fit the {} scheme", scheme.name()))
}

fn run_pose(pinned: &Path, scheme: Scheme) -> Result<()> {
    let bank = template_bank()?;
    let pinned = load_pinned(pinned, scheme)?;
    let shape5 = pinning::pose_shape(&pinned, bank.frontal().mean_shape(), bank.scheme())?;
    let pose = estimate_pose(&shape5);
    let selection = bank.select(pose.yaw);

    let report = PoseReport {
        pose,
        selection,
        bucket: selection.bucket.to_string(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_start(
    config: &config::Config,
    image: &Path,
    pinned: &Path,
    scheme: Scheme,
    roi_out: Option<PathBuf>,
) -> Result<()> {
    let img = image::open(image)
        .with_context(|| format!("opening image {}", image.display()))?
        .into_luma8();
    tracing::info!(path = %image.display(), width = img.width(), height = img.height(), "loaded image");

    let bank = template_bank()?;
    let pinned = load_pinned(pinned, scheme)?;
    let roi = UprightRoi {
        border_frac: config.roi_border_frac,
    };
    let result = pinned_start_shape_and_roi_with(&img, &bank, &pinned, &roi)?;

    let roi_path = roi_out.unwrap_or_else(|| config.default_roi_path());
    result
        .face_roi
        .save(&roi_path)
        .with_context(|| format!("writing ROI image to {}", roi_path.display()))?;
    tracing::info!(path = %roi_path.display(), bucket = %result.selection.bucket, "wrote face ROI");

    let report = StartReport {
        pose: result.pose,
        selection: result.selection,
        detpar: result.detpar,
        detpar_roi: result.detpar_roi,
        start_shape: result.start_shape,
        pinned_roi: result.pinned_roi,
        roi_image: roi_path,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env();

    match cli.command {
        Commands::Start {
            image,
            pinned,
            scheme,
            roi_out,
        } => run_start(&config, &image, &pinned, scheme, roi_out),
        Commands::Pose { pinned, scheme } => run_pose(&pinned, scheme),
    }
}
