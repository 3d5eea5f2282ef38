use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facetrain_core::{FaceExtractor, ScrfdLocator, TrainingPipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facetrain", about = "Train face recognizers from a labeled photo directory")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train LBPH, Eigenface and Fisherface models
    Train {
        /// Directory of `<label>_<name>` photos
        #[arg(short, long)]
        photos: PathBuf,
        /// Output prefix; writes `<export>_lbph.yml` etc.
        #[arg(short, long)]
        export: PathBuf,
    },
    /// Count the files in a photo directory
    Count {
        #[arg(short, long)]
        photos: PathBuf,
    },
    /// Print the crop size Eigenfaces and Fisherfaces would train on
    Size {
        #[arg(short, long)]
        photos: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Train { photos, export } => {
            let mut pipeline = build_pipeline(&config, photos, export)?;
            let artifacts = pipeline.train().context("training failed")?;
            println!("{}", artifacts.lbph.display());
            println!("{}", artifacts.eigenface.display());
            println!("{}", artifacts.fisherface.display());
        }
        Commands::Count { photos } => {
            let dataset = facetrain_core::Dataset::scan(&photos)
                .with_context(|| format!("cannot scan {}", photos.display()))?;
            println!("{}", dataset.count());
        }
        Commands::Size { photos } => {
            let mut pipeline = build_pipeline(&config, photos, PathBuf::new())?;
            let size = pipeline.target_size().context("sizing failed")?;
            println!("{}x{}", size.width, size.height);
        }
    }

    Ok(())
}

fn build_pipeline(
    config: &Config,
    photos: PathBuf,
    export: PathBuf,
) -> Result<TrainingPipeline<ScrfdLocator>> {
    let model_path = config.scrfd_model_path();
    let locator = ScrfdLocator::load(&model_path)
        .with_context(|| format!("cannot load face detector {}", model_path.display()))?;
    let extractor = FaceExtractor::with_params(locator, config.detect_params());
    Ok(TrainingPipeline::new(photos, export, extractor).with_trainers(config.trainers()))
}
