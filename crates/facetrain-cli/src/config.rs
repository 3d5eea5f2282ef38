use anyhow::{Context, Result};
use facetrain_core::recognizer::lbph::LbphParams;
use facetrain_core::recognizer::{EigenfaceTrainer, FisherfaceTrainer, LbphTrainer};
use facetrain_core::{DetectParams, Trainers};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Training configuration: defaults, then an optional TOML file, then
/// `FACETRAIN_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory containing the SCRFD detection model.
    pub model_dir: PathBuf,
    /// Detection pyramid step; must be greater than 1.0.
    pub scale_factor: f32,
    /// Minimum overlapping candidates before a face is kept.
    pub min_neighbors: u32,
    pub lbph_radius: u32,
    pub lbph_neighbors: u32,
    /// LBPH grid, applied to both axes.
    pub lbph_grid: u32,
    /// Eigenface components to keep (0 = all).
    pub eigen_components: usize,
    /// Fisherface components to keep (0 = classes - 1).
    pub fisher_components: usize,
}

impl Default for Config {
    fn default() -> Self {
        let detect = DetectParams::default();
        let lbph = LbphParams::default();
        Self {
            model_dir: default_model_dir(),
            scale_factor: detect.scale_factor,
            min_neighbors: detect.min_neighbors,
            lbph_radius: lbph.radius,
            lbph_neighbors: lbph.neighbors,
            lbph_grid: lbph.grid_x,
            eigen_components: 0,
            fisher_components: 0,
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Override fields from `FACETRAIN_*` variables. Unparseable values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("FACETRAIN_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        env_parse(&var, "FACETRAIN_SCALE_FACTOR", &mut self.scale_factor);
        env_parse(&var, "FACETRAIN_MIN_NEIGHBORS", &mut self.min_neighbors);
        env_parse(&var, "FACETRAIN_LBPH_RADIUS", &mut self.lbph_radius);
        env_parse(&var, "FACETRAIN_LBPH_NEIGHBORS", &mut self.lbph_neighbors);
        env_parse(&var, "FACETRAIN_LBPH_GRID", &mut self.lbph_grid);
        env_parse(&var, "FACETRAIN_EIGEN_COMPONENTS", &mut self.eigen_components);
        env_parse(&var, "FACETRAIN_FISHER_COMPONENTS", &mut self.fisher_components);
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join("det_10g.onnx")
    }

    pub fn detect_params(&self) -> DetectParams {
        DetectParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
        }
    }

    pub fn trainers(&self) -> Trainers {
        let lbph = LbphParams {
            radius: self.lbph_radius,
            neighbors: self.lbph_neighbors,
            grid_x: self.lbph_grid,
            grid_y: self.lbph_grid,
        };
        Trainers {
            lbph: Box::new(LbphTrainer::new(lbph)),
            eigenface: Box::new(EigenfaceTrainer::new(self.eigen_components)),
            fisherface: Box::new(FisherfaceTrainer::new(self.fisher_components)),
        }
    }
}

/// `$XDG_DATA_HOME/facetrain/models`, falling back to `~/.local/share`.
fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facetrain/models")
}

fn env_parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    match var(key).map(|v| v.parse::<T>()) {
        Some(Ok(value)) => *slot = value,
        Some(Err(_)) => tracing::warn!(key, "ignoring unparseable environment override"),
        None => {}
    }
}
