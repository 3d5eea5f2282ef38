//! Local Binary Pattern Histograms.
//!
//! Each crop is turned into circular LBP codes, split into a `grid_x × grid_y`
//! grid, and summarized as one normalized code histogram per cell. The
//! descriptor length depends only on the parameters, never on the crop size,
//! so crops of any size can be mixed.

use super::{artifact, Algorithm, Prediction, TrainError, TrainedModel, Trainer};
use crate::types::TrainingSample;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

/// Pixels are integers, so interpolation error below this counts as equal.
const LBP_EQUAL_EPSILON: f64 = 1e-6;
const MAX_NEIGHBORS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbphParams {
    pub radius: u32,
    pub neighbors: u32,
    pub grid_x: u32,
    pub grid_y: u32,
}

impl Default for LbphParams {
    fn default() -> Self {
        Self {
            radius: 1,
            neighbors: 8,
            grid_x: 8,
            grid_y: 8,
        }
    }
}

impl LbphParams {
    fn validate(&self) -> Result<(), TrainError> {
        let reason = if self.radius == 0 {
            "radius must be at least 1"
        } else if self.neighbors == 0 || self.neighbors > MAX_NEIGHBORS {
            "neighbors must be between 1 and 16"
        } else if self.grid_x == 0 || self.grid_y == 0 {
            "grid dimensions must be at least 1"
        } else {
            return Ok(());
        };
        Err(TrainError::InvalidParams {
            algorithm: Algorithm::Lbph,
            reason: reason.to_string(),
        })
    }

    fn bins(&self) -> usize {
        1usize << self.neighbors
    }

    /// Spatial histogram descriptor of `image`.
    pub fn describe(&self, image: &GrayImage) -> Vec<f32> {
        let (codes, w, h) = elbp(image, self.radius, self.neighbors);
        spatial_histogram(&codes, w, h, self.bins(), self.grid_x, self.grid_y)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LbphTrainer {
    pub params: LbphParams,
}

impl LbphTrainer {
    pub fn new(params: LbphParams) -> Self {
        Self { params }
    }

    pub fn fit(&self, samples: &[TrainingSample]) -> Result<LbphModel, TrainError> {
        self.params.validate()?;
        if samples.is_empty() {
            return Err(TrainError::Empty(Algorithm::Lbph));
        }

        let histograms = samples.iter().map(|s| self.params.describe(&s.image)).collect();
        tracing::info!(
            samples = samples.len(),
            radius = self.params.radius,
            neighbors = self.params.neighbors,
            grid_x = self.params.grid_x,
            grid_y = self.params.grid_y,
            "LBPH trained"
        );

        Ok(LbphModel {
            params: self.params,
            histograms,
            labels: samples.iter().map(|s| s.label).collect(),
        })
    }
}

impl Trainer for LbphTrainer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Lbph
    }

    fn train(&self, samples: &[TrainingSample]) -> Result<Box<dyn TrainedModel>, TrainError> {
        Ok(Box::new(self.fit(samples)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbphModel {
    pub params: LbphParams,
    pub histograms: Vec<Vec<f32>>,
    pub labels: Vec<i32>,
}

impl TrainedModel for LbphModel {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Lbph
    }

    fn predict(&self, image: &GrayImage) -> Result<Prediction, TrainError> {
        let query = self.params.describe(image);
        self.histograms
            .iter()
            .zip(&self.labels)
            .map(|(h, &label)| Prediction {
                label,
                distance: chi_square(h, &query),
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .ok_or(TrainError::Empty(Algorithm::Lbph))
    }

    fn save(&self, path: &Path) -> Result<(), TrainError> {
        artifact::write(path, Algorithm::Lbph, &self.labels, self)
    }
}

/// Circular (extended) LBP codes with bilinear sampling.
///
/// Returns the codes and their `(width, height)`, which is the image shrunk
/// by `radius` on every side; images too small for that yield no codes.
fn elbp(image: &GrayImage, radius: u32, neighbors: u32) -> (Vec<u32>, usize, usize) {
    let (iw, ih) = (image.width() as usize, image.height() as usize);
    let r = radius as usize;
    if iw <= 2 * r || ih <= 2 * r {
        return (Vec::new(), 0, 0);
    }
    let (w, h) = (iw - 2 * r, ih - 2 * r);
    let px = |x: usize, y: usize| image.as_raw()[y * iw + x] as f64;

    let mut codes = vec![0u32; w * h];
    for n in 0..neighbors {
        let angle = 2.0 * PI * n as f64 / neighbors as f64;
        let sx = radius as f64 * angle.cos();
        let sy = -(radius as f64) * angle.sin();

        let (fx, fy) = (sx.floor(), sy.floor());
        let (cx, cy) = (sx.ceil(), sy.ceil());
        let (tx, ty) = (sx - fx, sy - fy);
        let w1 = (1.0 - tx) * (1.0 - ty);
        let w2 = tx * (1.0 - ty);
        let w3 = (1.0 - tx) * ty;
        let w4 = tx * ty;

        // Offsets stay within [-r, r], so shifting by r keeps indices unsigned.
        let off = |d: f64| (d as isize + r as isize) as usize;
        let (fxo, fyo, cxo, cyo) = (off(fx), off(fy), off(cx), off(cy));

        for y in 0..h {
            for x in 0..w {
                let center = px(x + r, y + r);
                let t = w1 * px(x + fxo, y + fyo)
                    + w2 * px(x + cxo, y + fyo)
                    + w3 * px(x + fxo, y + cyo)
                    + w4 * px(x + cxo, y + cyo);
                if t > center || (t - center).abs() < LBP_EQUAL_EPSILON {
                    codes[y * w + x] |= 1 << n;
                }
            }
        }
    }
    (codes, w, h)
}

/// Concatenated per-cell histograms, each normalized to sum to 1.
///
/// Cells are `w / grid_x` by `h / grid_y` codes; leftover border codes are
/// ignored and empty cells contribute all-zero histograms.
fn spatial_histogram(
    codes: &[u32],
    w: usize,
    h: usize,
    bins: usize,
    grid_x: u32,
    grid_y: u32,
) -> Vec<f32> {
    let (gx, gy) = (grid_x as usize, grid_y as usize);
    let (cell_w, cell_h) = (w / gx, h / gy);
    let mut hist = vec![0f32; gx * gy * bins];
    if cell_w == 0 || cell_h == 0 {
        return hist;
    }
    let norm = 1.0 / (cell_w * cell_h) as f32;

    for row in 0..gy {
        for col in 0..gx {
            let cell = &mut hist[(row * gx + col) * bins..(row * gx + col + 1) * bins];
            for y in row * cell_h..(row + 1) * cell_h {
                for x in col * cell_w..(col + 1) * cell_w {
                    cell[codes[y * w + x] as usize] += norm;
                }
            }
        }
    }
    hist
}

/// Symmetric chi-square distance between two histograms.
fn chi_square(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            let sum = x + y;
            if sum > 0.0 { (x - y).powi(2) / sum } else { 0.0 }
        })
        .sum()
}
