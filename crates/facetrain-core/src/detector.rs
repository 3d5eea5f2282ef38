//! SCRFD face locator via ONNX Runtime.
//!
//! Runs the SCRFD (Sample and Computation Redistribution for Efficient Face
//! Detection) model with 3-stride anchor-free decoding, then merges raw anchor
//! hits with NMS. Each kept face remembers how many raw hits it absorbed, which
//! is what `DetectParams::min_neighbors` is checked against.

use crate::locator::{FaceLocator, LocatorError};
use crate::types::{DetectParams, FaceRect};
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const SCRFD_INPUT_SIZE: usize = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_CONFIDENCE_THRESHOLD: f32 = 0.5;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

/// Scale and padding applied when fitting the image into the model input.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: usize, height: usize, input: usize) -> (Self, usize, usize) {
        let scale = (input as f32 / width as f32).min(input as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as usize).clamp(1, input);
        let new_h = ((height as f32 * scale).round() as usize).clamp(1, input);
        let lb = Letterbox {
            scale,
            pad_x: (input - new_w) as f32 / 2.0,
            pad_y: (input - new_h) as f32 / 2.0,
        };
        (lb, new_w, new_h)
    }

    /// Map a point from model input space back to the source image.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// A raw detection in source image coordinates, before rounding.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Round outward-in to pixel coordinates and clip to the image.
    fn to_rect(&self, img_width: u32, img_height: u32) -> Option<FaceRect> {
        let x1 = self.x1.round().max(0.0);
        let y1 = self.y1.round().max(0.0);
        let x2 = self.x2.round().min(img_width as f32);
        let y2 = self.y2.round().min(img_height as f32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        FaceRect::new(x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32)
            .clip(img_width, img_height)
    }
}

/// Output tensor indices for one stride: (score_idx, bbox_idx).
type StrideOutputIndices = (usize, usize);

/// SCRFD-backed [`FaceLocator`].
pub struct ScrfdLocator {
    session: Session,
    stride_indices: [StrideOutputIndices; 3],
}

impl ScrfdLocator {
    /// Load the SCRFD ONNX model from `model_path`.
    pub fn load(model_path: &Path) -> Result<Self, LocatorError> {
        if !model_path.exists() {
            return Err(LocatorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        // Score and bbox tensors for three strides; keypoint tensors are unused.
        if output_names.len() < 6 {
            return Err(LocatorError::InferenceFailed(format!(
                "SCRFD model needs score and bbox outputs for 3 strides, got {} outputs",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self { session, stride_indices })
    }

    fn preprocess(gray: &GrayImage) -> (Array4<f32>, Letterbox) {
        let (width, height) = gray.dimensions();
        let (letterbox, new_w, new_h) =
            Letterbox::fit(width as usize, height as usize, SCRFD_INPUT_SIZE);
        let resized = imageops::resize(gray, new_w as u32, new_h as u32, FilterType::Triangle);

        let pad_x = letterbox.pad_x.floor() as usize;
        let pad_y = letterbox.pad_y.floor() as usize;

        // Padding is filled with the mean so it normalizes to 0.0.
        let mut tensor = Array4::<f32>::zeros((1, 3, SCRFD_INPUT_SIZE, SCRFD_INPUT_SIZE));
        for y in 0..SCRFD_INPUT_SIZE {
            for x in 0..SCRFD_INPUT_SIZE {
                let inside = y >= pad_y && y < pad_y + new_h && x >= pad_x && x < pad_x + new_w;
                let pixel = if inside {
                    resized.get_pixel((x - pad_x) as u32, (y - pad_y) as u32)[0] as f32
                } else {
                    SCRFD_MEAN
                };
                let v = (pixel - SCRFD_MEAN) / SCRFD_STD;
                for c in 0..3 {
                    tensor[[0, c, y, x]] = v;
                }
            }
        }

        (tensor, letterbox)
    }
}

impl FaceLocator for ScrfdLocator {
    fn locate(
        &mut self,
        gray: &GrayImage,
        params: &DetectParams,
    ) -> Result<Vec<FaceRect>, LocatorError> {
        if params.scale_factor.is_nan() || params.scale_factor <= 1.0 {
            return Err(LocatorError::InvalidParams(format!(
                "scale_factor must be > 1.0, got {}",
                params.scale_factor
            )));
        }
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let (input, letterbox) = Self::preprocess(gray);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_indices[pos];
            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| LocatorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| LocatorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;
            candidates.extend(decode_stride(
                scores,
                bboxes,
                stride,
                SCRFD_INPUT_SIZE,
                &letterbox,
                SCRFD_CONFIDENCE_THRESHOLD,
            ));
        }

        let raw = candidates.len();
        let faces: Vec<FaceRect> = nms(candidates, SCRFD_NMS_THRESHOLD)
            .into_iter()
            .filter(|(_, support)| *support >= params.min_neighbors as usize)
            .filter_map(|(c, _)| c.to_rect(width, height))
            .collect();

        tracing::debug!(raw, faces = faces.len(), "SCRFD detections");
        Ok(faces)
    }
}

/// Map stride slots to output tensor indices.
///
/// Exports name tensors either `score_8`, `bbox_16`, ... or with generic
/// numbers. Generic names fall back to the standard layout
/// `[0-2]` = scores, `[3-5]` = bboxes (strides 8, 16, 32).
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == target)
    };

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&s| Some((find("score", s)?, find("bbox", s)?)))
        .collect();

    match named {
        Some(v) => [v[0], v[1], v[2]],
        None => {
            tracing::info!(?names, "SCRFD output names not recognized, using positional mapping");
            [(0, 3), (1, 4), (2, 5)]
        }
    }
}

/// Decode the detections of one stride level into source image coordinates.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    input_size: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<Candidate> {
    let grid = input_size / stride;
    let anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
    let s = stride as f32;

    (0..anchors)
        .filter_map(|idx| {
            let score = scores.get(idx).copied()?;
            if score <= threshold {
                return None;
            }
            let off = bboxes.get(idx * 4..idx * 4 + 4)?;
            let cell = idx / SCRFD_ANCHORS_PER_CELL;
            let cx = (cell % grid) as f32 * s;
            let cy = (cell / grid) as f32 * s;

            let (x1, y1) = letterbox.unmap(cx - off[0] * s, cy - off[1] * s);
            let (x2, y2) = letterbox.unmap(cx + off[2] * s, cy + off[3] * s);
            Some(Candidate { x1, y1, x2, y2, score })
        })
        .collect()
}

/// Non-maximum suppression.
///
/// Returns kept candidates, highest score first, each paired with the number
/// of raw candidates it stands for (itself plus every box it suppressed).
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<(Candidate, usize)> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut suppressed = vec![false; candidates.len()];
    let mut keep = Vec::new();

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        let mut support = 1;
        for j in (i + 1)..candidates.len() {
            if !suppressed[j] && iou(&candidates[i], &candidates[j]) > iou_threshold {
                suppressed[j] = true;
                support += 1;
            }
        }
        keep.push((candidates[i].clone(), support));
    }

    keep
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a.area() + b.area() - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}
