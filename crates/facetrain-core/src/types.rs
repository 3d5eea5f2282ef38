use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned face rectangle in source image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Clip to an image of `img_width` × `img_height`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clip(&self, img_width: u32, img_height: u32) -> Option<FaceRect> {
        if self.x >= img_width || self.y >= img_height {
            return None;
        }
        let width = self.width.min(img_width - self.x);
        let height = self.height.min(img_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(FaceRect { x: self.x, y: self.y, width, height })
    }
}

/// Uniform crop size used by the fixed-shape recognizers.
///
/// `(0, 0)` means no face was found anywhere in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CropSize {
    pub width: u32,
    pub height: u32,
}

impl CropSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<FaceRect> for CropSize {
    fn from(rect: FaceRect) -> Self {
        Self { width: rect.width, height: rect.height }
    }
}

/// Parameters handed to the face locator on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectParams {
    /// Image pyramid step between detection scales.
    pub scale_factor: f32,
    /// Minimum number of overlapping raw detections that must support a face.
    pub min_neighbors: u32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.3,
            min_neighbors: 5,
        }
    }
}

/// A labeled image file from the dataset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    pub path: PathBuf,
    pub label: i32,
}

/// A grayscale face crop with its identity label.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub image: GrayImage,
    pub label: i32,
}

impl TrainingSample {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
