//! Face crop extraction from a labeled dataset.
//!
//! Two passes share this module: sizing, which finds the largest first-detected
//! face across the dataset, and extraction, which crops every detected face
//! and optionally resizes it to that size.

use crate::locator::{FaceLocator, LocatorError};
use crate::types::{CropSize, DatasetEntry, DetectParams, FaceRect, TrainingSample};
use image::imageops::{self, FilterType};
use image::GrayImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("face locator failed on {path}: {source}")]
    Locator {
        path: PathBuf,
        #[source]
        source: LocatorError,
    },
    #[error("cannot resize face crops to an empty target size")]
    EmptyTargetSize,
}

/// Samples produced by one extraction pass, with skip counters.
#[derive(Debug, Default)]
pub struct Extraction {
    pub samples: Vec<TrainingSample>,
    /// Rectangles returned by the locator across all images.
    pub faces: usize,
    /// Images where the locator found nothing.
    pub images_without_faces: usize,
}

impl Extraction {
    pub fn images(&self) -> impl Iterator<Item = &GrayImage> {
        self.samples.iter().map(|s| &s.image)
    }

    pub fn labels(&self) -> Vec<i32> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

/// Crops faces out of dataset images using a [`FaceLocator`].
pub struct FaceExtractor<L> {
    locator: L,
    params: DetectParams,
}

impl<L: FaceLocator> FaceExtractor<L> {
    pub fn new(locator: L) -> Self {
        Self::with_params(locator, DetectParams::default())
    }

    pub fn with_params(locator: L, params: DetectParams) -> Self {
        Self { locator, params }
    }

    pub fn params(&self) -> &DetectParams {
        &self.params
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Size of the largest-area first detection across `entries`.
    ///
    /// Only the first rectangle per image is considered. Images without faces
    /// are skipped. Returns `(0, 0)` when no image has a face.
    pub fn compute_target_size(
        &mut self,
        entries: &[DatasetEntry],
    ) -> Result<CropSize, ExtractError> {
        let mut best = FaceRect::default();
        let mut skipped = 0usize;

        for entry in entries {
            let (_, faces) = self.detect(&entry.path)?;
            let Some(first) = faces.first() else {
                skipped += 1;
                continue;
            };
            if first.area() > best.area() {
                best = *first;
            }
        }

        let size = CropSize::from(best);
        tracing::info!(
            width = size.width,
            height = size.height,
            images_without_faces = skipped,
            "computed target crop size"
        );
        Ok(size)
    }

    /// Crop every detected face of every entry into a labeled sample.
    ///
    /// With `target`, each crop is resized to exactly that size. Samples come
    /// out in entry order, then detection order.
    pub fn extract(
        &mut self,
        entries: &[DatasetEntry],
        target: Option<CropSize>,
    ) -> Result<Extraction, ExtractError> {
        let mut out = Extraction::default();

        for entry in entries {
            let (gray, faces) = self.detect(&entry.path)?;
            if faces.is_empty() {
                tracing::debug!(path = %entry.path.display(), "no face detected");
                out.images_without_faces += 1;
                continue;
            }
            out.faces += faces.len();
            for rect in faces {
                let image = crop_face(&gray, &rect, target)?;
                out.samples.push(TrainingSample { image, label: entry.label });
            }
        }

        if out.images_without_faces > 0 {
            tracing::warn!(
                count = out.images_without_faces,
                "images without a detected face were skipped"
            );
        }
        tracing::info!(
            faces = out.faces,
            samples = out.samples.len(),
            uniform = target.is_some(),
            "extracted face crops"
        );
        Ok(out)
    }

    fn detect(&mut self, path: &Path) -> Result<(GrayImage, Vec<FaceRect>), ExtractError> {
        let gray = load_grayscale(path)?;
        let faces = self
            .locator
            .locate(&gray, &self.params)
            .map_err(|source| ExtractError::Locator {
                path: path.to_path_buf(),
                source,
            })?;
        Ok((gray, faces))
    }
}

/// Decode an image file and convert it to 8-bit grayscale.
pub fn load_grayscale(path: &Path) -> Result<GrayImage, ExtractError> {
    let img = image::open(path).map_err(|source| ExtractError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// Crop `rect` out of `gray`, resizing with bilinear filtering when `target` is set.
///
/// `rect` is clipped to the image first; a rectangle entirely outside the
/// image produces an empty crop.
pub fn crop_face(
    gray: &GrayImage,
    rect: &FaceRect,
    target: Option<CropSize>,
) -> Result<GrayImage, ExtractError> {
    let (w, h) = gray.dimensions();
    let crop = match rect.clip(w, h) {
        Some(r) => imageops::crop_imm(gray, r.x, r.y, r.width, r.height).to_image(),
        None => GrayImage::new(0, 0),
    };

    match target {
        None => Ok(crop),
        Some(size) if size.is_empty() => Err(ExtractError::EmptyTargetSize),
        Some(size) if crop.dimensions() == (size.width, size.height) => Ok(crop),
        Some(size) if crop.width() == 0 || crop.height() == 0 => {
            Ok(GrayImage::new(size.width, size.height))
        }
        Some(size) => Ok(imageops::resize(&crop, size.width, size.height, FilterType::Triangle)),
    }
}
