use crate::types::{DetectParams, FaceRect};
use image::GrayImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("model file not found: {0}; download det_10g.onnx from insightface and place it in the model dir")]
    ModelNotFound(String),
    #[error("invalid detection parameters: {0}")]
    InvalidParams(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face localization capability.
///
/// Given a grayscale image, returns candidate face rectangles in the image's
/// own coordinate frame, in the locator's preferred order. An image without
/// faces yields an empty `Vec`, not an error.
pub trait FaceLocator {
    fn locate(
        &mut self,
        gray: &GrayImage,
        params: &DetectParams,
    ) -> Result<Vec<FaceRect>, LocatorError>;
}

impl<L: FaceLocator + ?Sized> FaceLocator for Box<L> {
    fn locate(
        &mut self,
        gray: &GrayImage,
        params: &DetectParams,
    ) -> Result<Vec<FaceRect>, LocatorError> {
        (**self).locate(gray, params)
    }
}
