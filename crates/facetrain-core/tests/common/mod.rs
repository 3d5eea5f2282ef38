#![allow(dead_code)]

use facetrain_core::locator::LocatorError;
use facetrain_core::{DetectParams, FaceLocator, FaceRect};
use image::{GrayImage, Luma};
use std::collections::HashMap;
use std::path::Path;

/// Locator double: faces are looked up by image dimensions, so each test
/// image is given a unique size.
#[derive(Default)]
pub struct FixedLocator {
    faces: HashMap<(u32, u32), Vec<FaceRect>>,
    pub calls: usize,
    pub seen_params: Vec<DetectParams>,
}

impl FixedLocator {
    pub fn with(mut self, size: (u32, u32), faces: &[FaceRect]) -> Self {
        self.faces.insert(size, faces.to_vec());
        self
    }
}

impl FaceLocator for FixedLocator {
    fn locate(
        &mut self,
        gray: &GrayImage,
        params: &DetectParams,
    ) -> Result<Vec<FaceRect>, LocatorError> {
        self.calls += 1;
        self.seen_params.push(*params);
        Ok(self.faces.get(&gray.dimensions()).cloned().unwrap_or_default())
    }
}

/// Write a textured grayscale PNG; `seed` changes the texture.
pub fn write_image(dir: &Path, name: &str, width: u32, height: u32, seed: u32) {
    let img = GrayImage::from_fn(width, height, |x, y| {
        let stripes = if seed % 2 == 0 { y / 3 } else { x / 3 };
        let v = if stripes % 2 == 0 { 190 } else { 50 };
        Luma([(v + (x * 3 + y * 5 + seed * 11) % 40) as u8])
    });
    img.save(dir.join(name)).unwrap();
}

/// The dataset from the reference scenario:
/// `1_a.jpg` has one 40×50 face, `1_b.jpg` one 60×60 face, `2_c.jpg` none.
pub fn reference_dataset(dir: &Path) -> FixedLocator {
    write_image(dir, "1_a.png", 100, 100, 0);
    write_image(dir, "1_b.png", 120, 120, 2);
    write_image(dir, "2_c.png", 80, 80, 1);
    FixedLocator::default()
        .with((100, 100), &[FaceRect::new(10, 10, 40, 50)])
        .with((120, 120), &[FaceRect::new(20, 20, 60, 60)])
}
