// ============================================================
// Layer 4 — Image Transforms
// ============================================================
// Turns an image file into an ImageSample of fixed size.
//
//   Train: shorter side → load_size, then a random
//          crop_size × crop_size window
//   Eval:  resize straight to size × size
//
// Output pixels are f32 in [0, 1], CHW.

use anyhow::{Context, Result};
use image::{imageops::FilterType, RgbImage};
use rand::Rng;
use std::path::Path;

use crate::domain::error::StyleError;
use crate::domain::image_sample::{ImageSample, CHANNELS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTransform {
    Train { load_size: u32, crop_size: u32 },
    Eval  { size: u32 },
}

impl ImageTransform {
    /// Decode the file at `path` and transform it.
    pub fn load(&self, path: &Path) -> Result<ImageSample> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?
            .to_rgb8();
        self.apply(&img)
    }

    pub fn apply(&self, img: &RgbImage) -> Result<ImageSample> {
        let out = match *self {
            ImageTransform::Train { load_size, crop_size } => {
                let resized = resize_shorter_side(img, load_size);
                random_crop(&resized, crop_size, &mut rand::thread_rng())
            }
            ImageTransform::Eval { size } => {
                image::imageops::resize(img, size, size, FilterType::Triangle)
            }
        };
        Ok(to_sample(&out)?)
    }
}

/// Scale so the shorter side equals `target`, keeping aspect ratio.
fn resize_shorter_side(img: &RgbImage, target: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let (nw, nh) = if w <= h {
        (target, ((h as f64) * target as f64 / w as f64).round() as u32)
    } else {
        (((w as f64) * target as f64 / h as f64).round() as u32, target)
    };
    image::imageops::resize(img, nw.max(target), nh.max(target), FilterType::Triangle)
}

fn random_crop<R: Rng>(img: &RgbImage, size: u32, rng: &mut R) -> RgbImage {
    let (w, h) = img.dimensions();
    let x = rng.gen_range(0..=w.saturating_sub(size));
    let y = rng.gen_range(0..=h.saturating_sub(size));
    image::imageops::crop_imm(img, x, y, size.min(w), size.min(h)).to_image()
}

/// HWC u8 → CHW f32 in [0, 1]
pub fn to_sample(img: &RgbImage) -> Result<ImageSample, StyleError> {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    let raw    = img.as_raw();
    let plane  = w * h;

    let mut pixels = vec![0.0f32; CHANNELS * plane];
    for (i, px) in raw.chunks_exact(CHANNELS).enumerate() {
        for c in 0..CHANNELS {
            pixels[c * plane + i] = px[c] as f32 / 255.0;
        }
    }
    ImageSample::new(pixels, h, w)
}
