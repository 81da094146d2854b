// ============================================================
// Layer 6 — Image Persistence
// ============================================================
// ImageSample (f32 CHW in [0,1]) → RGB raster file. The output
// format follows the file extension, as the image crate decides.

use anyhow::{Context, Result};
use image::RgbImage;
use std::{fs, path::Path};

use crate::domain::image_sample::{ImageSample, CHANNELS};

/// CHW f32 → HWC u8, clamping to [0, 1] first
pub fn to_rgb_image(sample: &ImageSample) -> Result<RgbImage> {
    let (h, w) = (sample.height(), sample.width());
    let plane  = h * w;
    let src    = sample.pixels();

    let mut raw = Vec::with_capacity(CHANNELS * plane);
    for i in 0..plane {
        for c in 0..CHANNELS {
            let v = src[c * plane + i].clamp(0.0, 1.0);
            raw.push((v * 255.0).round() as u8);
        }
    }
    RgbImage::from_raw(w as u32, h as u32, raw)
        .with_context(|| format!("Cannot build a {w}x{h} RGB image"))
}

/// Write `sample` to `path`, creating parent folders.
pub fn save_sample(sample: &ImageSample, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    to_rgb_image(sample)?
        .save(path)
        .with_context(|| format!("Cannot write image '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::to_sample;
    use image::Rgb;

    #[test]
    fn test_u8_pixels_survive_png_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("x.png");
        let img  = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7]));

        save_sample(&to_sample(&img).unwrap(), &path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back, img);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let s   = ImageSample::new(vec![-1.0, 2.0, 0.5], 1, 1).unwrap();
        let img = to_rgb_image(&s).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 255, 128]));
    }
}
