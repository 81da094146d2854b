// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Stacks N ImageSamples of identical shape into one tensor:
//
//   Input:  N × [3, H, W] (flat CHW Vec<f32> each)
//   Output: Tensor [N, 3, H, W] on the device passed to batch()
//
// unbatch() goes the other way for monitoring and persistence.

use anyhow::{bail, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::TensorData};

use crate::domain::image_sample::{ImageSample, CHANNELS};

/// Batch of decoded images; mixed sizes or an empty list are an Err
pub type ImageBatch<B> = Result<Tensor<B, 4>>;

#[derive(Clone, Debug, Default)]
pub struct ImageBatcher;

impl ImageBatcher {
    pub fn new() -> Self {
        Self
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<B, ImageSample, ImageBatch<B>> for ImageBatcher {
    /// Convert samples into a single [N, 3, H, W] tensor on `device`.
    fn batch(&self, items: Vec<ImageSample>, device: &B::Device) -> ImageBatch<B> {
        let Some(first) = items.first() else {
            bail!("cannot build a batch from zero images");
        };
        let (h, w) = (first.height(), first.width());
        if let Some(odd) = items.iter().find(|s| s.height() != h || s.width() != w) {
            bail!(
                "batch images must share one size: {}x{} vs {}x{}",
                h, w, odd.height(), odd.width()
            );
        }

        let n = items.len();
        let flat: Vec<f32> = items.into_iter().flat_map(ImageSample::into_pixels).collect();
        let data = TensorData::new(flat, [n, CHANNELS, h, w]);
        Ok(Tensor::<B, 4>::from_data(data, device))
    }
}

/// Split a [N, 3, H, W] tensor into N samples.
pub fn unbatch<B: Backend>(images: Tensor<B, 4>) -> Result<Vec<ImageSample>> {
    let [n, c, h, w] = images.dims();
    if c != CHANNELS {
        bail!("expected {CHANNELS} channels, got {c}");
    }
    let flat: Vec<f32> = images
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read image tensor: {e:?}"))?;

    let per_image = c * h * w;
    flat.chunks_exact(per_image)
        .take(n)
        .map(|chunk| Ok(ImageSample::new(chunk.to_vec(), h, w)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample(value: f32, h: usize, w: usize) -> ImageSample {
        ImageSample::new(vec![value; 3 * h * w], h, w).unwrap()
    }

    fn stack(items: Vec<ImageSample>) -> ImageBatch<TestBackend> {
        ImageBatcher::new().batch(items, &Default::default())
    }

    #[test]
    fn test_batch_shape() {
        let t = stack(vec![sample(0.1, 4, 6), sample(0.2, 4, 6)]).unwrap();
        assert_eq!(t.dims(), [2, 3, 4, 6]);
    }

    #[test]
    fn test_mixed_sizes_are_rejected() {
        assert!(stack(vec![sample(0.1, 4, 4), sample(0.2, 8, 8)]).is_err());
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        assert!(stack(Vec::new()).is_err());
    }

    #[test]
    fn test_unbatch_preserves_item_order() {
        let t = stack(vec![sample(0.25, 2, 2), sample(0.75, 2, 2)]).unwrap();
        let back = unbatch(t).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back[0].pixels().iter().all(|&p| p == 0.25));
        assert!(back[1].pixels().iter().all(|&p| p == 0.75));
    }
}
