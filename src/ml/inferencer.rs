// ============================================================
// Layer 5 — Stylizer
// ============================================================
// Rebuilds the network from a checkpoint directory and runs it
// in Evaluating mode only. Generic over the backend so tests can
// use NdArray while the CLI uses WGPU.
use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::path::Path;

use crate::data::batcher::{unbatch, ImageBatch, ImageBatcher};
use crate::data::transform::ImageTransform;
use crate::domain::image_sample::ImageSample;
use crate::domain::mode::ExecutionMode;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{StyleNet, SIZE_MULTIPLE};

pub struct Stylizer<B: Backend> {
    model:     StyleNet<B>,
    batcher:   ImageBatcher,
    device:    B::Device,
    transform: ImageTransform,
}

impl<B: Backend> Stylizer<B> {
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        device:       &B::Device,
        image_size:   u32,
    ) -> Result<Self> {
        if image_size == 0 || image_size as usize % SIZE_MULTIPLE != 0 {
            anyhow::bail!("image size {image_size} must be a positive multiple of {SIZE_MULTIPLE}");
        }
        let cfg   = ckpt_manager.load_model_config()?;
        let model: StyleNet<B> = cfg.init(device);
        let model = ckpt_manager.load_model(model, device)?;
        tracing::info!("Model loaded from checkpoint '{}'", ckpt_manager.dir().display());
        Ok(Self {
            model,
            batcher:   ImageBatcher::new(),
            device:    device.clone(),
            transform: ImageTransform::Eval { size: image_size },
        })
    }

    /// Stylize one already-transformed (content, style) pair.
    pub fn stylize(&self, content: ImageSample, style: ImageSample) -> Result<ImageSample> {
        let ic: ImageBatch<B> = self.batcher.batch(vec![content], &self.device);
        let is: ImageBatch<B> = self.batcher.batch(vec![style], &self.device);
        let (ic, is) = (ic?, is?);
        let out = self
            .model
            .forward(ic, is, ExecutionMode::Evaluating)?
            .into_stylized()?;
        unbatch(out)?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("model returned an empty batch"))
    }

    /// Decode, resize and stylize two image files.
    pub fn stylize_files(&self, content: &Path, style: &Path) -> Result<ImageSample> {
        let content = self.transform.load(content)?;
        let style   = self.transform.load(style)?;
        let result  = self.stylize(content, style)?;
        tracing::debug!("Stylized {}x{}", result.width(), result.height());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::domain::weights::LossWeights;
    use crate::ml::model::StyleNetConfig;

    type TB = NdArray<f32>;

    fn checkpoint(dir: &Path) -> CheckpointManager {
        let ckpt = CheckpointManager::new(dir).unwrap();
        let cfg  = StyleNetConfig::new(LossWeights::default()).with_base_channels(4);
        ckpt.save_model_config(&cfg).unwrap();
        ckpt.save_model(&cfg.init::<TB>(&Default::default()), 1).unwrap();
        ckpt
    }

    #[test]
    fn test_stylize_keeps_content_shape() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = checkpoint(dir.path());
        let stylizer = Stylizer::<TB>::from_checkpoint(&ckpt, &Default::default(), 32).unwrap();

        let c = ImageSample::new(vec![0.3; 3 * 32 * 32], 32, 32).unwrap();
        let s = ImageSample::new(vec![0.7; 3 * 32 * 32], 32, 32).unwrap();
        let out = stylizer.stylize(c, s).unwrap();
        assert_eq!(out.shape(), [3, 32, 32]);
        assert!(out.pixels().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_image_size_must_fit_network() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = checkpoint(dir.path());
        assert!(Stylizer::<TB>::from_checkpoint(&ckpt, &Default::default(), 30).is_err());
    }

    #[test]
    fn test_missing_model_config_fails() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(Stylizer::<TB>::from_checkpoint(&ckpt, &Default::default(), 32).is_err());
    }
}
