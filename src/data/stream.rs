// ============================================================
// Layer 4 — Folder Stream
// ============================================================
// Binds one dataset to its own infinite sampler and a loader:
//
//   sampler.next_batch(B) → indices → paths → decoded samples
//
// Training builds two of these (content, style) with separate
// samplers so their orders are never correlated.

use anyhow::Result;
use burn::data::dataset::Dataset;

use crate::data::{dataset::FlatFolderDataset, loader::BatchLoader, sampler::InfiniteSampler};
use crate::domain::image_sample::ImageSample;
use crate::domain::traits::ImageStream;

pub struct FolderStream {
    dataset: FlatFolderDataset,
    sampler: InfiniteSampler,
    loader:  BatchLoader,
}

impl FolderStream {
    pub fn new(dataset: FlatFolderDataset, loader: BatchLoader) -> Result<Self> {
        let sampler = InfiniteSampler::new(dataset.len())?;
        Ok(Self { dataset, sampler, loader })
    }
}

impl ImageStream for FolderStream {
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<ImageSample>> {
        let indices = self.sampler.next_batch(batch_size);
        let paths   = self.dataset.paths_for(&indices)?;
        tracing::debug!(
            "'{}': indices {:?} (pass {})",
            self.dataset.root().display(), indices, self.sampler.cycles() + 1
        );
        self.loader.load(&paths)
    }
}
