// ============================================================
// Layer 4 — Batch Loader
// ============================================================
// Decodes the images of one batch on a dedicated rayon pool of
// `num_workers` threads. The caller blocks until every image of
// the batch is ready; a single decode failure fails the batch.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;

use crate::data::transform::ImageTransform;
use crate::domain::image_sample::ImageSample;

pub struct BatchLoader {
    pool:      rayon::ThreadPool,
    transform: ImageTransform,
}

impl BatchLoader {
    pub fn new(num_workers: usize, transform: ImageTransform) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers.max(1))
            .thread_name(|i| format!("image-loader-{i}"))
            .build()
            .context("Cannot start image loader thread pool")?;
        Ok(Self { pool, transform })
    }

    /// Load every path, preserving order.
    pub fn load(&self, paths: &[PathBuf]) -> Result<Vec<ImageSample>> {
        let transform = self.transform;
        self.pool.install(|| {
            paths
                .par_iter()
                .map(|p| transform.load(p))
                .collect::<Result<Vec<_>>>()
        })
    }
}
