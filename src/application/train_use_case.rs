// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration        (Layer 3 - domain)
//   Step 2: Build both folder datasets        (Layer 4 - data)
//   Step 3: Build loaders + infinite streams  (Layer 4 - data)
//   Step 4: Save model + train config         (Layer 6 - infra)
//   Step 5: Open the telemetry sink           (Layer 6 - infra)
//   Step 6: Run the training orchestrator     (Layer 5 - ml)

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::FlatFolderDataset,
    loader::BatchLoader,
    stream::FolderStream,
    transform::ImageTransform,
};
use crate::domain::error::StyleError;
use crate::domain::weights::LossWeights;
use crate::infra::{checkpoint::CheckpointManager, metrics::FileTelemetry};
use crate::ml::model::{StyleNetConfig, SIZE_MULTIPLE};
use crate::ml::trainer::{run_training, Streams, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Written next to the
// checkpoints so a run can be reproduced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub content_folder:    PathBuf,
    pub style_folder:      PathBuf,
    pub checkpoint_dir:    PathBuf,
    pub log_dir:           PathBuf,
    pub iterations:        usize,
    pub batch_size:        usize,
    pub num_workers:       usize,
    pub lr:                f64,
    pub lr_decay:          f64,
    pub log_interval:      usize,
    pub progress_interval: usize,
    pub pretrained:        bool,
    pub load_size:         u32,
    pub crop_size:         u32,
    pub base_channels:     usize,
    pub weights:           LossWeights,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            content_folder:    PathBuf::new(),
            style_folder:      PathBuf::new(),
            checkpoint_dir:    PathBuf::from("checkpoints"),
            log_dir:           PathBuf::from("runs"),
            iterations:        160_000,
            batch_size:        8,
            num_workers:       8,
            lr:                1e-4,
            lr_decay:          5e-5,
            log_interval:      10_000,
            progress_interval: 100,
            pretrained:        false,
            load_size:         512,
            crop_size:         256,
            base_channels:     16,
            weights:           LossWeights::default(),
        }
    }
}

impl TrainConfig {
    /// Reject a bad configuration before any collaborator is built.
    pub fn validate(&self) -> Result<(), StyleError> {
        if self.batch_size == 0 {
            return Err(StyleError::InvalidBatchSize(self.batch_size));
        }
        if self.iterations == 0 {
            return Err(StyleError::InvalidIterations);
        }
        if self.log_interval == 0 {
            return Err(StyleError::InvalidInterval { name: "log_interval" });
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return Err(StyleError::InvalidLearningRate(self.lr));
        }
        if !self.lr_decay.is_finite() || self.lr_decay < 0.0 {
            return Err(StyleError::InvalidLearningRate(self.lr_decay));
        }
        if self.crop_size == 0
            || self.crop_size > self.load_size
            || self.crop_size as usize % SIZE_MULTIPLE != 0
        {
            return Err(StyleError::InvalidImageSize {
                crop:     self.crop_size as usize,
                load:     self.load_size as usize,
                multiple: SIZE_MULTIPLE,
            });
        }
        self.weights.validate()?;
        for folder in [&self.content_folder, &self.style_folder] {
            if !folder.is_dir() {
                return Err(StyleError::MissingPath(folder.clone()));
            }
        }
        Ok(())
    }

    pub fn model_config(&self) -> StyleNetConfig {
        StyleNetConfig::new(self.weights.clone()).with_base_channels(self.base_channels)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig { &self.config }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        tracing::info!("Training process started (pid {})", std::process::id());

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Datasets ──────────────────────────────────────────────────
        let content = FlatFolderDataset::new(&cfg.content_folder)?;
        let style   = FlatFolderDataset::new(&cfg.style_folder)?;
        tracing::info!(
            "Datasets: {} content images, {} style images",
            content.len(),
            style.len()
        );

        // ── Step 3: Streams ───────────────────────────────────────────────────
        // one pool per stream, each with its own sampler
        let transform = ImageTransform::Train { load_size: cfg.load_size, crop_size: cfg.crop_size };
        let streams = Streams {
            content: Box::new(FolderStream::new(content, BatchLoader::new(cfg.num_workers, transform)?)?),
            style:   Box::new(FolderStream::new(style, BatchLoader::new(cfg.num_workers, transform)?)?),
        };

        // ── Step 4: Persist configs ───────────────────────────────────────────
        let model_cfg    = cfg.model_config();
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        if cfg.pretrained && !ckpt_manager.has_checkpoint() {
            anyhow::bail!(
                "--pretrained given but '{}' holds no checkpoint",
                cfg.checkpoint_dir.display()
            );
        }
        ckpt_manager.save_model_config(&model_cfg)?;
        ckpt_manager.save_train_config(cfg)?;

        // ── Step 5: Telemetry ─────────────────────────────────────────────────
        let mut sink = FileTelemetry::new(&cfg.log_dir)?;

        // ── Step 6: Train (Layer 5) ───────────────────────────────────────────
        let summary = run_training(cfg, &model_cfg, streams, &ckpt_manager, &mut sink)?;
        tracing::info!(
            "Finished {} iterations, {} snapshots, final loss {:.4}",
            summary.iterations,
            summary.snapshots.len(),
            summary.final_loss
        );
        Ok(summary)
    }
}
