// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores StyleNet parameters with Burn's
// NamedMpkFileRecorder at full precision, so a reload gives back
// bit-identical weights.
//
// File naming convention:
//   checkpoints/
//     model_iter_10000.mpk   ← weights after iteration 10000
//     model_iter_20000.mpk
//     ...
//     latest_iter.json       ← iteration of the newest snapshot
//     model_config.json      ← StyleNetConfig (architecture + weights)
//     train_config.json      ← full TrainConfig of the run
//
// Each snapshot file stands alone; nothing is rotated here.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{StyleNet, StyleNetConfig};

type WeightRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

const LATEST_FILE: &str = "latest_iter.json";
const MODEL_CONFIG_FILE: &str = "model_config.json";
const TRAIN_CONFIG_FILE: &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Manager over an existing directory; used by evaluation.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            anyhow::bail!(
                "Checkpoint directory '{}' not found. Run 'train' first.",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn model_path(&self, iteration: usize) -> PathBuf {
        // extension is added by the recorder
        self.dir.join(format!("model_iter_{iteration}"))
    }

    /// Persist `model` as the snapshot of `iteration` and mark it latest.
    pub fn save_model<B: Backend>(&self, model: &StyleNet<B>, iteration: usize) -> Result<PathBuf> {
        let path = self.model_path(iteration);
        model
            .clone()
            .save_file(path.clone(), &WeightRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.dir.join(LATEST_FILE), serde_json::to_string(&iteration)?)
            .with_context(|| format!("Failed to write {LATEST_FILE}"))?;

        tracing::debug!("Saved checkpoint: iteration {}", iteration);
        Ok(path)
    }

    /// Restore the newest snapshot into `model`.
    pub fn load_model<B: Backend>(&self, model: StyleNet<B>, device: &B::Device) -> Result<StyleNet<B>> {
        let iteration = self.latest_iteration()?;
        let path = self.model_path(iteration);
        tracing::info!("Loading checkpoint from iteration {}", iteration);

        let model = model
            .load_file(path.clone(), &WeightRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;
        Ok(model.freeze_loss_net())
    }

    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(LATEST_FILE).exists()
    }

    pub fn save_model_config(&self, cfg: &StyleNetConfig) -> Result<()> {
        self.write_json(MODEL_CONFIG_FILE, cfg)
    }

    /// Architecture used by the run that wrote these checkpoints
    pub fn load_model_config(&self) -> Result<StyleNetConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read model config from '{}'. Make sure you have run 'train' before 'eval'.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG_FILE, cfg)
    }

    fn write_json<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    /// Iteration number of the newest snapshot
    pub fn latest_iteration(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
