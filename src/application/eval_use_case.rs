// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Two ways to stylize with a trained checkpoint:
//
//   single pair  → <output_dir>/ics.jpg
//   run folder   → <output_dir>/ics/<content-stem>--<style-filename>
//                  for every (content, style) in the cross product
//
// Folder mode keeps going past a failed pair: the failure is
// logged, counted in EvalReport::failed and the sweep moves on.
// A derived name that repeats overwrites the earlier file.

use anyhow::Result;
use burn::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::data::dataset::list_files;
use crate::domain::error::StyleError;
use crate::infra::{checkpoint::CheckpointManager, image_io::save_sample};
use crate::ml::inferencer::Stylizer;

const SINGLE_OUTPUT: &str = "ics.jpg";
const FOLDER_OUTPUT: &str = "ics";

#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Content image, or content folder in run-folder mode
    pub content:        PathBuf,
    /// Style image, or style folder in run-folder mode
    pub style:          PathBuf,
    pub run_folder:     bool,
    pub checkpoint_dir: PathBuf,
    pub output_dir:     PathBuf,
    pub image_size:     u32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            content:        PathBuf::from("./content/"),
            style:          PathBuf::from("./style/"),
            run_folder:     false,
            checkpoint_dir: PathBuf::from("checkpoints"),
            output_dir:     PathBuf::from("."),
            image_size:     256,
        }
    }
}

impl EvalConfig {
    pub fn validate(&self) -> Result<(), StyleError> {
        for path in [&self.content, &self.style] {
            let present = if self.run_folder { path.is_dir() } else { path.is_file() };
            if !present {
                return Err(StyleError::MissingPath(path.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvalReport {
    pub written: Vec<PathBuf>,
    pub failed:  usize,
}

/// `<content-stem>--<style-filename>`
pub fn derived_output_name(content: &Path, style: &Path) -> String {
    let stem = content
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let style_name = style
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}--{style_name}")
}

pub struct EvalUseCase {
    config: EvalConfig,
}

impl EvalUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<EvalReport> {
        let cfg = &self.config;
        tracing::info!("Evaluation process started (pid {})", std::process::id());
        cfg.validate()?;

        let ckpt_manager = CheckpointManager::open(&cfg.checkpoint_dir)?;
        let stylizer = Stylizer::<B>::from_checkpoint(&ckpt_manager, device, cfg.image_size)?;

        if cfg.run_folder {
            self.run_folder(&stylizer)
        } else {
            self.run_single(&stylizer)
        }
    }

    fn run_single<B: Backend>(&self, stylizer: &Stylizer<B>) -> Result<EvalReport> {
        let cfg    = &self.config;
        let result = stylizer.stylize_files(&cfg.content, &cfg.style)?;
        let path   = cfg.output_dir.join(SINGLE_OUTPUT);
        save_sample(&result, &path)?;
        tracing::info!("Wrote '{}'", path.display());
        Ok(EvalReport { written: vec![path], failed: 0 })
    }

    fn run_folder<B: Backend>(&self, stylizer: &Stylizer<B>) -> Result<EvalReport> {
        let cfg      = &self.config;
        let contents = list_files(&cfg.content)?;
        let styles   = list_files(&cfg.style)?;
        let out_dir  = cfg.output_dir.join(FOLDER_OUTPUT);
        tracing::info!(
            "Stylizing {} content × {} style images into '{}'",
            contents.len(),
            styles.len(),
            out_dir.display()
        );

        let mut report = EvalReport::default();
        let mut seen   = HashSet::new();
        for content in &contents {
            for style in &styles {
                let path = out_dir.join(derived_output_name(content, style));
                if !seen.insert(path.clone()) {
                    tracing::warn!("'{}' already written in this sweep; overwriting", path.display());
                }

                let outcome = stylizer
                    .stylize_files(content, style)
                    .and_then(|result| save_sample(&result, &path));
                match outcome {
                    Ok(()) => {
                        tracing::debug!("Wrote '{}'", path.display());
                        report.written.push(path);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Skipping pair ('{}', '{}'): {:#}",
                            content.display(),
                            style.display(),
                            e
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!("{} images written, {} pairs failed", report.written.len(), report.failed);
        Ok(report)
    }
}
