// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Configuration errors  → rejected before the first iteration
// Precondition errors   → batch / shape mismatches at a call site
// Numerical errors      → non-finite loss halts the run
// Telemetry errors      → out-of-order step indices
//
// Everything above the domain wraps these in anyhow::Error.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::mode::ExecutionMode;

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("dataset folder '{0}' contains no files")]
    EmptyDataset(PathBuf),

    #[error("required path '{0}' does not exist")]
    MissingPath(PathBuf),

    #[error("batch size must be greater than zero (got {0})")]
    InvalidBatchSize(usize),

    #[error("iteration count must be greater than zero")]
    InvalidIterations,

    #[error("{name} must be greater than zero")]
    InvalidInterval { name: &'static str },

    #[error("learning rate must be finite and positive (got {0})")]
    InvalidLearningRate(f64),

    #[error("{name} must be finite and non-negative (got {value})")]
    NegativeWeight { name: String, value: f64 },

    #[error("crop size {crop} must not exceed load size {load} and must be a multiple of {multiple}")]
    InvalidImageSize { crop: usize, load: usize, multiple: usize },

    #[error("content batch has {content} images but style batch has {style}")]
    BatchMismatch { content: usize, style: usize },

    #[error("pixel buffer holds {actual} values, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("loss became non-finite ({value}) at iteration {iteration}")]
    NonFiniteLoss { iteration: usize, value: f64 },

    #[error("metric '{name}' step {step} is not greater than the previous step {previous}")]
    NonIncreasingStep { name: String, step: usize, previous: usize },

    #[error("forward pass in {requested} mode produced the wrong kind of output")]
    ModeMismatch { requested: ExecutionMode },
}
