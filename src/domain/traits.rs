// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The orchestrator talks to monitoring and to the learning-rate
// formula only through these traits.
//
// Implementations:
//   - FileTelemetry (infra::metrics)   → TelemetrySink
//   - InverseDecay  (domain::schedule) → LrSchedule

use anyhow::Result;

use crate::domain::image_sample::ImageSample;

// ─── SampleRow ────────────────────────────────────────────────────────────────
/// One row of the snapshot results table:
/// the inputs of one batch item and what the model made of them.
#[derive(Debug, Clone)]
pub struct SampleRow {
    pub iteration: usize,
    pub content:   ImageSample,
    pub style:     ImageSample,
    pub result:    ImageSample,
}

// ─── TelemetrySink ────────────────────────────────────────────────────────────
/// Anything that receives monitoring records from a training run.
///
/// Calls arrive in iteration order. Steps must be strictly
/// increasing per metric name.
pub trait TelemetrySink {
    /// Record one scalar at `step`
    fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> Result<()>;

    /// Record one (content, style, result) triple
    fn log_sample(&mut self, row: SampleRow) -> Result<()>;

    /// Write any buffered records. Called exactly once, at the end of the run.
    fn flush(&mut self) -> Result<()>;
}

// ─── LrSchedule ───────────────────────────────────────────────────────────────
/// Learning rate as a function of the zero-based iteration index
pub trait LrSchedule {
    fn learning_rate(&self, iteration: usize) -> f64;
}

// ─── ImageStream ──────────────────────────────────────────────────────────────
/// An endless source of image batches.
///
/// Implementations:
///   - FolderStream (data::stream) → dataset + infinite sampler + loader
pub trait ImageStream {
    /// Exactly `batch_size` images. Never signals exhaustion;
    /// an Err is a loading failure, not end-of-stream.
    fn next_batch(&mut self, batch_size: usize) -> Result<Vec<ImageSample>>;
}
