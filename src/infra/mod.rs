// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that touch the disk:
//
//   checkpoint.rs — StyleNet weights + configs per snapshot
//   metrics.rs    — file-backed TelemetrySink (CSV + PNG samples)
//   image_io.rs   — ImageSample → raster file

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training telemetry written to a run folder
pub mod metrics;

/// Writing ImageSamples as image files
pub mod image_io;
