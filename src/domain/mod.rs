// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what a style-transfer
// run IS: images, loss weights, the execution mode, the error
// taxonomy, and the seams to the outside world (telemetry,
// learning-rate schedule).
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// A decoded, resized RGB image in CHW layout
pub mod image_sample;

/// Per-stage loss weights for the four loss families
pub mod weights;

/// Train / evaluate switch passed into every forward call
pub mod mode;

/// Learning-rate schedules
pub mod schedule;

/// Typed error taxonomy shared by every layer
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;
