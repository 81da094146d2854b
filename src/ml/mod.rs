// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, runs or optimises the network.
//
//   loss.rs       — stage losses (content, remd, moment, color)
//                   and their weighted aggregate
//
//   model.rs      — the three-stage StyleNet with its explicit
//                   Training / Evaluating contract
//
//   trainer.rs    — the training orchestrator: iterations,
//                   Adam steps, snapshots, schedule updates
//
//   inferencer.rs — loads a checkpoint and stylizes image pairs
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Loss terms and their aggregation
pub mod loss;

/// Three-stage style network
pub mod model;

/// Training state machine and snapshotting
pub mod trainer;

/// Evaluation-only wrapper around a restored model
pub mod inferencer;
