// ============================================================
// Layer 3 — Execution Mode
// ============================================================
// The model never stores whether it is training. Every forward
// call receives the mode explicitly, so there is no shared flag
// for anyone to observe half-way through a snapshot.
//
//   Training   → (content, style) ↦ scalar loss
//   Evaluating → (content, style) ↦ stylized batch

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Training,
    Evaluating,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Training   => write!(f, "training"),
            ExecutionMode::Evaluating => write!(f, "evaluating"),
        }
    }
}
