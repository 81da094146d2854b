// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer wires the other layers together for one goal
// (training or stylizing).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Configs are validated here, before anything is built

// The training workflow
pub mod train_use_case;

// Single-pair and run-folder stylization
pub mod eval_use_case;
