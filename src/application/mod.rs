// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training or evaluating a classifier).
//
// Rules for this layer:
//   - No tensor math here (that's Layer 5)
//   - No argument parsing or printing (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Scoring a saved checkpoint
pub mod eval_use_case;
