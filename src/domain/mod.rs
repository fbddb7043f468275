// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and arithmetic shared by every other layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and functions
//
// Everything here can be unit tested without a tensor backend.

/// Running-average accumulator used for per-epoch progress lines
pub mod meter;

/// Confusion counts and macro precision / recall / F1
pub mod classification;
