// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each
// (training a translator, or translating with one).
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No argument parsing or printing (that's Layer 1)
//   - Concrete Burn backends are chosen here and nowhere else
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The translation workflow
pub mod translate_use_case;
