// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting I/O that the other layers use but do not own:
//
//   checkpoint.rs — model weights (Burn CompactRecorder), the
//                   training config, both vocabularies and the
//                   latest / best epoch pointers
//
//   metrics.rs    — the metric sink: per-step scalar series and
//                   per-epoch summary rows as CSV
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint, config and vocabulary persistence
pub mod checkpoint;

/// Training metrics CSV sink
pub mod metrics;
