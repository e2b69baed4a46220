// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here, generic over `B: Backend`.
// Concrete backends are chosen only by the application layer.
//
// What's in this layer:
//
//   init.rs       — Xavier-uniform Linear / Embedding constructors
//
//   gru.rs        — GRU cell with masked stepping over padding
//
//   encoder.rs    — Embedding + stacked (bi)GRU layers, one
//                   summary state per layer
//
//   attention.rs  — Source padding mask and Luong "general"
//                   attention over all decoder steps at once
//
//   decoder.rs    — Embedding + stacked GRU cells + attention
//                   + vocabulary projection
//
//   seq2seq.rs    — Encoder/decoder orchestration, batch-level
//                   teacher forcing, autoregressive generation
//
//   criterion.rs  — Padding-aware cross-entropy and perplexity
//
//   scheduler.rs  — Warmup + cosine-annealing learning rate
//
//   trainer.rs    — Training / validation loop, best-metric
//                   tracking, checkpoints
//
//   translator.rs — Greedy translation from a checkpoint
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Cho et al. (2014) GRU, Luong et al. (2015) Attention

/// Xavier-uniform layer constructors
pub mod init;

/// Masked GRU cell
pub mod gru;

/// Recurrent source encoder
pub mod encoder;

/// Attention mask and Luong attention
pub mod attention;

/// Attention decoder
pub mod decoder;

/// Encoder/decoder model and decode modes
pub mod seq2seq;

/// Loss and perplexity
pub mod criterion;

/// Learning-rate schedules
pub mod scheduler;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Greedy translation from a trained checkpoint
pub mod translator;
