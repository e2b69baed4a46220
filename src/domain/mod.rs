// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types and algorithms that define the core concepts
// of the translation system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and functions
//
// Everything here is unit-testable without a tensor backend.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// A source/target sentence pair from a parallel corpus
pub mod sentence_pair;

/// Word ↔ id vocabulary with the reserved sentinel ids
pub mod vocab;

/// First end-of-sequence position per row
pub mod lengths;

/// Corpus-level BLEU accumulator
pub mod bleu;

/// Running averages and best-value tracking across epochs
pub mod tracking;

/// Precondition violations raised by the core
pub mod error;

/// Core abstractions that other layers implement
pub mod traits;
