// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw parallel corpus file to padded
// tensor batches:
//
//   corpus.tsv
//       │
//       ▼
//   TsvCorpusLoader     → reads lines, yields SentencePairs
//       │                 (Preprocessor cleans + tokenises)
//       ▼
//   split_train_val     → seeded shuffle, train / validation
//       │
//       ▼
//   Vocab (domain)      → built from the training side only
//       │
//       ▼
//   TranslationDataset  → encoded, length-filtered samples
//       │
//       ▼
//   TranslationBatcher  → pads to the batch max, keeps lengths
//       │
//       ▼
//   DataLoader          → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads a tab-separated parallel corpus
pub mod loader;

/// Cleans and tokenises raw sentences
pub mod preprocessor;

/// Implements Burn's Dataset trait for encoded sentence pairs
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Seeded shuffle and train/validation split
pub mod splitter;
