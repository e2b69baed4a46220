// ============================================================
// Layer 3 — SentencePair Domain Type
// ============================================================
// One aligned line of a parallel corpus, already split into
// word tokens. Ids are assigned later by the vocabulary.

use serde::{Deserialize, Serialize};

/// A tokenised source sentence and its reference translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Words of the sentence to translate
    pub source: Vec<String>,

    /// Words of the reference translation
    pub target: Vec<String>,
}

impl SentencePair {
    pub fn new(source: Vec<String>, target: Vec<String>) -> Self {
        Self { source, target }
    }

    /// True when both sides fit within `max_len` words.
    /// Sentinels are not counted.
    pub fn fits(&self, max_len: usize) -> bool {
        self.source.len() <= max_len && self.target.len() <= max_len
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() || self.target.is_empty()
    }
}
