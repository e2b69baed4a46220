// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so a new
// corpus format or a different decoding strategy plugs in
// without touching the workflow code.

use anyhow::Result;

use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can produce tokenised sentence pairs.
///
/// Implementations:
///   - TsvCorpusLoader → one `source<TAB>target` pair per line
pub trait CorpusSource {
    fn load_pairs(&self) -> Result<Vec<SentencePair>>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Anything that turns a source sentence into a target sentence.
///
/// Implementations:
///   - TranslateUseCase → greedy decoding with a trained checkpoint
pub trait Translator {
    fn translate(&self, sentence: &str) -> Result<String>;
}
