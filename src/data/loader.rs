// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads a tab-separated parallel corpus, one pair per line:
//
//   source sentence<TAB>target sentence[<TAB>ignored columns...]
//
// Lines that are blank, lack a tab, or tokenise to nothing on
// either side are skipped with a warning instead of aborting
// the run. A missing file is an error.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

pub struct TsvCorpusLoader {
    path:         PathBuf,
    preprocessor: Preprocessor,
}

impl TsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), preprocessor: Preprocessor::new() }
    }

    /// Parse corpus text that is already in memory.
    pub fn parse(&self, text: &str) -> Vec<SentencePair> {
        let mut pairs   = Vec::new();
        let mut skipped = 0usize;

        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut cols = line.split('\t');
            let (Some(src), Some(tgt)) = (cols.next(), cols.next()) else {
                tracing::warn!("Line {}: no tab separator, skipping", lineno + 1);
                skipped += 1;
                continue;
            };

            let pair = SentencePair::new(
                self.preprocessor.tokenize(src),
                self.preprocessor.tokenize(tgt),
            );
            if pair.is_empty() {
                tracing::warn!("Line {}: empty side after cleaning, skipping", lineno + 1);
                skipped += 1;
                continue;
            }
            pairs.push(pair);
        }

        if skipped > 0 {
            tracing::debug!("Skipped {} malformed corpus lines", skipped);
        }
        pairs
    }
}

impl CorpusSource for TsvCorpusLoader {
    fn load_pairs(&self) -> Result<Vec<SentencePair>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;
        let pairs = self.parse(&text);
        tracing::info!("Read {} sentence pairs from '{}'", pairs.len(), self.path.display());
        Ok(pairs)
    }
}
