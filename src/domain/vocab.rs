// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Maps words to integer ids and back. The first four ids are
// reserved for sentinels and are identical in every vocabulary,
// so the model can refer to them as constants:
//
//   0  <pad>   fills sequences up to the batch-wide width
//   1  <unk>   any word not seen often enough during building
//   2  <sos>   start of sequence
//   3  <eos>   end of sequence
//
// Regular words follow, ordered by descending frequency and
// then alphabetically so that building is deterministic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const PAD_IDX: usize = 0;
pub const UNK_IDX: usize = 1;
pub const SOS_IDX: usize = 2;
pub const EOS_IDX: usize = 3;

const SPECIALS: [&str; 4] = ["<pad>", "<unk>", "<sos>", "<eos>"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocab {
    itos: Vec<String>,
    #[serde(skip)]
    stoi: HashMap<String, usize>,
}

impl Vocab {
    /// Build a vocabulary from tokenised sentences, keeping words that
    /// occur at least `min_freq` times.
    pub fn build<'a, I, S>(sentences: I, min_freq: usize) -> Self
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<[String]> + 'a + ?Sized,
    {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for sentence in sentences {
            for word in sentence.as_ref() {
                *counts.entry(word.as_str()).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(w, c)| *c >= min_freq.max(1) && !SPECIALS.contains(w))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let itos = SPECIALS
            .iter()
            .map(|s| s.to_string())
            .chain(words.into_iter().map(|(w, _)| w.to_string()))
            .collect();
        Self::from_itos(itos)
    }

    /// Rebuild the lookup table from an id-ordered word list.
    pub fn from_itos(itos: Vec<String>) -> Self {
        let stoi = itos.iter().enumerate().map(|(i, w)| (w.clone(), i)).collect();
        Self { itos, stoi }
    }

    /// Restore the word → id map after deserialisation.
    pub fn reindex(self) -> Self {
        Self::from_itos(self.itos)
    }

    pub fn len(&self) -> usize {
        self.itos.len()
    }

    pub fn id(&self, word: &str) -> usize {
        self.stoi.get(word).copied().unwrap_or(UNK_IDX)
    }

    pub fn word(&self, id: usize) -> &str {
        self.itos.get(id).map(String::as_str).unwrap_or(SPECIALS[UNK_IDX])
    }

    /// Wrap encoded words in `<sos> … <eos>`.
    pub fn encode_wrapped(&self, words: &[String]) -> Vec<usize> {
        let mut ids = Vec::with_capacity(words.len() + 2);
        ids.push(SOS_IDX);
        ids.extend(words.iter().map(|w| self.id(w)));
        ids.push(EOS_IDX);
        ids
    }

    /// Turn ids back into words, stopping at the first `<eos>` and
    /// skipping `<pad>` and `<sos>`.
    pub fn decode(&self, ids: &[usize]) -> Vec<String> {
        ids.iter()
            .take_while(|&&id| id != EOS_IDX)
            .filter(|&&id| id != PAD_IDX && id != SOS_IDX)
            .map(|&id| self.word(id).to_string())
            .collect()
    }
}
