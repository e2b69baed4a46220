use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::{sentence_pair::SentencePair, vocab::Vocab};

/// One encoded sentence pair, unpadded.
/// Both sides are wrapped as `<sos> … <eos>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub src_ids: Vec<usize>,
    pub tgt_ids: Vec<usize>,
}

impl TranslationSample {
    pub fn encode(pair: &SentencePair, src_vocab: &Vocab, tgt_vocab: &Vocab) -> Self {
        Self {
            src_ids: src_vocab.encode_wrapped(&pair.source),
            tgt_ids: tgt_vocab.encode_wrapped(&pair.target),
        }
    }
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self { Self { samples } }

    /// Encode pairs, dropping those longer than `max_len` words on either side.
    pub fn from_pairs(
        pairs:     &[SentencePair],
        src_vocab: &Vocab,
        tgt_vocab: &Vocab,
        max_len:   usize,
    ) -> Self {
        let samples: Vec<_> = pairs
            .iter()
            .filter(|p| p.fits(max_len))
            .map(|p| TranslationSample::encode(p, src_vocab, tgt_vocab))
            .collect();
        tracing::debug!(
            "Encoded {} of {} pairs (max_len = {})",
            samples.len(), pairs.len(), max_len
        );
        Self { samples }
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn samples(&self) -> &[TranslationSample] { &self.samples }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocab::{EOS_IDX, SOS_IDX};

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_from_pairs_filters_long_sentences() {
        let pairs = vec![
            SentencePair::new(words("a b"), words("x y")),
            SentencePair::new(words("a b c d"), words("x")),
        ];
        let src = Vocab::build(pairs.iter().map(|p| &p.source), 1);
        let tgt = Vocab::build(pairs.iter().map(|p| &p.target), 1);
        let ds  = TranslationDataset::from_pairs(&pairs, &src, &tgt, 3);

        assert_eq!(ds.len(), 1);
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.src_ids.len(), 4);
        assert_eq!(sample.tgt_ids[0], SOS_IDX);
        assert_eq!(*sample.tgt_ids.last().unwrap(), EOS_IDX);
        assert!(ds.get(1).is_none());
    }
}
