// ============================================================
// Layer 5 — Greedy Translator
// ============================================================
// Rebuilds a trained model from the checkpoint directory and
// translates raw sentences:
//
//   clean + tokenize ─► src vocab ─► generate (no target,
//   teacher forcing 0, max_len + 1 steps) ─► argmax ids ─►
//   cut at first <eos> ─► tgt vocab ─► words
//
// The epoch with the best validation BLEU is preferred; without
// one the latest checkpoint is used.

use anyhow::Result;
use burn::prelude::*;

use crate::data::{batcher::padded_tensor, preprocessor::Preprocessor};
use crate::domain::{lengths::sequence_lengths, vocab::{Vocab, EOS_IDX}};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::seq2seq::Seq2Seq;

/// Greedy decode of one already-encoded source sentence (`<sos> … <eos>`).
/// Returns the predicted target ids without the closing <eos>.
pub fn greedy_translate<B: Backend>(
    model:   &Seq2Seq<B>,
    src_ids: &[usize],
    device:  &B::Device,
) -> Result<Vec<usize>> {
    let (ids, _) = greedy_translate_with_attention(model, src_ids, device)?;
    Ok(ids)
}

/// Like [`greedy_translate`], also returning one attention row per kept
/// target word. Each row has one weight per source token, sentinels included.
pub fn greedy_translate_with_attention<B: Backend>(
    model:   &Seq2Seq<B>,
    src_ids: &[usize],
    device:  &B::Device,
) -> Result<(Vec<usize>, Vec<Vec<f32>>)> {
    let (src, src_lens) = padded_tensor::<B>(&[src_ids.to_vec()], device);
    let output = model.generate(src, &src_lens)?;

    let mut preds = output.predictions();
    let lens      = sequence_lengths(&preds, EOS_IDX, model.max_len);
    let mut ids   = preds.pop().unwrap_or_default();
    ids.truncate(lens.first().copied().unwrap_or(0));

    // [1, steps, Ts] → one row per step
    let [_, _, ts] = output.attention.dims();
    let weights: Vec<f32> = output.attention.into_data().iter::<f32>().collect();
    let rows = weights
        .chunks(ts.max(1))
        .take(ids.len())
        .map(|row| row.to_vec())
        .collect();
    Ok((ids, rows))
}

/// Fixed sample positions spread over a set of `len` items:
/// `len/4 - 1`, then every `len/4` after it.
pub fn quartile_indices(len: usize) -> Vec<usize> {
    let step = (len / 4).max(1);
    ((len / 4).saturating_sub(1)..len).step_by(step).collect()
}

pub struct GreedyTranslator<B: Backend> {
    model:        Seq2Seq<B>,
    src_vocab:    Vocab,
    tgt_vocab:    Vocab,
    preprocessor: Preprocessor,
    device:       B::Device,
}

impl<B: Backend> GreedyTranslator<B> {
    pub fn new(model: Seq2Seq<B>, src_vocab: Vocab, tgt_vocab: Vocab, device: B::Device) -> Self {
        Self { model, src_vocab, tgt_vocab, preprocessor: Preprocessor::new(), device }
    }

    /// Rebuild the architecture from `train_config.json` and load weights.
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg                    = ckpt.load_config()?;
        let (src_vocab, tgt_vocab) = ckpt.load_vocabs()?;

        let model_cfg = cfg
            .model_config(src_vocab.len(), tgt_vocab.len())
            .with_dropout(0.0);
        let model = ckpt.load_model(model_cfg.init::<B>(&device), ckpt.preferred_epoch()?, &device)?;
        tracing::info!(
            "Model loaded from '{}' ({} source / {} target words)",
            ckpt.dir().display(), src_vocab.len(), tgt_vocab.len(),
        );

        Ok(Self::new(model, src_vocab, tgt_vocab, device))
    }

    /// Translate one raw sentence into target-language words.
    pub fn translate_words(&self, sentence: &str) -> Result<Vec<String>> {
        let words   = self.preprocessor.tokenize(sentence);
        let src_ids = self.src_vocab.encode_wrapped(&words);
        tracing::debug!("Source ids: {:?}", src_ids);

        let ids = greedy_translate(&self.model, &src_ids, &self.device)?;
        Ok(self.tgt_vocab.decode(&ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    type TestBackend = burn::backend::NdArray;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            emb_dim:    4,
            h_dim:      4,
            enc_layers: 1,
            dec_layers: 1,
            max_len:    5,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_greedy_translate_is_bounded_and_eos_free() {
        let device = Default::default();
        let model  = tiny_config().model_config(9, 9).init::<TestBackend>(&device);

        let ids = greedy_translate(&model, &[2, 4, 5, 3], &device).unwrap();
        assert!(ids.len() <= 6);
        assert!(!ids.contains(&EOS_IDX));
    }

    #[test]
    fn test_attention_rows_follow_kept_words() {
        let device  = Default::default();
        let model   = tiny_config().model_config(9, 9).init::<TestBackend>(&device);
        let src_ids = [2, 4, 5, 6, 3];

        let (ids, rows) = greedy_translate_with_attention(&model, &src_ids, &device).unwrap();
        assert_eq!(ids, greedy_translate(&model, &src_ids, &device).unwrap());
        assert_eq!(rows.len(), ids.len());
        for row in &rows {
            assert_eq!(row.len(), src_ids.len());
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_quartile_indices() {
        assert_eq!(quartile_indices(8), vec![1, 3, 5, 7]);
        assert_eq!(quartile_indices(10), vec![1, 3, 5, 7, 9]);
        assert_eq!(quartile_indices(3), vec![0, 1, 2]);
        assert!(quartile_indices(0).is_empty());
    }

    #[test]
    fn test_translator_roundtrips_through_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = tiny_config();

        let src = Vocab::build(&[words("hello world .")], 1);
        let tgt = Vocab::build(&[words("bonjour le monde .")], 1);
        let model = cfg.model_config(src.len(), tgt.len()).init::<TestBackend>(&device);
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_vocabs(&src, &tgt).unwrap();
        ckpt.save_model(&model, 1).unwrap();

        let translator = GreedyTranslator::<TestBackend>::from_checkpoint(&ckpt, device).unwrap();
        let out = translator.translate_words("Hello, world!").unwrap();
        assert!(out.len() <= cfg.max_len + 1);
        assert!(out.iter().all(|w| w != "<eos>" && w != "<pad>"));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(GreedyTranslator::<TestBackend>::from_checkpoint(&ckpt, Default::default()).is_err());
    }
}
