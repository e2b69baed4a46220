// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// Composes the encoder and the attention decoder.
//
// One forward pass:
//
//   encode ──► resolve DecodeMode (once per batch)
//                 │
//                 ├─ TeacherForced   decoder(tgt[:, :-1]) in one call
//                 │
//                 └─ Autoregressive  decoder(<sos>) → argmax → decoder(ŷ₁) → …
//                                    for `steps` calls, outputs concatenated
//
// Returns logits [B, steps, V] and attention weights [B, steps, Ts].
//
// The attention mask is built once from the source batch and the
// same tensor is handed to every decoder call of the pass.
//
// Reference: Sutskever et al. (2014), Bahdanau et al. (2015)

use burn::prelude::*;
use rand::Rng;

use crate::data::batcher::TranslationBatch;
use crate::domain::error::{check_lengths, Seq2SeqError};
use crate::domain::vocab::{PAD_IDX, SOS_IDX};
use crate::ml::attention::AttentionMask;
use crate::ml::decoder::{AttnDecoder, DecoderState};
use crate::ml::encoder::Encoder;

#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub src_vocab: usize,
    pub tgt_vocab: usize,
    #[config(default = 256)]
    pub emb_dim: usize,
    #[config(default = 512)]
    pub h_dim: usize,
    #[config(default = 2)]
    pub enc_layers: usize,
    #[config(default = 2)]
    pub dec_layers: usize,
    #[config(default = true)]
    pub enc_bidirect: bool,
    #[config(default = true)]
    pub attention: bool,
    /// Longest sentence in words, sentinels excluded
    #[config(default = 20)]
    pub max_len: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2Seq<B> {
        let encoder = Encoder::new(
            self.src_vocab, self.emb_dim, self.h_dim,
            self.enc_layers, self.enc_bidirect, self.dropout, device,
        );
        let decoder = AttnDecoder::new(
            self.tgt_vocab, self.emb_dim, self.h_dim, encoder.output_dim(),
            self.dec_layers, self.attention, self.dropout, device,
        );
        Seq2Seq { encoder, decoder, max_len: self.max_len }
    }
}

/// How the decoder is driven for one whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Ground-truth target fed in a single decoder call
    TeacherForced,
    /// Own arg-max predictions fed back for `steps` calls
    Autoregressive { steps: usize },
}

impl DecodeMode {
    /// One uniform draw against `teacher_forcing` picks the mode for the
    /// entire batch. Without target lengths the mode is always autoregressive.
    pub fn resolve<R: Rng>(
        teacher_forcing: f64,
        rng:             &mut R,
        tgt_lens:        Option<&[usize]>,
        max_len:         usize,
    ) -> Self {
        let draw: f64 = rng.gen();
        if tgt_lens.is_some() && draw < teacher_forcing {
            Self::TeacherForced
        } else {
            Self::autoregressive(tgt_lens, max_len)
        }
    }

    /// Step count: longest target minus one (its <sos> is never predicted),
    /// or `max_len + 1` to leave room for <eos> when there is no reference.
    pub fn autoregressive(tgt_lens: Option<&[usize]>, max_len: usize) -> Self {
        let steps = match tgt_lens {
            Some(lens) => lens.iter().copied().max().unwrap_or(1).saturating_sub(1),
            None => max_len + 1,
        };
        Self::Autoregressive { steps: steps.max(1) }
    }
}

pub struct Seq2SeqOutput<B: Backend> {
    /// [B, steps, V]
    pub logits:    Tensor<B, 3>,
    /// [B, steps, Ts]
    pub attention: Tensor<B, 3>,
}

impl<B: Backend> Seq2SeqOutput<B> {
    /// Arg-max token id per row and step, copied to the host.
    pub fn predictions(&self) -> Vec<Vec<usize>> {
        let [batch, steps, _] = self.logits.dims();
        let ids: Vec<usize> = self
            .logits
            .clone()
            .argmax(2)
            .reshape([batch, steps])
            .into_data()
            .iter::<i64>()
            .map(|id| id as usize)
            .collect();
        ids.chunks(steps.max(1)).map(<[usize]>::to_vec).collect()
    }
}

#[derive(Module, Debug)]
pub struct Seq2Seq<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: AttnDecoder<B>,
    pub max_len: usize,
}

impl<B: Backend> Seq2Seq<B> {
    /// Full forward pass.
    ///
    /// * `src`      — [B, W] padded source ids
    /// * `src_lens` — true length of each source row
    /// * `target`   — [B, Tt] padded target ids, required for `TeacherForced`
    pub fn forward(
        &self,
        src:      Tensor<B, 2, Int>,
        src_lens: &[usize],
        target:   Option<Tensor<B, 2, Int>>,
        mode:     DecodeMode,
    ) -> Result<Seq2SeqOutput<B>, Seq2SeqError> {
        let [batch, width] = src.dims();
        check_lengths("src_lens", src_lens, batch, width)?;
        if let Some(tgt) = &target {
            let rows = tgt.dims()[0];
            if rows != batch {
                return Err(Seq2SeqError::RowCountMismatch { what: "target", expected: batch, found: rows });
            }
        }

        // ── Encode ────────────────────────────────────────────────────────────
        // Columns past the longest source row are pure padding
        let enc_len = src_lens.iter().copied().max().unwrap_or(width);
        let src     = src.slice([0..batch, 0..enc_len]);
        let mask    = AttentionMask::from_source(src.clone(), PAD_IDX);
        let encoded = self.encoder.forward(src, &mask.positions());
        let state   = DecoderState::from_encoder(&encoded.summaries, self.decoder.n_layers());

        // ── Decode ────────────────────────────────────────────────────────────
        match mode {
            DecodeMode::TeacherForced => {
                let tgt = target.ok_or(Seq2SeqError::MissingTarget)?;
                let [_, tgt_width] = tgt.dims();
                if tgt_width < 2 {
                    return Err(Seq2SeqError::TargetTooShort { width: tgt_width });
                }
                let dec_in = tgt.narrow(1, 0, tgt_width - 1);
                let out    = self.decoder.forward(dec_in, state, encoded.states, &mask);
                Ok(Seq2SeqOutput { logits: out.logits, attention: out.weights })
            }
            DecodeMode::Autoregressive { steps } => {
                let device     = encoded.states.device();
                let mut dec_in = Tensor::<B, 2, Int>::full([batch, 1], SOS_IDX as i64, &device);
                let mut state  = state;
                let mut logits  = Vec::with_capacity(steps);
                let mut weights = Vec::with_capacity(steps);

                for _ in 0..steps.max(1) {
                    let out = self.decoder.forward(dec_in, state, encoded.states.clone(), &mask);
                    // Int ids carry no gradient, so feeding them back is detached
                    dec_in = out.logits.clone().argmax(2).reshape([batch, 1]);
                    state  = out.state;
                    logits.push(out.logits);
                    weights.push(out.weights);
                }

                Ok(Seq2SeqOutput {
                    logits:    Tensor::cat(logits, 1),
                    attention: Tensor::cat(weights, 1),
                })
            }
        }
    }

    /// Forward pass on a loader batch. Target lengths and host-side
    /// target ids must cover every row of the batch.
    pub fn forward_batch(
        &self,
        batch: &TranslationBatch<B>,
        mode:  DecodeMode,
    ) -> Result<Seq2SeqOutput<B>, Seq2SeqError> {
        let [rows, tgt_width] = batch.tgt.dims();
        check_lengths("tgt_lens", &batch.tgt_lens, rows, tgt_width)?;
        if batch.tgt_ids.len() != rows {
            return Err(Seq2SeqError::RowCountMismatch {
                what:     "tgt_ids",
                expected: rows,
                found:    batch.tgt_ids.len(),
            });
        }
        self.forward(batch.src.clone(), &batch.src_lens, Some(batch.tgt.clone()), mode)
    }

    /// Reference-free generation: the forward pass with teacher forcing
    /// fixed at zero and no target, decoding `max_len + 1` steps.
    pub fn generate(
        &self,
        src:      Tensor<B, 2, Int>,
        src_lens: &[usize],
    ) -> Result<Seq2SeqOutput<B>, Seq2SeqError> {
        self.forward(src, src_lens, None, DecodeMode::autoregressive(None, self.max_len))
    }

    /// Parameter count per submodule as `(depth, name, count)`, parents
    /// listed before their children.
    pub fn param_breakdown(&self) -> Vec<(usize, String, usize)> {
        let enc = &self.encoder;
        let dec = &self.decoder;

        let mut rows = vec![
            (0, "seq2seq".to_string(), self.num_params()),
            (1, "encoder".to_string(), enc.num_params()),
            (2, "embedding".to_string(), enc.embedding.num_params()),
        ];
        for (i, layer) in enc.layers.iter().enumerate() {
            rows.push((2, format!("layers.{i}"), layer.num_params()));
        }
        rows.push((1, "decoder".to_string(), dec.num_params()));
        rows.push((2, "embedding".to_string(), dec.embedding.num_params()));
        for (i, cell) in dec.cells.iter().enumerate() {
            rows.push((2, format!("cells.{i}"), cell.num_params()));
        }
        if let Some(attention) = &dec.attention {
            rows.push((2, "attention".to_string(), attention.num_params()));
        }
        rows.push((2, "output".to_string(), dec.output.num_params()));
        rows
    }

    /// Indented parameter table in millions (1024²), skipping modules
    /// with fewer than `threshold` parameters.
    pub fn param_report(&self, threshold: usize) -> Vec<String> {
        self.param_breakdown()
            .into_iter()
            .filter(|(_, _, count)| *count >= threshold)
            .map(|(depth, name, count)| {
                let label = format!("{}{}", "  ".repeat(depth), name);
                format!("{:60}\t{:10.2}M", label, count as f64 / (1024.0 * 1024.0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::TranslationBatcher;
    use crate::data::dataset::TranslationSample;
    use crate::ml::criterion::sequence_cross_entropy;
    use burn::data::dataloader::batcher::Batcher;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = burn::backend::NdArray;

    fn ids(values: &[i32], shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default()).reshape(shape)
    }

    fn small_config() -> Seq2SeqConfig {
        Seq2SeqConfig::new(12, 14)
            .with_emb_dim(6)
            .with_h_dim(8)
            .with_enc_layers(2)
            .with_dec_layers(2)
            .with_max_len(5)
            .with_dropout(0.0)
    }

    #[test]
    fn test_teacher_forced_scenario_shape() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let src   = ids(&[2, 5, 6, 3, 0], [1, 5]);
        let tgt   = ids(&[2, 7, 8, 3], [1, 4]);

        let out = model.forward(src, &[4], Some(tgt.clone()), DecodeMode::TeacherForced).unwrap();
        assert_eq!(out.logits.dims(), [1, 3, 14]);
        // Encoder output is cut to the longest source row
        assert_eq!(out.attention.dims(), [1, 3, 4]);

        let crit = sequence_cross_entropy(out.logits, tgt.narrow(1, 1, 3)).unwrap();
        let loss = crit.loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0, "loss = {loss}");
        assert_eq!(crit.n_tokens, 3);
    }

    #[test]
    fn test_autoregressive_step_count_follows_targets() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let src   = ids(&[2, 5, 3, 0, 2, 6, 7, 3], [2, 4]);
        let tgt   = ids(&[2, 7, 3, 0, 0, 2, 8, 9, 10, 3], [2, 5]);
        let mode  = DecodeMode::autoregressive(Some(&[3, 5][..]), 5);
        assert_eq!(mode, DecodeMode::Autoregressive { steps: 4 });

        let out = model.forward(src, &[3, 4], Some(tgt), mode).unwrap();
        assert_eq!(out.logits.dims(), [2, 4, 14]);
        assert_eq!(out.attention.dims(), [2, 4, 4]);
    }

    #[test]
    fn test_generate_uses_max_len_plus_one() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let out   = model.generate(ids(&[2, 5, 3], [1, 3]), &[3]).unwrap();
        assert_eq!(out.logits.dims(), [1, 6, 14]);
    }

    #[test]
    fn test_first_step_identical_in_both_modes() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let src   = ids(&[2, 5, 6, 3, 2, 9, 3, 0], [2, 4]);
        let tgt   = ids(&[2, 7, 8, 3, 2, 10, 3, 0], [2, 4]);

        let tf = model
            .forward(src.clone(), &[4, 3], Some(tgt.clone()), DecodeMode::TeacherForced)
            .unwrap();
        let ar = model
            .forward(src, &[4, 3], Some(tgt), DecodeMode::Autoregressive { steps: 3 })
            .unwrap();

        let first_tf = tf.logits.narrow(1, 0, 1);
        let first_ar = ar.logits.narrow(1, 0, 1);
        let diff: f32 = (first_tf - first_ar).abs().max().into_scalar();
        assert!(diff < 1e-5, "diff = {diff}");
    }

    #[test]
    fn test_attention_rows_normalised_over_valid_source() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let src   = ids(&[2, 5, 6, 3, 2, 9, 3, 0], [2, 4]);
        let out   = model.generate(src, &[4, 3]).unwrap();

        let [_, steps, ts] = out.attention.dims();
        let w: Vec<f32> = out.attention.into_data().iter::<f32>().collect();
        for (i, row) in w.chunks(ts).enumerate() {
            let valid = if i < steps { 4 } else { 3 };
            let total: f32 = row[..valid].iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
            assert!(row[valid..].iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_teacher_forced_without_target_fails() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let err = model
            .forward(ids(&[2, 5, 3], [1, 3]), &[3], None, DecodeMode::TeacherForced)
            .err();
        assert_eq!(err, Some(Seq2SeqError::MissingTarget));
    }

    #[test]
    fn test_row_mismatch_is_fatal() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let src   = ids(&[2, 5, 3, 2, 6, 3], [2, 3]);
        assert!(matches!(
            model.forward(src.clone(), &[3], None, DecodeMode::Autoregressive { steps: 2 }),
            Err(Seq2SeqError::RowCountMismatch { what: "src_lens", .. })
        ));
        let tgt = ids(&[2, 7, 3], [1, 3]);
        assert!(matches!(
            model.forward(src, &[3, 3], Some(tgt), DecodeMode::TeacherForced),
            Err(Seq2SeqError::RowCountMismatch { what: "target", .. })
        ));
    }

    fn two_row_batch() -> TranslationBatch<TestBackend> {
        TranslationBatcher::<TestBackend>::new(Default::default()).batch(vec![
            TranslationSample { src_ids: vec![2, 5, 3], tgt_ids: vec![2, 7, 3] },
            TranslationSample { src_ids: vec![2, 6, 3], tgt_ids: vec![2, 8, 9, 3] },
        ])
    }

    #[test]
    fn test_single_column_target_is_too_short() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let err = model
            .forward(ids(&[2, 5, 3], [1, 3]), &[3], Some(ids(&[2], [1, 1])), DecodeMode::TeacherForced)
            .err();
        assert_eq!(err, Some(Seq2SeqError::TargetTooShort { width: 1 }));
    }

    #[test]
    fn test_batch_target_rows_must_match() {
        let model = small_config().init::<TestBackend>(&Default::default());
        assert!(model.forward_batch(&two_row_batch(), DecodeMode::TeacherForced).is_ok());

        let mut short_lens = two_row_batch();
        short_lens.tgt_lens.truncate(1);
        assert!(matches!(
            model.forward_batch(&short_lens, DecodeMode::Autoregressive { steps: 3 }),
            Err(Seq2SeqError::RowCountMismatch { what: "tgt_lens", expected: 2, found: 1 })
        ));

        let mut short_ids = two_row_batch();
        short_ids.tgt_ids.pop();
        assert!(matches!(
            model.forward_batch(&short_ids, DecodeMode::TeacherForced),
            Err(Seq2SeqError::RowCountMismatch { what: "tgt_ids", expected: 2, found: 1 })
        ));

        let mut overlong = two_row_batch();
        overlong.tgt_lens[0] = 9;
        assert!(matches!(
            model.forward_batch(&overlong, DecodeMode::TeacherForced),
            Err(Seq2SeqError::InvalidLength { row: 0, len: 9, width: 4 })
        ));
    }

    #[test]
    fn test_param_breakdown_children_sum_to_parent() {
        let model = small_config().init::<TestBackend>(&Default::default());
        let rows  = model.param_breakdown();

        let sum_at = |depth: usize, from: usize, to: usize| -> usize {
            rows[from..to].iter().filter(|r| r.0 == depth).map(|r| r.2).sum()
        };
        let dec_at = rows.iter().position(|r| r.1 == "decoder").unwrap();

        assert_eq!(rows[0].2, model.num_params());
        assert_eq!(rows[0].2, rows[1].2 + rows[dec_at].2);
        assert_eq!(rows[1].2, sum_at(2, 2, dec_at));
        assert_eq!(rows[dec_at].2, sum_at(2, dec_at + 1, rows.len()));
        assert!(rows.iter().any(|r| r.1 == "attention"));
    }

    #[test]
    fn test_param_report_filters_small_modules() {
        let model = small_config().init::<TestBackend>(&Default::default());
        assert_eq!(model.param_report(0).len(), model.param_breakdown().len());

        let report = model.param_report(model.num_params());
        assert_eq!(report.len(), 1);
        assert!(report[0].starts_with("seq2seq"));
        assert!(report[0].ends_with('M'));
    }

    #[test]
    fn test_resolve_is_batch_level_coin_flip() {
        let mut rng = StdRng::seed_from_u64(1);
        let lens    = [4usize, 3];
        assert_eq!(DecodeMode::resolve(1.0, &mut rng, Some(&lens[..]), 9), DecodeMode::TeacherForced);
        assert_eq!(
            DecodeMode::resolve(0.0, &mut rng, Some(&lens[..]), 9),
            DecodeMode::Autoregressive { steps: 3 }
        );
        // Generation never teacher-forces, whatever the probability
        assert_eq!(
            DecodeMode::resolve(1.0, &mut rng, None, 9),
            DecodeMode::Autoregressive { steps: 10 }
        );
    }

    #[test]
    fn test_resolve_is_reproducible_with_seed() {
        let lens = [5usize];
        let draws = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| DecodeMode::resolve(0.5, &mut rng, Some(&lens[..]), 9))
                .collect::<Vec<_>>()
        };
        assert_eq!(draws(11), draws(11));
    }
}
