// ============================================================
// Layer 5 — Loss / Perplexity Criterion
// ============================================================
// Cross-entropy that ignores padding, reported two ways:
//
//   loss = mean over sentences of ( Σ_t nll(t) )       ← optimised
//   ppl  = exp( Σ_all nll / number of non-pad tokens ) ← reported
//
// The first is a per-sentence sum averaged over the batch, the
// second a per-token average over the whole batch. Both are logged.

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::domain::error::Seq2SeqError;
use crate::domain::vocab::PAD_IDX;

pub struct CriterionOutput<B: Backend> {
    /// Scalar loss, shape [1], still attached to the graph
    pub loss:       Tensor<B, 1>,
    pub perplexity: f64,
    /// Number of non-padding target tokens in the batch
    pub n_tokens:   usize,
}

/// logits [B, T, V], targets [B, T] (already shifted past <sos>)
pub fn sequence_cross_entropy<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
) -> Result<CriterionOutput<B>, Seq2SeqError> {
    let [batch, steps, vocab] = logits.dims();
    let [t_batch, t_steps]    = targets.dims();
    if t_batch != batch {
        return Err(Seq2SeqError::RowCountMismatch { what: "targets", expected: batch, found: t_batch });
    }
    if t_steps != steps {
        return Err(Seq2SeqError::StepMismatch { expected: t_steps, found: steps });
    }

    let valid    = targets.clone().equal_elem(PAD_IDX as i64).bool_not();
    let n_tokens = valid
        .clone()
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize;
    if n_tokens == 0 {
        return Err(Seq2SeqError::EmptyBatch);
    }

    let log_probs = log_softmax(logits.reshape([batch * steps, vocab]), 1);
    let nll = log_probs
        .gather(1, targets.reshape([batch * steps, 1]))
        .reshape([batch, steps])
        .neg()
        * valid.float();

    let total: f64 = nll.clone().sum().into_scalar().elem::<f64>();
    let loss       = nll.sum_dim(1).mean();

    Ok(CriterionOutput {
        loss,
        perplexity: (total / n_tokens as f64).exp(),
        n_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    fn targets(values: &[i32], shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(values, &Default::default()).reshape(shape)
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_uniform_logits_give_vocab_perplexity() {
        // All-zero logits are a uniform distribution: nll = ln(V) per token
        let logits = Tensor::<TestBackend, 3>::zeros([2, 3, 5], &Default::default());
        let out = sequence_cross_entropy(logits, targets(&[4, 2, 3, 4, 3, 0], [2, 3])).unwrap();

        assert_eq!(out.n_tokens, 5);
        assert!((out.perplexity - 5.0).abs() < 1e-4);
        // Row sums: 3·ln5 and 2·ln5, batch mean 2.5·ln5
        let expected = 2.5 * 5.0_f64.ln();
        assert!((scalar(out.loss) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_padding_contributes_nothing() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 3>::random([1, 4, 6], Distribution::Default, &device);
        let full   = sequence_cross_entropy(logits.clone().narrow(1, 0, 2), targets(&[4, 3], [1, 2])).unwrap();
        let padded = sequence_cross_entropy(logits, targets(&[4, 3, 0, 0], [1, 4])).unwrap();

        assert!((scalar(full.loss) - scalar(padded.loss)).abs() < 1e-5);
        assert!((full.perplexity - padded.perplexity).abs() < 1e-4);
    }

    #[test]
    fn test_loss_non_negative_and_ppl_at_least_one() {
        let device = Default::default();
        for _ in 0..5 {
            let logits = Tensor::<TestBackend, 3>::random([3, 4, 7], Distribution::Normal(0.0, 3.0), &device);
            let out = sequence_cross_entropy(logits, targets(&[1, 2, 3, 0, 4, 5, 6, 3, 3, 0, 0, 0], [3, 4])).unwrap();
            assert!(scalar(out.loss) >= 0.0);
            assert!(out.perplexity >= 1.0);
        }
    }

    #[test]
    fn test_all_padding_is_fatal() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 2, 4], &Default::default());
        let err = sequence_cross_entropy(logits, targets(&[0, 0], [1, 2])).err();
        assert_eq!(err, Some(Seq2SeqError::EmptyBatch));
    }

    #[test]
    fn test_step_mismatch_is_fatal() {
        let logits = Tensor::<TestBackend, 3>::zeros([1, 3, 4], &Default::default());
        let err = sequence_cross_entropy(logits, targets(&[2, 3], [1, 2])).err();
        assert_eq!(err, Some(Seq2SeqError::StepMismatch { expected: 2, found: 3 }));
    }
}
