// ============================================================
// Layer 3 — BLEU Scorer
// ============================================================
// Corpus-level BLEU (Papineni et al., 2002).
//
// Sentence pairs are folded into running statistics:
//   matches[n]  clipped n-gram matches of order n+1
//   totals[n]   n-gram count of order n+1 in the predictions
//   pred_len    total prediction length
//   ref_len     total reference length
//
// score = 100 · BP · exp( Σ_n log(matches[n] / totals[n]) / N )
// BP    = 1                  if pred_len > ref_len
//         exp(1 - r / c)     otherwise
//
// The score is 0 whenever any order has no matches, which also
// covers the empty accumulator.

use std::collections::HashMap;

pub const DEFAULT_MAX_ORDER: usize = 4;

#[derive(Debug, Clone)]
pub struct Bleu {
    max_order: usize,
    matches:   Vec<usize>,
    totals:    Vec<usize>,
    pred_len:  usize,
    ref_len:   usize,
    sentences: usize,
}

impl Default for Bleu {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ORDER)
    }
}

impl Bleu {
    pub fn new(max_order: usize) -> Self {
        let max_order = max_order.max(1);
        Self {
            max_order,
            matches:   vec![0; max_order],
            totals:    vec![0; max_order],
            pred_len:  0,
            ref_len:   0,
            sentences: 0,
        }
    }

    /// Accumulate n-gram statistics of one prediction against its reference.
    /// Both slices must already be stripped of sentinels and padding.
    pub fn add_sentence(&mut self, prediction: &[usize], reference: &[usize]) {
        self.pred_len  += prediction.len();
        self.ref_len   += reference.len();
        self.sentences += 1;

        for n in 1..=self.max_order {
            let pred_ngrams = count_ngrams(prediction, n);
            let ref_ngrams  = count_ngrams(reference, n);

            self.matches[n - 1] += pred_ngrams
                .iter()
                .map(|(gram, &count)| count.min(ref_ngrams.get(gram).copied().unwrap_or(0)))
                .sum::<usize>();
            self.totals[n - 1] += prediction.len().saturating_sub(n - 1);
        }
    }

    /// Corpus BLEU on a 0–100 scale.
    pub fn score(&self) -> f64 {
        if self.pred_len == 0 || self.matches.iter().any(|&m| m == 0) {
            return 0.0;
        }

        let log_precision = self
            .matches
            .iter()
            .zip(&self.totals)
            .map(|(&m, &t)| (m as f64 / t as f64).ln())
            .sum::<f64>()
            / self.max_order as f64;

        let brevity = if self.pred_len > self.ref_len {
            1.0
        } else {
            (1.0 - self.ref_len as f64 / self.pred_len as f64).exp()
        };

        100.0 * brevity * log_precision.exp()
    }

    /// Number of sentence pairs accumulated so far.
    pub fn sentences(&self) -> usize {
        self.sentences
    }
}

fn count_ngrams(tokens: &[usize], n: usize) -> HashMap<&[usize], usize> {
    let mut counts = HashMap::new();
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_max() {
        let mut bleu = Bleu::default();
        bleu.add_sentence(&[4, 5, 6, 7, 8], &[4, 5, 6, 7, 8]);
        bleu.add_sentence(&[9, 10, 11, 12], &[9, 10, 11, 12]);
        assert!((bleu.score() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_is_zero() {
        let mut bleu = Bleu::default();
        bleu.add_sentence(&[1, 2, 3, 4, 5], &[6, 7, 8, 9, 10]);
        assert_eq!(bleu.score(), 0.0);
    }

    #[test]
    fn test_empty_accumulator_is_zero() {
        let bleu = Bleu::default();
        assert_eq!(bleu.score(), 0.0);
        assert_eq!(bleu.sentences(), 0);
    }

    #[test]
    fn test_empty_prediction_is_zero() {
        let mut bleu = Bleu::default();
        bleu.add_sentence(&[], &[4, 5, 6, 7]);
        assert_eq!(bleu.score(), 0.0);
    }

    #[test]
    fn test_counts_are_clipped() {
        // "the the the the" vs "the cat": unigram precision 1/4
        let mut bleu = Bleu::new(1);
        bleu.add_sentence(&[7, 7, 7, 7], &[7, 8]);
        assert!((bleu.score() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_brevity_penalty() {
        let mut bleu = Bleu::new(1);
        bleu.add_sentence(&[4, 5], &[4, 5, 6, 7]);
        let expected = 100.0 * (1.0_f64 - 4.0 / 2.0).exp();
        assert!((bleu.score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_partial_match_between_bounds() {
        let mut bleu = Bleu::default();
        bleu.add_sentence(&[4, 5, 6, 7, 8, 9], &[4, 5, 6, 7, 10, 9]);
        let score = bleu.score();
        assert!(score > 0.0 && score < 100.0, "score = {score}");
    }
}
