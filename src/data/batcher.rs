// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec of variable
// length samples into rectangular tensors.
//
// How batching works here:
//   Input:  N samples, source/target lengths all different
//   Output: src [N, Ts] and tgt [N, Tt], where Ts / Tt are the
//           longest source / target in THIS batch, padded with
//           PAD_IDX on the right
//
// The true lengths (sentinels included) stay on the host as
// Vec<usize>. The model needs them for control flow, so we
// never read them back from the device.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;
use crate::domain::vocab::PAD_IDX;

#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source ids — shape: [batch_size, max_src_len]
    pub src: Tensor<B, 2, Int>,

    /// True source length per row
    pub src_lens: Vec<usize>,

    /// Target ids — shape: [batch_size, max_tgt_len]
    /// Row layout: <sos> w1 … wn <eos> <pad>…
    pub tgt: Tensor<B, 2, Int>,

    /// True target length per row, <sos> and <eos> included
    pub tgt_lens: Vec<usize>,

    /// Unpadded target ids, kept for BLEU references
    pub tgt_ids: Vec<Vec<usize>>,
}

impl<B: Backend> TranslationBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.src_lens.len()
    }
}

#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// Pad `rows` to a common width and upload them as one `[rows, width]` tensor.
/// Returns the tensor and the true length of every row.
pub fn padded_tensor<B: Backend>(
    rows:   &[Vec<usize>],
    device: &B::Device,
) -> (Tensor<B, 2, Int>, Vec<usize>) {
    let lens: Vec<usize> = rows.iter().map(Vec::len).collect();
    let width = lens.iter().copied().max().unwrap_or(0).max(1);

    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|row| {
            row.iter()
                .map(|&id| id as i32)
                .chain(std::iter::repeat(PAD_IDX as i32))
                .take(width)
        })
        .collect();

    let tensor = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device)
        .reshape([rows.len(), width]);
    (tensor, lens)
}

impl<B: Backend> Batcher<TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>) -> TranslationBatch<B> {
        let (src_rows, tgt_rows): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|s| (s.src_ids, s.tgt_ids))
            .unzip();

        let (src, src_lens) = padded_tensor::<B>(&src_rows, &self.device);
        let (tgt, tgt_lens) = padded_tensor::<B>(&tgt_rows, &self.device);

        TranslationBatch { src, src_lens, tgt, tgt_lens, tgt_ids: tgt_rows }
    }
}
