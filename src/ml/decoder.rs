// ============================================================
// Layer 5 — Attention Decoder
// ============================================================
// Consumes any number of decoder input tokens in one call:
//   - the whole shifted target during teacher forcing
//   - a single token per call during autoregressive decoding
//
// Per step the embedded token runs through the stacked GRU
// cells. Attention is then applied to the top-layer outputs of
// ALL steps at once, so both call patterns share one code path
// and give identical results for identical inputs.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, Linear},
    prelude::*,
};

use crate::ml::attention::{Attention, AttentionMask};
use crate::ml::gru::GruCell;
use crate::ml::init;

/// Hidden state of every decoder layer — L × [B, H].
#[derive(Debug, Clone)]
pub struct DecoderState<B: Backend> {
    pub layers: Vec<Tensor<B, 2>>,
}

impl<B: Backend> DecoderState<B> {
    /// Map encoder summaries onto `n_layers` decoder layers: one-to-one
    /// when the depths match, otherwise every layer starts from the
    /// top encoder layer.
    pub fn from_encoder(summaries: &[Tensor<B, 2>], n_layers: usize) -> Self {
        let layers = if summaries.len() == n_layers {
            summaries.to_vec()
        } else {
            summaries
                .last()
                .map(|top| vec![top.clone(); n_layers])
                .unwrap_or_default()
        };
        Self { layers }
    }
}

pub struct DecoderOutput<B: Backend> {
    /// Unnormalised scores — [B, Td, V]
    pub logits:  Tensor<B, 3>,
    pub state:   DecoderState<B>,
    /// Attention over source positions — [B, Td, Ts]
    pub weights: Tensor<B, 3>,
}

#[derive(Module, Debug)]
pub struct AttnDecoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub cells:     Vec<GruCell<B>>,
    pub attention: Option<Attention<B>>,
    pub output:    Linear<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> AttnDecoder<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vocab_size: usize,
        emb_dim:    usize,
        h_dim:      usize,
        enc_dim:    usize,
        n_layers:   usize,
        attention:  bool,
        dropout:    f64,
        device:     &B::Device,
    ) -> Self {
        let cells = (0..n_layers.max(1))
            .map(|i| GruCell::new(if i == 0 { emb_dim } else { h_dim }, h_dim, device))
            .collect();

        Self {
            embedding: init::embedding(vocab_size, emb_dim, device),
            cells,
            attention: attention.then(|| Attention::new(h_dim, enc_dim, device)),
            output:    init::linear(h_dim, vocab_size, device),
            dropout:   DropoutConfig::new(dropout).init(),
        }
    }

    pub fn n_layers(&self) -> usize {
        self.cells.len()
    }

    /// input [B, Td] ids → logits [B, Td, V], new state, weights [B, Td, Ts]
    pub fn forward(
        &self,
        input: Tensor<B, 2, Int>,
        state: DecoderState<B>,
        enc:   Tensor<B, 3>,
        mask:  &AttentionMask<B>,
    ) -> DecoderOutput<B> {
        let [batch, steps] = input.dims();
        let emb = self.dropout.forward(self.embedding.forward(input));
        let [_, _, emb_dim] = emb.dims();

        let mut hidden = state.layers;
        let mut tops   = Vec::with_capacity(steps);

        for t in 0..steps {
            let mut x = emb.clone().narrow(1, t, 1).reshape([batch, emb_dim]);
            for (l, cell) in self.cells.iter().enumerate() {
                let h = cell.step(x, hidden[l].clone());
                hidden[l] = h.clone();
                x = if l + 1 < self.cells.len() { self.dropout.forward(h) } else { h };
            }
            let [_, h_dim] = x.dims();
            tops.push(x.reshape([batch, 1, h_dim]));
        }
        let outputs = Tensor::cat(tops, 1);

        let (states, weights) = match &self.attention {
            Some(attention) => attention.forward(outputs, enc, mask),
            None => {
                let zeros = Tensor::zeros([batch, steps, mask.source_len()], &outputs.device());
                (outputs, zeros)
            }
        };

        let logits = self.output.forward(self.dropout.forward(states));
        DecoderOutput { logits, state: DecoderState { layers: hidden }, weights }
    }
}
