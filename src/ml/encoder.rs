// ============================================================
// Layer 5 — Recurrent Encoder
// ============================================================
// Embeds the padded source batch and runs a stack of GRU
// layers over it, optionally in both directions.
//
//   src [B, Ts] ─ Embedding ─ Dropout ─┬─ layer 1 ─ Dropout ─ … ─ layer L ─► outputs [B, Ts, H·dirs]
//                                      │      │                     │
//                                      ▼      ▼                     ▼
//                                  summary per layer [B, H]  (decoder initial state)
//
// Variable lengths are handled by masking inside GruCell::run,
// not by packing: a row's padding never touches its summary.
// In bidirectional mode the two final states of a layer are
// merged back to H with tanh(Linear(2H → H)), so the decoder
// hidden size stays H either way.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, Linear},
    prelude::*,
    tensor::activation::tanh,
};

use crate::ml::{gru::GruCell, init};

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub forward_cell:  GruCell<B>,
    pub backward_cell: Option<GruCell<B>>,
    pub bridge:        Option<Linear<B>>,
}

impl<B: Backend> EncoderLayer<B> {
    fn new(d_input: usize, h_dim: usize, bidirect: bool, device: &B::Device) -> Self {
        Self {
            forward_cell:  GruCell::new(d_input, h_dim, device),
            backward_cell: bidirect.then(|| GruCell::new(d_input, h_dim, device)),
            bridge:        bidirect.then(|| init::linear(2 * h_dim, h_dim, device)),
        }
    }

    fn forward(&self, x: Tensor<B, 3>, mask: &Tensor<B, 2>) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let [batch, _, _] = x.dims();
        let h_dim  = self.forward_cell.d_hidden;
        let device = x.device();
        let h0     = Tensor::zeros([batch, h_dim], &device);

        let (fwd_out, fwd_h) = self.forward_cell.run(x.clone(), h0.clone(), Some(mask.clone()), false);

        match (&self.backward_cell, &self.bridge) {
            (Some(cell), Some(bridge)) => {
                let (bwd_out, bwd_h) = cell.run(x, h0, Some(mask.clone()), true);
                let outputs = Tensor::cat(vec![fwd_out, bwd_out], 2);
                let summary = tanh(bridge.forward(Tensor::cat(vec![fwd_h, bwd_h], 1)));
                (outputs, summary)
            }
            _ => (fwd_out, fwd_h),
        }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub embedding:    Embedding<B>,
    pub layers:       Vec<EncoderLayer<B>>,
    pub dropout:      Dropout,
    pub n_directions: usize,
}

/// Everything the decoder needs from the encoder.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// Top-layer states at every source position — [B, Ts, H·dirs]
    pub states: Tensor<B, 3>,

    /// Final state of each layer — L × [B, H]
    pub summaries: Vec<Tensor<B, 2>>,
}

impl<B: Backend> Encoder<B> {
    pub fn new(
        vocab_size: usize,
        emb_dim:    usize,
        h_dim:      usize,
        n_layers:   usize,
        bidirect:   bool,
        dropout:    f64,
        device:     &B::Device,
    ) -> Self {
        let n_directions = if bidirect { 2 } else { 1 };
        let layers = (0..n_layers.max(1))
            .map(|i| {
                let d_input = if i == 0 { emb_dim } else { h_dim * n_directions };
                EncoderLayer::new(d_input, h_dim, bidirect, device)
            })
            .collect();

        Self {
            embedding: init::embedding(vocab_size, emb_dim, device),
            layers,
            dropout: DropoutConfig::new(dropout).init(),
            n_directions,
        }
    }

    /// Width of `EncoderOutput::states` along the last axis.
    pub fn output_dim(&self) -> usize {
        self.layers[0].forward_cell.d_hidden * self.n_directions
    }

    /// src [B, Ts] ids, mask [B, Ts] (1.0 = real token)
    pub fn forward(&self, src: Tensor<B, 2, Int>, mask: &Tensor<B, 2>) -> EncoderOutput<B> {
        let mut x = self.dropout.forward(self.embedding.forward(src));
        let mut summaries = Vec::with_capacity(self.layers.len());

        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                x = self.dropout.forward(x);
            }
            let (out, summary) = layer.forward(x, mask);
            summaries.push(summary);
            x = out;
        }

        EncoderOutput { states: x, summaries }
    }
}
