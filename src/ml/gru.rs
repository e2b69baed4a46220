// ============================================================
// Layer 5 — GRU Cell
// ============================================================
// A single gated recurrent unit, stepped one time position at a
// time so that the encoder can mask padding explicitly.
//
//   r  = σ(W_ir x + W_hr h)
//   z  = σ(W_iz x + W_hz h)
//   n  = tanh(W_in x + r ⊙ (W_hn h))
//   h' = (1 − z) ⊙ n + z ⊙ h
//
// Reference: Cho et al. (2014) Learning Phrase Representations
//            using RNN Encoder-Decoder

use burn::{
    nn::Linear,
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::ml::init;

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    /// x → [r | z | n] pre-activations
    pub input_gates:  Linear<B>,
    /// h → [r | z | n] pre-activations
    pub hidden_gates: Linear<B>,
    pub d_hidden:     usize,
}

impl<B: Backend> GruCell<B> {
    pub fn new(d_input: usize, d_hidden: usize, device: &B::Device) -> Self {
        Self {
            input_gates:  init::linear(d_input, 3 * d_hidden, device),
            hidden_gates: init::linear(d_hidden, 3 * d_hidden, device),
            d_hidden,
        }
    }

    /// One step: x [batch, d_input], h [batch, d_hidden] → h' [batch, d_hidden]
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let d  = self.d_hidden;
        let gi = self.input_gates.forward(x);
        let gh = self.hidden_gates.forward(h.clone());

        let r = sigmoid(gi.clone().narrow(1, 0, d) + gh.clone().narrow(1, 0, d));
        let z = sigmoid(gi.clone().narrow(1, d, d) + gh.clone().narrow(1, d, d));
        let n = tanh(gi.narrow(1, 2 * d, d) + r * gh.narrow(1, 2 * d, d));

        // (1 − z)·n + z·h  ==  n + z·(h − n)
        n.clone() + z * (h - n)
    }

    /// Run over a whole sequence x [batch, time, d_input].
    ///
    /// `mask` is [batch, time] with 1.0 at real tokens and 0.0 at
    /// padding. At a padding position the previous state is carried
    /// over unchanged and the output is zero, so padding never reaches
    /// the final state in either direction.
    ///
    /// Returns outputs [batch, time, d_hidden] and the final state.
    pub fn run(
        &self,
        x:       Tensor<B, 3>,
        h0:      Tensor<B, 2>,
        mask:    Option<Tensor<B, 2>>,
        reverse: bool,
    ) -> (Tensor<B, 3>, Tensor<B, 2>) {
        let [batch, time, d_input] = x.dims();
        let d = self.d_hidden;

        let mut h       = h0;
        let mut outputs = Vec::with_capacity(time);
        let order: Vec<usize> = if reverse { (0..time).rev().collect() } else { (0..time).collect() };

        for t in order {
            let x_t   = x.clone().narrow(1, t, 1).reshape([batch, d_input]);
            let h_new = self.step(x_t, h.clone());

            h = match &mask {
                Some(mask) => {
                    let m = mask.clone().narrow(1, t, 1); // [batch, 1]
                    let keep = m.clone().neg().add_scalar(1.0);
                    h_new * m + h * keep
                }
                None => h_new,
            };

            let out = match &mask {
                Some(mask) => h.clone() * mask.clone().narrow(1, t, 1),
                None => h.clone(),
            };
            outputs.push(out.reshape([batch, 1, d]));
        }

        if reverse {
            outputs.reverse();
        }
        (Tensor::cat(outputs, 1), h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn cell() -> GruCell<TestBackend> {
        GruCell::new(3, 4, &Default::default())
    }

    fn max_abs_diff(a: Tensor<TestBackend, 2>, b: Tensor<TestBackend, 2>) -> f32 {
        (a - b).abs().max().into_scalar()
    }

    #[test]
    fn test_run_shapes() {
        let device = Default::default();
        let gru    = cell();
        let x      = Tensor::<TestBackend, 3>::random([2, 5, 3], burn::tensor::Distribution::Default, &device);
        let (out, h) = gru.run(x, Tensor::zeros([2, 4], &device), None, false);
        assert_eq!(out.dims(), [2, 5, 4]);
        assert_eq!(h.dims(), [2, 4]);
    }

    #[test]
    fn test_padding_does_not_change_final_state() {
        let device = Default::default();
        let gru    = cell();
        let x      = Tensor::<TestBackend, 3>::random([1, 5, 3], burn::tensor::Distribution::Default, &device);
        let h0     = Tensor::<TestBackend, 2>::zeros([1, 4], &device);

        // Only the first three positions are real
        let mask = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![1.0f32, 1.0, 1.0, 0.0, 0.0], [1, 5]), &device,
        );
        let (out, h_masked) = gru.run(x.clone(), h0.clone(), Some(mask.clone()), false);
        let (_, h_short)    = gru.run(x.clone().narrow(1, 0, 3), h0.clone(), None, false);
        assert!(max_abs_diff(h_masked, h_short) < 1e-6);

        // Outputs at padding are zero
        let pad_out: f32 = out.narrow(1, 3, 2).abs().sum().into_scalar();
        assert_eq!(pad_out, 0.0);

        // Backward direction starts at the last real token
        let (_, h_rev_masked) = gru.run(x.clone(), h0.clone(), Some(mask), true);
        let (_, h_rev_short)  = gru.run(x.narrow(1, 0, 3), h0, None, true);
        assert!(max_abs_diff(h_rev_masked, h_rev_short) < 1e-6);
    }
}
