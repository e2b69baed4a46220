// ============================================================
// Layer 5 — Attention
// ============================================================
// Luong "general" attention over the encoder states, evaluated
// for all decoder steps in one batched matmul:
//
//   keys    = W_a · enc                    [B, Ts, H]
//   scores  = dec · keysᵀ                  [B, Td, Ts]
//   weights = softmax(scores + pad_bias)   pad_bias = −1e9 at padding
//   weights = weights ⊙ valid              exact zeros at padding
//   context = weights · enc                [B, Td, H_enc]
//   output  = tanh(W_c · [dec ; context])  [B, Td, H]
//
// The softmax already renormalises over the valid positions;
// the final multiply only turns the underflowed ~0 into a true 0.
//
// Reference: Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

use burn::{
    nn::Linear,
    prelude::*,
    tensor::activation::{softmax, tanh},
};

use crate::ml::init;

const MASK_PENALTY: f64 = 1e9;

/// Valid source positions for one batch, shape [B, 1, Ts] with 1.0
/// at real tokens and 0.0 at padding.
///
/// Built once per forward pass and shared by every decoder call.
#[derive(Debug, Clone)]
pub struct AttentionMask<B: Backend> {
    valid: Tensor<B, 3>,
}

impl<B: Backend> AttentionMask<B> {
    /// `src` is the source batch already cut to the encoder length.
    pub fn from_source(src: Tensor<B, 2, Int>, pad_idx: usize) -> Self {
        let [batch, time] = src.dims();
        let valid = src.equal_elem(pad_idx as i64).bool_not().float().reshape([batch, 1, time]);
        Self { valid }
    }

    /// [B, Ts] view, used by the encoder to skip padding.
    pub fn positions(&self) -> Tensor<B, 2> {
        let [batch, _, time] = self.valid.dims();
        self.valid.clone().reshape([batch, time])
    }

    pub fn valid(&self) -> Tensor<B, 3> {
        self.valid.clone()
    }

    pub fn source_len(&self) -> usize {
        self.valid.dims()[2]
    }
}

#[derive(Module, Debug)]
pub struct Attention<B: Backend> {
    pub key:     Linear<B>,
    pub combine: Linear<B>,
}

impl<B: Backend> Attention<B> {
    pub fn new(dec_dim: usize, enc_dim: usize, device: &B::Device) -> Self {
        Self {
            key:     init::linear_no_bias(enc_dim, dec_dim, device),
            combine: init::linear(dec_dim + enc_dim, dec_dim, device),
        }
    }

    /// dec [B, Td, H], enc [B, Ts, H_enc] → (attentional states [B, Td, H], weights [B, Td, Ts])
    pub fn forward(
        &self,
        dec:  Tensor<B, 3>,
        enc:  Tensor<B, 3>,
        mask: &AttentionMask<B>,
    ) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let keys   = self.key.forward(enc.clone());
        let scores = dec.clone().matmul(keys.swap_dims(1, 2));

        let valid    = mask.valid();
        let pad_bias = valid.clone().sub_scalar(1.0).mul_scalar(MASK_PENALTY);
        let weights  = softmax(scores + pad_bias, 2) * valid;

        let context = weights.clone().matmul(enc);
        let states  = tanh(self.combine.forward(Tensor::cat(vec![dec, context], 2)));
        (states, weights)
    }
}
