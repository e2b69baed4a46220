// ============================================================
// Layer 5 — Parameter Initialisation
// ============================================================
// Every weight matrix starts from Xavier-uniform:
//
//   W ~ U(−a, a),   a = gain · √(6 / (fan_in + fan_out))
//
// Burn's Linear passes its fans to the initializer itself. The
// Embedding default (N(0, 1)) has no fan-aware variant, so its
// table is re-initialised here with fan_in = d, fan_out = n.
//
// Reference: Glorot & Bengio (2010)

use burn::{
    nn::{Embedding, EmbeddingConfig, Initializer, Linear, LinearConfig},
    prelude::*,
};

pub const XAVIER_UNIFORM: Initializer = Initializer::XavierUniform { gain: 1.0 };

pub fn linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    LinearConfig::new(d_input, d_output)
        .with_initializer(XAVIER_UNIFORM)
        .init(device)
}

/// Linear without bias (attention key projection).
pub fn linear_no_bias<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    LinearConfig::new(d_input, d_output)
        .with_bias(false)
        .with_initializer(XAVIER_UNIFORM)
        .init(device)
}

pub fn embedding<B: Backend>(n_embedding: usize, d_model: usize, device: &B::Device) -> Embedding<B> {
    let mut embedding = EmbeddingConfig::new(n_embedding, d_model).init(device);
    embedding.weight = XAVIER_UNIFORM.init_with([n_embedding, d_model], Some(d_model), Some(n_embedding), device);
    embedding
}
