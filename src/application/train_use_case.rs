// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the parallel corpus     (Layer 4 - data)
//   Step 2: Train / validation split     (Layer 4 - data)
//   Step 3: Build vocabularies           (Layer 3 - domain)
//   Step 4: Encode + length-filter       (Layer 4 - data)
//   Step 5: Save config and vocabularies (Layer 6 - infra)
//   Step 6: Run training loop            (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{dataset::TranslationDataset, loader::TsvCorpusLoader, splitter::split_train_val};
use crate::domain::{sentence_pair::SentencePair, traits::CorpusSource, vocab::Vocab};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    seq2seq::Seq2SeqConfig,
    trainer::{run_training, TrainContext, TrainSummary},
};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run, saved next to the
// checkpoints so the translator can rebuild the same model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Tab-separated `source<TAB>target` corpus
    pub corpus:          String,
    /// Separate validation corpus; when absent `valid_fraction` of
    /// the training corpus is held out
    pub valid_corpus:    Option<String>,
    pub valid_fraction:  f64,
    pub checkpoint_dir:  String,
    /// Longest sentence kept, in words, on either side
    pub max_len:         usize,
    pub min_freq:        usize,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub min_lr:          f64,
    pub warmup_epochs:   usize,
    pub teacher_forcing: f64,
    /// Gradient-norm clip; 0 disables clipping
    pub grad_clip:       f64,
    pub emb_dim:         usize,
    pub h_dim:           usize,
    pub enc_layers:      usize,
    pub dec_layers:      usize,
    pub enc_bidirect:    bool,
    pub attention:       bool,
    pub dropout:         f64,
    pub seed:            u64,
    /// Validation pairs translated and logged after each epoch
    pub eval_samples:    usize,
    /// Log attention weights of fixed validation samples each epoch
    pub viz_attn:        bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus:          "data/train.tsv".to_string(),
            valid_corpus:    None,
            valid_fraction:  0.1,
            checkpoint_dir:  "checkpoints".to_string(),
            max_len:         20,
            min_freq:        2,
            batch_size:      64,
            epochs:          20,
            lr:              3e-4,
            min_lr:          3e-6,
            warmup_epochs:   1,
            teacher_forcing: 0.5,
            grad_clip:       5.0,
            emb_dim:         256,
            h_dim:           512,
            enc_layers:      2,
            dec_layers:      2,
            enc_bidirect:    true,
            attention:       true,
            dropout:         0.2,
            seed:            42,
            eval_samples:    3,
            viz_attn:        false,
        }
    }
}

impl TrainConfig {
    /// Read a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Model architecture for the given vocabulary sizes.
    pub fn model_config(&self, src_vocab: usize, tgt_vocab: usize) -> Seq2SeqConfig {
        Seq2SeqConfig::new(src_vocab, tgt_vocab)
            .with_emb_dim(self.emb_dim)
            .with_h_dim(self.h_dim)
            .with_enc_layers(self.enc_layers)
            .with_dec_layers(self.dec_layers)
            .with_enc_bidirect(self.enc_bidirect)
            .with_attention(self.attention)
            .with_max_len(self.max_len)
            .with_dropout(self.dropout)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.max_len > 0, "max_len must be positive");
        ensure!(self.enc_layers > 0 && self.dec_layers > 0, "layer counts must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.teacher_forcing),
            "teacher_forcing must lie in [0, 1], got {}", self.teacher_forcing
        );
        ensure!(
            self.valid_corpus.is_some() || (0.0..1.0).contains(&self.valid_fraction),
            "valid_fraction must lie in [0, 1), got {}", self.valid_fraction
        );
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        let PreparedData { src_vocab, tgt_vocab, train_set, val_set } = self.prepare()?;

        // ── Step 5: Save what the translator needs ────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;
        ckpt.save_vocabs(&src_vocab, &tgt_vocab)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let model_cfg = cfg.model_config(src_vocab.len(), tgt_vocab.len());
        let metrics   = MetricsLogger::new(ckpt.dir())?;
        let mut ctx   = TrainContext::new(cfg.clone(), metrics);
        let device    = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Training on {:?} (validation on {})", device, std::any::type_name::<MyInnerBackend>());

        run_training::<MyBackend>(
            &mut ctx,
            &model_cfg,
            train_set.samples().to_vec(),
            val_set.samples().to_vec(),
            (&src_vocab, &tgt_vocab),
            &ckpt,
            &device,
        )
    }

    /// Build the model for the corpus vocabularies and return its parameter
    /// table without training.
    pub fn trace_params(&self, threshold: usize) -> Result<Vec<String>> {
        let PreparedData { src_vocab, tgt_vocab, .. } = self.prepare()?;
        let device = burn::backend::wgpu::WgpuDevice::default();
        let model  = self
            .config
            .model_config(src_vocab.len(), tgt_vocab.len())
            .init::<MyInnerBackend>(&device);
        Ok(model.param_report(threshold))
    }

    /// Steps 1–4: corpus, split, vocabularies and encoded datasets.
    fn prepare(&self) -> Result<PreparedData> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load the corpus ───────────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.corpus);
        let pairs = TsvCorpusLoader::new(&cfg.corpus).load_pairs()?;
        tracing::info!("Loaded {} sentence pairs", pairs.len());

        // ── Step 2: Train / validation split ──────────────────────────────────
        let (train_pairs, val_pairs) = match &cfg.valid_corpus {
            Some(path) => (pairs, TsvCorpusLoader::new(path).load_pairs()?),
            None => split_train_val(pairs, 1.0 - cfg.valid_fraction, cfg.seed),
        };
        ensure!(!train_pairs.is_empty(), "No training pairs in '{}'", cfg.corpus);
        ensure!(!val_pairs.is_empty(), "No validation pairs; check valid_corpus / valid_fraction");

        // ── Step 3: Vocabularies from the training side only ──────────────────
        let (src_vocab, tgt_vocab) = build_vocabs(&train_pairs, cfg);
        tracing::info!("Vocabulary: {} source, {} target words", src_vocab.len(), tgt_vocab.len());

        // ── Step 4: Encode, dropping pairs longer than max_len ────────────────
        let train_set = TranslationDataset::from_pairs(&train_pairs, &src_vocab, &tgt_vocab, cfg.max_len);
        let val_set   = TranslationDataset::from_pairs(&val_pairs, &src_vocab, &tgt_vocab, cfg.max_len);
        tracing::info!("Split: {} train, {} validation", train_set.sample_count(), val_set.sample_count());
        ensure!(
            train_set.sample_count() > 0 && val_set.sample_count() > 0,
            "No pairs left after filtering to max_len = {}", cfg.max_len
        );

        Ok(PreparedData { src_vocab, tgt_vocab, train_set, val_set })
    }
}

struct PreparedData {
    src_vocab: Vocab,
    tgt_vocab: Vocab,
    train_set: TranslationDataset,
    val_set:   TranslationDataset,
}

fn build_vocabs(pairs: &[SentencePair], cfg: &TrainConfig) -> (Vocab, Vocab) {
    let src = Vocab::build(pairs.iter().map(|p| &p.source), cfg.min_freq);
    let tgt = Vocab::build(pairs.iter().map(|p| &p.target), cfg.min_freq);
    (src, tgt)
}
