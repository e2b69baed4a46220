// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `translate`
// and all their configurable flags.
//
// `train` accepts an optional `--config file.json`. Values from
// the file replace the defaults; flags given explicitly on the
// command line win over both.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a seq2seq translator on a tab-separated parallel corpus
    Train(TrainArgs),

    /// Translate a sentence with a trained checkpoint
    Translate(TranslateArgs),
}

/// All arguments for the `train` command.
/// Unset flags fall back to the JSON config, then to the defaults.
#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// JSON file with any subset of the training hyperparameters
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Parallel corpus, one `source<TAB>target` pair per line
    #[arg(long)]
    pub corpus: Option<String>,

    /// Separate validation corpus (otherwise --valid-fraction is held out)
    #[arg(long)]
    pub valid_corpus: Option<String>,

    /// Share of the corpus held out for validation
    #[arg(long)]
    pub valid_fraction: Option<f64>,

    /// Directory for checkpoints, vocabularies and metrics
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    /// Longest sentence kept, in words
    #[arg(long)]
    pub max_len: Option<usize>,

    /// Minimum word count to enter the vocabulary
    #[arg(long)]
    pub min_freq: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub epochs: Option<usize>,

    /// Peak learning rate, reached after warmup
    #[arg(long)]
    pub lr: Option<f64>,

    /// Floor of the cosine annealing
    #[arg(long)]
    pub min_lr: Option<f64>,

    #[arg(long)]
    pub warmup_epochs: Option<usize>,

    /// Probability that a batch is decoded with the ground-truth target
    #[arg(long)]
    pub teacher_forcing: Option<f64>,

    /// Gradient-norm clip, 0 to disable
    #[arg(long)]
    pub grad_clip: Option<f64>,

    #[arg(long)]
    pub emb_dim: Option<usize>,

    #[arg(long)]
    pub h_dim: Option<usize>,

    #[arg(long)]
    pub enc_layers: Option<usize>,

    #[arg(long)]
    pub dec_layers: Option<usize>,

    /// Bidirectional encoder
    #[arg(long)]
    pub enc_bidirect: Option<bool>,

    /// Attention in the decoder
    #[arg(long)]
    pub attention: Option<bool>,

    #[arg(long)]
    pub dropout: Option<f64>,

    /// Seed for initialisation, the data split and teacher forcing
    #[arg(long)]
    pub seed: Option<u64>,

    /// Validation pairs translated and logged after each epoch
    #[arg(long)]
    pub eval_samples: Option<usize>,

    /// Log attention weights of fixed validation samples each epoch
    #[arg(long)]
    pub viz_attn: Option<bool>,

    /// Print the per-module parameter table and exit without training
    #[arg(long)]
    pub param_tracing: bool,

    /// Smallest parameter count listed by --param-tracing
    #[arg(long, default_value_t = 100 * 1024)]
    pub param_threshold: usize,
}

impl TrainArgs {
    /// Resolve defaults ← JSON config ← command-line flags.
    /// This is the boundary between Layer 1 and Layer 2:
    /// the application layer never sees clap types.
    pub fn into_config(self) -> Result<TrainConfig> {
        let mut cfg = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $( if let Some(v) = self.$field { cfg.$field = v; } )*
            };
        }
        apply!(
            corpus, valid_fraction, checkpoint_dir, max_len, min_freq,
            batch_size, epochs, lr, min_lr, warmup_epochs, teacher_forcing,
            grad_clip, emb_dim, h_dim, enc_layers, dec_layers, enc_bidirect,
            attention, dropout, seed, eval_samples, viz_attn,
        );
        if self.valid_corpus.is_some() {
            cfg.valid_corpus = self.valid_corpus;
        }
        Ok(cfg)
    }
}

/// All arguments for the `translate` command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// The source-language sentence to translate
    #[arg(long)]
    pub sentence: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
