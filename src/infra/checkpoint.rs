// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything needed to rebuild a trained
// translator, using Burn's CompactRecorder for the weights.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json      ← number of the last saved epoch
//     best_epoch.json        ← epoch with the best validation BLEU
//     train_config.json      ← hyperparameters (architecture included)
//     src_vocab.json         ← source vocabulary
//     tgt_vocab.json         ← target vocabulary
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::vocab::Vocab;
use crate::ml::seq2seq::Seq2Seq;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights for `epoch` and mark it as the latest.
    pub fn save_model<B: Backend>(&self, model: &Seq2Seq<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_json("latest_epoch.json", &epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the weights of `epoch` into `model`.
    pub fn load_model<B: Backend>(
        &self,
        model:  Seq2Seq<B>,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<Seq2Seq<B>> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_best_epoch(&self, epoch: usize) -> Result<()> {
        self.write_json("best_epoch.json", &epoch)
    }

    pub fn latest_epoch(&self) -> Result<usize> {
        self.read_json("latest_epoch.json")
    }

    /// Best-BLEU epoch if one was recorded, otherwise the latest epoch.
    pub fn preferred_epoch(&self) -> Result<usize> {
        if self.dir.join("best_epoch.json").exists() {
            self.read_json("best_epoch.json")
        } else {
            self.latest_epoch()
        }
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json("train_config.json", cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json("train_config.json")
    }

    pub fn save_vocabs(&self, src: &Vocab, tgt: &Vocab) -> Result<()> {
        self.write_json("src_vocab.json", src)?;
        self.write_json("tgt_vocab.json", tgt)
    }

    pub fn load_vocabs(&self) -> Result<(Vocab, Vocab)> {
        let src: Vocab = self.read_json("src_vocab.json")?;
        let tgt: Vocab = self.read_json("tgt_vocab.json")?;
        Ok((src.reindex(), tgt.reindex()))
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!("Cannot read '{}'. Make sure you have run 'train' first.", path.display())
            })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}
