// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// The metric sink of a training run. Two CSV files live in the
// checkpoint directory:
//
//   scalars.csv  — tag,step,value
//                  every train step: train/loss, train/ppl, train/lr
//                  every epoch:      val/loss, val/ppl, val/bleu
//
//   metrics.csv  — one row per epoch
//                  epoch,train_loss,train_ppl,val_loss,val_ppl,val_bleu,lr
//
// Both files are appended to, so a resumed or repeated run keeps
// its history. Headers are written only when a file is created.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of per-epoch metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub train_ppl:  f64,
    pub val_loss:   f64,
    pub val_ppl:    f64,
    pub val_bleu:   f64,
    /// Learning rate at the end of the epoch
    pub lr:         f64,
}

pub struct MetricsLogger {
    epoch_csv:  PathBuf,
    scalar_csv: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let epoch_csv  = dir.join("metrics.csv");
        let scalar_csv = dir.join("scalars.csv");
        write_header(&epoch_csv, "epoch,train_loss,train_ppl,val_loss,val_ppl,val_bleu,lr")?;
        write_header(&scalar_csv, "tag,step,value")?;

        Ok(Self { epoch_csv, scalar_csv })
    }

    /// Append one point of a scalar time series.
    pub fn scalar(&self, tag: &str, step: usize, value: f64) -> Result<()> {
        let mut f = append(&self.scalar_csv)?;
        writeln!(f, "{tag},{step},{value:.6}")?;
        Ok(())
    }

    pub fn log_epoch(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = append(&self.epoch_csv)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.8}",
            m.epoch, m.train_loss, m.train_ppl, m.val_loss, m.val_ppl, m.val_bleu, m.lr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}, val_bleu={:.2}",
            m.epoch, m.train_loss, m.val_loss, m.val_bleu,
        );
        Ok(())
    }

    pub fn epoch_csv(&self) -> &Path {
        &self.epoch_csv
    }

    pub fn scalar_csv(&self) -> &Path {
        &self.scalar_csv
    }
}

fn write_header(path: &Path, header: &str) -> Result<()> {
    if !path.exists() {
        let mut f = fs::File::create(path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        writeln!(f, "{header}")?;
        tracing::debug!("Created metrics CSV: '{}'", path.display());
    }
    Ok(())
}

fn append(path: &Path) -> Result<fs::File> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot append to '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_headers_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.scalar("train/loss", 0, 3.5).unwrap();
        logger.scalar("train/loss", 1, 3.25).unwrap();

        // A second logger on the same directory must not repeat the header
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log_epoch(&EpochMetrics {
            epoch: 1, train_loss: 3.0, train_ppl: 20.0,
            val_loss: 3.1, val_ppl: 22.0, val_bleu: 1.5, lr: 3e-4,
        }).unwrap();

        let scalars = fs::read_to_string(logger.scalar_csv()).unwrap();
        assert_eq!(
            scalars.lines().collect::<Vec<_>>(),
            vec!["tag,step,value", "train/loss,0,3.500000", "train/loss,1,3.250000"]
        );

        let epochs = fs::read_to_string(again.epoch_csv()).unwrap();
        let lines: Vec<_> = epochs.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1,3.000000,20.000000,3.100000"));
    }
}
