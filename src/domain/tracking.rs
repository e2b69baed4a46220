// ============================================================
// Layer 3 — Metric Tracking
// ============================================================
// AverageMeter  — weighted running average over batches
// BestTracker   — best value seen so far and the epoch it came from
//
// Loss and perplexity improve downwards, BLEU improves upwards,
// so each tracker carries its own direction.

use serde::{Deserialize, Serialize};

/// Running average weighted by the number of samples per update.
#[derive(Debug, Clone, Default)]
pub struct AverageMeter {
    sum:   f64,
    count: usize,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64, n: usize) {
        self.sum   += value * n as f64;
        self.count += n;
    }

    /// Average so far, or NaN before the first update.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Best {
    pub value: f64,
    pub epoch: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestTracker {
    direction: Direction,
    best:      Option<Best>,
}

impl BestTracker {
    pub fn new(direction: Direction) -> Self {
        Self { direction, best: None }
    }

    pub fn min() -> Self {
        Self::new(Direction::Min)
    }

    pub fn max() -> Self {
        Self::new(Direction::Max)
    }

    /// Record `value` observed at `epoch`. Returns true when it is a new best.
    /// NaN never improves the tracker.
    pub fn check(&mut self, value: f64, epoch: usize) -> bool {
        if value.is_nan() {
            return false;
        }
        let improved = match self.best {
            None => true,
            Some(best) => match self.direction {
                Direction::Min => value < best.value,
                Direction::Max => value > best.value,
            },
        };
        if improved {
            self.best = Some(Best { value, epoch });
        }
        improved
    }

    pub fn best(&self) -> Option<Best> {
        self.best
    }
}
