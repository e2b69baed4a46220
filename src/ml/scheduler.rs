//! Learning-rate schedules.
//!
//! Burn's optimizers take the learning rate as an argument on
//! every `step`, so a schedule is just a pure function from the
//! global step to a rate.

use std::f64::consts::PI;

pub trait LrSchedule {
    fn lr_at(&self, step: usize) -> f64;
}

/// Cosine annealing from `base_lr` down to `min_lr` over `t_max` steps,
/// then held at `min_lr`.
///
/// ```text
/// lr = min_lr + 0.5 · (base_lr − min_lr) · (1 + cos(π · step / t_max))
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CosineAnnealing {
    pub base_lr: f64,
    pub min_lr:  f64,
    pub t_max:   usize,
}

impl CosineAnnealing {
    pub fn new(base_lr: f64, min_lr: f64, t_max: usize) -> Self {
        Self { base_lr, min_lr, t_max: t_max.max(1) }
    }
}

impl LrSchedule for CosineAnnealing {
    fn lr_at(&self, step: usize) -> f64 {
        let progress = step.min(self.t_max) as f64 / self.t_max as f64;
        self.min_lr + 0.5 * (self.base_lr - self.min_lr) * (1.0 + (PI * progress).cos())
    }
}

/// Linear warmup from `base_lr · init_scale` to `base_lr` over
/// `warmup_steps`, then hands over to `after` counting from zero.
#[derive(Debug, Clone, Copy)]
pub struct Warmup<S> {
    pub base_lr:      f64,
    pub init_scale:   f64,
    pub warmup_steps: usize,
    pub after:        S,
}

impl<S: LrSchedule> Warmup<S> {
    pub fn new(base_lr: f64, init_scale: f64, warmup_steps: usize, after: S) -> Self {
        Self { base_lr, init_scale, warmup_steps, after }
    }
}

impl<S: LrSchedule> LrSchedule for Warmup<S> {
    fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            let frac = step as f64 / self.warmup_steps as f64;
            self.base_lr * (self.init_scale + (1.0 - self.init_scale) * frac)
        } else {
            self.after.lr_at(step - self.warmup_steps)
        }
    }
}

/// Schedule used by training: cosine annealing over the whole run,
/// optionally preceded by a warmup of `warmup_steps`.
pub fn training_schedule(
    base_lr:      f64,
    min_lr:       f64,
    total_steps:  usize,
    warmup_steps: usize,
) -> Box<dyn LrSchedule> {
    let cosine = CosineAnnealing::new(base_lr, min_lr, total_steps);
    if warmup_steps > 0 {
        Box::new(Warmup::new(base_lr, 1e-3, warmup_steps, cosine))
    } else {
        Box::new(cosine)
    }
}
