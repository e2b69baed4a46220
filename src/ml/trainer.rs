// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   for epoch in 1..=epochs
//     train_epoch   Autodiff backend, teacher forcing per batch,
//                   cross-entropy → backward → (clip) → Adam step
//                   at the scheduled learning rate
//     evaluate      model.valid() on the inner backend, teacher
//                   forcing off, loss / ppl / corpus BLEU
//     track best    loss ↓  ppl ↓  BLEU ↑, each with its epoch
//     checkpoint    weights every epoch, best-BLEU pointer
//     samples       random greedy translations; with viz_attn also
//                   the attention of fixed quartile samples
//
// All run state (config, metric sink, RNG, global step) lives in
// one TrainContext that is created once per run and passed down
// explicitly.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{TranslationBatch, TranslationBatcher},
    dataset::{TranslationDataset, TranslationSample},
};
use crate::domain::{
    bleu::Bleu,
    lengths::sequence_lengths,
    tracking::{AverageMeter, Best, BestTracker},
    vocab::{Vocab, EOS_IDX},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    criterion::sequence_cross_entropy,
    scheduler::{training_schedule, LrSchedule},
    seq2seq::{DecodeMode, Seq2Seq, Seq2SeqConfig},
    translator::{greedy_translate, greedy_translate_with_attention, quartile_indices},
};

// ─── Run context ──────────────────────────────────────────────────────────────
pub struct TrainContext {
    pub config:  TrainConfig,
    pub metrics: MetricsLogger,
    pub rng:     StdRng,
    /// Optimizer steps taken so far, across epochs
    pub step:    usize,
}

impl TrainContext {
    pub fn new(config: TrainConfig, metrics: MetricsLogger) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, metrics, rng, step: 0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpochStats {
    pub loss: f64,
    pub ppl:  f64,
}

#[derive(Debug, Clone, Copy)]
pub struct EvalStats {
    pub loss: f64,
    pub ppl:  f64,
    pub bleu: f64,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub best_loss: Option<Best>,
    pub best_ppl:  Option<Best>,
    pub best_bleu: Option<Best>,
}

/// Target ids without their leading <sos>, aligned with decoder outputs.
fn shifted_targets<B: Backend>(batch: &TranslationBatch<B>) -> Tensor<B, 2, Int> {
    let [_, width] = batch.tgt.dims();
    batch.tgt.clone().narrow(1, 1, width.saturating_sub(1))
}

// ─── One training epoch ───────────────────────────────────────────────────────
pub fn train_epoch<B, O, I>(
    mut model: Seq2Seq<B>,
    optim:     &mut O,
    batches:   I,
    schedule:  &dyn LrSchedule,
    ctx:       &mut TrainContext,
) -> Result<(Seq2Seq<B>, EpochStats)>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
    I: IntoIterator<Item = TranslationBatch<B>>,
{
    let mut losses = AverageMeter::new();
    let mut ppls   = AverageMeter::new();

    for batch in batches {
        let n    = batch.batch_size();
        let mode = DecodeMode::resolve(
            ctx.config.teacher_forcing,
            &mut ctx.rng,
            Some(batch.tgt_lens.as_slice()),
            ctx.config.max_len,
        );

        let output = model.forward_batch(&batch, mode)?;
        let crit   = sequence_cross_entropy(output.logits, shifted_targets(&batch))?;
        let loss   = crit.loss.clone().into_scalar().elem::<f64>();

        // Backward pass + Adam update (clipping is configured on the optimizer)
        let lr    = schedule.lr_at(ctx.step);
        let grads = crit.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model     = optim.step(lr, model, grads);

        losses.update(loss, n);
        ppls.update(crit.perplexity, n);

        ctx.metrics.scalar("train/loss", ctx.step, loss)?;
        ctx.metrics.scalar("train/ppl",  ctx.step, crit.perplexity)?;
        ctx.metrics.scalar("train/lr",   ctx.step, lr)?;
        ctx.step += 1;
    }

    tracing::debug!("Trained on {} sentences", losses.count());
    Ok((model, EpochStats { loss: losses.avg(), ppl: ppls.avg() }))
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
/// Loss, perplexity and corpus BLEU with teacher forcing off.
/// Meters and the BLEU accumulator are fresh on every call.
pub fn evaluate<B, I>(model: &Seq2Seq<B>, batches: I, max_len: usize) -> Result<EvalStats>
where
    B: Backend,
    I: IntoIterator<Item = TranslationBatch<B>>,
{
    let mut losses = AverageMeter::new();
    let mut ppls   = AverageMeter::new();
    let mut bleu   = Bleu::default();
    let mut tokens = 0;

    for batch in batches {
        let n      = batch.batch_size();
        let mode   = DecodeMode::autoregressive(Some(batch.tgt_lens.as_slice()), max_len);
        let output = model.forward_batch(&batch, mode)?;
        let preds  = output.predictions();

        let crit = sequence_cross_entropy(output.logits, shifted_targets(&batch))?;
        tokens += crit.n_tokens;
        losses.update(crit.loss.into_scalar().elem::<f64>(), n);
        ppls.update(crit.perplexity, n);

        let pred_lens = sequence_lengths(&preds, EOS_IDX, max_len);
        for ((pred, pred_len), (reference, &tgt_len)) in preds
            .iter()
            .zip(pred_lens)
            .zip(batch.tgt_ids.iter().zip(&batch.tgt_lens))
        {
            // Reference without <sos> and <eos>
            let reference = reference.get(1..tgt_len.saturating_sub(1)).unwrap_or(&[]);
            bleu.add_sentence(&pred[..pred_len.min(pred.len())], reference);
        }
    }

    tracing::debug!("Scored {} validation sentences ({} target tokens)", bleu.sentences(), tokens);
    Ok(EvalStats { loss: losses.avg(), ppl: ppls.avg(), bleu: bleu.score() })
}

/// Greedily translate a few random validation pairs and log them.
fn log_random_samples<B: Backend>(
    model:   &Seq2Seq<B>,
    samples: &[TranslationSample],
    vocabs:  (&Vocab, &Vocab),
    ctx:     &mut TrainContext,
    device:  &B::Device,
) -> Result<()> {
    let (src_vocab, tgt_vocab) = vocabs;
    for sample in samples.choose_multiple(&mut ctx.rng, ctx.config.eval_samples) {
        let pred = greedy_translate(model, &sample.src_ids, device)?;
        tracing::info!("  > {}", src_vocab.decode(&sample.src_ids).join(" "));
        tracing::info!("  = {}", tgt_vocab.decode(&sample.tgt_ids).join(" "));
        tracing::info!("  < {}", tgt_vocab.decode(&pred).join(" "));
    }
    Ok(())
}

/// Log source, reference and prediction of the fixed quartile samples,
/// then one line of attention weights per predicted word.
fn log_attention_samples<B: Backend>(
    model:   &Seq2Seq<B>,
    samples: &[TranslationSample],
    vocabs:  (&Vocab, &Vocab),
    device:  &B::Device,
) -> Result<()> {
    let (src_vocab, tgt_vocab) = vocabs;
    for idx in quartile_indices(samples.len()) {
        let sample = &samples[idx];
        let (pred, rows) = greedy_translate_with_attention(model, &sample.src_ids, device)?;
        tracing::info!("  [{}] > {}", idx, src_vocab.decode(&sample.src_ids).join(" "));
        tracing::info!("  [{}] = {}", idx, tgt_vocab.decode(&sample.tgt_ids).join(" "));
        for (word, row) in tgt_vocab.decode(&pred).iter().zip(&rows) {
            let weights: Vec<String> = row.iter().map(|w| format!("{w:.2}")).collect();
            tracing::info!("  [{}] < {:>12} | {}", idx, word, weights.join(" "));
        }
    }
    Ok(())
}

// ─── Full run ─────────────────────────────────────────────────────────────────
pub fn run_training<B: AutodiffBackend>(
    ctx:           &mut TrainContext,
    model_cfg:     &Seq2SeqConfig,
    train_samples: Vec<TranslationSample>,
    valid_samples: Vec<TranslationSample>,
    vocabs:        (&Vocab, &Vocab),
    ckpt:          &CheckpointManager,
    device:        &B::Device,
) -> Result<TrainSummary> {
    let cfg = ctx.config.clone();
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Seq2Seq<B> = model_cfg.init(device);
    tracing::info!(
        "Model ready: {} params, enc_layers={} (bidirect={}), dec_layers={}, attention={}",
        model.num_params(), cfg.enc_layers, cfg.enc_bidirect, cfg.dec_layers, cfg.attention,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let clipping  = (cfg.grad_clip > 0.0).then(|| GradientClippingConfig::Norm(cfg.grad_clip as f32));
    let mut optim = AdamConfig::new().with_grad_clipping(clipping).init();

    // ── Learning-rate schedule ────────────────────────────────────────────────
    let steps_per_epoch = train_samples.len().div_ceil(cfg.batch_size.max(1)).max(1);
    let schedule = training_schedule(
        cfg.lr,
        cfg.min_lr,
        steps_per_epoch * cfg.epochs,
        steps_per_epoch * cfg.warmup_epochs,
    );

    // ── Data loaders ──────────────────────────────────────────────────────────
    // Training batches live on the autodiff backend, validation batches on
    // the inner backend that model.valid() runs on.
    let train_loader = DataLoaderBuilder::new(TranslationBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(TranslationDataset::new(train_samples));

    let valid_loader = DataLoaderBuilder::new(TranslationBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(TranslationDataset::new(valid_samples.clone()));

    let mut best_loss = BestTracker::min();
    let mut best_ppl  = BestTracker::min();
    let mut best_bleu = BestTracker::max();

    tracing::info!(
        "Metrics: {} (epochs), {} (steps)",
        ctx.metrics.epoch_csv().display(), ctx.metrics.scalar_csv().display(),
    );
    if cfg.viz_attn {
        tracing::info!("Attention before training:");
        log_attention_samples(&model.valid(), &valid_samples, vocabs, device)?;
    }

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        tracing::info!("Epoch {}/{}, LR = {:.3e}", epoch, cfg.epochs, schedule.lr_at(ctx.step));

        let (trained, train) = train_epoch(model, &mut optim, train_loader.iter(), schedule.as_ref(), ctx)?;
        model = trained;
        tracing::info!("\ttrain: Loss {:7.3}  PPL {:7.3}", train.loss, train.ppl);

        let model_valid = model.valid();
        let valid = evaluate(&model_valid, valid_loader.iter(), cfg.max_len)?;
        tracing::info!(
            "\tvalid: Loss {:7.3}  PPL {:7.3}  BLEU {:7.3}",
            valid.loss, valid.ppl, valid.bleu
        );

        ctx.metrics.scalar("val/loss", ctx.step, valid.loss)?;
        ctx.metrics.scalar("val/ppl",  ctx.step, valid.ppl)?;
        ctx.metrics.scalar("val/bleu", ctx.step, valid.bleu)?;
        ctx.metrics.log_epoch(&EpochMetrics {
            epoch,
            train_loss: train.loss,
            train_ppl:  train.ppl,
            val_loss:   valid.loss,
            val_ppl:    valid.ppl,
            val_bleu:   valid.bleu,
            lr:         schedule.lr_at(ctx.step),
        })?;

        best_loss.check(valid.loss, epoch);
        best_ppl.check(valid.ppl, epoch);

        ckpt.save_model(&model, epoch)?;
        if best_bleu.check(valid.bleu, epoch) {
            ckpt.save_best_epoch(epoch)?;
        }

        if ctx.config.eval_samples > 0 {
            tracing::info!("Random eval:");
            log_random_samples(&model_valid, &valid_samples, vocabs, ctx, device)?;
        }
        if cfg.viz_attn {
            tracing::info!("Attention after epoch {}:", epoch);
            log_attention_samples(&model_valid, &valid_samples, vocabs, device)?;
        }
    }

    let summary = TrainSummary {
        best_loss: best_loss.best(),
        best_ppl:  best_ppl.best(),
        best_bleu: best_bleu.best(),
    };
    tracing::info!("Best: {}", describe_best(&summary));
    Ok(summary)
}

fn describe_best(s: &TrainSummary) -> String {
    let fmt = |name: &str, b: Option<Best>| match b {
        Some(b) => format!("{name} {:7.3} ({})", b.value, b.epoch),
        None => format!("{name}     n/a"),
    };
    format!("{}  {}  {}", fmt("Loss", s.best_loss), fmt("PPL", s.best_ppl), fmt("BLEU", s.best_bleu))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataloader::batcher::Batcher;

    type TestBackend = burn::backend::NdArray;
    type TestAutodiff = burn::backend::Autodiff<TestBackend>;

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            batch_size:    2,
            epochs:        2,
            emb_dim:       8,
            h_dim:         8,
            enc_layers:    1,
            dec_layers:    1,
            max_len:       4,
            dropout:       0.0,
            warmup_epochs: 1,
            eval_samples:  1,
            ..TrainConfig::default()
        }
    }

    fn samples() -> Vec<TranslationSample> {
        vec![
            TranslationSample { src_ids: vec![2, 4, 5, 3],    tgt_ids: vec![2, 6, 7, 3] },
            TranslationSample { src_ids: vec![2, 5, 3],       tgt_ids: vec![2, 7, 3] },
            TranslationSample { src_ids: vec![2, 4, 4, 5, 3], tgt_ids: vec![2, 6, 6, 7, 3] },
            TranslationSample { src_ids: vec![2, 4, 3],       tgt_ids: vec![2, 6, 3] },
        ]
    }

    fn vocab(words: &[&str]) -> Vocab {
        let sentence: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        Vocab::build(&[sentence], 1)
    }

    #[test]
    fn test_evaluate_reports_finite_metrics() {
        let device = Default::default();
        let cfg    = tiny_config();
        let model  = cfg.model_config(8, 8).init::<TestBackend>(&device);
        let batch  = TranslationBatcher::<TestBackend>::new(device).batch(samples());

        let stats = evaluate(&model, vec![batch], cfg.max_len).unwrap();
        assert!(stats.loss.is_finite() && stats.loss >= 0.0);
        assert!(stats.ppl >= 1.0);
        assert!((0.0..=100.0).contains(&stats.bleu));
    }

    #[test]
    fn test_evaluate_is_independent_across_calls() {
        let device = Default::default();
        let cfg    = tiny_config();
        let model  = cfg.model_config(8, 8).init::<TestBackend>(&device);
        let batch  = TranslationBatcher::<TestBackend>::new(device).batch(samples());

        let first  = evaluate(&model, vec![batch.clone()], cfg.max_len).unwrap();
        let second = evaluate(&model, vec![batch], cfg.max_len).unwrap();
        assert_eq!(first.loss, second.loss);
        assert_eq!(first.ppl,  second.ppl);
        assert_eq!(first.bleu, second.bleu);
    }

    #[test]
    fn test_evaluate_rejects_missing_target_lengths() {
        let device = Default::default();
        let cfg    = tiny_config();
        let model  = cfg.model_config(8, 8).init::<TestBackend>(&device);

        let mut batch = TranslationBatcher::<TestBackend>::new(device).batch(samples()[..2].to_vec());
        batch.tgt_lens.truncate(1);
        assert!(evaluate(&model, vec![batch], cfg.max_len).is_err());
    }

    #[test]
    fn test_train_epoch_advances_steps_and_logs() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let cfg     = tiny_config();
        let mut ctx = TrainContext::new(cfg.clone(), MetricsLogger::new(dir.path()).unwrap());

        let model     = cfg.model_config(8, 8).init::<TestAutodiff>(&device);
        let mut optim = AdamConfig::new().init();
        let batcher   = TranslationBatcher::<TestAutodiff>::new(device);
        let batches   = samples().chunks(2).map(|c| batcher.batch(c.to_vec())).collect::<Vec<_>>();
        let schedule  = training_schedule(cfg.lr, cfg.min_lr, 4, 0);

        let (_, stats) = train_epoch(model, &mut optim, batches, schedule.as_ref(), &mut ctx).unwrap();
        assert_eq!(ctx.step, 2);
        assert!(stats.loss.is_finite() && stats.loss >= 0.0);
        assert!(stats.ppl >= 1.0);

        let scalars = std::fs::read_to_string(ctx.metrics.scalar_csv()).unwrap();
        // header + 3 series × 2 steps
        assert_eq!(scalars.lines().count(), 7);
    }

    #[test]
    fn test_training_reduces_loss_on_repeated_batch() {
        let dir     = tempfile::tempdir().unwrap();
        let device  = Default::default();
        let cfg     = TrainConfig { teacher_forcing: 1.0, lr: 1e-2, ..tiny_config() };
        let mut ctx = TrainContext::new(cfg.clone(), MetricsLogger::new(dir.path()).unwrap());

        let mut model = cfg.model_config(8, 8).init::<TestAutodiff>(&device);
        let mut optim = AdamConfig::new().init();
        let batcher   = TranslationBatcher::<TestAutodiff>::new(device);
        let schedule  = training_schedule(cfg.lr, cfg.lr, 100, 0);

        let mut first = None;
        let mut last  = 0.0;
        for _ in 0..30 {
            let batch = batcher.batch(samples());
            let (m, stats) = train_epoch(model, &mut optim, vec![batch], schedule.as_ref(), &mut ctx).unwrap();
            model = m;
            first.get_or_insert(stats.loss);
            last = stats.loss;
        }
        assert!(last < first.unwrap(), "loss did not decrease: {first:?} → {last}");
    }

    #[test]
    fn test_run_training_end_to_end() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = TrainConfig { viz_attn: true, ..tiny_config() };
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let mut ctx = TrainContext::new(cfg.clone(), MetricsLogger::new(dir.path()).unwrap());

        let src = vocab(&["a", "b", "c", "d"]);
        let tgt = vocab(&["w", "x", "y", "z"]);
        let summary = run_training::<TestAutodiff>(
            &mut ctx,
            &cfg.model_config(8, 8),
            samples(),
            samples(),
            (&src, &tgt),
            &ckpt,
            &device,
        )
        .unwrap();

        assert!(summary.best_loss.is_some());
        assert!(summary.best_ppl.is_some());
        assert!(summary.best_bleu.is_some());
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);
        assert_eq!(ctx.step, 4);

        let rows = std::fs::read_to_string(ctx.metrics.epoch_csv()).unwrap();
        assert_eq!(rows.lines().count(), 3);
    }
}
