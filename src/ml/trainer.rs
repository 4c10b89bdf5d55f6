// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - training runs on Autodiff<backend>, so gradients exist
//   - model.valid() strips autodiff and disables dropout for
//     the validation pass, which runs on the inner backend
//   - argmax(1) returns [batch, 1]; it is flattened to [batch]
//     before comparing with the targets
//
// Every epoch writes a checkpoint (model + optimizer +
// checkpoint.json). When the selection loss improves the
// weights are also saved as best_model. With `resume` the loop
// continues from the last checkpoint; without a checkpoint it
// starts from scratch.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{PointCloudBatch, PointCloudBatcher},
    dataset::ShapeDataset,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::backend::{BackendKind, NdArrayTrainBackend, WgpuTrainBackend};
use crate::ml::model::{PointCloudClassifier, PointCloudClassifierConfig};

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Epochs executed by this invocation (0 when a resumed run was already done)
    pub epochs_run:    usize,
    /// Last completed epoch overall
    pub last_epoch:    usize,
    pub best_val_loss: Option<f64>,
    pub best_epoch:    Option<usize>,
    pub stopped_early: bool,
}

/// Loss and accuracy over one pass of a data loader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Mean per-batch cross-entropy (NaN when there were no batches)
    pub loss:     f64,
    /// Fraction of samples whose argmax matches the target
    pub accuracy: f64,
    pub samples:  usize,
}

/// Entry point for training: picks the backend named in `cfg` and
/// runs [`train_loop`] on it.
pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: ShapeDataset,
    val_dataset:   ShapeDataset,
    num_classes:   usize,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainingSummary> {
    match cfg.backend {
        BackendKind::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<WgpuTrainBackend>(cfg, train_dataset, val_dataset, num_classes, ckpt_manager, device)
        }
        BackendKind::NdArray => {
            let device = burn::backend::ndarray::NdArrayDevice::Cpu;
            tracing::info!("Using NdArray CPU backend");
            train_loop::<NdArrayTrainBackend>(cfg, train_dataset, val_dataset, num_classes, ckpt_manager, device)
        }
    }
}

/// Correct predictions in a batch.
fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Evaluate a model (no gradients) over every batch of a loader.
pub fn evaluate_model<B: Backend>(
    model:  &PointCloudClassifier<B>,
    loader: &dyn DataLoader<PointCloudBatch<B>>,
) -> EvalMetrics {
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut correct  = 0usize;
    let mut samples  = 0usize;

    for batch in loader.iter() {
        samples += batch.targets.dims()[0];
        let (loss, logits) = model.forward_loss(batch.points, batch.targets.clone());
        loss_sum += loss.into_scalar().elem::<f64>();
        batches  += 1;
        correct  += count_correct(logits, batch.targets);
    }

    EvalMetrics {
        loss:     if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
        accuracy: if samples > 0 { correct as f64 / samples as f64 } else { 0.0 },
        samples,
    }
}

/// Train for `cfg.epochs` epochs (or until `cfg.patience` runs out),
/// saving a checkpoint after every epoch and the best model whenever
/// the selection loss improves. With `cfg.resume` the model, optimizer
/// and counters continue from the last checkpoint in `ckpt_manager`.
pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: ShapeDataset,
    val_dataset:   ShapeDataset,
    num_classes:   usize,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainingSummary> {
    if num_classes == 0 {
        bail!("Cannot train a classifier with zero classes");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = PointCloudClassifierConfig::new(cfg.num_points, num_classes, cfg.hidden_sizes.clone())
        .with_dropout(cfg.dropout);
    let mut model: PointCloudClassifier<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: input={} hidden={:?} classes={} params={}",
        model_cfg.input_dim(),
        cfg.hidden_sizes,
        num_classes,
        model.num_params(),
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    if cfg.weight_decay > 0.0 {
        optim_cfg = optim_cfg.with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as f32)));
    }
    let mut optim = optim_cfg.init::<B, PointCloudClassifier<B>>();

    // ── Resume ────────────────────────────────────────────────────────────────
    let mut start_epoch = 1usize;
    let mut best_val_loss: Option<f64> = None;
    let mut best_epoch: Option<usize> = None;

    if cfg.resume {
        match ckpt_manager.load_state()? {
            Some(state) => {
                model = ckpt_manager.load_model(model, &state, &device)?;
                optim = ckpt_manager.load_optimizer(optim, &state, &device)?;
                start_epoch   = state.epoch + 1;
                best_val_loss = state.best_val_loss;
                best_epoch    = state.best_epoch;
                tracing::info!(
                    "Resumed from epoch {} (best_val_loss={:?})",
                    state.epoch,
                    state.best_val_loss
                );
            }
            None => tracing::info!("Nothing to resume, starting from scratch"),
        }
    }

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(PointCloudBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    // validation runs on the inner backend, no autodiff overhead
    let val_loader = DataLoaderBuilder::new(PointCloudBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.dir())?;

    let mut epochs_without_improvement = best_epoch.map_or(0, |best| (start_epoch - 1).saturating_sub(best));
    let mut epochs_run    = 0usize;
    let mut last_epoch    = start_epoch - 1;
    let mut stopped_early = false;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in start_epoch..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut train_correct  = 0usize;
        let mut train_samples  = 0usize;

        for batch in train_loader.iter() {
            train_samples += batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.points, batch.targets.clone());

            train_loss_sum += loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            train_correct  += count_correct(logits, batch.targets);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if train_batches > 0 { train_loss_sum / train_batches as f64 } else { f64::NAN };
        let train_acc  = if train_samples > 0 { train_correct as f64 / train_samples as f64 } else { 0.0 };

        // ── Validation phase ──────────────────────────────────────────────────
        let val = evaluate_model(&model.valid(), val_loader.as_ref());

        let metrics = EpochMetrics::new(epoch, train_loss, train_acc, val.loss, val.accuracy);
        metrics_logger.log(&metrics)?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.1}% | val_loss={:.4} | val_acc={:.1}%",
            epoch, cfg.epochs, train_loss, train_acc * 100.0, val.loss, val.accuracy * 100.0,
        );

        if metrics.is_improvement(best_val_loss) {
            best_val_loss = Some(metrics.selection_loss());
            best_epoch    = Some(epoch);
            epochs_without_improvement = 0;
            ckpt_manager.save_best(&model)?;
            tracing::info!("New best model at epoch {} (loss={:.4})", epoch, metrics.selection_loss());
        } else {
            epochs_without_improvement += 1;
        }

        ckpt_manager.save(epoch, &model, &optim, best_val_loss, best_epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        epochs_run += 1;
        last_epoch  = epoch;

        if cfg.patience.is_some_and(|p| epochs_without_improvement >= p) {
            tracing::info!(
                "No improvement for {} epochs, stopping early",
                epochs_without_improvement
            );
            stopped_early = true;
            break;
        }
    }

    tracing::info!("Training complete!");
    Ok(TrainingSummary { epochs_run, last_epoch, best_val_loss, best_epoch, stopped_early })
}
