// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop using Burn's DataLoader, cross-entropy, and Adam.
//
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend, so
//     validation (and BatchNorm) runs in inference mode
//   - argmax(1) returns [batch, 1]; flatten before .equal()
//
// Why count samples per epoch?
//   Burn's loader ends an epoch at the first index for which
//   Dataset::get returns None. A file that vanished after the
//   scan would silently shorten every epoch, so a short epoch
//   fails the run instead.
//
// Why no per-epoch checkpoint?
//   Parameters are persisted once, by the caller, after the
//   last epoch. Nothing but a metrics row is written per epoch.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::domain::error::{ClassifierError, Result};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::ResNet;

/// Metrics of the last completed epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs:         usize,
    pub train_loss:     f64,
    pub train_accuracy: f64,
    pub val_loss:       Option<f64>,
    pub val_accuracy:   Option<f64>,
}

/// Number of rows whose argmax equals the target class.
fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Fit `model` for `cfg.epochs` passes and return it on the inner backend.
pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    mut model:     ResNet<B>,
    train_dataset: ImageDataset,
    val_dataset:   ImageDataset,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<(ResNet<B::InnerBackend>, TrainingSummary)> {
    let train_size = train_dataset.sample_count();
    let val_size   = val_dataset.sample_count();

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend, no autodiff overhead) ───────────
    // Skipped entirely when the split left nothing to validate on.
    let val_loader = (val_size > 0).then(|| {
        DataLoaderBuilder::new(ImageBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .num_workers(cfg.num_workers)
            .build(val_dataset)
    });

    let train_loss_fn = CrossEntropyLossConfig::new().init::<B>(&device);
    let val_loss_fn   = CrossEntropyLossConfig::new().init::<B::InnerBackend>(&device);

    let mut summary = TrainingSummary {
        epochs:         0,
        train_loss:     f64::NAN,
        train_accuracy: 0.0,
        val_loss:       None,
        val_accuracy:   None,
    };
    let mut best_val_loss = f64::INFINITY;

    tracing::info!(
        "Training for {} epochs: {} train / {} validation samples, batch size {}",
        cfg.epochs, train_size, val_size, cfg.batch_size
    );

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for batch in train_loader.iter() {
            let n      = batch.targets.dims()[0];
            let logits = model.forward(batch.images);
            let loss   = train_loss_fn.forward(logits.clone(), batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>() * n as f64;
            correct  += count_correct(logits.detach(), batch.targets);
            seen     += n;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        // The loader stops at the first sample the dataset cannot produce.
        if seen != train_size {
            return Err(ClassifierError::dataset(format!(
                "epoch {epoch} visited {seen} of {train_size} training samples"
            )));
        }

        let train_loss     = if seen > 0 { loss_sum / seen as f64 } else { f64::NAN };
        let train_accuracy = if seen > 0 { correct as f64 / seen as f64 } else { 0.0 };
        if !train_loss.is_finite() {
            tracing::warn!("Epoch {}: training loss is {} (diverged?)", epoch, train_loss);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_correct  = 0usize;
        let mut val_seen     = 0usize;

        for batch in val_loader.iter().flat_map(|loader| loader.iter()) {
            let n      = batch.targets.dims()[0];
            let logits = model_valid.forward(batch.images);
            let loss   = val_loss_fn.forward(logits.clone(), batch.targets.clone());

            val_loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
            val_correct  += count_correct(logits, batch.targets);
            val_seen     += n;
        }

        let (val_loss, val_accuracy) = if val_seen > 0 {
            (Some(val_loss_sum / val_seen as f64), Some(val_correct as f64 / val_seen as f64))
        } else {
            (None, None)
        };

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.5} | train_acc={:.1}% | val_loss={} | val_acc={}",
            epoch,
            cfg.epochs,
            train_loss,
            train_accuracy * 100.0,
            val_loss.map(|v| format!("{v:.5}")).unwrap_or_else(|| "N/A".into()),
            val_accuracy.map(|v| format!("{:.1}%", v * 100.0)).unwrap_or_else(|| "N/A".into()),
        );

        let row = EpochMetrics { epoch, train_loss, train_accuracy, val_loss, val_accuracy };
        if row.is_improvement(best_val_loss) {
            best_val_loss = row.val_loss.unwrap_or(best_val_loss);
            tracing::debug!("Epoch {}: best validation loss so far", epoch);
        }
        metrics.log(&row)?;

        summary = TrainingSummary { epochs: epoch, train_loss, train_accuracy, val_loss, val_accuracy };
    }

    tracing::info!("Training complete!");
    Ok((model.valid(), summary))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_data(
            TensorData::new(vec![0.9f32, 0.1, 0.2, 0.8, 0.7, 0.3], [3, 2]),
            &device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(vec![0i64, 1, 1], [3]), &device);
        assert_eq!(count_correct(logits, targets), 2);
    }

    #[test]
    fn test_sample_lost_mid_epoch_fails_the_run() {
        use crate::data::{codec::tests::encoded, folder::ImageFolder, preprocessor::Preprocessor};
        use crate::ml::model::{build, InputShape};
        use image::ImageFormat;
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("dataset");
        fs::create_dir_all(data_dir.join("kiwi")).unwrap();
        for name in ["a.png", "b.png"] {
            fs::write(data_dir.join("kiwi").join(name), encoded([0, 200, 0], 8, 8, ImageFormat::Png)).unwrap();
        }
        let (_, entries) = ImageFolder::scan(&data_dir).unwrap().into_parts();
        fs::write(data_dir.join("kiwi/b.png"), b"replaced after the scan").unwrap();

        let cfg = TrainConfig { epochs: 1, batch_size: 1, num_workers: 1, ..TrainConfig::default() };
        let preprocessor = Preprocessor::new(8, 8);
        let device  = Default::default();
        let model   = build::<burn::backend::Autodiff<B>>(InputShape::rgb(8, 8), 18, 1, &device).unwrap();
        let metrics = MetricsLogger::create(&dir.path().join("model")).unwrap();

        let err = run_training(
            &cfg,
            model,
            ImageDataset::new(entries, preprocessor),
            ImageDataset::new(Vec::new(), preprocessor),
            &metrics,
            device,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::Dataset { .. }), "{err}");
    }
}
