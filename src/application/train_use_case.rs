// ============================================================
// Layer 2 — Training Pipeline
// ============================================================
// Orchestrates one offline training run, in order:
//
//   Step 1: Scan the folder-per-class dataset   (Layer 4 - data)
//   Step 2: Seeded train/validation split       (Layer 4 - data)
//   Step 3: Build Burn datasets                 (Layer 4 - data)
//   Step 4: Build a fresh ResNet                (Layer 5 - ml)
//   Step 5: Save config, open metrics CSV       (Layer 6 - infra)
//   Step 6: Run the epoch loop                  (Layer 5 - ml)
//   Step 7: Persist params, metadata, synset    (Layer 6 - infra)
//
// Only Step 7 writes the checkpoint. A run stopped before it
// completes leaves no parameters behind.

use std::path::PathBuf;

use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::ImageDataset,
    folder::ImageFolder,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::error::{ClassifierError, Result};
use crate::infra::{
    checkpoint::{CheckpointManager, ModelMetadata, CONFIG_FILE},
    metrics::MetricsLogger,
};
use crate::ml::{
    model::{is_supported_depth, InputShape, ResNetConfig},
    trainer::{run_training, TrainingSummary},
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Written to
// train_config.json next to the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_dir:    PathBuf,
    pub model_dir:      PathBuf,
    pub model_name:     String,
    pub epochs:         usize,
    pub batch_size:     usize,
    pub learning_rate:  f64,
    /// BatchNorm running-statistics momentum.
    #[serde(default = "default_bn_momentum")]
    pub bn_momentum:    f64,
    pub depth:          usize,
    pub image_width:    u32,
    pub image_height:   u32,
    pub train_fraction: f64,
    pub seed:           u64,
    pub num_workers:    usize,
}

fn default_bn_momentum() -> f64 {
    0.1
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_dir:    PathBuf::from("dataset/fruits-custom"),
            model_dir:      PathBuf::from("model"),
            model_name:     "fruit-resnet18".to_string(),
            epochs:         5,
            batch_size:     32,
            learning_rate:  1e-3,
            bn_momentum:    default_bn_momentum(),
            depth:          18,
            image_width:    224,
            image_height:   224,
            train_fraction: 0.8,
            seed:           42,
            num_workers:    1,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_supported_depth(self.depth) {
            return Err(ClassifierError::UnsupportedDepth { depth: self.depth });
        }
        if self.epochs == 0 {
            return Err(ClassifierError::invalid_config("epochs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(ClassifierError::invalid_config("batch size must be at least 1"));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ClassifierError::invalid_config("image size must be non-zero"));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(ClassifierError::invalid_config("train fraction must be in (0, 1]"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ClassifierError::invalid_config("learning rate must be positive"));
        }
        if !(self.bn_momentum > 0.0 && self.bn_momentum <= 1.0) {
            return Err(ClassifierError::invalid_config("batch-norm momentum must be in (0, 1]"));
        }
        if self.model_name.is_empty() {
            return Err(ClassifierError::invalid_config("model name must not be empty"));
        }
        Ok(())
    }

    pub fn input_shape(&self) -> InputShape {
        InputShape::rgb(self.image_height as usize, self.image_width as usize)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub metadata: ModelMetadata,
    pub summary:  TrainingSummary,
}

// ─── TrainingPipeline ─────────────────────────────────────────────────────────
pub struct TrainingPipeline {
    config: TrainConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the default training backend.
    pub fn run(&self) -> Result<TrainingReport> {
        self.run_on::<TrainBackend>(Default::default())
    }

    pub fn run_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainingReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Scan dataset ──────────────────────────────────────────────
        tracing::info!("Starting dataset preparation from '{}'", cfg.dataset_dir.display());
        let (labels, entries) = ImageFolder::scan(&cfg.dataset_dir)?.into_parts();
        tracing::info!("Number of classes: {}", labels.len());

        // ── Step 2: Train / validation split ──────────────────────────────────
        let (train_entries, val_entries) = split_train_val(entries, cfg.train_fraction, cfg.seed);
        if train_entries.is_empty() {
            return Err(ClassifierError::dataset("training split is empty"));
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_entries.len(),
            val_entries.len()
        );

        // ── Step 3: Build Burn datasets ───────────────────────────────────────
        // Same Preprocessor type the inference service uses.
        let preprocessor  = Preprocessor::new(cfg.image_width, cfg.image_height);
        let train_dataset = ImageDataset::new(train_entries, preprocessor);
        let val_dataset   = ImageDataset::new(val_entries, preprocessor);

        // ── Step 4: Fresh model ───────────────────────────────────────────────
        let input_shape = cfg.input_shape();
        let model = ResNetConfig::from_shape(input_shape, cfg.depth, labels.len())
            .with_bn_momentum(cfg.bn_momentum)
            .init::<B>(&device)?;
        tracing::info!(
            "Model ready: ResNet-{} for {} classes, input {:?}",
            cfg.depth, labels.len(), input_shape
        );

        // ── Step 5: Config + metrics ──────────────────────────────────────────
        let ckpt    = CheckpointManager::new(&cfg.model_dir);
        ckpt.save_json(CONFIG_FILE, cfg)?;
        let metrics = MetricsLogger::create(ckpt.dir())?;

        // ── Step 6: Epoch loop ────────────────────────────────────────────────
        let (trained, summary) =
            run_training::<B>(cfg, model, train_dataset, val_dataset, &metrics, device)?;

        // ── Step 7: Persist ───────────────────────────────────────────────────
        let params_file = CheckpointManager::params_stem(&cfg.model_name, summary.epochs);
        let metadata = ModelMetadata {
            model_name:          cfg.model_name.clone(),
            params_file:         params_file.clone(),
            depth:               cfg.depth,
            input_shape,
            num_classes:         labels.len(),
            epochs:              summary.epochs,
            validation_accuracy: summary.val_accuracy,
            validation_loss:     summary.val_loss,
            label_fingerprint:   labels.fingerprint(),
        };

        tracing::info!(
            "Final validation accuracy: {}",
            summary.val_accuracy.map(|v| format!("{v:.5}")).unwrap_or_else(|| "N/A".into())
        );
        tracing::info!(
            "Final validation loss: {}",
            summary.val_loss.map(|v| format!("{v:.5}")).unwrap_or_else(|| "N/A".into())
        );

        ckpt.save_model(&trained, &params_file)?;
        ckpt.save_metadata(&metadata)?;
        ckpt.save_labels(&labels)?;
        tracing::info!("Model and synset saved to '{}'", ckpt.dir().display());

        Ok(TrainingReport { metadata, summary })
    }
}
