// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `predict` and `inspect`.
// Defaults reproduce the reference training run: 5 epochs,
// batch size 32, 224x224 RGB, 80/20 split.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{inference_service::InferenceConfig, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a ResNet on a folder-per-class image dataset
    Train(TrainArgs),

    /// Classify one or more images with a trained model
    Predict(PredictArgs),

    /// Print the metadata of a trained model directory
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Root folder with one sub-directory per class
    #[arg(long, default_value = "dataset/fruits-custom")]
    pub dataset_dir: PathBuf,

    /// Where parameters, synset.txt and metadata are written
    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    /// Prefix of the parameter file name
    #[arg(long, default_value = "fruit-resnet18")]
    pub model_name: String,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// BatchNorm running-statistics momentum
    #[arg(long, default_value_t = 0.1)]
    pub bn_momentum: f64,

    /// ResNet depth: 18, 34, 50, 101 or 152
    #[arg(long, default_value_t = 18)]
    pub depth: usize,

    #[arg(long, default_value_t = 224)]
    pub width: u32,

    #[arg(long, default_value_t = 224)]
    pub height: u32,

    /// Fraction of samples used for training; the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed for the split and the batch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_dir:    a.dataset_dir,
            model_dir:      a.model_dir,
            model_name:     a.model_name,
            epochs:         a.epochs,
            batch_size:     a.batch_size,
            learning_rate:  a.lr,
            bn_momentum:    a.bn_momentum,
            depth:          a.depth,
            image_width:    a.width,
            image_height:   a.height,
            train_fraction: a.train_fraction,
            seed:           a.seed,
            num_workers:    a.workers,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image files to classify
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    #[arg(long, default_value = "fruit-resnet18")]
    pub model_name: String,

    #[arg(long, default_value_t = 18)]
    pub depth: usize,

    #[arg(long, default_value_t = 224)]
    pub width: u32,

    #[arg(long, default_value_t = 224)]
    pub height: u32,

    /// How many ranked classes to print per image
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    /// Model replicas in the execution pool
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}

impl From<&PredictArgs> for InferenceConfig {
    fn from(a: &PredictArgs) -> Self {
        InferenceConfig::new(&a.model_dir)
            .with_model_name(a.model_name.clone())
            .with_depth(a.depth)
            .with_image_size(a.width, a.height)
            .with_workers(a.workers)
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,
}
