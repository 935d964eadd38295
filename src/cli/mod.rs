// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and prints results. All work is
// delegated to Layer 2 (application).
//
//   1. `train`   — fit a model on a folder-per-class dataset
//   2. `predict` — classify image files with a saved model
//   3. `inspect` — show a saved model's metadata

pub mod commands;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, InspectArgs, PredictArgs, TrainArgs};

use crate::application::{
    inference_service::{InferenceConfig, InferenceService},
    train_use_case::TrainingPipeline,
};
use crate::infra::checkpoint::CheckpointManager;

#[derive(Parser, Debug)]
#[command(
    name = "fruit-classifier",
    version,
    about = "Train a ResNet image classifier, then classify images with the saved model."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(&args),
            Commands::Inspect(args) => run_inspect(&args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on images in: {}", args.dataset_dir.display());

    let report = TrainingPipeline::new(args.into())
        .run()
        .context("training failed")?;

    println!(
        "Training complete after {} epoch(s). Checkpoint: {}",
        report.summary.epochs, report.metadata.params_file
    );
    if let Some(acc) = report.metadata.validation_accuracy {
        println!("Validation accuracy: {:.2}%", acc * 100.0);
    }
    Ok(())
}

fn run_predict(args: &PredictArgs) -> Result<()> {
    let mut service: InferenceService = InferenceService::new(InferenceConfig::from(args));
    service
        .initialize()
        .with_context(|| format!("could not load model from '{}'", args.model_dir.display()))?;

    for path in &args.images {
        let bytes = fs::read(path)
            .with_context(|| format!("could not read '{}'", path.display()))?;
        let name   = path.display().to_string();
        let result = service
            .predict_named(&bytes, &name)
            .with_context(|| format!("prediction failed for '{name}'"))?;

        println!("\n{name}");
        for (rank, item) in result.top_k(args.top_k).iter().enumerate() {
            println!("  {:>2}. {:<24} {:.5}", rank + 1, item.label, item.probability);
        }
        println!("{}", result.to_json());
    }

    service.close();
    Ok(())
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let ckpt = CheckpointManager::new(&args.model_dir);
    let labels = ckpt
        .load_labels()
        .with_context(|| format!("no model in '{}'", args.model_dir.display()))?;

    match ckpt.load_metadata()? {
        Some(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
        None       => println!("(no metadata.json)"),
    }
    println!("Classes ({}): {}", labels.len(), labels.names().join(", "));
    Ok(())
}
