// ============================================================
// fruit-classifier
// ============================================================
// Layers, outermost first:
//
//   cli         — clap commands (train / predict / inspect)
//   application — TrainingPipeline and InferenceService
//   domain      — labels, classification results, errors, traits
//   data        — image codec, preprocessing, dataset folder, batching
//   ml          — ResNet, translator, training loop (Burn)
//   infra       — checkpoint directory and metrics CSV

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
