// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by training and inference:
//
//   checkpoint.rs — the model directory contract: parameters
//                   (Burn CompactRecorder), synset.txt,
//                   metadata.json, train_config.json
//
//   metrics.rs    — per-epoch loss/accuracy rows in metrics.csv

/// Model directory layout: parameters, labels, metadata
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
