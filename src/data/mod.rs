// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files/bytes on one side and tensor
// batches on the other:
//
//   encoded bytes / image files
//       │
//       ▼
//   ImageCodec        → DynamicImage
//       │
//       ▼
//   Preprocessor      → PreparedTensor (3, H, W) in [0, 1]
//       │
//       ├──► Translator (inference, one image per call)
//       │
//       ▼
//   ImageFolder       → labelled file list + LabelSet (training)
//       │
//       ▼
//   split_train_val   → seeded 80/20 split
//       │
//       ▼
//   ImageDataset      → Burn Dataset, decodes lazily
//       │
//       ▼
//   ImageBatcher      → [N, 3, H, W] + [N] targets

/// Decodes JPEG/PNG/... bytes with the image crate
pub mod codec;

/// The resize + normalise transform shared by training and inference
pub mod preprocessor;

/// Folder-per-class dataset discovery
pub mod folder;

/// Implements Burn's Dataset trait for labelled images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
