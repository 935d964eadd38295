// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Burn-specific code lives here and in the data batcher:
//
//   model.rs      — ResNet v1 (18/34/50/101/152) built from
//                   Burn's Conv2d / BatchNorm / Linear blocks
//
//   translator.rs — softmax postprocessing and the
//                   preprocess/postprocess pair used per request
//
//   trainer.rs    — epoch loop: forward, cross-entropy,
//                   backward, Adam step, validation
//
// Backends: ndarray on the CPU by default, wgpu with the
// `wgpu` cargo feature. Training wraps the inference backend
// in Autodiff.

/// ResNet architecture
pub mod model;

/// Pre/postprocessing around one forward pass
pub mod translator;

/// Full training loop with validation
pub mod trainer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
