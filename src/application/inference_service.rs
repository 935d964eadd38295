// ============================================================
// Layer 2 — Inference Service
// ============================================================
// Owns a loaded checkpoint and answers prediction requests.
//
//   Uninitialized ──initialize──► Loading ──► Ready ──close──► Closed
//                                    │
//                                    └──────► FailedInit (terminal)
//
// initialize/close take &mut self and predict takes &self, so a
// prediction can never overlap a state change. To share a Ready
// service across threads, wrap it in an Arc.
//
// Per-call execution runs on an ExecutionPool: `workers` replicas
// of the model, each behind a Mutex. Replicas share nothing that
// a forward pass mutates.
//
// Why replicas instead of one shared model?
//   Each slot owns a clone of the model, so concurrent requests
//   run their forward passes on separate copies. try_lock first
//   means a request only waits when every slot is busy.
//
// Why is FailedInit terminal?
//   A half-loaded directory (labels read, parameters missing)
//   is a deployment error. Retrying in place would hide it, so
//   the caller builds a new service once the files are fixed.
//
// Reference: Rust Book §16 (Shared-State Concurrency)

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, TryLockError,
    },
};

use burn::prelude::*;

use crate::data::{codec::ImageCodec, preprocessor::Preprocessor};
use crate::domain::{
    classification::Classifications,
    error::{ClassifierError, Result},
    labels::LabelSet,
    traits::Classifier,
};
use crate::infra::checkpoint::{CheckpointManager, ModelMetadata};
use crate::ml::{
    model::{build, InputShape, ResNet},
    translator::Translator,
    InferBackend,
};

pub use crate::domain::service_state::ServiceState;

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_dir:   PathBuf,
    pub model_name:  String,
    pub depth:       usize,
    pub image_shape: InputShape,
    /// Number of model replicas in the execution pool.
    pub workers:     usize,
}

impl InferenceConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir:   model_dir.into(),
            model_name:  "fruit-resnet18".to_string(),
            depth:       18,
            image_shape: InputShape::rgb(224, 224),
            workers:     1,
        }
    }

    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_shape = InputShape::rgb(height as usize, width as usize);
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

// ─── Execution Pool ───────────────────────────────────────────────────────────
struct ExecutionPool<B: Backend> {
    slots: Vec<Mutex<ResNet<B>>>,
    next:  AtomicUsize,
}

impl<B: Backend> ExecutionPool<B> {
    fn new(model: ResNet<B>, size: usize) -> Self {
        let mut slots: Vec<Mutex<ResNet<B>>> =
            (1..size.max(1)).map(|_| Mutex::new(model.clone())).collect();
        slots.push(Mutex::new(model));
        Self { slots, next: AtomicUsize::new(0) }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Run `f` on a free replica, or wait for the round-robin one.
    fn run<R>(&self, f: impl FnOnce(&ResNet<B>) -> R) -> R {
        let len   = self.slots.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % len;

        let free = (0..len).find_map(|offset| match self.slots[(start + offset) % len].try_lock() {
            Ok(guard)                         => Some(guard),
            Err(TryLockError::Poisoned(p))    => Some(p.into_inner()),
            Err(TryLockError::WouldBlock)     => None,
        });
        let guard = free.unwrap_or_else(|| {
            self.slots[start].lock().unwrap_or_else(PoisonError::into_inner)
        });
        f(&guard)
    }
}

// Everything a Ready service holds.
struct Loaded<B: Backend> {
    translator: Translator,
    pool:       ExecutionPool<B>,
    metadata:   Option<ModelMetadata>,
    device:     B::Device,
}

enum State<B: Backend> {
    Uninitialized,
    Loading,
    Ready(Box<Loaded<B>>),
    Closed,
    FailedInit(String),
}

impl<B: Backend> State<B> {
    fn tag(&self) -> ServiceState {
        match self {
            Self::Uninitialized => ServiceState::Uninitialized,
            Self::Loading       => ServiceState::Loading,
            Self::Ready(_)      => ServiceState::Ready,
            Self::Closed        => ServiceState::Closed,
            Self::FailedInit(_) => ServiceState::FailedInit,
        }
    }
}

// ─── InferenceService ─────────────────────────────────────────────────────────
pub struct InferenceService<B: Backend = InferBackend> {
    config: InferenceConfig,
    state:  State<B>,
}

impl<B: Backend> InferenceService<B> {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config, state: State::Uninitialized }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        self.state.tag()
    }

    /// Why initialisation failed, once in `FailedInit`.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            State::FailedInit(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn labels(&self) -> Option<&LabelSet> {
        self.loaded().ok().map(|l| l.translator.labels())
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.loaded().ok().and_then(|l| l.metadata.as_ref())
    }

    /// Load labels and parameters from the configured model directory.
    /// Only valid once, from `Uninitialized`.
    pub fn initialize(&mut self) -> Result<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(ClassifierError::InvalidTransition {
                action: "initialize",
                state:  self.state(),
            });
        }

        self.state = State::Loading;
        tracing::info!(
            "Loading model structure and parameters from '{}'",
            self.config.model_dir.display()
        );

        match load::<B>(&self.config) {
            Ok(loaded) => {
                tracing::info!(
                    "Inference service ready: {} classes, {} worker(s)",
                    loaded.translator.labels().len(),
                    loaded.pool.len()
                );
                self.state = State::Ready(Box::new(loaded));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Model initialisation failed: {}", e);
                self.state = State::FailedInit(e.to_string());
                Err(e)
            }
        }
    }

    pub fn predict(&self, bytes: &[u8]) -> Result<Classifications> {
        self.predict_named(bytes, "<bytes>")
    }

    /// Classify one encoded image. `filename` only appears in logs.
    pub fn predict_named(&self, bytes: &[u8], filename: &str) -> Result<Classifications> {
        let loaded = self.loaded()?;
        tracing::debug!("Prediction request '{}' ({} bytes)", filename, bytes.len());

        let image    = ImageCodec::decode(bytes)?;
        let prepared = loaded.translator.process_input(&image);
        let input    = prepared.to_tensor::<B>(&loaded.device);
        let logits   = loaded.pool.run(|model| model.forward(input));
        let result   = loaded.translator.process_output(logits)?;

        tracing::info!("Prediction for '{}': {}", filename, result);
        Ok(result)
    }

    /// Release the model replicas and labels. Safe to call repeatedly.
    pub fn close(&mut self) {
        if matches!(self.state, State::Closed) {
            tracing::debug!("Inference service already closed");
            return;
        }
        let previous = std::mem::replace(&mut self.state, State::Closed);
        drop(previous);
        tracing::info!("Inference service closed");
    }

    fn loaded(&self) -> Result<&Loaded<B>> {
        match &self.state {
            State::Ready(loaded) => Ok(&**loaded),
            other => Err(ClassifierError::NotReady { state: other.tag() }),
        }
    }
}

impl<B: Backend> Classifier for InferenceService<B> {
    fn classify(&self, bytes: &[u8], filename: &str) -> Result<Classifications> {
        self.predict_named(bytes, filename)
    }

    fn is_ready(&self) -> bool {
        self.state() == ServiceState::Ready
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

fn check_metadata(meta: &ModelMetadata, config: &InferenceConfig, labels: &LabelSet, dir: &Path) -> Result<()> {
    meta.verify_labels(labels, dir)?;
    if meta.depth != config.depth {
        return Err(ClassifierError::model_load(dir, format!(
            "checkpoint is ResNet-{}, service is configured for ResNet-{}",
            meta.depth, config.depth
        )));
    }
    if meta.input_shape != config.image_shape {
        return Err(ClassifierError::model_load(dir, format!(
            "checkpoint was trained on {:?}, service is configured for {:?}",
            meta.input_shape, config.image_shape
        )));
    }
    Ok(())
}

fn load<B: Backend>(config: &InferenceConfig) -> Result<Loaded<B>> {
    let ckpt = CheckpointManager::new(&config.model_dir);

    let labels = ckpt.load_labels()?;
    tracing::info!("Synset loaded: {} classes", labels.len());

    let metadata = ckpt.load_metadata()?;
    match &metadata {
        Some(meta) => check_metadata(meta, config, &labels, ckpt.dir())?,
        None => tracing::warn!(
            "No metadata in '{}'; label order cannot be verified",
            ckpt.dir().display()
        ),
    }

    let device = B::Device::default();
    let model  = build::<B>(config.image_shape, config.depth, labels.len(), &device)?;
    let stem   = ckpt.locate_params(&config.model_name, metadata.as_ref())?;
    let model  = ckpt.load_model(model, &stem, &device)?;

    let shape        = config.image_shape;
    let preprocessor = Preprocessor::new(shape.width as u32, shape.height as u32);
    let translator   = Translator::new(preprocessor, Arc::new(labels));

    Ok(Loaded {
        translator,
        pool: ExecutionPool::new(model, config.workers),
        metadata,
        device,
    })
}
