// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the classifier core can report. Callers (the
// CLI today, an HTTP layer tomorrow) branch on the variant, so
// kinds are never folded into one generic error.
//
// Two groups matter to callers:
//   - initialisation failures: fatal for one service instance
//   - per-request failures:    local to one predict call
//
// ErrorKind is the coarse four-way classification an outer
// transport maps to status codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::service_state::ServiceState;

/// Result alias used by the library layers.
pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    /// A required file (synset, image, dataset root) is absent.
    #[error("missing resource: '{}'", path.display())]
    MissingResource { path: PathBuf },

    /// A label file or class list with zero entries.
    #[error("label set at '{}' is empty", path.display())]
    EmptyLabelSet { path: PathBuf },

    #[error("label index {index} out of range for label set of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("input is empty")]
    EmptyInput,

    #[error("unsupported image format")]
    UnsupportedFormat(#[source] image::ImageError),

    #[error("unsupported ResNet depth {depth} (supported: 18, 34, 50, 101, 152)")]
    UnsupportedDepth { depth: usize },

    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Model output could not be read back from the backend.
    #[error("cannot read model output: {reason}")]
    TensorData { reason: String },

    /// Parameters could not be bound to the architecture.
    #[error("failed to load model from '{}': {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// The service is not in the `Ready` state. Retryable.
    #[error("inference service is not ready (state: {state})")]
    NotReady { state: ServiceState },

    #[error("cannot {action} while service is {state}")]
    InvalidTransition { action: &'static str, state: ServiceState },

    #[error("dataset error: {message}")]
    Dataset { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Writing the checkpoint or one of its side files failed.
    #[error("failed to persist '{}': {reason}", path.display())]
    Persist { path: PathBuf, reason: String },

    #[error("io")]
    Io(#[from] std::io::Error),
}

/// The four kinds an outer transport distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request payload could not be read as an image.
    InputDecode,
    /// Transforming or running the model on a decoded input failed.
    Prediction,
    /// The service is still loading or has been shut down.
    NotReady,
    /// Anything else: configuration, storage, bugs.
    Unexpected,
}

impl ClassifierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput | Self::UnsupportedFormat(_) => ErrorKind::InputDecode,
            Self::DimensionMismatch { .. }
            | Self::IndexOutOfRange { .. }
            | Self::TensorData { .. } => ErrorKind::Prediction,
            Self::NotReady { .. } => ErrorKind::NotReady,
            _ => ErrorKind::Unexpected,
        }
    }

    /// Only `NotReady` is worth retrying after a delay.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::NotReady
    }

    pub(crate) fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset { message: message.into() }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModelLoad { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persist { path: path.into(), reason: reason.to_string() }
    }
}
