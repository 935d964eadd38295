// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer: the class
// vocabulary, the prediction result, the error taxonomy, and
// the Classifier trait. No Burn types and no model code here.

/// Ordered class names (synset.txt)
pub mod labels;

/// Per-class probabilities returned by a prediction
pub mod classification;

/// Lifecycle tag of the inference service
pub mod service_state;

/// ClassifierError and its coarse ErrorKind
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;
