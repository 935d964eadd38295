// ============================================================
// Layer 5 — Translator (pre/postprocessing pair)
// ============================================================
// Converts between the media world and the model's tensors:
//
//   process_input:  DynamicImage → PreparedTensor (3, H, W)
//   process_output: logits [num_classes] → Classifications
//
// The translator shares the service's LabelSet, so the label at
// index i is always paired with model output i.

use std::sync::Arc;

use burn::{prelude::*, tensor::activation::softmax};
use image::DynamicImage;

use crate::data::preprocessor::{PreparedTensor, Preprocessor};
use crate::domain::{
    classification::Classifications,
    error::{ClassifierError, Result},
    labels::LabelSet,
};

fn read_f32(data: TensorData) -> Result<Vec<f32>> {
    data.to_vec::<f32>()
        .map_err(|e| ClassifierError::TensorData { reason: format!("{e:?}") })
}

/// Softmax `raw` over the class axis and zip it with `labels` by index.
pub fn to_classifications<B: Backend>(raw: Tensor<B, 1>, labels: &LabelSet) -> Result<Classifications> {
    let [actual] = raw.dims();
    if actual != labels.len() {
        return Err(ClassifierError::DimensionMismatch { expected: labels.len(), actual });
    }

    let probabilities = read_f32(softmax(raw, 0).into_data().convert::<f32>())?;
    Ok(Classifications::new(labels.names().to_vec(), probabilities))
}

#[derive(Debug, Clone)]
pub struct Translator {
    preprocessor: Preprocessor,
    labels:       Arc<LabelSet>,
}

impl Translator {
    pub fn new(preprocessor: Preprocessor, labels: Arc<LabelSet>) -> Self {
        Self { preprocessor, labels }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn process_input(&self, image: &DynamicImage) -> PreparedTensor {
        self.preprocessor.transform(image)
    }

    /// `logits` is the `[1, num_classes]` output of one forward pass.
    pub fn process_output<B: Backend>(&self, logits: Tensor<B, 2>) -> Result<Classifications> {
        let [batch, _] = logits.dims();
        if batch != 1 {
            return Err(ClassifierError::DimensionMismatch { expected: 1, actual: batch });
        }
        to_classifications(logits.flatten::<1>(0, 1), &self.labels)
    }
}
