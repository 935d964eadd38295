// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N ImageSamples into
//   images:  [N, 3, H, W]  float
//   targets: [N]           int (class index)
//
// Every PreparedTensor from one Preprocessor has the same
// shape, so stacking is a flat concatenation plus a reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageSample;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();
        let [c, h, w]  = items.first().map(|s| s.tensor.shape()).unwrap_or([3, 0, 0]);

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.tensor.as_slice().iter().copied())
            .collect();
        let labels: Vec<i64> = items.iter().map(|s| s.label as i64).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, c, h, w]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]),
            &self.device,
        );

        ImageBatch { images, targets }
    }
}
