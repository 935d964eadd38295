use burn::data::dataset::Dataset;

use crate::data::{
    codec::ImageCodec,
    folder::ImageEntry,
    preprocessor::{PreparedTensor, Preprocessor},
};

/// One decoded, preprocessed training sample.
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub tensor: PreparedTensor,
    pub label:  usize,
}

/// Lazily decodes image files on `get`, applying the shared preprocessor.
pub struct ImageDataset {
    entries:      Vec<ImageEntry>,
    preprocessor: Preprocessor,
}

impl ImageDataset {
    pub fn new(entries: Vec<ImageEntry>, preprocessor: Preprocessor) -> Self {
        Self { entries, preprocessor }
    }

    pub fn sample_count(&self) -> usize { self.entries.len() }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        let entry = self.entries.get(index)?;
        // Every entry decoded during the scan; a failure here means the file
        // changed underneath us, and the trainer rejects the short epoch.
        match ImageCodec::decode_file(&entry.path) {
            Ok(image) => Some(ImageSample {
                tensor: self.preprocessor.transform(&image),
                label:  entry.label,
            }),
            Err(e) => {
                tracing::error!("Cannot decode '{}': {}", entry.path.display(), e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
