// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Owns the model directory layout shared by training (writer)
// and the inference service (reader):
//
//   model/
//     synset.txt                 ← labels, one per line, index order
//     fruit-resnet18-0005.mpk    ← parameters (CompactRecorder)
//     metadata.json              ← epochs, accuracy, loss, label fingerprint
//     train_config.json          ← hyperparameters of the run
//     metrics.csv                ← per-epoch curves
//
// synset.txt and the parameter file are required at load time.
// metadata.json is optional; when present it is checked against
// the synset so a checkpoint cannot silently be paired with a
// reordered or different label list.
//
// Why store a label fingerprint?
//   The parameter file only knows output *positions*. If the
//   synset is edited or re-sorted, every prediction is still a
//   valid probability vector, just attached to the wrong names.
//   Comparing hashes at load time turns that into an error.
//
// Burn's CompactRecorder:
//   - Serialises parameters to named MessagePack (`.mpk`)
//   - Stores floats at half precision
//   - Loading into a different architecture is caught by the
//     shape checks in load_model
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::{
    error::{ClassifierError, Result},
    labels::LabelSet,
};
use crate::ml::{
    model::{InputShape, ResNet, ResNetRecord},
    InferBackend,
};

pub const SYNSET_FILE: &str = "synset.txt";
pub const METADATA_FILE: &str = "metadata.json";
pub const CONFIG_FILE: &str = "train_config.json";

/// `.mpk`: the extension `CompactRecorder` appends to a parameter stem.
pub fn params_extension() -> String {
    format!(".{}", <CompactRecorder as FileRecorder<InferBackend>>::file_extension())
}

/// Key/value facts about a trained checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name:          String,
    /// Stem of the parameter file, without the recorder's extension.
    pub params_file:         String,
    pub depth:               usize,
    pub input_shape:         InputShape,
    pub num_classes:         usize,
    pub epochs:              usize,
    pub validation_accuracy: Option<f64>,
    pub validation_loss:     Option<f64>,
    /// `LabelSet::fingerprint()` of the synset used for training.
    pub label_fingerprint:   String,
}

impl ModelMetadata {
    /// Fail if `labels` is not the label list this checkpoint was trained on.
    pub fn verify_labels(&self, labels: &LabelSet, dir: &Path) -> Result<()> {
        if self.num_classes != labels.len() {
            return Err(ClassifierError::model_load(dir, format!(
                "checkpoint has {} classes but {} lists {}",
                self.num_classes, SYNSET_FILE, labels.len()
            )));
        }
        let fingerprint = labels.fingerprint();
        if self.label_fingerprint != fingerprint {
            return Err(ClassifierError::model_load(dir, format!(
                "{} (fingerprint {}) is not the label list the checkpoint was trained on ({})",
                SYNSET_FILE, fingerprint, self.label_fingerprint
            )));
        }
        Ok(())
    }
}

/// Saves and restores everything in one model directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn synset_path(&self) -> PathBuf {
        self.dir.join(SYNSET_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| ClassifierError::persist(&self.dir, e))
    }

    /// Parameter file stem for a model name and completed epoch count.
    pub fn params_stem(model_name: &str, epoch: usize) -> String {
        format!("{model_name}-{epoch:04}")
    }

    // ── Parameters ────────────────────────────────────────────────────────────

    pub fn save_model<B: Backend>(&self, model: &ResNet<B>, stem: &str) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(stem);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| ClassifierError::persist(&path, e))?;
        tracing::debug!("Saved parameters to '{}{}'", path.display(), params_extension());
        Ok(())
    }

    /// Bind the parameters in `stem` to `model`, which must already have the
    /// checkpoint's architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  ResNet<B>,
        stem:   &str,
        device: &B::Device,
    ) -> Result<ResNet<B>> {
        let path = self.dir.join(stem);
        let record: ResNetRecord<B> = CompactRecorder::new()
            .load(path.clone(), device)
            .map_err(|e| ClassifierError::model_load(&path, e.to_string()))?;

        if record.blocks.len() != model.blocks.len() {
            return Err(ClassifierError::model_load(&path, format!(
                "checkpoint has {} residual units, architecture has {}",
                record.blocks.len(), model.blocks.len()
            )));
        }
        let (saved, expected) = (record.fc.weight.dims(), model.fc.weight.dims());
        if saved != expected {
            return Err(ClassifierError::model_load(&path, format!(
                "classifier head shape {saved:?} does not match architecture {expected:?}"
            )));
        }

        let expected_params = model.num_params();
        let model = model.load_record(record);
        if model.num_params() != expected_params {
            return Err(ClassifierError::model_load(&path, format!(
                "checkpoint holds {} parameters, architecture expects {}",
                model.num_params(), expected_params
            )));
        }

        tracing::info!("Loaded {} parameters from '{}'", expected_params, path.display());
        Ok(model)
    }

    /// Stem of the parameter file to load: the one named in the metadata, or
    /// else the highest-numbered `{model_name}-NNNN.mpk`.
    pub fn locate_params(&self, model_name: &str, metadata: Option<&ModelMetadata>) -> Result<String> {
        if let Some(meta) = metadata {
            return Ok(meta.params_file.clone());
        }

        let prefix    = format!("{model_name}-");
        let extension = params_extension();
        let mut stems: Vec<String> = fs::read_dir(&self.dir)
            .map_err(|e| ClassifierError::model_load(&self.dir, e.to_string()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.starts_with(&prefix))
            .filter_map(|name| name.strip_suffix(extension.as_str()).map(str::to_string))
            .collect();
        stems.sort();

        stems.pop().ok_or_else(|| ClassifierError::model_load(
            &self.dir,
            format!("no '{prefix}NNNN{extension}' parameter file found"),
        ))
    }

    // ── Labels ────────────────────────────────────────────────────────────────

    pub fn save_labels(&self, labels: &LabelSet) -> Result<()> {
        self.ensure_dir()?;
        labels.save(self.synset_path())
    }

    pub fn load_labels(&self) -> Result<LabelSet> {
        LabelSet::load(self.synset_path())
    }

    // ── Metadata / config ─────────────────────────────────────────────────────

    pub fn save_metadata(&self, metadata: &ModelMetadata) -> Result<()> {
        self.save_json(METADATA_FILE, metadata)
    }

    /// `Ok(None)` when the directory carries no metadata file.
    pub fn load_metadata(&self) -> Result<Option<ModelMetadata>> {
        let path = self.dir.join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        self.load_json(METADATA_FILE)
            .map(Some)
            .map_err(|e| ClassifierError::model_load(&path, e.to_string()))
    }

    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| ClassifierError::persist(&path, e))?;
        fs::write(&path, json).map_err(|e| ClassifierError::persist(&path, e))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClassifierError::MissingResource { path: path.clone() },
            _ => ClassifierError::Io(e),
        })?;
        serde_json::from_str(&json)
            .map_err(|e| ClassifierError::model_load(&path, format!("invalid JSON: {e}")))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::build;

    type B = burn::backend::NdArray;

    fn labels(names: &[&str]) -> LabelSet {
        LabelSet::from_names(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    fn metadata(labels: &LabelSet) -> ModelMetadata {
        ModelMetadata {
            model_name:          "fruit-resnet18".into(),
            params_file:         CheckpointManager::params_stem("fruit-resnet18", 1),
            depth:               18,
            input_shape:         InputShape::rgb(16, 16),
            num_classes:         labels.len(),
            epochs:              1,
            validation_accuracy: Some(0.5),
            validation_loss:     None,
            label_fingerprint:   labels.fingerprint(),
        }
    }

    #[test]
    fn test_params_stem_is_zero_padded() {
        assert_eq!(CheckpointManager::params_stem("m", 5), "m-0005");
    }

    #[test]
    fn test_save_and_load_model_parameters() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let shape  = InputShape::rgb(16, 16);

        let trained = build::<B>(shape, 18, 3, &device).unwrap();
        ckpt.save_model(&trained, "m-0001").unwrap();

        let fresh  = build::<B>(shape, 18, 3, &device).unwrap();
        let loaded = ckpt.load_model(fresh, "m-0001", &device).unwrap();

        assert_eq!(loaded.num_params(), trained.num_params());
        let a = trained.fc.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = loaded.fc.weight.val().into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            // CompactRecorder stores half precision.
            assert!((x - y).abs() < 1e-3, "{x} vs {y}");
        }
    }

    #[test]
    fn test_head_shape_mismatch_is_model_load_error() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let shape  = InputShape::rgb(16, 16);

        ckpt.save_model(&build::<B>(shape, 18, 3, &device).unwrap(), "m-0001").unwrap();
        let err = ckpt
            .load_model(build::<B>(shape, 18, 4, &device).unwrap(), "m-0001", &device)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad { .. }));
    }

    #[test]
    fn test_missing_params_is_model_load_error() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let model  = build::<B>(InputShape::rgb(16, 16), 18, 2, &device).unwrap();
        assert!(matches!(
            ckpt.load_model(model, "absent-0001", &device),
            Err(ClassifierError::ModelLoad { .. })
        ));
        assert!(matches!(
            ckpt.locate_params("absent", None),
            Err(ClassifierError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_locate_params_finds_saved_files_without_metadata() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let model  = build::<B>(InputShape::rgb(8, 8), 18, 2, &device).unwrap();

        for stem in ["m-0002", "m-0010", "other-0099"] {
            ckpt.save_model(&model, stem).unwrap();
        }
        fs::write(dir.path().join("m-notes.txt"), b"").unwrap();

        assert!(dir.path().join(format!("m-0010{}", params_extension())).is_file());
        let stem = ckpt.locate_params("m", None).unwrap();
        assert_eq!(stem, "m-0010");
        assert!(ckpt.load_model(build::<B>(InputShape::rgb(8, 8), 18, 2, &device).unwrap(), &stem, &device).is_ok());
    }

    #[test]
    fn test_metadata_round_trip_and_absence() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("model"));
        assert_eq!(ckpt.load_metadata().unwrap(), None);

        let meta = metadata(&labels(&["a", "b"]));
        ckpt.save_metadata(&meta).unwrap();
        assert_eq!(ckpt.load_metadata().unwrap(), Some(meta.clone()));
        assert_eq!(ckpt.locate_params("ignored", Some(&meta)).unwrap(), meta.params_file);
    }

    #[test]
    fn test_verify_labels_detects_reordering() {
        let trained_on = labels(&["apple", "banana"]);
        let meta       = metadata(&trained_on);
        let dir        = Path::new("model");

        assert!(meta.verify_labels(&trained_on, dir).is_ok());
        assert!(matches!(
            meta.verify_labels(&labels(&["banana", "apple"]), dir),
            Err(ClassifierError::ModelLoad { .. })
        ));
        assert!(matches!(
            meta.verify_labels(&labels(&["apple", "banana", "cherry"]), dir),
            Err(ClassifierError::ModelLoad { .. })
        ));
    }
}
