// ============================================================
// Layer 3 — LabelSet (synset)
// ============================================================
// The ordered class vocabulary. Index i is the name of model
// output i, so the order written at training time must be the
// order read at inference time.
//
// File format (synset.txt):
//   apple
//   banana
//   cherry
//
// fingerprint() hashes the ordered names so a checkpoint can
// record which label list it was trained against.

use std::{fs, path::Path};

use crate::domain::error::{ClassifierError, Result};

/// Ordered list of class names. Duplicates are allowed; order is not negotiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Read one label per line. `\r\n` line endings are accepted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClassifierError::MissingResource { path: path.to_path_buf() });
        }

        let text  = fs::read_to_string(path)?;
        let names: Vec<String> = text.lines().map(str::to_string).collect();
        if names.is_empty() {
            return Err(ClassifierError::EmptyLabelSet { path: path.to_path_buf() });
        }

        tracing::debug!("Loaded {} labels from '{}'", names.len(), path.display());
        Ok(Self { names })
    }

    /// Build from class names discovered at training time.
    pub fn from_names(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(ClassifierError::EmptyLabelSet { path: "<in-memory>".into() });
        }
        Ok(Self { names })
    }

    /// Write the labels in index order, one per line.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut text = self.names.join("\n");
        text.push('\n');
        fs::write(path, text).map_err(|e| ClassifierError::persist(path, e))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_at(&self, index: usize) -> Result<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::IndexOutOfRange { index, size: self.names.len() })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// FNV-1a over the names, each terminated by a newline.
    /// Reordering, renaming, adding or removing a label changes it.
    pub fn fingerprint(&self) -> String {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME:  u64 = 0x0000_0100_0000_01b3;

        let hash = self
            .names
            .iter()
            .flat_map(|n| n.bytes().chain(std::iter::once(b'\n')))
            .fold(OFFSET, |h, b| (h ^ b as u64).wrapping_mul(PRIME));
        format!("{hash:016x}")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> LabelSet {
        LabelSet::from_names(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_missing_file_is_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let err = LabelSet::load(dir.path().join("synset.txt")).unwrap_err();
        assert!(matches!(err, ClassifierError::MissingResource { .. }));
    }

    #[test]
    fn test_empty_file_is_empty_label_set() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("synset.txt");
        fs::write(&path, "").unwrap();
        let err = LabelSet::load(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyLabelSet { .. }));
    }

    #[test]
    fn test_load_keeps_file_order() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("synset.txt");
        fs::write(&path, "pear\r\napple\nbanana\n").unwrap();
        let set = LabelSet::load(&path).unwrap();
        assert_eq!(set.names(), &["pear", "apple", "banana"]);
        assert_eq!(set.name_at(1).unwrap(), "apple");
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("synset.txt");
        let set  = labels(&["b", "a", "c"]);
        set.save(&path).unwrap();
        assert_eq!(LabelSet::load(&path).unwrap(), set);
    }

    #[test]
    fn test_name_at_out_of_range() {
        let set = labels(&["a", "b"]);
        let err = set.name_at(2).unwrap_err();
        assert!(matches!(err, ClassifierError::IndexOutOfRange { index: 2, size: 2 }));
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        assert_eq!(labels(&["a", "b"]).fingerprint(), labels(&["a", "b"]).fingerprint());
        assert_ne!(labels(&["a", "b"]).fingerprint(), labels(&["b", "a"]).fingerprint());
        // The separator keeps ["ab"] and ["a", "b"] apart.
        assert_ne!(labels(&["ab"]).fingerprint(), labels(&["a", "b"]).fingerprint());
    }

    #[test]
    fn test_from_names_rejects_empty() {
        assert!(matches!(
            LabelSet::from_names(Vec::new()),
            Err(ClassifierError::EmptyLabelSet { .. })
        ));
    }
}
