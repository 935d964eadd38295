// ============================================================
// Layer 4 — Image Folder Scanner
// ============================================================
// Discovers a folder-per-class dataset:
//
//   dataset/
//     apple/   a1.jpg  a2.png  nested/a3.jpg
//     banana/  b1.jpg  ...
//
// Class folders are sorted by name; that sorted order is the
// class index order and becomes synset.txt. Files are collected
// recursively (bounded depth) and sorted, so two scans of the
// same tree yield the same entries.
//
// Every file is fully decoded once here. Files that fail are
// skipped with a warning, so ImageDataset::get only ever sees
// images that decode.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::codec::ImageCodec;
use crate::domain::{
    error::{ClassifierError, Result},
    labels::LabelSet,
};

/// Deepest directory level searched below a class folder.
const MAX_DEPTH: usize = 10;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff"];

/// One labelled image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub path:  PathBuf,
    pub label: usize,
}

#[derive(Debug, Clone)]
pub struct ImageFolder {
    labels:  LabelSet,
    entries: Vec<ImageEntry>,
}

impl ImageFolder {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ClassifierError::dataset(format!(
                "dataset directory '{}' does not exist",
                root.display()
            )));
        }

        let mut class_dirs: Vec<PathBuf> = fs::read_dir(root)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        class_dirs.sort();

        if class_dirs.is_empty() {
            return Err(ClassifierError::dataset(format!(
                "'{}' contains no class folders",
                root.display()
            )));
        }

        let mut names   = Vec::with_capacity(class_dirs.len());
        let mut entries = Vec::new();

        for (label, dir) in class_dirs.iter().enumerate() {
            let name = dir
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    ClassifierError::dataset(format!("class folder '{}' is not valid UTF-8", dir.display()))
                })?
                .to_string();

            let mut files = Vec::new();
            collect_images(dir, 0, &mut files)?;
            files.sort();

            let before = entries.len();
            for path in files {
                match ImageCodec::decode_file(&path) {
                    Ok(_) => entries.push(ImageEntry { path, label }),
                    Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
                }
            }
            let count = entries.len() - before;
            if count == 0 {
                tracing::warn!("Class '{}' has no readable images", name);
            }
            tracing::debug!("Class {} '{}': {} images", label, name, count);
            names.push(name);
        }

        if entries.is_empty() {
            return Err(ClassifierError::dataset(format!(
                "no readable images under '{}'",
                root.display()
            )));
        }

        tracing::info!(
            "Scanned '{}': {} classes, {} images",
            root.display(),
            names.len(),
            entries.len()
        );

        Ok(Self { labels: LabelSet::from_names(names)?, entries })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn into_parts(self) -> (LabelSet, Vec<ImageEntry>) {
        (self.labels, self.entries)
    }
}

fn collect_images(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) -> Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, depth + 1, out)?;
        } else if has_image_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
