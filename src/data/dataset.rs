// ============================================================
// Layer 4 — Flat Folder Dataset
// ============================================================
// Every regular file directly under a root folder, in file-name
// order. The length is fixed at construction and is never zero.
//
// Implements Burn's Dataset trait over file paths; decoding is
// left to the loader so `get` stays cheap.

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::StyleError;

#[derive(Debug, Clone)]
pub struct FlatFolderDataset {
    root:  PathBuf,
    paths: Vec<PathBuf>,
}

impl FlatFolderDataset {
    /// Scan `root` and freeze its file list.
    /// Fails if the folder is missing, unreadable, or empty.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StyleError::MissingPath(root).into());
        }

        let paths = list_files(&root)?;
        if paths.is_empty() {
            return Err(StyleError::EmptyDataset(root).into());
        }

        tracing::info!("Dataset '{}': {} files", root.display(), paths.len());
        Ok(Self { root, paths })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Resolve a batch of sampler indices into file paths
    pub fn paths_for(&self, indices: &[usize]) -> Result<Vec<PathBuf>> {
        indices
            .iter()
            .map(|&i| {
                self.get(i)
                    .with_context(|| format!("index {i} out of range for '{}'", self.root.display()))
            })
            .collect()
    }
}

// ─── Burn Dataset Trait Implementation ────────────────────────────────────────
impl Dataset<PathBuf> for FlatFolderDataset {
    fn get(&self, index: usize) -> Option<PathBuf> {
        self.paths.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

/// Regular, non-hidden files directly under `dir`, sorted by file name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let entry = entry?;
        let path  = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        if path.is_file() && !hidden {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
