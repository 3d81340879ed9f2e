use crate::foundation::error::EyeCandyResult;
use anyhow::Context;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded images for `IMAGE` stimuli, keyed by the path the program used.
#[derive(Clone, Debug, Default)]
pub struct ImageCache {
    root: PathBuf,
    images: HashMap<String, Arc<image::RgbaImage>>,
}

impl ImageCache {
    /// Relative image paths resolve against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            images: HashMap::new(),
        }
    }

    /// Decode every path not already cached. Returns how many were loaded.
    #[tracing::instrument(skip_all, fields(root = %self.root.display()))]
    pub fn preload<'a>(&mut self, paths: impl IntoIterator<Item = &'a String>) -> EyeCandyResult<usize> {
        let missing: Vec<&String> = paths
            .into_iter()
            .filter(|p| !self.images.contains_key(p.as_str()))
            .collect();
        let root = self.root.as_path();
        let loaded = missing
            .par_iter()
            .map(|p| decode(root, p).map(|img| ((*p).clone(), Arc::new(img))))
            .collect::<EyeCandyResult<Vec<_>>>()?;
        let n = loaded.len();
        self.images.extend(loaded);
        tracing::debug!(loaded = n, total = self.images.len(), "images preloaded");
        Ok(n)
    }

    /// Cache an already decoded image under `key`.
    pub fn insert(&mut self, key: impl Into<String>, image: image::RgbaImage) {
        self.images.insert(key.into(), Arc::new(image));
    }

    /// Decoded image for `key`.
    pub fn get(&self, key: &str) -> Option<&Arc<image::RgbaImage>> {
        self.images.get(key)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn decode(root: &Path, rel: &str) -> EyeCandyResult<image::RgbaImage> {
    let path = root.join(rel);
    let img = image::open(&path).with_context(|| format!("decode image '{}'", path.display()))?;
    Ok(img.to_rgba8())
}
