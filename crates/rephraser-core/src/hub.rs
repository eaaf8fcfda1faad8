//! Model artifact fetching through the HuggingFace Hub
//!
//! Artifacts are cached on disk under the configured cache directory,
//! keyed by repository id; a second startup with the same model skips
//! the network entirely.

use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiBuilder};
use tracing::debug;

use crate::error::{Error, Result};

/// Local paths of the three files a T5-family checkpoint needs.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Hub handle bound to a local cache directory.
pub struct ArtifactStore {
    api: Api,
}

impl ArtifactStore {
    pub fn new(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .build()
            .map_err(|e| Error::HfHubError(e.to_string()))?;
        Ok(Self { api })
    }

    /// Resolve the checkpoint files for `model_id`, downloading any
    /// that are not already cached.
    pub fn fetch(&self, model_id: &str) -> Result<ModelArtifacts> {
        let repo = self.api.model(model_id.to_string());
        let config = repo
            .get("config.json")
            .map_err(|e| Error::HfHubError(format!("{model_id}/config.json: {e}")))?;
        let tokenizer = repo
            .get("tokenizer.json")
            .map_err(|e| Error::HfHubError(format!("{model_id}/tokenizer.json: {e}")))?;
        let weights = repo
            .get("model.safetensors")
            .map_err(|e| Error::HfHubError(format!("{model_id}/model.safetensors: {e}")))?;
        debug!("Resolved artifacts for {model_id}: {weights:?}");
        Ok(ModelArtifacts {
            config,
            tokenizer,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_cache_dir() {
        let dir = std::env::temp_dir().join(format!("rephraser-hub-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let _store = ArtifactStore::new(&dir).unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
