//! Configuration types for model loading and decoding

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which checkpoint to serve and where to cache its artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier on the HuggingFace Hub
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Local cache directory for downloaded artifacts
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_model_id() -> String {
    "humarin/chatgpt_paraphraser_on_T5_base".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Fixed decoding hyperparameters.
///
/// These are not exposed per request; only temperature and the
/// sampling flag vary between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodingConfig {
    /// Maximum number of generated tokens per candidate
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Top-k truncation applied when sampling
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Top-p (nucleus) truncation applied when sampling
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Inputs longer than this are truncated by the tokenizer
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    /// Base RNG seed; each candidate offsets it by its index
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_input_tokens: default_max_input_tokens(),
            seed: default_seed(),
        }
    }
}

fn default_max_output_tokens() -> usize {
    256
}

fn default_top_k() -> usize {
    120
}

fn default_top_p() -> f64 {
    0.98
}

fn default_max_input_tokens() -> usize {
    512
}

fn default_seed() -> u64 {
    299792458
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_config_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.model_id, "humarin/chatgpt_paraphraser_on_T5_base");
        assert_eq!(config.cache_dir, PathBuf::from("models"));
    }

    #[test]
    fn decoding_config_defaults() {
        let config = DecodingConfig::default();
        assert_eq!(config.max_output_tokens, 256);
        assert_eq!(config.top_k, 120);
        assert_eq!(config.top_p, 0.98);
        assert_eq!(config.max_input_tokens, 512);
    }

    #[test]
    fn model_config_fills_missing_fields() {
        let config: ModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model_id, ModelConfig::default().model_id);
    }
}
