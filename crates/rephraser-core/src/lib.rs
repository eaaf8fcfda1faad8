//! Rephraser core - pretrained seq2seq paraphrase generation
//!
//! This crate wraps a T5-family checkpoint fetched from the HuggingFace
//! Hub and exposes a single `rephrase` operation producing ranked
//! candidate paraphrases. Model loading, tokenization and generation
//! primitives are delegated to candle and the tokenizers crate; nothing
//! here implements model internals.

pub mod config;
pub mod device;
pub mod error;
pub mod hub;
pub mod model;

pub use config::{DecodingConfig, ModelConfig};
pub use error::{Error, Result};
pub use model::{Candidate, Rephraser};
