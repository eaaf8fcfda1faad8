//! Seq2seq paraphrase model wrapper
//!
//! Loads a T5-family conditional-generation checkpoint once and runs
//! per-request decoding with candle's `LogitsProcessor`. Weights are
//! shared read-only across callers; each generation works on a cheap
//! clone of the model graph so decoder caches never cross requests.

use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::t5;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::{DecodingConfig, ModelConfig};
use crate::device::select_device;
use crate::error::{Error, Result};
use crate::hub::ArtifactStore;

/// End-of-sequence marker appended to every input before encoding.
const EOS_MARKER: &str = " </s>";

/// A generated rephrasing paired with its ranking score.
///
/// The score is the mean log-probability of the chosen tokens, so
/// higher is better and values are comparable across candidates of
/// different lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub score: f32,
}

pub struct Rephraser {
    model: t5::T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    config: t5::Config,
    decoding: DecodingConfig,
    device: Device,
}

impl Rephraser {
    /// Load the checkpoint and tokenizer named by `settings`, blocking
    /// until both are ready. Any failure here is fatal to startup.
    pub fn load(settings: &ModelConfig) -> Result<Self> {
        let device = select_device()?;
        let store = ArtifactStore::new(&settings.cache_dir)?;
        let artifacts = store.fetch(&settings.model_id)?;
        let decoding = DecodingConfig::default();

        info!("Loading model...");
        let config: t5::Config =
            serde_json::from_str(&std::fs::read_to_string(&artifacts.config)?)?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                std::slice::from_ref(&artifacts.weights),
                DType::F32,
                &device,
            )
        }
        .map_err(|e| Error::ModelLoadError(e.to_string()))?;
        let model = t5::T5ForConditionalGeneration::load(vb, &config)
            .map_err(|e| Error::ModelLoadError(e.to_string()))?;

        info!("Loading tokenizer...");
        let mut tokenizer = Tokenizer::from_file(&artifacts.tokenizer)
            .map_err(|e| Error::TokenizationError(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: decoding.max_input_tokens,
                ..Default::default()
            }))
            .map_err(|e| Error::TokenizationError(e.to_string()))?;

        info!("Loading done.");
        Ok(Self {
            model,
            tokenizer,
            config,
            decoding,
            device,
        })
    }

    /// Generate `num_sequences` rephrasings of `text`, best first.
    ///
    /// With `sample` false the decode is greedy and fully
    /// deterministic; with `sample` true candidates are drawn with
    /// top-k/top-p sampling at `temperature`, each from a distinct
    /// seed.
    pub fn rephrase(
        &self,
        text: &str,
        temperature: f64,
        sample: bool,
        num_sequences: usize,
    ) -> Result<Vec<Candidate>> {
        validate_params(temperature, sample, num_sequences)?;

        let input = format!("{text}{EOS_MARKER}");
        let encoding = self
            .tokenizer
            .encode(input, false)
            .map_err(|e| Error::TokenizationError(e.to_string()))?;
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        debug!("Encoded {} input tokens", encoding.get_ids().len());

        let mut candidates = Vec::with_capacity(num_sequences);
        for index in 0..num_sequences {
            candidates.push(self.generate_one(&input_ids, temperature, sample, index as u64)?);
        }
        Ok(rank(candidates))
    }

    fn generate_one(
        &self,
        input_ids: &Tensor,
        temperature: f64,
        sample: bool,
        index: u64,
    ) -> Result<Candidate> {
        // The clone shares weight tensors; it only isolates this
        // call's KV cache from concurrent generations.
        let mut model = self.model.clone();
        let mut logits_processor = self.logits_processor(temperature, sample, index);

        let encoder_output = model.encode(input_ids)?;
        let decoder_start = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let mut output_ids = vec![decoder_start];
        let mut log_prob_sum = 0f32;
        let mut steps = 0usize;

        while output_ids.len() <= self.decoding.max_output_tokens {
            let decoder_input = if output_ids.len() == 1 || !self.config.use_cache {
                Tensor::new(output_ids.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                // Safe: output_ids is seeded with decoder_start above.
                let last = *output_ids.last().unwrap();
                Tensor::new(&[last], &self.device)?.unsqueeze(0)?
            };
            let logits = model.decode(&decoder_input, &encoder_output)?.squeeze(0)?;
            let next = logits_processor.sample(&logits)?;

            let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
            log_prob_sum += log_probs.i(next as usize)?.to_scalar::<f32>()?;
            steps += 1;

            if next as usize == self.config.eos_token_id {
                break;
            }
            output_ids.push(next);
        }

        let text = self
            .tokenizer
            .decode(&output_ids[1..], true)
            .map_err(|e| Error::TokenizationError(e.to_string()))?;
        Ok(Candidate {
            text,
            score: log_prob_sum / steps as f32,
        })
    }

    fn logits_processor(&self, temperature: f64, sample: bool, index: u64) -> LogitsProcessor {
        let sampling = if sample {
            Sampling::TopKThenTopP {
                k: self.decoding.top_k,
                p: self.decoding.top_p,
                temperature,
            }
        } else {
            Sampling::ArgMax
        };
        // Distinct seed per candidate so sampled sequences differ.
        LogitsProcessor::from_sampling(self.decoding.seed.wrapping_add(index), sampling)
    }
}

/// Reject parameter values the runtime would otherwise turn into an
/// opaque tensor error.
fn validate_params(temperature: f64, sample: bool, num_sequences: usize) -> Result<()> {
    if num_sequences < 1 {
        return Err(Error::InvalidParameter(
            "num_sequences must be at least 1".to_string(),
        ));
    }
    if sample && !(temperature.is_finite() && temperature > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "temperature must be a positive finite number, got {temperature}"
        )));
    }
    Ok(())
}

/// Order candidates best-first by score. The sort is stable, so
/// equal-score candidates keep their generation order.
fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, score: f32) -> Candidate {
        Candidate {
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn rank_orders_best_first() {
        let ranked = rank(vec![
            candidate("low", -2.5),
            candidate("high", -0.1),
            candidate("mid", -1.0),
        ]);
        let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["high", "mid", "low"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn rank_is_stable_for_equal_scores() {
        let ranked = rank(vec![
            candidate("first", -1.0),
            candidate("second", -1.0),
            candidate("third", -1.0),
        ]);
        let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn validate_rejects_zero_sequences() {
        assert!(matches!(
            validate_params(1.0, false, 0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_sampling_temperature() {
        assert!(matches!(
            validate_params(0.0, true, 2),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            validate_params(-1.0, true, 2),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            validate_params(f64::NAN, true, 2),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn validate_ignores_temperature_when_not_sampling() {
        // Deterministic decoding never reads the temperature, matching
        // the upstream behavior of only honoring it when sampling.
        assert!(validate_params(0.0, false, 1).is_ok());
        assert!(validate_params(-3.0, false, 4).is_ok());
    }

    #[test]
    fn eos_marker_is_appended_verbatim() {
        let input = format!("{}{}", "The cat sat on the mat.", EOS_MARKER);
        assert_eq!(input, "The cat sat on the mat. </s>");
    }
}
