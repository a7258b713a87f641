use std::fs::File;
use std::sync::{Mutex, MutexGuard};

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::parler_tts;
use tokenizers::Tokenizer;

use crate::config::ModelConfig;
use crate::error::{StartupError, SynthesisError};
use crate::retry::{retry, RetryPolicy};
use crate::tts::source::ModelSource;
use crate::tts::SpeechModel;

/// Parler-TTS model and tokenizer, loaded once and shared by every request.
pub struct ParlerModel {
    // Generation mutates the decoder's KV cache
    model: Mutex<parler_tts::Model>,
    tokenizer: Tokenizer,
    device: Device,
    max_steps: usize,
    temperature: f64,
    top_p: Option<f64>,
}

impl ParlerModel {
    pub fn load(config: &ModelConfig, policy: RetryPolicy) -> Result<Self, StartupError> {
        let device = Device::cuda_if_available(0)?;
        let source = ModelSource::from_config(config);
        tracing::info!("Loading model from {}", source.describe());

        let model = retry(policy, "model", || load_model(&source, &device))?;

        tracing::info!("Loading tokenizer...");
        let tokenizer = retry(policy, "tokenizer", || load_tokenizer(&source))?;

        tracing::info!("Model and tokenizer loaded. Using device: {:?}", device);

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            max_steps: config.max_steps,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    /// Token ids as a `[1, seq_len]` tensor. A single unpadded sequence needs no attention mask.
    fn tokenize(&self, text: &str) -> Result<Tensor, SynthesisError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| SynthesisError::Tokenize(e.to_string()))?;
        token_tensor(encoding.get_ids().to_vec(), &self.device)
    }
}

fn token_tensor(ids: Vec<u32>, device: &Device) -> Result<Tensor, SynthesisError> {
    Tensor::new(ids, device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(|e| SynthesisError::Tokenize(e.to_string()))
}

/// Take the lock even if an earlier generation panicked while holding it.
/// `parler_tts::Model::generate` resets its KV caches on entry, so no stale state carries over.
fn lock_model<T>(model: &Mutex<T>) -> MutexGuard<'_, T> {
    model.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Model lock was poisoned by a panicked request, recovering");
        poisoned.into_inner()
    })
}

impl SpeechModel for ParlerModel {
    fn generate(&self, description: &str, prompt: &str) -> Result<Vec<f32>, SynthesisError> {
        let description_tokens = self.tokenize(description)?;
        let prompt_tokens = self.tokenize(prompt)?;
        tracing::debug!("Tokenization complete");

        let lp = LogitsProcessor::new(rand::random(), Some(self.temperature), self.top_p);

        let mut model = lock_model(&self.model);
        let codes = model.generate(&prompt_tokens, &description_tokens, lp, self.max_steps)?;
        let codes = codes.to_dtype(DType::I64)?.unsqueeze(0)?;
        let pcm = model
            .audio_encoder
            .decode_codes(&codes.to_device(&self.device)?)?;
        drop(model);

        let samples = pcm.i((0, 0))?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        Ok(samples)
    }
}

fn load_model(source: &ModelSource, device: &Device) -> Result<parler_tts::Model, StartupError> {
    let config_path = source.fetch("config.json")?;
    let weights_path = source.fetch("model.safetensors")?;

    let config: parler_tts::Config = serde_json::from_reader(File::open(config_path)?)?;
    // SAFETY: the weights file is not modified while mapped
    let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? };
    Ok(parler_tts::Model::new(&config, vb)?)
}

fn load_tokenizer(source: &ModelSource) -> Result<Tokenizer, StartupError> {
    let path = source.fetch("tokenizer.json")?;
    Tokenizer::from_file(path).map_err(|e| StartupError::Tokenizer(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_token_tensor_shape() {
        let tensor = token_tensor(vec![5, 6, 7], &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[1, 3]);
        assert_eq!(tensor.to_vec2::<u32>().unwrap(), vec![vec![5, 6, 7]]);
    }

    #[test]
    fn test_token_tensor_empty() {
        let tensor = token_tensor(Vec::new(), &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[1, 0]);
    }

    #[test]
    fn test_lock_model_recovers_after_panic() {
        let model = Arc::new(Mutex::new(0u32));

        let poisoner = Arc::clone(&model);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("generation panicked");
        })
        .join();
        assert!(result.is_err());
        assert!(model.is_poisoned());

        *lock_model(&model) += 1;
        assert_eq!(*lock_model(&model), 1);
    }
}
