pub mod parler;
pub mod source;
pub mod wav;

use std::sync::Arc;

use crate::error::SynthesisError;

pub use parler::ParlerModel;

/// Voice/style prompt the model is conditioned on. Not client controllable.
pub const VOICE_DESCRIPTION: &str = "Anwar Ibrahim";

/// Rate the WAV output is written at.
pub const SAMPLE_RATE: u32 = 44_100;

/// A loaded speech model: description + prompt text in, raw samples out.
pub trait SpeechModel: Send + Sync {
    fn generate(&self, description: &str, prompt: &str) -> Result<Vec<f32>, SynthesisError>;
}

pub struct TtsService {
    model: Arc<dyn SpeechModel>,
}

impl TtsService {
    pub fn new(model: Arc<dyn SpeechModel>) -> Self {
        Self { model }
    }

    /// Synthesize `text` and encode it as WAV. Blocks until generation finishes.
    pub fn speak(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let samples = self.model.generate(VOICE_DESCRIPTION, text)?;
        tracing::info!("Generation complete: {} samples", samples.len());

        let wav = wav::samples_to_wav(&samples, SAMPLE_RATE)?;
        tracing::info!("Audio processing complete: {} bytes", wav.len());

        Ok(wav)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubModel;
    use super::*;

    #[test]
    fn test_speak_uses_fixed_description() {
        let model = Arc::new(StubModel::ok(vec![0.1; 100]));
        let service = TtsService::new(model.clone());

        service.speak("Selamat pagi").unwrap();

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, VOICE_DESCRIPTION);
        assert_eq!(calls[0].1, "Selamat pagi");
    }

    #[test]
    fn test_speak_returns_wav() {
        let service = TtsService::new(Arc::new(StubModel::ok(vec![0.0; 441])));
        let wav = service.speak("hello").unwrap();
        assert!(wav.starts_with(b"RIFF"));
        // 44-byte header plus two bytes per sample
        assert_eq!(wav.len(), 44 + 441 * 2);
    }

    #[test]
    fn test_speak_propagates_generation_error() {
        let service = TtsService::new(Arc::new(StubModel::failing("out of memory")));
        let err = service.speak("hello").unwrap_err();
        assert_eq!(err.to_string(), "Generation failed: out of memory");
    }
}
