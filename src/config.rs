use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_MODEL_ID: &str = "mesolitica/malaysian-parler-tts-mini-v1";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Where the model files come from and how to sample from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_id: String,
    pub revision: String,
    /// Read `config.json`, `model.safetensors` and `tokenizer.json` from here instead of the hub.
    pub local_dir: Option<PathBuf>,
    pub max_steps: usize,
    pub temperature: f64,
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub cors_origin: String,
    pub max_text_chars: Option<usize>,
    pub load_retry: RetryPolicy,
    pub model: ModelConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host: IpAddr = parse("HOST", &var("HOST", "0.0.0.0"), "an IP address")?;
        let port: u16 = parse("PORT", &var("PORT", "5000"), "a port number")?;
        let addr = SocketAddr::new(host, port);

        let attempts: u32 = parse("TTS_LOAD_ATTEMPTS", &var("TTS_LOAD_ATTEMPTS", "3"), "a positive integer")?;
        if attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "TTS_LOAD_ATTEMPTS",
                expected: "a positive integer",
                value: "0".into(),
            });
        }
        let delay_secs: u64 = parse(
            "TTS_LOAD_RETRY_DELAY_SECS",
            &var("TTS_LOAD_RETRY_DELAY_SECS", "5"),
            "a number of seconds",
        )?;

        let max_text_chars = lookup("TTS_MAX_TEXT_CHARS")
            .map(|v| parse("TTS_MAX_TEXT_CHARS", &v, "a positive integer"))
            .transpose()?;
        let top_p = lookup("TTS_TOP_P")
            .map(|v| parse("TTS_TOP_P", &v, "a float"))
            .transpose()?;

        Ok(Self {
            addr,
            cors_origin: var("CORS_ORIGIN", DEFAULT_CORS_ORIGIN),
            max_text_chars,
            load_retry: RetryPolicy {
                attempts,
                delay: Duration::from_secs(delay_secs),
            },
            model: ModelConfig {
                model_id: var("TTS_MODEL_ID", DEFAULT_MODEL_ID),
                revision: var("TTS_MODEL_REVISION", "main"),
                local_dir: lookup("TTS_MODEL_DIR").map(PathBuf::from),
                max_steps: parse("TTS_MAX_STEPS", &var("TTS_MAX_STEPS", "512"), "a positive integer")?,
                temperature: parse("TTS_TEMPERATURE", &var("TTS_TEMPERATURE", "1.0"), "a float")?,
                top_p,
            },
        })
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}
