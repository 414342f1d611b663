//! ElevenLabs text-to-speech.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callpilot_core::capability::{NullSynthesizer, SpeechSynthesizer};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{SpeechError, SpeechResult};

pub const ENV_API_KEY: &str = "ELEVENLABS_API_KEY";
pub const ENV_VOICE_ID: &str = "ELEVENLABS_VOICE_ID";
pub const ENV_MODEL: &str = "TTS_MODEL";
pub const ENV_BASE_URL: &str = "ELEVENLABS_BASE_URL";

pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_MODEL: &str = "eleven_turbo_v2_5";
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
/// Well under the default provider deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 4_000;

/// Speech service configuration
#[derive(Clone)]
pub struct SpeechConfig {
    /// API key; synthesis is disabled without one
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub base_url: String,
    /// Per-request deadline in milliseconds
    pub timeout_ms: u64,
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SpeechConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: set(ENV_API_KEY),
            voice_id: set(ENV_VOICE_ID).unwrap_or(defaults.voice_id),
            model_id: set(ENV_MODEL).unwrap_or(defaults.model_id),
            base_url: set(ENV_BASE_URL).unwrap_or(defaults.base_url),
            timeout_ms: defaults.timeout_ms,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_voice(mut self, voice_id: &str) -> Self {
        self.voice_id = voice_id.to_string();
        self
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Text-to-speech over the ElevenLabs HTTP API.
pub struct ElevenLabsSynthesizer {
    config: SpeechConfig,
    api_key: String,
    http_client: reqwest::Client,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SpeechConfig) -> SpeechResult<Self> {
        let api_key = config.api_key.clone().ok_or(SpeechError::MissingApiKey)?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("callpilot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            config,
            api_key,
            http_client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        )
    }

    /// Synthesize `text`, returning the encoded audio.
    pub async fn request_audio(&self, text: &str) -> SpeechResult<Vec<u8>> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SynthesisRequest {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Option<Vec<u8>> {
        match self.request_audio(text).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(error = %e, "speech synthesis failed, continuing without audio");
                None
            }
        }
    }
}

/// The synthesizer to use for this process: ElevenLabs when an API key is
/// configured, otherwise [`NullSynthesizer`].
pub fn synthesizer_from_env() -> Arc<dyn SpeechSynthesizer> {
    synthesizer_for(SpeechConfig::from_env())
}

pub fn synthesizer_for(config: SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
    if config.api_key.is_none() {
        debug!("no speech API key, audio disabled");
        return Arc::new(NullSynthesizer);
    }
    match ElevenLabsSynthesizer::new(config) {
        Ok(synth) => {
            info!(endpoint = %synth.endpoint(), "speech synthesis enabled");
            Arc::new(synth)
        }
        Err(e) => {
            warn!(error = %e, "speech synthesizer unavailable, audio disabled");
            Arc::new(NullSynthesizer)
        }
    }
}
