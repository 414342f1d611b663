//! Speech adapter errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("ELEVENLABS_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("speech service returned no audio")]
    EmptyAudio,
}

pub type SpeechResult<T> = std::result::Result<T, SpeechError>;
