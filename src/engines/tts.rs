//! Text-to-speech engine client
//!
//! The synthesis engine runs out of process and returns a mono PCM WAV clip.

use std::time::Duration;

use crate::{Error, Result};

/// Synthesizes speech via the configured endpoint
pub struct TextToSpeech {
    client: reqwest::blocking::Client,
    url: String,
}

impl TextToSpeech {
    /// Create a new TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, url })
    }

    /// Synthesize text to WAV bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the engine reports an error
    pub fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SynthesizeRequest<'a> {
            text: &'a str,
        }

        let response = self
            .client
            .post(&self.url)
            .json(&SynthesizeRequest { text })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Tts(format!("synthesis error {status}: {body}")));
        }

        let audio = response.bytes()?;
        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}
