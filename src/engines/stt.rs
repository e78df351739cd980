//! Speech-to-text engine client
//!
//! The transcription engine runs out of process; this client uploads 16kHz
//! mono WAV audio and receives plain text back.

use std::time::Duration;

use crate::audio::samples_to_wav;
use crate::config::SAMPLE_RATE;
use crate::{Error, Result};

/// Response from the transcription endpoint
#[derive(serde::Deserialize)]
struct TranscribeResponse {
    text: String,
}

/// Transcribes speech to text via the configured endpoint
pub struct SpeechToText {
    client: reqwest::blocking::Client,
    url: String,
}

impl SpeechToText {
    /// Create a new STT client
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

    /// Transcribe f32 audio samples at 16kHz
    ///
    /// # Errors
    ///
    /// Returns error if encoding, the request, or decoding fails
    pub fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let wav = samples_to_wav(samples, SAMPLE_RATE)?;
        tracing::debug!(audio_bytes = wav.len(), "starting transcription");

        let form = reqwest::blocking::multipart::Form::new().part(
            "file",
            reqwest::blocking::multipart::Part::bytes(wav)
                .file_name("audio.wav")
                .mime_str("audio/wav")
                .map_err(|e| Error::Stt(e.to_string()))?,
        );

        let response = self.client.post(&self.url).multipart(form).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Stt(format!("transcription error {status}: {body}")));
        }

        let result: TranscribeResponse = response.json()?;
        let text = result.text.trim().to_string();
        tracing::debug!(transcript = %text, "transcription complete");
        Ok(text)
    }
}
