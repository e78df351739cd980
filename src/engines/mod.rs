//! Speech engine facade
//!
//! Lazily-initialized handles to the transcription, voice-activity, and
//! synthesis engines. Initialization cost is paid once, on first use by the
//! dialogue worker.

mod stt;
mod tts;
mod vad;

pub use stt::SpeechToText;
pub use tts::TextToSpeech;
pub use vad::{EnergyVad, VoiceActivity};

use std::sync::OnceLock;
use std::time::Instant;

use crate::config::{EngineConfig, VadConfig};
use crate::Result;

/// Holds the speech engine handles, constructed on first access
pub struct SpeechEngines {
    config: EngineConfig,
    vad_config: VadConfig,
    stt: OnceLock<SpeechToText>,
    tts: OnceLock<TextToSpeech>,
}

impl SpeechEngines {
    /// Create the facade; no engine is initialized yet
    #[must_use]
    pub const fn new(config: EngineConfig, vad_config: VadConfig) -> Self {
        Self {
            config,
            vad_config,
            stt: OnceLock::new(),
            tts: OnceLock::new(),
        }
    }

    /// Get the transcription engine, initializing it on first call
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be constructed
    pub fn stt(&self) -> Result<&SpeechToText> {
        if let Some(engine) = self.stt.get() {
            return Ok(engine);
        }

        let t0 = Instant::now();
        let engine = SpeechToText::new(self.config.stt_url.clone(), self.config.timeout)?;
        tracing::info!(elapsed_ms = t0.elapsed().as_millis(), "STT engine ready");

        Ok(self.stt.get_or_init(|| engine))
    }

    /// Get the synthesis engine, initializing it on first call
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be constructed
    pub fn tts(&self) -> Result<&TextToSpeech> {
        if let Some(engine) = self.tts.get() {
            return Ok(engine);
        }

        let t0 = Instant::now();
        let engine = TextToSpeech::new(self.config.tts_url.clone(), self.config.timeout)?;
        tracing::info!(elapsed_ms = t0.elapsed().as_millis(), "TTS engine ready");

        Ok(self.tts.get_or_init(|| engine))
    }

    /// Create a fresh voice-activity engine for a capture session
    #[must_use]
    pub fn vad(&self) -> EnergyVad {
        EnergyVad::new(self.vad_config)
    }

    /// Initialize all engines eagerly, reporting the first failure
    ///
    /// # Errors
    ///
    /// Returns error if any engine fails to construct
    pub fn warm_up(&self) -> Result<()> {
        self.stt()?;
        self.tts()?;
        Ok(())
    }
}

impl std::fmt::Debug for SpeechEngines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechEngines")
            .field("stt_url", &self.config.stt_url)
            .field("tts_url", &self.config.tts_url)
            .field("stt_loaded", &self.stt.get().is_some())
            .field("tts_loaded", &self.tts.get().is_some())
            .finish()
    }
}
