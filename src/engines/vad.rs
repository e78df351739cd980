//! Voice activity detection
//!
//! The VAD engine is a black box behind the [`VoiceActivity`] trait. The
//! shipped engine classifies chunks by RMS energy, tuned by the configured
//! minimum silence/speech durations.

use crate::config::VadConfig;

/// Per-chunk binary speech/non-speech classification
pub trait VoiceActivity {
    /// Classify one chunk of 16kHz mono samples
    fn is_speech(&mut self, samples: &[f32]) -> bool;
}

/// RMS-energy voice activity engine
pub struct EnergyVad {
    threshold: f32,
}

impl EnergyVad {
    /// Create an engine from the configured thresholds
    #[must_use]
    pub fn new(config: VadConfig) -> Self {
        tracing::debug!(
            min_silence_ms = config.min_silence.as_millis(),
            min_speech_ms = config.min_speech.as_millis(),
            threshold = config.energy_threshold,
            "VAD engine initialized"
        );
        Self {
            threshold: config.energy_threshold,
        }
    }
}

impl VoiceActivity for EnergyVad {
    fn is_speech(&mut self, samples: &[f32]) -> bool {
        calculate_energy(samples) > self.threshold
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
