//! Utterance segmentation over a live audio stream
//!
//! Consumes captured samples in fixed 512-sample chunks, classifies each via
//! the voice-activity engine, and delimits speech segments by trailing
//! silence. Silence is measured in samples at the fixed 16kHz rate, which
//! keeps segmentation deterministic and testable without a clock.
//!
//! Two configurations are used: wake listening (0.6s silence threshold,
//! 0.3s minimum segment, 15s rolling buffer cap) and command recording
//! (configured post-wake silence, no minimum, deadline enforced by the
//! caller).

use crate::config::CHUNK_SIZE;
use crate::engines::VoiceActivity;

/// Segmentation thresholds, all in samples
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Continuous trailing silence that completes a segment
    pub silence_samples: usize,

    /// Segments with less speech than this are discarded as noise
    pub min_speech_samples: usize,

    /// Rolling cap on the accumulating buffer; `None` disables truncation
    pub max_buffer_samples: Option<usize>,
}

/// Delimits speech segments in a stream of audio chunks
pub struct UtteranceSegmenter {
    config: SegmenterConfig,
    buffer: Vec<f32>,
    pending: Vec<f32>,
    speech_detected: bool,
    speech_samples: usize,
    silence_samples: usize,
}

impl UtteranceSegmenter {
    /// Create a segmenter with the given thresholds
    #[must_use]
    pub const fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            pending: Vec::new(),
            speech_detected: false,
            speech_samples: 0,
            silence_samples: 0,
        }
    }

    /// Feed captured samples, returning a completed segment if one ends
    ///
    /// Samples are processed in 512-sample chunks; a trailing partial chunk
    /// is held until more audio arrives. At most one segment is returned per
    /// call; unprocessed samples stay queued for the next call.
    pub fn feed<V: VoiceActivity>(&mut self, samples: &[f32], vad: &mut V) -> Option<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        while self.pending.len() >= CHUNK_SIZE {
            let chunk: Vec<f32> = self.pending.drain(..CHUNK_SIZE).collect();
            let is_speech = vad.is_speech(&chunk);

            if let Some(segment) = self.push_chunk(&chunk, is_speech) {
                return Some(segment);
            }
        }

        None
    }

    /// Whether speech has been observed since the last completed segment
    #[must_use]
    pub const fn speech_detected(&self) -> bool {
        self.speech_detected
    }

    /// Take everything accumulated so far, including a partial tail chunk
    ///
    /// Used by command recording when the absolute deadline fires before a
    /// silence-delimited segment completes.
    pub fn take_buffer(&mut self) -> Vec<f32> {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.append(&mut self.pending);
        self.speech_detected = false;
        self.speech_samples = 0;
        self.silence_samples = 0;
        buffer
    }

    /// Discard all state, ready for a fresh capture session
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending.clear();
        self.speech_detected = false;
        self.speech_samples = 0;
        self.silence_samples = 0;
    }

    fn push_chunk(&mut self, chunk: &[f32], is_speech: bool) -> Option<Vec<f32>> {
        self.buffer.extend_from_slice(chunk);

        if is_speech {
            self.speech_detected = true;
            self.speech_samples += chunk.len();
            self.silence_samples = 0;
        } else if self.speech_detected {
            self.silence_samples += chunk.len();
            if self.silence_samples > self.config.silence_samples {
                return self.finish_segment();
            }
        }

        // Bound memory during continuous non-speech with no endpoint
        if let Some(cap) = self.config.max_buffer_samples {
            if self.buffer.len() > cap {
                let excess = self.buffer.len() - cap;
                self.buffer.drain(..excess);
            }
        }

        None
    }

    /// Complete the current segment, dropping the silence tail beyond the
    /// threshold and rejecting segments with too little speech
    fn finish_segment(&mut self) -> Option<Vec<f32>> {
        let excess = self.silence_samples - self.config.silence_samples;
        let mut segment = std::mem::take(&mut self.buffer);
        segment.truncate(segment.len().saturating_sub(excess));

        let speech_samples = self.speech_samples;
        self.speech_detected = false;
        self.speech_samples = 0;
        self.silence_samples = 0;

        if speech_samples < self.config.min_speech_samples {
            tracing::debug!(speech_samples, "segment too short, discarded");
            return None;
        }

        tracing::debug!(samples = segment.len(), "speech segment complete");
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SAMPLE_RATE, VadConfig, duration_to_samples};
    use crate::engines::EnergyVad;
    use std::time::Duration;

    fn wake_config() -> SegmenterConfig {
        SegmenterConfig {
            silence_samples: duration_to_samples(Duration::from_millis(600)),
            min_speech_samples: duration_to_samples(Duration::from_millis(300)),
            max_buffer_samples: Some(duration_to_samples(Duration::from_secs(15))),
        }
    }

    fn test_vad() -> EnergyVad {
        EnergyVad::new(VadConfig {
            min_silence: Duration::from_millis(800),
            min_speech: Duration::from_millis(100),
            energy_threshold: 0.03,
        })
    }

    fn speech(samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / SAMPLE_RATE as f32;
                0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    fn silence(samples: usize) -> Vec<f32> {
        vec![0.0; samples]
    }

    #[test]
    fn silence_only_never_completes() {
        let mut segmenter = UtteranceSegmenter::new(wake_config());
        let mut vad = test_vad();

        for _ in 0..100 {
            assert!(segmenter.feed(&silence(4096), &mut vad).is_none());
        }
        assert!(!segmenter.speech_detected());
    }

    #[test]
    fn speech_then_silence_completes_exactly_once() {
        let mut segmenter = UtteranceSegmenter::new(wake_config());
        let mut vad = test_vad();

        // 16 chunks of speech, 24 chunks of silence
        let mut stream = speech(16 * 512);
        stream.extend(silence(24 * 512));

        let segment = segmenter.feed(&stream, &mut vad).expect("segment");

        // Completion fires on the 19th silence chunk (9728 > 9600 samples);
        // the 128 samples beyond the threshold are dropped.
        assert_eq!(segment.len(), 16 * 512 + 9600);

        // Trailing silence alone never produces another segment
        assert!(segmenter.feed(&silence(16_000), &mut vad).is_none());
    }

    #[test]
    fn short_blip_is_discarded() {
        let mut segmenter = UtteranceSegmenter::new(wake_config());
        let mut vad = test_vad();

        // Two chunks of speech (~64ms), well under the 0.3s minimum
        let mut stream = speech(2 * 512);
        stream.extend(silence(24 * 512));

        assert!(segmenter.feed(&stream, &mut vad).is_none());
        assert!(!segmenter.speech_detected());
    }

    #[test]
    fn rolling_cap_bounds_buffer() {
        let cap = 4 * 512;
        let mut segmenter = UtteranceSegmenter::new(SegmenterConfig {
            silence_samples: duration_to_samples(Duration::from_millis(600)),
            min_speech_samples: 0,
            max_buffer_samples: Some(cap),
        });
        let mut vad = test_vad();

        for _ in 0..50 {
            segmenter.feed(&silence(512), &mut vad);
        }
        assert!(segmenter.take_buffer().len() <= cap);
    }

    #[test]
    fn partial_chunks_are_held_back() {
        let mut segmenter = UtteranceSegmenter::new(wake_config());
        let mut vad = test_vad();

        segmenter.feed(&speech(300), &mut vad);
        // Not yet a full chunk, so the VAD has seen nothing
        assert!(!segmenter.speech_detected());

        segmenter.feed(&speech(300), &mut vad);
        assert!(segmenter.speech_detected());
    }

    #[test]
    fn take_buffer_includes_partial_tail() {
        let mut segmenter = UtteranceSegmenter::new(wake_config());
        let mut vad = test_vad();

        segmenter.feed(&speech(512 + 100), &mut vad);
        assert_eq!(segmenter.take_buffer().len(), 612);
        assert!(!segmenter.speech_detected());
    }
}
