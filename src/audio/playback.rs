//! Audio playback to the headset speaker

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Plays WAV audio on a named output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Create a playback instance bound to `device`
    #[must_use]
    pub const fn new(device: Device) -> Self {
        Self { device }
    }

    /// Decode and play a mono PCM WAV clip, blocking until finished
    ///
    /// # Errors
    ///
    /// Returns error if the WAV cannot be decoded or no matching output
    /// stream can be opened
    pub fn play_wav(&self, wav_bytes: &[u8]) -> Result<()> {
        let (samples, sample_rate) = decode_wav(wav_bytes)?;
        self.play_samples(&samples, sample_rate)
    }

    /// Play raw f32 samples at the given rate, blocking until finished
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output config exists or the stream fails
    pub fn play_samples(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let supported_config = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .or_else(|| {
                // Fallback: stereo, duplicating the mono signal
                self.device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(sample_rate)
                        && c.max_sample_rate() >= SampleRate(sample_rate)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();
        let channels = config.channels as usize;

        let queue = Arc::new(Mutex::new(samples.to_vec()));
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));

        let queue_cb = Arc::clone(&queue);
        let position_cb = Arc::clone(&position);
        let finished_cb = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let (Ok(samples), Ok(mut pos)) = (queue_cb.lock(), position_cb.lock()) else {
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples.len() {
                            let s = samples[*pos];
                            *pos += 1;
                            s
                        } else {
                            if let Ok(mut done) = finished_cb.lock() {
                                *done = true;
                            }
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Wait for the callback to run out of samples, bounded by the clip
        // length plus a grace period
        let sample_count = samples.len();
        let duration_ms = (sample_count as u64 * 1000) / u64::from(sample_rate);
        let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

        while !finished.lock().map(|done| *done).unwrap_or(true) {
            if Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        std::thread::sleep(Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = sample_count, "playback complete");

        Ok(())
    }
}

/// Decode WAV bytes to mono f32 samples and the source sample rate
fn decode_wav(wav_bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::new(Cursor::new(wav_bytes)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .filter_map(std::result::Result::ok)
                .map(|s| f32::from(s) / max)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .filter_map(std::result::Result::ok)
            .collect(),
    };

    // Downmix interleaved channels to mono if needed
    let mono = if spec.channels > 1 {
        let channels = usize::from(spec.channels);
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::samples_to_wav;

    #[test]
    fn wav_decode_roundtrip() {
        let original: Vec<f32> = vec![0.0, 0.25, -0.25, 0.5, -0.5];
        let wav = samples_to_wav(&original, 16_000).unwrap();

        let (decoded, rate) = decode_wav(&wav).unwrap();
        assert_eq!(rate, 16_000);
        assert_eq!(decoded.len(), original.len());
        for (a, b) in decoded.iter().zip(&original) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn wav_decode_rejects_garbage() {
        assert!(decode_wav(&[0u8; 16]).is_err());
    }
}
