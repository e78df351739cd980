//! Voice pipeline integration tests
//!
//! Tests segmentation, voice-activity detection, and wake-phrase handling
//! without requiring audio hardware.

use std::time::Duration;

use localguard_voice::assistant::extract_wake_command;
use localguard_voice::config::{VadConfig, duration_to_samples};
use localguard_voice::engines::{EnergyVad, VoiceActivity};
use localguard_voice::{SegmenterConfig, UtteranceSegmenter};

#[allow(dead_code)]
mod common;
use common::{generate_silence, generate_sine_samples};

fn test_vad() -> EnergyVad {
    EnergyVad::new(VadConfig {
        min_silence: Duration::from_millis(800),
        min_speech: Duration::from_millis(100),
        energy_threshold: 0.03,
    })
}

fn wake_segmenter() -> UtteranceSegmenter {
    UtteranceSegmenter::new(SegmenterConfig {
        silence_samples: duration_to_samples(Duration::from_millis(600)),
        min_speech_samples: duration_to_samples(Duration::from_millis(300)),
        max_buffer_samples: Some(duration_to_samples(Duration::from_secs(15))),
    })
}

#[test]
fn vad_classifies_tone_and_silence() {
    let mut vad = test_vad();

    let tone = generate_sine_samples(440.0, 0.032, 0.3);
    assert!(vad.is_speech(&tone));

    let silence = generate_silence(0.032);
    assert!(!vad.is_speech(&silence));

    // Low-amplitude hum stays below the energy threshold
    let hum = generate_sine_samples(50.0, 0.032, 0.005);
    assert!(!vad.is_speech(&hum));
}

#[test]
fn streamed_utterance_produces_one_segment() {
    let mut segmenter = wake_segmenter();
    let mut vad = test_vad();

    // 0.512s of tone followed by 1s of silence, fed in small pushes the way
    // the capture callback delivers audio
    let mut stream = generate_sine_samples(440.0, 0.512, 0.3);
    stream.extend(generate_silence(1.0));

    let mut segments = Vec::new();
    for push in stream.chunks(160) {
        if let Some(segment) = segmenter.feed(push, &mut vad) {
            segments.push(segment);
        }
    }

    assert_eq!(segments.len(), 1);
    // Speech plus the 0.6s silence tail up to the threshold, nothing beyond
    assert_eq!(segments[0].len(), 8192 + 9600);
}

#[test]
fn silence_only_stream_never_segments() {
    let mut segmenter = wake_segmenter();
    let mut vad = test_vad();

    for push in generate_silence(3.0).chunks(160) {
        assert!(segmenter.feed(push, &mut vad).is_none());
    }
    assert!(!segmenter.speech_detected());
}

#[test]
fn command_recording_completes_on_post_wake_silence() {
    // Command recording uses the post-wake threshold and no minimum length
    let mut segmenter = UtteranceSegmenter::new(SegmenterConfig {
        silence_samples: duration_to_samples(Duration::from_millis(800)),
        min_speech_samples: 0,
        max_buffer_samples: None,
    });
    let mut vad = test_vad();

    let mut stream = generate_sine_samples(300.0, 0.256, 0.2);
    stream.extend(generate_silence(1.2));

    let mut segments = Vec::new();
    for push in stream.chunks(512) {
        if let Some(segment) = segmenter.feed(push, &mut vad) {
            segments.push(segment);
        }
    }

    assert_eq!(segments.len(), 1);
    assert!(!segments[0].is_empty());
}

#[test]
fn wake_phrase_with_inline_command() {
    let command = extract_wake_command("Security how many people are outside", "security");
    assert_eq!(command.as_deref(), Some("how many people are outside"));
}

#[test]
fn wake_phrase_alone_requests_followup() {
    let command = extract_wake_command("security", "security");
    assert_eq!(command.as_deref(), Some(""));
}

#[test]
fn unrelated_speech_is_discarded() {
    assert!(extract_wake_command("nothing to see here", "security").is_none());
}

#[test]
fn wake_phrase_deep_in_long_transcript_is_ignored() {
    let transcript = "the guard said something about the perimeter security system";
    assert!(extract_wake_command(transcript, "security").is_none());
}
