//! Shared test utilities

use localguard_voice::config::SAMPLE_RATE;

/// Generate sine wave audio samples
#[must_use]
pub fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
#[must_use]
pub fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Build an API router over a fresh idle assistant
#[must_use]
pub fn test_router() -> axum::Router {
    let assistant = std::sync::Arc::new(localguard_voice::Assistant::new(
        localguard_voice::Config::default(),
    ));
    localguard_voice::api::router(assistant)
}
