//! Configuration for the LocalGuard voice node
//!
//! Every option is read from a `LOCALGUARD_*` environment variable and falls
//! back to a documented default when absent or unparseable. Startup never
//! fails on bad configuration.

use std::time::Duration;

/// Sample rate for all audio processing (16kHz mono for speech)
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per VAD chunk (~32ms at 16kHz)
pub const CHUNK_SIZE: usize = 512;

/// Voice node configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Wake phrase that activates command capture
    pub wake_word: String,

    /// Name substring used to locate the USB headset (input and output)
    pub audio_device: String,

    /// Silence that ends command recording after the wake word
    pub silence_after_wake: Duration,

    /// Silence that ends a segment while listening for the wake word
    pub wake_silence: Duration,

    /// Minimum speech length for a segment to be transcribed
    pub min_segment: Duration,

    /// Hard cap on command recording length
    pub max_command_duration: Duration,

    /// Rolling wake-listen buffer cap
    pub wake_buffer_cap: Duration,

    /// Voice activity configuration passed to the VAD engine
    pub vad: VadConfig,

    /// Speech engine endpoints
    pub engines: EngineConfig,

    /// Local LLM configuration
    pub llm: LlmConfig,

    /// Dashboard context service configuration
    pub context: ContextConfig,

    /// Control API port
    pub port: u16,
}

/// Voice activity detection configuration
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// Minimum silence duration the engine is tuned for
    pub min_silence: Duration,

    /// Minimum speech duration the engine is tuned for
    pub min_speech: Duration,

    /// RMS energy threshold above which a chunk counts as speech
    pub energy_threshold: f32,
}

/// Speech engine endpoints (STT and TTS are external collaborators)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Transcription endpoint (multipart WAV in, `{"text": ...}` out)
    pub stt_url: String,

    /// Synthesis endpoint (`{"text": ...}` in, WAV bytes out)
    pub tts_url: String,

    /// Per-request timeout for both engines
    pub timeout: Duration,
}

/// Local LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    pub url: String,

    /// Health endpoint of the inference server
    pub health_url: String,

    /// Model identifier sent with each request
    pub model: String,

    /// System prompt for every query
    pub system_prompt: String,

    /// Request timeout
    pub timeout: Duration,

    /// Path to the llama-server binary
    pub server_bin: String,

    /// Path to the GGUF model file
    pub model_path: String,

    /// CPU affinity range passed to taskset (e.g. "4-7")
    pub cpu_affinity: String,
}

/// Dashboard context service configuration
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Structured brief endpoint
    pub brief_url: String,

    /// Most-recent-events endpoint
    pub events_url: String,

    /// Per-fetch timeout
    pub timeout: Duration,

    /// Time-to-live of the cached text summary
    pub cache_ttl: Duration,
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a security assistant for LocalGuard, a distributed \
     edge AI monitoring system. Answer concisely in 1-3 sentences. Be direct and helpful. \
     /no_think";

impl Default for Config {
    fn default() -> Self {
        Self {
            wake_word: "security".to_string(),
            audio_device: "Blackwire".to_string(),
            silence_after_wake: Duration::from_millis(800),
            wake_silence: Duration::from_millis(600),
            min_segment: Duration::from_millis(300),
            max_command_duration: Duration::from_secs(10),
            wake_buffer_cap: Duration::from_secs(15),
            vad: VadConfig {
                min_silence: Duration::from_millis(800),
                min_speech: Duration::from_millis(100),
                energy_threshold: 0.03,
            },
            engines: EngineConfig {
                stt_url: "http://127.0.0.1:8090/transcribe".to_string(),
                tts_url: "http://127.0.0.1:8091/synthesize".to_string(),
                timeout: Duration::from_secs(30),
            },
            llm: LlmConfig {
                url: "http://127.0.0.1:8081/v1/chat/completions".to_string(),
                health_url: "http://127.0.0.1:8081/health".to_string(),
                model: "qwen3-1.7b".to_string(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                timeout: Duration::from_secs(30),
                server_bin: "~/test_llm/llama.cpp/build/bin/llama-server".to_string(),
                model_path: "~/test_llm/models/qwen3-1.7b/Qwen3-1.7B-Q8_0.gguf".to_string(),
                cpu_affinity: "4-7".to_string(),
            },
            context: ContextConfig {
                brief_url: "http://127.0.0.1:3000/api/insights/brief".to_string(),
                events_url: "http://127.0.0.1:3000/api/events?limit=1".to_string(),
                timeout: Duration::from_millis(1200),
                cache_ttl: Duration::from_secs(2),
            },
            port: 8070,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            wake_word: env_string("LOCALGUARD_WAKE_WORD", &defaults.wake_word).to_lowercase(),
            audio_device: env_string("LOCALGUARD_AUDIO_DEVICE", &defaults.audio_device),
            silence_after_wake: env_secs(
                "LOCALGUARD_SILENCE_AFTER_WAKE",
                defaults.silence_after_wake,
            ),
            wake_silence: env_secs("LOCALGUARD_WAKE_SILENCE", defaults.wake_silence),
            min_segment: defaults.min_segment,
            max_command_duration: env_secs(
                "LOCALGUARD_MAX_COMMAND_SECS",
                defaults.max_command_duration,
            ),
            wake_buffer_cap: defaults.wake_buffer_cap,
            vad: defaults.vad,
            engines: EngineConfig {
                stt_url: env_string("LOCALGUARD_STT_URL", &defaults.engines.stt_url),
                tts_url: env_string("LOCALGUARD_TTS_URL", &defaults.engines.tts_url),
                timeout: defaults.engines.timeout,
            },
            llm: LlmConfig {
                url: env_string("LOCALGUARD_LLM_URL", &defaults.llm.url),
                health_url: env_string("LOCALGUARD_LLM_HEALTH_URL", &defaults.llm.health_url),
                model: env_string("LOCALGUARD_LLM_MODEL", &defaults.llm.model),
                system_prompt: defaults.llm.system_prompt,
                timeout: defaults.llm.timeout,
                server_bin: env_string("LOCALGUARD_LLM_SERVER_BIN", &defaults.llm.server_bin),
                model_path: env_string("LOCALGUARD_LLM_MODEL_PATH", &defaults.llm.model_path),
                cpu_affinity: env_string("LOCALGUARD_LLM_CPU_AFFINITY", &defaults.llm.cpu_affinity),
            },
            context: ContextConfig {
                brief_url: env_string("LOCALGUARD_BRIEF_URL", &defaults.context.brief_url),
                events_url: env_string("LOCALGUARD_EVENTS_URL", &defaults.context.events_url),
                timeout: env_secs("LOCALGUARD_CONTEXT_TIMEOUT", defaults.context.timeout),
                cache_ttl: env_secs("LOCALGUARD_CONTEXT_TTL", defaults.context.cache_ttl),
            },
            port: defaults.port,
        }
    }

    /// Wake-listen silence threshold in samples
    #[must_use]
    pub fn wake_silence_samples(&self) -> usize {
        duration_to_samples(self.wake_silence)
    }

    /// Post-wake silence threshold in samples
    #[must_use]
    pub fn command_silence_samples(&self) -> usize {
        duration_to_samples(self.silence_after_wake)
    }

    /// Minimum segment length in samples
    #[must_use]
    pub fn min_segment_samples(&self) -> usize {
        duration_to_samples(self.min_segment)
    }

    /// Rolling wake-listen buffer cap in samples
    #[must_use]
    pub fn wake_buffer_cap_samples(&self) -> usize {
        duration_to_samples(self.wake_buffer_cap)
    }
}

/// Convert a duration to a sample count at the fixed capture rate
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn duration_to_samples(d: Duration) -> usize {
    (d.as_secs_f64() * f64::from(SAMPLE_RATE)) as usize
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key).map_or(default, |v| parse_secs(&v, default))
}

/// Parse a duration in (possibly fractional) seconds; invalid values fall back
fn parse_secs(value: &str, default: Duration) -> Duration {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(default, Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.wake_word, "security");
        assert_eq!(config.silence_after_wake, Duration::from_millis(800));
        assert_eq!(config.max_command_duration, Duration::from_secs(10));
        assert_eq!(config.context.timeout, Duration::from_millis(1200));
        assert_eq!(config.context.cache_ttl, Duration::from_secs(2));
        assert_eq!(config.port, 8070);
    }

    #[test]
    fn duration_sample_conversion() {
        assert_eq!(duration_to_samples(Duration::from_secs(1)), 16_000);
        assert_eq!(duration_to_samples(Duration::from_millis(600)), 9_600);
        assert_eq!(duration_to_samples(Duration::from_millis(300)), 4_800);
    }

    #[test]
    fn invalid_secs_fall_back() {
        let default = Duration::from_millis(800);
        assert_eq!(parse_secs("not-a-number", default), default);
        assert_eq!(parse_secs("-3", default), default);
        assert_eq!(parse_secs("NaN", default), default);
        assert_eq!(parse_secs("1.5", default), Duration::from_millis(1500));
        assert_eq!(parse_secs(" 0.6 ", default), Duration::from_millis(600));
    }

    #[test]
    fn absent_env_uses_defaults() {
        // None of the LOCALGUARD_* variables are set in the test environment
        let config = Config::from_env();
        assert_eq!(config.wake_word, Config::default().wake_word);
        assert_eq!(config.llm.model, Config::default().llm.model);
    }
}
