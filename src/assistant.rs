//! Dialogue controller
//!
//! Owns the turn-taking state machine and every piece of shared mutable
//! state: the assistant state, the running flag, the interaction history,
//! and the cached live context, all behind one coarse mutex. The lock is
//! held only for reads and writes, never across audio, network, or
//! inference calls.
//!
//! A single dedicated worker thread drives the loop: listen for the wake
//! phrase, capture a command, resolve it (intent table first, LLM fallback),
//! speak the reply. Cancellation is cooperative; the worker observes the
//! running flag at cycle boundaries and never aborts a turn in flight.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::audio::{AudioCapture, AudioPlayback, find_input_device, find_output_device};
use crate::config::Config;
use crate::context::{CachedSummary, ContextFetcher};
use crate::engines::SpeechEngines;
use crate::intent;
use crate::llm::{LlmClient, LlmSupervisor};
use crate::segmenter::{SegmenterConfig, UtteranceSegmenter};
use crate::Result;

/// Completed turns kept for `/status`, oldest evicted first
const INTERACTION_CAPACITY: usize = 10;

/// How often the worker drains the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// Wake phrase must appear within this many characters of the transcript
/// start to count as a wake
const WAKE_WINDOW_CHARS: usize = 30;

/// Inline commands shorter than this are treated as wake-word only
const MIN_INLINE_COMMAND_CHARS: usize = 3;

/// Spoken after a bare wake word, before command capture
const ACK_UTTERANCE: &str = "Yes?";

/// Spoken once when the worker comes up
const GREETING: &str = "LocalGuard voice assistant online.";

/// Where the assistant is in the turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantState {
    Idle,
    Listening,
    Recording,
    Thinking,
    Speaking,
}

impl std::fmt::Display for AssistantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Recording => "recording",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        };
        f.write_str(name)
    }
}

/// One completed turn, as exposed by `/status`
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    /// Unix timestamp in seconds
    pub timestamp: f64,
    pub command: String,
    pub response: String,
    /// `"intent"` or `"llm"`
    pub source: &'static str,
    /// Seconds spent in the LLM, zero on the intent path
    pub llm_time: f64,
    /// Seconds spent synthesizing and playing the reply
    pub tts_time: f64,
}

struct Shared {
    state: AssistantState,
    running: bool,
    interactions: VecDeque<Interaction>,
    context_cache: CachedSummary,
    worker: Option<JoinHandle<()>>,
}

/// The voice assistant; all mutation goes through its methods
pub struct Assistant {
    config: Config,
    shared: Mutex<Shared>,
    // Created by the worker thread; blocking HTTP clients must not be built
    // on an async runtime thread
    supervisor: Mutex<Option<LlmSupervisor>>,
}

impl Assistant {
    /// Create an idle assistant
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shared: Mutex::new(Shared {
                state: AssistantState::Idle,
                running: false,
                interactions: VecDeque::with_capacity(INTERACTION_CAPACITY),
                context_cache: CachedSummary::default(),
                worker: None,
            }),
            supervisor: Mutex::new(None),
        }
    }

    /// Start the dialogue worker; a no-op returning `false` if already running
    pub fn start(self: &Arc<Self>) -> bool {
        {
            let mut shared = self.lock();
            if shared.running {
                return false;
            }
            shared.running = true;
        }

        let assistant = Arc::clone(self);
        let handle = std::thread::spawn(move || assistant.run_worker());
        self.lock().worker = Some(handle);

        tracing::info!("assistant started");
        true
    }

    /// Request the worker to stop at its next cycle boundary
    pub fn stop(&self) {
        let mut shared = self.lock();
        if shared.running {
            shared.running = false;
            tracing::info!("stop requested");
        }
    }

    /// Stop, join the worker, and tear down a supervised inference server
    pub fn shutdown(&self) {
        self.stop();

        let handle = self.lock().worker.take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("dialogue worker panicked");
            }
        }

        let supervisor = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut supervisor) = supervisor {
            supervisor.stop();
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> AssistantState {
        self.lock().state
    }

    /// Whether the worker loop is (or is about to be) active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Configured wake phrase
    #[must_use]
    pub fn wake_word(&self) -> &str {
        &self.config.wake_word
    }

    /// Snapshot of recent turns, oldest first
    #[must_use]
    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().interactions.iter().cloned().collect()
    }

    // ---- worker ----

    fn run_worker(self: Arc<Self>) {
        tracing::info!(device = %self.config.audio_device, "dialogue worker starting");

        // Missing input hardware is the one condition fatal to the worker;
        // the control API stays up and reports idle.
        let Some(input_device) = find_input_device(&self.config.audio_device) else {
            tracing::error!(
                device = %self.config.audio_device,
                "no matching audio input device, worker exiting"
            );
            self.worker_exit();
            return;
        };

        let mut capture = match AudioCapture::new(input_device) {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!(error = %e, "audio capture setup failed, worker exiting");
                self.worker_exit();
                return;
            }
        };

        let playback = find_output_device(&self.config.audio_device).map(AudioPlayback::new);
        if playback.is_none() {
            tracing::warn!("no audio output device, responses will not be spoken");
        }

        let engines = SpeechEngines::new(self.config.engines.clone(), self.config.vad);
        if let Err(e) = engines.warm_up() {
            tracing::warn!(error = %e, "speech engine warm-up failed");
        }

        match LlmSupervisor::new(self.config.llm.clone()) {
            Ok(mut supervisor) => {
                if let Err(e) = supervisor.ensure_running() {
                    tracing::warn!(error = %e, "inference server launch failed");
                }
                *self
                    .supervisor
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(supervisor);
            }
            Err(e) => tracing::warn!(error = %e, "inference-server supervisor setup failed"),
        }

        let (fetcher, llm) = match (
            ContextFetcher::new(self.config.context.clone()),
            LlmClient::new(self.config.llm.clone()),
        ) {
            (Ok(fetcher), Ok(llm)) => (fetcher, llm),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "collaborator client setup failed, worker exiting");
                self.worker_exit();
                return;
            }
        };

        self.speak(&engines, playback.as_ref(), GREETING);

        while self.is_running() {
            if let Err(e) =
                self.listen_cycle(&mut capture, &engines, playback.as_ref(), &fetcher, &llm)
            {
                tracing::warn!(error = %e, "listen cycle failed");
                std::thread::sleep(Duration::from_secs(1));
            }
        }

        self.worker_exit();
        tracing::info!("dialogue worker stopped");
    }

    /// One wake-listen pass: capture a segment, check for the wake phrase,
    /// and run the resulting turn if there is one
    fn listen_cycle(
        &self,
        capture: &mut AudioCapture,
        engines: &SpeechEngines,
        playback: Option<&AudioPlayback>,
        fetcher: &ContextFetcher,
        llm: &LlmClient,
    ) -> Result<()> {
        self.set_state(AssistantState::Listening);
        capture.start()?;

        let mut segmenter = UtteranceSegmenter::new(SegmenterConfig {
            silence_samples: self.config.wake_silence_samples(),
            min_speech_samples: self.config.min_segment_samples(),
            max_buffer_samples: Some(self.config.wake_buffer_cap_samples()),
        });
        let mut vad = engines.vad();

        let segment = loop {
            if !self.is_running() {
                capture.stop();
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);

            let samples = capture.take_buffer();
            if let Some(segment) = segmenter.feed(&samples, &mut vad) {
                break segment;
            }
        };
        capture.stop();

        let transcript = engines.stt()?.transcribe(&segment)?;
        if transcript.is_empty() {
            return Ok(());
        }
        tracing::debug!(%transcript, "wake-listen transcript");

        let Some(inline) = extract_wake_command(&transcript, &self.config.wake_word) else {
            return Ok(());
        };
        tracing::info!(%transcript, "wake word detected");

        let command = if inline.chars().count() < MIN_INLINE_COMMAND_CHARS {
            match self.record_command(capture, engines, playback)? {
                Some(command) => command,
                None => return Ok(()),
            }
        } else {
            inline
        };

        self.handle_command(engines, playback, fetcher, llm, &command);
        Ok(())
    }

    /// Capture a command after a bare wake word
    ///
    /// Ends at the first of post-wake silence or the absolute deadline.
    fn record_command(
        &self,
        capture: &mut AudioCapture,
        engines: &SpeechEngines,
        playback: Option<&AudioPlayback>,
    ) -> Result<Option<String>> {
        self.set_state(AssistantState::Recording);
        self.speak(engines, playback, ACK_UTTERANCE);

        capture.start()?;
        let mut segmenter = UtteranceSegmenter::new(SegmenterConfig {
            silence_samples: self.config.command_silence_samples(),
            min_speech_samples: 0,
            max_buffer_samples: None,
        });
        let mut vad = engines.vad();
        let deadline = Instant::now() + self.config.max_command_duration;

        let audio = loop {
            std::thread::sleep(POLL_INTERVAL);

            let samples = capture.take_buffer();
            if let Some(segment) = segmenter.feed(&samples, &mut vad) {
                break segment;
            }
            if Instant::now() >= deadline {
                tracing::debug!("command recording deadline reached");
                break segmenter.take_buffer();
            }
        };
        capture.stop();

        if audio.is_empty() {
            return Ok(None);
        }

        let text = engines.stt()?.transcribe(&audio)?;
        let text = text.trim().to_string();
        Ok((!text.is_empty()).then_some(text))
    }

    /// Resolve a command and speak the answer
    fn handle_command(
        &self,
        engines: &SpeechEngines,
        playback: Option<&AudioPlayback>,
        fetcher: &ContextFetcher,
        llm: &LlmClient,
        command: &str,
    ) {
        self.set_state(AssistantState::Thinking);
        tracing::info!(%command, "resolving command");
        let turn_start = Instant::now();

        let (response, source, llm_time) = match intent::match_intent(command) {
            Some(key) => {
                let brief = fetcher.fetch_brief();
                let event = fetcher.fetch_latest_event();
                let response = intent::build_response(key, brief.as_ref(), event.as_ref());
                (response, "intent", Duration::ZERO)
            }
            None => {
                let context = self.live_context(fetcher);
                let llm_start = Instant::now();
                let response = match llm.query(command, context.as_deref()) {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!(error = %e, "LLM query failed");
                        format!("Sorry, I had trouble answering that: {e}")
                    }
                };
                (response, "llm", llm_start.elapsed())
            }
        };

        self.set_state(AssistantState::Speaking);
        let tts_time = self.speak(engines, playback, &response);

        #[allow(clippy::cast_precision_loss)]
        let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        self.push_interaction(Interaction {
            timestamp,
            command: command.to_string(),
            response,
            source,
            llm_time: round_secs(llm_time),
            tts_time: round_secs(tts_time),
        });

        tracing::info!(
            source,
            llm_ms = llm_time.as_millis(),
            tts_ms = tts_time.as_millis(),
            total_ms = turn_start.elapsed().as_millis(),
            "turn complete"
        );
    }

    /// Cached live-context summary for LLM grounding
    ///
    /// Fetches outside the lock; a fetch failure falls back to the last
    /// stored value, however stale.
    fn live_context(&self, fetcher: &ContextFetcher) -> Option<String> {
        let now = Instant::now();

        {
            let shared = self.lock();
            if let Some(fresh) = shared.context_cache.fresh(now, fetcher.cache_ttl()) {
                return Some(fresh.to_string());
            }
        }

        match fetcher.fetch_summary() {
            Ok(summary) => {
                self.lock().context_cache.store(summary.clone(), now);
                (!summary.is_empty()).then_some(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "context refresh failed, using stale value");
                let shared = self.lock();
                let stale = shared.context_cache.stale();
                (!stale.is_empty()).then(|| stale.to_string())
            }
        }
    }

    /// Synthesize and play text, best-effort; returns time spent
    fn speak(
        &self,
        engines: &SpeechEngines,
        playback: Option<&AudioPlayback>,
        text: &str,
    ) -> Duration {
        let Some(playback) = playback else {
            return Duration::ZERO;
        };

        let start = Instant::now();
        let result = engines
            .tts()
            .and_then(|tts| tts.synthesize(text))
            .and_then(|wav| playback.play_wav(&wav));

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to speak response");
        }
        start.elapsed()
    }

    fn push_interaction(&self, interaction: Interaction) {
        let mut shared = self.lock();
        if shared.interactions.len() == INTERACTION_CAPACITY {
            shared.interactions.pop_front();
        }
        shared.interactions.push_back(interaction);
    }

    fn set_state(&self, state: AssistantState) {
        let mut shared = self.lock();
        if shared.state != state {
            tracing::info!(from = %shared.state, to = %state, "state transition");
            shared.state = state;
        }
    }

    fn worker_exit(&self) {
        let mut shared = self.lock();
        shared.running = false;
        if shared.state != AssistantState::Idle {
            tracing::info!(from = %shared.state, to = %AssistantState::Idle, "state transition");
            shared.state = AssistantState::Idle;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Duration in seconds, rounded to two decimals for the interaction record
fn round_secs(d: Duration) -> f64 {
    (d.as_secs_f64() * 100.0).round() / 100.0
}

/// Check a transcript for the wake phrase and extract the inline command
///
/// The phrase matches at the start of the lower-cased transcript or anywhere
/// within its first 30 characters. The text after the phrase, trimmed of
/// surrounding punctuation, is returned; it may be empty (bare wake word).
#[must_use]
pub fn extract_wake_command(transcript: &str, wake_word: &str) -> Option<String> {
    let lower = transcript.to_lowercase();
    let window: String = lower.chars().take(WAKE_WINDOW_CHARS).collect();

    let position = if lower.starts_with(wake_word) {
        0
    } else {
        window.find(wake_word)?
    };

    let after = &lower[position + wake_word.len()..];
    Some(
        after
            .trim_matches(|c: char| matches!(c, ' ' | '.' | ',' | '!' | '?'))
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_word_at_start() {
        assert_eq!(
            extract_wake_command("Security, what's the status?", "security"),
            Some("what's the status".to_string())
        );
    }

    #[test]
    fn wake_word_within_window() {
        assert_eq!(
            extract_wake_command("hey there security how close", "security"),
            Some("how close".to_string())
        );
    }

    #[test]
    fn wake_word_beyond_window_is_ignored() {
        let transcript = format!("{} security report", "a".repeat(40));
        assert_eq!(extract_wake_command(&transcript, "security"), None);
    }

    #[test]
    fn bare_wake_word_yields_empty_command() {
        assert_eq!(
            extract_wake_command("Security!", "security"),
            Some(String::new())
        );
        assert_eq!(
            extract_wake_command("Security.", "security"),
            Some(String::new())
        );
    }

    #[test]
    fn no_wake_word_no_command() {
        assert_eq!(extract_wake_command("turn on the lights", "security"), None);
        assert_eq!(extract_wake_command("", "security"), None);
    }

    #[test]
    fn state_renders_lowercase() {
        assert_eq!(AssistantState::Listening.to_string(), "listening");
        assert_eq!(AssistantState::Idle.to_string(), "idle");
    }

    #[test]
    fn interaction_ring_evicts_oldest() {
        let assistant = Assistant::new(Config::default());

        for i in 0..11 {
            assistant.push_interaction(Interaction {
                timestamp: f64::from(i),
                command: format!("command {i}"),
                response: String::new(),
                source: "intent",
                llm_time: 0.0,
                tts_time: 0.0,
            });
        }

        let interactions = assistant.interactions();
        assert_eq!(interactions.len(), INTERACTION_CAPACITY);
        assert_eq!(interactions[0].command, "command 1");
        assert_eq!(interactions[9].command, "command 10");
    }

    #[test]
    fn fresh_assistant_is_idle() {
        let assistant = Assistant::new(Config::default());
        assert_eq!(assistant.state(), AssistantState::Idle);
        assert!(!assistant.is_running());
        assert!(assistant.interactions().is_empty());
    }
}
