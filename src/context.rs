//! Dashboard context fetching
//!
//! Two independent reads back the Intent Router: a structured brief and the
//! most recent timeline event, fetched fresh on every invocation. The LLM
//! fallback path instead uses a short-TTL cached text summary, trading
//! freshness for reduced load on the dashboard.
//!
//! Collaborator payloads are validated into optional-field structs at this
//! boundary; untyped JSON never propagates further.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::config::ContextConfig;
use crate::{Error, Result};

/// Maximum length of the cached live-context summary
pub const MAX_SUMMARY_CHARS: usize = 260;

/// Structured situational brief from the dashboard; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Brief {
    pub alert_level: Option<String>,
    pub risk_score: Option<f64>,
    pub person_count: Option<i64>,
    pub nearest_person_m: Option<f64>,
    #[serde(default)]
    pub objects_of_interest: Vec<String>,
    pub scene_summary: Option<String>,
    pub last_event: Option<String>,
}

/// One timeline event from the dashboard
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEvent {
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<TimelineEvent>,
}

/// Fetches and converts dashboard context payloads
pub struct ContextFetcher {
    client: reqwest::blocking::Client,
    config: ContextConfig,
}

impl ContextFetcher {
    /// Create a fetcher with the configured endpoints and timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: ContextConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    /// Fetch the structured brief; `None` on any failure
    #[must_use]
    pub fn fetch_brief(&self) -> Option<Brief> {
        match self.fetch_json::<Brief>(&self.config.brief_url) {
            Ok(brief) => Some(brief),
            Err(e) => {
                tracing::warn!(error = %e, "brief fetch failed");
                None
            }
        }
    }

    /// Fetch the most recent timeline event; `None` on failure or empty feed
    #[must_use]
    pub fn fetch_latest_event(&self) -> Option<TimelineEvent> {
        match self.fetch_json::<EventsResponse>(&self.config.events_url) {
            Ok(response) => response.events.into_iter().next(),
            Err(e) => {
                tracing::warn!(error = %e, "event fetch failed");
                None
            }
        }
    }

    /// Fetch a fresh text summary for LLM grounding
    ///
    /// # Errors
    ///
    /// Returns error when the brief cannot be fetched; the caller falls back
    /// to the cached value
    pub fn fetch_summary(&self) -> Result<String> {
        let brief = self.fetch_json::<Brief>(&self.config.brief_url)?;
        let event = self.fetch_latest_event();
        Ok(summarize(&brief, event.as_ref()))
    }

    /// Time-to-live for the cached summary
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        self.config.cache_ttl
    }

    fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Context(format!("{url} returned {status}")));
        }
        Ok(response.json()?)
    }
}

/// Render a brief plus optional event into a bounded one-line summary
fn summarize(brief: &Brief, event: Option<&TimelineEvent>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(level) = &brief.alert_level {
        parts.push(format!("alert {level}"));
    }
    if let Some(score) = brief.risk_score {
        parts.push(format!("risk {score:.0}"));
    }
    if let Some(count) = brief.person_count {
        parts.push(format!("{count} people"));
    }
    if let Some(dist) = brief.nearest_person_m {
        parts.push(format!("nearest {dist:.1}m"));
    }
    if !brief.objects_of_interest.is_empty() {
        parts.push(format!("objects: {}", brief.objects_of_interest.join(", ")));
    }
    if let Some(scene) = &brief.scene_summary {
        if !scene.is_empty() {
            parts.push(scene.clone());
        }
    }
    if let Some(message) = event.and_then(|e| e.message.as_ref()) {
        parts.push(format!("last event: {message}"));
    } else if let Some(last) = &brief.last_event {
        parts.push(format!("last event: {last}"));
    }

    truncate_chars(&parts.join("; "), MAX_SUMMARY_CHARS)
}

/// Truncate to at most `max` characters on a char boundary
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

/// Cached text value with a time-to-live
///
/// The cache itself is plain data; the dialogue controller keeps it inside
/// its single shared-state lock and refreshes it outside the lock.
#[derive(Debug, Clone, Default)]
pub struct CachedSummary {
    value: String,
    fetched_at: Option<Instant>,
}

impl CachedSummary {
    /// Get the cached value if it is still fresh at `now`
    #[must_use]
    pub fn fresh(&self, now: Instant, ttl: Duration) -> Option<&str> {
        let fetched_at = self.fetched_at?;
        (now.duration_since(fetched_at) < ttl).then_some(self.value.as_str())
    }

    /// The last stored value regardless of age; empty before the first store
    #[must_use]
    pub fn stale(&self) -> &str {
        &self.value
    }

    /// Store a freshly fetched value
    pub fn store(&mut self, value: String, now: Instant) {
        self.value = value;
        self.fetched_at = Some(now);
    }
}
