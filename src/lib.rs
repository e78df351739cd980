//! LocalGuard Voice Node - hands-free interface to the edge security network
//!
//! This library provides the core functionality for the voice node:
//! - Wake-word detection and utterance segmentation over live audio
//! - Command resolution (deterministic intent table, local LLM fallback)
//! - Live security context from the dashboard
//! - Spoken responses via the local TTS engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Operator                         │
//! │        microphone  │  speaker  │  Control API       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              LocalGuard Voice Node                   │
//! │  Segmenter │ Wake Word │ Intent Router │ Controller │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Local collaborators                     │
//! │    STT  │  TTS  │  llama-server  │  Dashboard       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod audio;
pub mod config;
pub mod context;
pub mod engines;
pub mod error;
pub mod intent;
pub mod llm;
pub mod segmenter;

pub use assistant::{Assistant, AssistantState, Interaction};
pub use config::Config;
pub use context::{Brief, ContextFetcher, TimelineEvent};
pub use error::{Error, Result};
pub use intent::IntentKey;
pub use segmenter::{SegmenterConfig, UtteranceSegmenter};
