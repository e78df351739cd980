//! Local LLM fallback
//!
//! Commands the intent table cannot answer go to a llama-server instance
//! speaking the chat-completions protocol. Replies are sanitized before
//! synthesis: the model emits `<think>` reasoning blocks that must never be
//! spoken aloud.

mod supervisor;

pub use supervisor::LlmSupervisor;

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::{Error, Result};

/// Token budget per reply; answers are spoken, so short
const MAX_TOKENS: u32 = 150;

/// Low sampling temperature for factual answers
const TEMPERATURE: f64 = 0.3;

/// Spoken when sanitization leaves nothing usable
pub const EMPTY_REPLY_FALLBACK: &str = "I'm not sure how to respond to that.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat-completions client for the local inference server
pub struct LlmClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    /// Query the model with a command and optional live context
    ///
    /// The context, when present, is prefixed as framing ahead of the
    /// command. The reply is sanitized before being returned.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a
    /// malformed reply body
    pub fn query(&self, command: &str, context: Option<&str>) -> Result<String> {
        let user_content = match context.filter(|c| !c.is_empty()) {
            Some(context) => format!("Live security context: {context}\n\nUser command: {command}"),
            None => command.to_string(),
        };

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_content,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self.client.post(&self.config.url).json(&request).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Llm(format!("inference error {status}: {body}")));
        }

        let reply: ChatResponse = response.json()?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm("reply carried no choices".to_string()))?;

        Ok(sanitize_response(&content))
    }
}

/// Strip model reasoning from a reply, leaving only speakable text
///
/// `<think>…</think>` blocks are removed. If nothing remains, the content
/// inside the first block is used instead, because a truncated reply may
/// consist of reasoning only. An empty result becomes a fixed fallback
/// sentence.
#[must_use]
pub fn sanitize_response(raw: &str) -> String {
    let stripped = strip_think_blocks(raw);
    if !stripped.is_empty() {
        return stripped;
    }

    if let Some(inner) = first_think_inner(raw) {
        if !inner.is_empty() {
            return inner.to_string();
        }
    }

    EMPTY_REPLY_FALLBACK.to_string()
}

/// Remove every closed `<think>…</think>` block; an unterminated open tag is
/// left in place
fn strip_think_blocks(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("<think>") {
        let after_open = &rest[open + "<think>".len()..];
        let Some(close) = after_open.find("</think>") else {
            break;
        };
        result.push_str(&rest[..open]);
        rest = &after_open[close + "</think>".len()..];
    }

    result.push_str(rest);
    result.trim().to_string()
}

/// The trimmed content inside the first closed `<think>` block, if any
fn first_think_inner(text: &str) -> Option<&str> {
    let open = text.find("<think>")?;
    let after_open = &text[open + "<think>".len()..];
    let close = after_open.find("</think>")?;
    Some(after_open[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_block_is_stripped() {
        assert_eq!(
            sanitize_response("<think>reasoning</think>final answer"),
            "final answer"
        );
    }

    #[test]
    fn reasoning_only_reply_extracts_inner() {
        assert_eq!(
            sanitize_response("<think>only reasoning</think>"),
            "only reasoning"
        );
    }

    #[test]
    fn empty_reply_uses_fallback() {
        assert_eq!(sanitize_response(""), EMPTY_REPLY_FALLBACK);
        assert_eq!(sanitize_response("   "), EMPTY_REPLY_FALLBACK);
        assert_eq!(sanitize_response("<think></think>"), EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn plain_reply_passes_through() {
        assert_eq!(sanitize_response("All clear."), "All clear.");
    }

    #[test]
    fn multiple_blocks_are_all_removed() {
        assert_eq!(
            sanitize_response("<think>a</think>one <think>b</think>two"),
            "one two"
        );
    }

    #[test]
    fn unterminated_tag_is_kept() {
        assert_eq!(
            sanitize_response("<think>never closed, still spoken"),
            "<think>never closed, still spoken"
        );
    }
}
