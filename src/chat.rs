//! Chat completion client
//!
//! Talks to either a local Ollama-style server (`{base}/api/chat`, with
//! optional newline-delimited JSON streaming) or a bearer-token cloud
//! endpoint returning an OpenAI-style envelope. Failures are returned as
//! values; the controller decides how to render them in the conversation.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::session::{Message, Role};
use crate::{Error, Result};

/// Fixed assistant text substituted when the endpoint is unreachable
pub const CONNECT_FALLBACK: &str =
    "Error: could not reach the chat endpoint. Make sure the model server is running.";

/// Where completions come from
#[derive(Debug, Clone)]
pub enum ChatProvider {
    /// Local chat server speaking the `/api/chat` protocol
    Local {
        /// Server base URL, e.g. `http://localhost:11434`
        base_url: String,
    },
    /// Hosted endpoint with bearer-token auth and an OpenAI-style response
    Cloud {
        /// Full endpoint URL
        url: String,
        /// Bearer token
        api_key: String,
    },
}

/// Requests completions for a conversation history
pub struct ChatClient {
    client: reqwest::Client,
    provider: ChatProvider,
    model: String,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct LocalChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct LocalChatReply {
    message: Option<LocalChatMessage>,
}

#[derive(Deserialize)]
struct LocalChatMessage {
    content: String,
}

#[derive(Serialize)]
struct CloudChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct CloudChatReply {
    choices: Vec<CloudChoice>,
}

#[derive(Deserialize)]
struct CloudChoice {
    message: CloudChoiceMessage,
}

#[derive(Deserialize)]
struct CloudChoiceMessage {
    content: String,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        provider: ChatProvider,
        model: String,
        stream: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            provider,
            model,
            stream,
        })
    }

    /// Request a completion for the given history
    ///
    /// `on_delta` receives each text fragment as it arrives when the local
    /// provider streams; for non-streamed responses it is called once with
    /// the whole reply.
    ///
    /// # Errors
    ///
    /// Returns error on connection failure, non-success status, or a
    /// malformed response body
    pub async fn complete(
        &self,
        system_prompt: Option<&str>,
        history: &[Message],
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let reply = match &self.provider {
            ChatProvider::Local { base_url } => {
                let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
                if self.stream {
                    return self
                        .complete_local_streamed(&url, system_prompt, history, on_delta)
                        .await;
                }
                self.complete_local(&url, system_prompt, history).await?
            }
            ChatProvider::Cloud { url, api_key } => {
                self.complete_cloud(url, api_key, system_prompt, history)
                    .await?
            }
        };

        on_delta(&reply);
        Ok(reply)
    }

    /// Single-object local response
    async fn complete_local(
        &self,
        url: &str,
        system_prompt: Option<&str>,
        history: &[Message],
    ) -> Result<String> {
        let request = LocalChatRequest {
            model: &self.model,
            messages: wire_messages(system_prompt, history),
            stream: false,
        };

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        tracing::debug!(status = %status, "chat response received");

        if !status.is_success() {
            return Err(status_error(status));
        }

        let reply: LocalChatReply = response.json().await?;
        Ok(reply.message.map(|m| m.content).unwrap_or_default())
    }

    /// Newline-delimited JSON local response, fragments surfaced as they arrive
    async fn complete_local_streamed(
        &self,
        url: &str,
        system_prompt: Option<&str>,
        history: &[Message],
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String> {
        let request = LocalChatRequest {
            model: &self.model,
            messages: wire_messages(system_prompt, history),
            stream: true,
        };

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        tracing::debug!(status = %status, "chat stream opened");

        if !status.is_success() {
            return Err(status_error(status));
        }

        let mut body = response.bytes_stream();
        // Split on raw newlines; a UTF-8 character may straddle chunks
        let mut pending: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(chunk) = body.next().await {
            pending.extend_from_slice(&chunk?);

            while let Some(newline) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                if let Some(delta) = parse_stream_line(&String::from_utf8_lossy(&line)) {
                    reply.push_str(&delta);
                    on_delta(&delta);
                }
            }
        }

        // Servers are not required to terminate the last fragment with a newline
        if let Some(delta) = parse_stream_line(&String::from_utf8_lossy(&pending)) {
            reply.push_str(&delta);
            on_delta(&delta);
        }

        tracing::debug!(reply_len = reply.len(), "chat stream complete");
        Ok(reply)
    }

    /// OpenAI-style cloud response
    async fn complete_cloud(
        &self,
        url: &str,
        api_key: &str,
        system_prompt: Option<&str>,
        history: &[Message],
    ) -> Result<String> {
        let request = CloudChatRequest {
            model: &self.model,
            messages: wire_messages(system_prompt, history),
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "chat response received");

        if !status.is_success() {
            return Err(status_error(status));
        }

        let reply: CloudChatReply = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Chat("response contained no choices".to_string()))
    }

    /// The configured model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Map a chat failure to the in-band assistant text shown for it
///
/// Connection-class failures yield a fixed apology string; other failures
/// embed their description, including the status code for non-success
/// responses.
#[must_use]
pub fn fallback_text(err: &Error) -> String {
    match err {
        Error::Http(e) if e.is_connect() || e.is_timeout() => CONNECT_FALLBACK.to_string(),
        Error::Chat(msg) => format!("Error: {msg}"),
        other => format!("Error: {other}"),
    }
}

/// Error for a non-success chat response status
fn status_error(status: reqwest::StatusCode) -> Error {
    Error::Chat(format!(
        "chat endpoint returned status {}",
        status.as_u16()
    ))
}

/// Extract the text fragment from one NDJSON stream line
///
/// Lines without a `message.content` field (keepalives, the final `done`
/// marker, or garbage) yield `None`.
fn parse_stream_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let fragment: LocalChatReply = serde_json::from_str(line).ok()?;
    fragment.message.map(|m| m.content)
}

/// Build the wire message list: optional system prompt, then the history
fn wire_messages<'a>(
    system_prompt: Option<&'a str>,
    history: &'a [Message],
) -> Vec<WireMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 1);

    if let Some(prompt) = system_prompt {
        messages.push(WireMessage {
            role: "system",
            content: prompt,
        });
    }

    for message in history {
        messages.push(WireMessage {
            role: role_name(message.role),
            content: &message.content,
        });
    }

    messages
}

/// Wire name for a history role
const fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::History;

    #[test]
    fn stream_line_with_content_yields_delta() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert_eq!(parse_stream_line(line).as_deref(), Some("Hel"));
    }

    #[test]
    fn done_marker_and_garbage_yield_nothing() {
        assert_eq!(parse_stream_line(r#"{"done":true}"#), None);
        assert_eq!(parse_stream_line(""), None);
        assert_eq!(parse_stream_line("not json"), None);
    }

    #[test]
    fn wire_messages_lead_with_system_prompt() {
        let mut history = History::new();
        history.push_user("hello");
        history.push_assistant("hi");

        let wire = wire_messages(Some("be brief"), history.recent());
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[0].content, "be brief");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
    }

    #[test]
    fn wire_messages_without_system_prompt() {
        let mut history = History::new();
        history.push_user("hello");

        let wire = wire_messages(None, history.recent());
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
    }

    #[test]
    fn status_failure_text_embeds_code() {
        let err = status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            fallback_text(&err),
            "Error: chat endpoint returned status 500"
        );
    }
}
