//! Conversation session state
//!
//! Holds the per-conversation data the controller owns: the message
//! history, the recording state machine, and the speaking gate that blocks
//! a new recording while synthesized audio is playing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Number of most-recent history entries sent with each chat request
pub const HISTORY_WINDOW: usize = 10;

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The practicing user
    User,
    /// The AI conversation partner
    Assistant,
}

/// One conversation turn entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    /// Message author
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only conversation history
///
/// The full transcript is retained for display; [`History::recent`] is the
/// request-time view, trimmed to the last [`HISTORY_WINDOW`] entries with
/// the oldest evicted first.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    /// Create an empty history
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Drop all entries (new conversation)
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Full transcript, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent [`HISTORY_WINDOW`] entries, for the chat request
    #[must_use]
    pub fn recent(&self) -> &[Message] {
        let start = self.messages.len().saturating_sub(HISTORY_WINDOW);
        &self.messages[start..]
    }

    /// Number of entries in the full transcript
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Recording lifecycle of the active conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// No capture in progress; the record action is available
    #[default]
    Idle,
    /// Microphone stream open, samples accumulating
    Recording,
    /// Capture stopped; transcription and the reply round trip are running
    Processing,
}

/// Gate blocking a new recording while synthesized audio plays
///
/// Set before synthesis starts and cleared when the guard drops, whether
/// playback succeeded or failed.
#[derive(Debug, Clone, Default)]
pub struct SpeakingGate {
    speaking: Arc<AtomicBool>,
}

impl SpeakingGate {
    /// Create a clear gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether synthesized audio is currently being produced or played
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Raise the gate for the lifetime of the returned guard
    #[must_use]
    pub fn begin(&self) -> SpeakingGuard {
        self.speaking.store(true, Ordering::SeqCst);
        SpeakingGuard {
            speaking: Arc::clone(&self.speaking),
        }
    }
}

/// Clears the speaking gate on drop
#[derive(Debug)]
pub struct SpeakingGuard {
    speaking: Arc<AtomicBool>,
}

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        self.speaking.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_everything_when_short() {
        let mut history = History::new();
        history.push_user("hello");
        history.push_assistant("hi there");

        assert_eq!(history.recent().len(), 2);
        assert_eq!(history.recent()[0].role, Role::User);
    }

    #[test]
    fn recent_trims_to_window_oldest_first() {
        let mut history = History::new();
        for i in 0..15 {
            history.push_user(format!("turn {i}"));
        }

        let recent = history.recent();
        assert_eq!(recent.len(), HISTORY_WINDOW);
        assert_eq!(recent[0].content, "turn 5");
        assert_eq!(recent[HISTORY_WINDOW - 1].content, "turn 14");
        // Full transcript untouched by the request-time view
        assert_eq!(history.len(), 15);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = History::new();
        history.push_user("hello");
        history.clear();

        assert!(history.is_empty());
        assert!(history.recent().is_empty());
    }

    #[test]
    fn speaking_gate_clears_on_guard_drop() {
        let gate = SpeakingGate::new();
        assert!(!gate.is_speaking());

        {
            let _guard = gate.begin();
            assert!(gate.is_speaking());
        }

        assert!(!gate.is_speaking());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
