//! Conversation controller
//!
//! Owns the state of one practice conversation: the transcript, the
//! recording state machine, and the speaking gate. Each turn is
//! transcript in, chat round trip, reply out; chat failures are rendered
//! as the assistant's turn text instead of being raised, so a dead model
//! server becomes visible conversation content rather than a crash.

use std::path::Path;

use crate::chat::{self, ChatClient};
use crate::scenario::Scenario;
use crate::session::{History, RecordingState, SpeakingGate};
use crate::voice::{AudioPlayback, TextToSpeech};
use crate::{Error, Result};

/// Drives the turn-taking loop of a practice conversation
pub struct ConversationController {
    chat: ChatClient,
    scenario: Option<Scenario>,
    history: History,
    recording: RecordingState,
    speaking: SpeakingGate,
}

impl ConversationController {
    /// Create a controller with no active conversation
    #[must_use]
    pub fn new(chat: ChatClient) -> Self {
        Self {
            chat,
            scenario: None,
            history: History::new(),
            recording: RecordingState::Idle,
            speaking: SpeakingGate::new(),
        }
    }

    /// Start a conversation for a scenario
    ///
    /// Resets the transcript, submits the scenario's opening prompt as the
    /// first user turn, and returns the assistant's opener. `on_delta`
    /// receives reply text incrementally for display.
    pub async fn start_conversation(
        &mut self,
        scenario: Scenario,
        on_delta: &mut dyn FnMut(&str),
    ) -> String {
        tracing::info!(scenario = %scenario.name, "starting conversation");

        self.history.clear();
        self.recording = RecordingState::Idle;
        self.history.push_user(scenario.opening_prompt.clone());
        self.scenario = Some(scenario);

        self.request_reply(on_delta).await
    }

    /// Submit a transcribed user utterance and return the assistant's reply
    pub async fn submit_user_utterance(
        &mut self,
        text: &str,
        on_delta: &mut dyn FnMut(&str),
    ) -> String {
        self.history.push_user(text);
        self.request_reply(on_delta).await
    }

    /// Run the chat round trip and append the assistant turn
    ///
    /// On failure the in-band error text becomes the assistant turn.
    async fn request_reply(&mut self, on_delta: &mut dyn FnMut(&str)) -> String {
        let system_prompt = self.scenario.as_ref().map(|s| s.system_prompt.as_str());

        let reply = match self
            .chat
            .complete(system_prompt, self.history.recent(), on_delta)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                let text = chat::fallback_text(&e);
                on_delta(&text);
                text
            }
        };

        self.history.push_assistant(reply.clone());
        reply
    }

    /// Whether the record action is currently available
    ///
    /// Requires an active conversation, `RecordingState::Idle`, and a
    /// clear speaking gate.
    #[must_use]
    pub fn can_record(&self) -> bool {
        self.scenario.is_some()
            && self.recording == RecordingState::Idle
            && !self.speaking.is_speaking()
    }

    /// Transition Idle → Recording
    ///
    /// # Errors
    ///
    /// Returns error if no conversation is active, a recording or the
    /// previous turn is still in flight, or the assistant is speaking
    pub fn begin_recording(&mut self) -> Result<()> {
        if self.scenario.is_none() {
            return Err(Error::Config("no active conversation".to_string()));
        }
        if self.speaking.is_speaking() {
            return Err(Error::Audio("assistant is still speaking".to_string()));
        }
        match self.recording {
            RecordingState::Idle => {
                self.recording = RecordingState::Recording;
                Ok(())
            }
            RecordingState::Recording => {
                Err(Error::Audio("a recording is already in progress".to_string()))
            }
            RecordingState::Processing => Err(Error::Audio(
                "still processing the previous turn".to_string(),
            )),
        }
    }

    /// Transition Recording → Processing
    ///
    /// # Errors
    ///
    /// Returns error if no recording is in progress
    pub fn finish_recording(&mut self) -> Result<()> {
        if self.recording != RecordingState::Recording {
            return Err(Error::Audio("no recording in progress".to_string()));
        }

        self.recording = RecordingState::Processing;
        Ok(())
    }

    /// Transition Processing → Idle once the turn's round trip is done
    pub fn finish_turn(&mut self) {
        self.recording = RecordingState::Idle;
    }

    /// Full transcript of the active conversation
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current recording state
    #[must_use]
    pub const fn recording_state(&self) -> RecordingState {
        self.recording
    }

    /// The gate blocking recording during synthesized speech
    #[must_use]
    pub const fn speaking_gate(&self) -> &SpeakingGate {
        &self.speaking
    }

    /// The active scenario, if a conversation has started
    #[must_use]
    pub const fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }
}

/// Screen a transcription result before it reaches the model
///
/// `None` means the turn is skipped: the service failed or produced
/// nothing intelligible. No model call is made for a skipped turn.
#[must_use]
pub fn usable_transcript(result: Result<String>) -> Option<String> {
    match result {
        Ok(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                tracing::debug!("empty transcript, skipping turn");
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "transcription failed, skipping turn");
            None
        }
    }
}

/// Synthesize a reply, persist the artifact, and play it
///
/// The speaking gate stays raised until playback has finished, clearing
/// on every exit path.
///
/// # Errors
///
/// Returns error if synthesis, persisting, or playback fails
pub async fn speak(
    tts: &TextToSpeech,
    playback: &AudioPlayback,
    gate: &SpeakingGate,
    artifact_dir: &Path,
    text: &str,
) -> Result<()> {
    let _guard = gate.begin();

    let audio = tts.synthesize(text).await?;

    let path = artifact_dir.join(audio.format.reply_file_name());
    std::fs::write(&path, &audio.bytes)?;
    tracing::debug!(path = %path.display(), bytes = audio.bytes.len(), "reply audio written");

    playback.play(&audio).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_failed_transcripts_are_unusable() {
        assert_eq!(usable_transcript(Ok(String::new())), None);
        assert_eq!(usable_transcript(Ok("   \n".to_string())), None);
        assert_eq!(
            usable_transcript(Err(Error::Stt("request failed".to_string()))),
            None
        );
    }

    #[test]
    fn transcripts_are_trimmed() {
        assert_eq!(
            usable_transcript(Ok("  hello there \n".to_string())).as_deref(),
            Some("hello there")
        );
    }
}
