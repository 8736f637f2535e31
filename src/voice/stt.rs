//! Speech-to-text (STT) processing

use serde::Deserialize;

use crate::{Error, Result};

/// Remote recognition service backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    /// `OpenAI` Whisper transcription API
    Whisper,
    /// Deepgram transcription API
    Deepgram,
}

impl SttProvider {
    /// Parse a provider name from configuration
    ///
    /// # Errors
    ///
    /// Returns error for unknown provider names
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Response from the Whisper transcription API
#[derive(Deserialize)]
struct WhisperReply {
    text: String,
}

/// Response from the Deepgram transcription API
#[derive(Deserialize)]
struct DeepgramReply {
    results: DeepgramResults,
}

#[derive(Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes captured speech to text
pub struct SpeechToText {
    client: reqwest::Client,
    provider: SttProvider,
    api_key: String,
    model: String,
}

impl SpeechToText {
    /// Create a new STT instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(provider: SttProvider, api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            let name = match provider {
                SttProvider::Whisper => "OpenAI",
                SttProvider::Deepgram => "Deepgram",
            };
            return Err(Error::Config(format!(
                "{name} API key required for transcription"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            api_key,
            model,
        })
    }

    /// Transcribe WAV audio to text
    ///
    /// # Errors
    ///
    /// Returns error if the recognition request fails
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio).await,
            SttProvider::Deepgram => self.transcribe_deepgram(audio).await,
        }
    }

    /// Transcribe using the Whisper multipart upload API
    async fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("recording.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperReply = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using the Deepgram raw-body API
    async fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramReply = response.json().await?;
        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_parse() {
        assert_eq!(SttProvider::from_name("whisper").unwrap(), SttProvider::Whisper);
        assert_eq!(SttProvider::from_name("Deepgram").unwrap(), SttProvider::Deepgram);
        assert!(SttProvider::from_name("sphinx").is_err());
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = SpeechToText::new(SttProvider::Whisper, String::new(), "whisper-1".into())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
