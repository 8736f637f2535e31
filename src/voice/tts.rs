//! Text-to-speech (TTS) processing
//!
//! Cloud neural voices (`OpenAI`, ElevenLabs) return MP3; the offline Piper
//! engine runs as a local subprocess and produces WAV. The synthesized
//! reply is handed back as bytes plus its encoding so the caller can
//! persist and play it.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::{Error, Result};

/// Encoding of synthesized audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// MPEG audio (cloud backends)
    Mp3,
    /// PCM WAV (offline backend)
    Wav,
}

impl AudioFormat {
    /// Fixed name of the reply artifact for this encoding
    #[must_use]
    pub const fn reply_file_name(self) -> &'static str {
        match self {
            Self::Mp3 => "reply.mp3",
            Self::Wav => "reply.wav",
        }
    }
}

/// Synthesized speech with its encoding
#[derive(Debug)]
pub struct SpeechAudio {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`
    pub format: AudioFormat,
}

/// TTS backend
#[derive(Debug, Clone)]
enum TtsBackend {
    OpenAi {
        api_key: String,
        voice: String,
        speed: f32,
        model: String,
    },
    ElevenLabs {
        api_key: String,
        voice_id: String,
        model: String,
    },
    Piper {
        binary: PathBuf,
        voice_model: PathBuf,
    },
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    backend: TtsBackend,
}

impl TextToSpeech {
    /// Create a TTS instance using the `OpenAI` speech API
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new_openai(api_key: String, voice: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            backend: TtsBackend::OpenAi {
                api_key,
                voice,
                speed,
                model: "tts-1".to_string(),
            },
        })
    }

    /// Create a TTS instance using ElevenLabs
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new_elevenlabs(api_key: String, voice_id: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            backend: TtsBackend::ElevenLabs {
                api_key,
                voice_id,
                model: "eleven_monolingual_v1".to_string(),
            },
        })
    }

    /// Create a TTS instance using a local Piper engine
    #[must_use]
    pub fn new_piper(binary: PathBuf, voice_model: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend: TtsBackend::Piper {
                binary,
                voice_model,
            },
        }
    }

    /// Encoding this backend produces
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        match self.backend {
            TtsBackend::OpenAi { .. } | TtsBackend::ElevenLabs { .. } => AudioFormat::Mp3,
            TtsBackend::Piper { .. } => AudioFormat::Wav,
        }
    }

    /// Synthesize text to speech
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<SpeechAudio> {
        let bytes = match &self.backend {
            TtsBackend::OpenAi {
                api_key,
                voice,
                speed,
                model,
            } => {
                self.synthesize_openai(api_key, voice, *speed, model, text)
                    .await?
            }
            TtsBackend::ElevenLabs {
                api_key,
                voice_id,
                model,
            } => {
                self.synthesize_elevenlabs(api_key, voice_id, model, text)
                    .await?
            }
            TtsBackend::Piper {
                binary,
                voice_model,
            } => synthesize_piper(binary, voice_model, text).await?,
        };

        Ok(SpeechAudio {
            bytes,
            format: self.format(),
        })
    }

    /// Synthesize using the `OpenAI` speech API
    async fn synthesize_openai(
        &self,
        api_key: &str,
        voice: &str,
        speed: f32,
        model: &str,
        text: &str,
    ) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = SpeechRequest {
            model,
            input: text,
            voice,
            speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Synthesize using ElevenLabs
    async fn synthesize_elevenlabs(
        &self,
        api_key: &str,
        voice_id: &str,
        model: &str,
        text: &str,
    ) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{voice_id}");
        let request = SpeechRequest {
            text,
            model_id: model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Synthesize using a local Piper subprocess
///
/// Text goes in on stdin; Piper writes a WAV file which is read back.
async fn synthesize_piper(
    binary: &std::path::Path,
    voice_model: &std::path::Path,
    text: &str,
) -> Result<Vec<u8>> {
    let output_file = tempfile::Builder::new()
        .prefix("parlando-tts-")
        .suffix(".wav")
        .tempfile()?;

    let mut child = Command::new(binary)
        .arg("--model")
        .arg(voice_model)
        .arg("--output_file")
        .arg(output_file.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Tts(format!("failed to launch piper: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| Error::Tts(format!("failed to send text to piper: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| Error::Tts(format!("piper did not finish: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Tts(format!(
            "piper exited with {}: {stderr}",
            output.status
        )));
    }

    let bytes = std::fs::read(output_file.path())?;
    tracing::debug!(bytes = bytes.len(), "piper synthesis complete");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_backends_emit_mp3_and_piper_emits_wav() {
        let openai = TextToSpeech::new_openai("key".into(), "alloy".into(), 1.0).unwrap();
        assert_eq!(openai.format(), AudioFormat::Mp3);

        let piper = TextToSpeech::new_piper("piper".into(), "en_US-amy-medium.onnx".into());
        assert_eq!(piper.format(), AudioFormat::Wav);
        assert_eq!(piper.format().reply_file_name(), "reply.wav");
    }

    #[test]
    fn missing_cloud_key_is_a_config_error() {
        assert!(TextToSpeech::new_openai(String::new(), "alloy".into(), 1.0).is_err());
        assert!(TextToSpeech::new_elevenlabs(String::new(), "voice".into()).is_err());
    }

    #[tokio::test]
    async fn missing_piper_binary_is_a_tts_error() {
        let tts = TextToSpeech::new_piper(
            "/nonexistent/piper-binary".into(),
            "voice.onnx".into(),
        );

        let err = tts.synthesize("hello").await.err().unwrap();
        assert!(matches!(err, Error::Tts(_)));
    }
}
