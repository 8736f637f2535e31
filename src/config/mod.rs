//! Configuration management for parlando

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::chat::ChatProvider;
use crate::{Error, Result};

/// Fixed name of the capture file, overwritten each turn
pub const CAPTURE_FILE: &str = "recording.wav";

/// Parlando configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat completion settings
    pub chat: ChatConfig,

    /// Voice processing settings
    pub voice: VoiceConfig,

    /// API keys for external services
    pub api_keys: ApiKeys,

    /// Directory holding the capture file and reply artifacts
    pub data_dir: PathBuf,

    /// Optional directory of custom scenario JSON files
    pub scenario_dir: Option<PathBuf>,
}

/// Which chat endpoint to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProviderKind {
    /// Local server speaking the `/api/chat` protocol
    Local,
    /// Bearer-token cloud endpoint
    Cloud,
}

impl ChatProviderKind {
    /// Parse a provider kind from configuration
    ///
    /// # Errors
    ///
    /// Returns error for unknown provider names
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "local" | "ollama" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            other => Err(Error::Config(format!("unknown chat provider: {other}"))),
        }
    }
}

/// Chat completion settings
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Endpoint kind
    pub kind: ChatProviderKind,

    /// Local chat server base URL
    pub local_url: String,

    /// Cloud chat endpoint URL (required for the cloud kind)
    pub cloud_url: Option<String>,

    /// Model identifier sent with every request
    pub model: String,

    /// Stream local responses incrementally
    pub stream: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Voice processing settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT provider name ("whisper" or "deepgram")
    pub stt_provider: String,

    /// STT model identifier
    pub stt_model: String,

    /// TTS backend name ("openai", "elevenlabs", or "piper")
    pub tts_backend: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// Path to the piper binary
    pub piper_binary: PathBuf,

    /// Path to the piper voice model
    pub piper_voice: Option<PathBuf>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper STT and `OpenAI` TTS)
    pub openai: Option<String>,

    /// Deepgram API key (optional STT)
    pub deepgram: Option<String>,

    /// ElevenLabs API key (optional TTS)
    pub elevenlabs: Option<String>,

    /// Bearer token for the cloud chat endpoint
    pub chat: Option<String>,
}

impl Config {
    /// Load configuration with env > file > default precedence
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is invalid or the data directory
    /// cannot be created
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let kind_name = std::env::var("PARLANDO_CHAT_PROVIDER")
            .ok()
            .or(fc.chat.provider)
            .unwrap_or_else(|| "local".to_string());

        let chat = ChatConfig {
            kind: ChatProviderKind::from_name(&kind_name)?,
            local_url: std::env::var("PARLANDO_CHAT_URL")
                .ok()
                .or(fc.chat.url)
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            cloud_url: std::env::var("PARLANDO_CLOUD_CHAT_URL")
                .ok()
                .or(fc.chat.cloud_url),
            model: std::env::var("PARLANDO_MODEL")
                .ok()
                .or(fc.chat.model)
                .unwrap_or_else(|| "llama3.2".to_string()),
            stream: std::env::var("PARLANDO_STREAM")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.chat.stream)
                .unwrap_or(true),
            timeout_secs: std::env::var("PARLANDO_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.chat.timeout_secs)
                .unwrap_or(60),
        };

        let voice = VoiceConfig {
            stt_provider: std::env::var("PARLANDO_STT_PROVIDER")
                .ok()
                .or(fc.voice.stt_provider)
                .unwrap_or_else(|| "whisper".to_string()),
            stt_model: std::env::var("PARLANDO_STT_MODEL")
                .ok()
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_backend: std::env::var("PARLANDO_TTS_BACKEND")
                .ok()
                .or(fc.voice.tts_backend)
                .unwrap_or_else(|| "openai".to_string()),
            tts_voice: std::env::var("PARLANDO_TTS_VOICE")
                .ok()
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: std::env::var("PARLANDO_TTS_SPEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.voice.tts_speed)
                .unwrap_or(1.0),
            piper_binary: std::env::var("PARLANDO_PIPER_BIN")
                .ok()
                .or(fc.voice.piper_binary)
                .map_or_else(|| PathBuf::from("piper"), PathBuf::from),
            piper_voice: std::env::var("PARLANDO_PIPER_VOICE")
                .ok()
                .or(fc.voice.piper_voice)
                .map(PathBuf::from),
        };

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
            deepgram: std::env::var("DEEPGRAM_API_KEY")
                .ok()
                .or(fc.api_keys.deepgram),
            elevenlabs: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .or(fc.api_keys.elevenlabs),
            chat: std::env::var("PARLANDO_CHAT_API_KEY")
                .ok()
                .or(fc.api_keys.chat),
        };

        // ~/.local/share/parlando on Linux; holds capture and reply files
        let data_dir = std::env::var("PARLANDO_DATA_DIR").map_or_else(
            |_| {
                directories::BaseDirs::new()
                    .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("parlando"))
            },
            PathBuf::from,
        );
        std::fs::create_dir_all(&data_dir)?;

        let scenario_dir = std::env::var("PARLANDO_SCENARIO_DIR")
            .ok()
            .or(fc.scenario_dir)
            .map(PathBuf::from);

        Ok(Self {
            chat,
            voice,
            api_keys,
            data_dir,
            scenario_dir,
        })
    }

    /// Fixed path of the capture WAV, overwritten each turn
    #[must_use]
    pub fn capture_path(&self) -> PathBuf {
        self.data_dir.join(CAPTURE_FILE)
    }

    /// Resolve the configured chat provider
    ///
    /// # Errors
    ///
    /// Returns error if the cloud kind is selected without a URL or token
    pub fn chat_provider(&self) -> Result<ChatProvider> {
        match self.chat.kind {
            ChatProviderKind::Local => Ok(ChatProvider::Local {
                base_url: self.chat.local_url.clone(),
            }),
            ChatProviderKind::Cloud => {
                let url = self.chat.cloud_url.clone().ok_or_else(|| {
                    Error::Config("chat.cloud_url required for the cloud provider".to_string())
                })?;
                let api_key = self.api_keys.chat.clone().ok_or_else(|| {
                    Error::Config(
                        "PARLANDO_CHAT_API_KEY required for the cloud provider".to_string(),
                    )
                })?;
                Ok(ChatProvider::Cloud { url, api_key })
            }
        }
    }

    /// Request timeout for chat completions
    #[must_use]
    pub const fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_names_parse() {
        assert_eq!(
            ChatProviderKind::from_name("local").unwrap(),
            ChatProviderKind::Local
        );
        assert_eq!(
            ChatProviderKind::from_name("Ollama").unwrap(),
            ChatProviderKind::Local
        );
        assert_eq!(
            ChatProviderKind::from_name("cloud").unwrap(),
            ChatProviderKind::Cloud
        );
        assert!(ChatProviderKind::from_name("hosted").is_err());
    }
}
