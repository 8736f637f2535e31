//! TOML configuration file loading
//!
//! Supports `~/.config/parlando/config.toml` as a persistent config
//! source. All fields are optional — the file is a partial overlay on top
//! of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParlandoConfigFile {
    /// Chat completion configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Directory of custom scenario JSON files
    #[serde(default)]
    pub scenario_dir: Option<String>,
}

/// Chat completion configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Provider kind: "local" or "cloud"
    pub provider: Option<String>,

    /// Local chat server base URL (e.g. "http://localhost:11434")
    pub url: Option<String>,

    /// Cloud chat endpoint URL
    pub cloud_url: Option<String>,

    /// Model identifier (e.g. "llama3.2")
    pub model: Option<String>,

    /// Stream local responses incrementally
    pub stream: Option<bool>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT provider: "whisper" or "deepgram"
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS backend: "openai", "elevenlabs", or "piper"
    pub tts_backend: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Path to the piper binary
    pub piper_binary: Option<String>,

    /// Path to the piper voice model (.onnx)
    pub piper_voice: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
    pub chat: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ParlandoConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> ParlandoConfigFile {
    let Some(path) = config_file_path() else {
        return ParlandoConfigFile::default();
    };

    if !path.exists() {
        return ParlandoConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ParlandoConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ParlandoConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/parlando/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("parlando").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overlay_parses() {
        let file: ParlandoConfigFile = toml::from_str(
            r#"
            [chat]
            model = "llama3.2"
            stream = false

            [voice]
            tts_backend = "piper"
            piper_voice = "/opt/voices/en_US-amy-medium.onnx"
            "#,
        )
        .unwrap();

        assert_eq!(file.chat.model.as_deref(), Some("llama3.2"));
        assert_eq!(file.chat.stream, Some(false));
        assert!(file.chat.url.is_none());
        assert_eq!(file.voice.tts_backend.as_deref(), Some("piper"));
        assert!(file.api_keys.openai.is_none());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file: ParlandoConfigFile = toml::from_str("").unwrap();
        assert!(file.chat.model.is_none());
        assert!(file.scenario_dir.is_none());
    }
}
