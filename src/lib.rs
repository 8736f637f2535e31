//! Parlando - spoken-English practice with an AI conversation partner
//!
//! Pick a scenario, the assistant opens the conversation, answer by voice:
//! your reply is captured, transcribed, sent to a chat-completion
//! endpoint, and the assistant's answer is synthesized and spoken back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  parlando CLI                     │
//! │   scenario picker │ push-to-talk │ status lines   │
//! └──────────────────────┬───────────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────────┐
//! │            Conversation Controller                │
//! │   history │ recording state │ speaking gate       │
//! └──────┬──────────────┬──────────────┬─────────────┘
//!        │              │              │
//! ┌──────▼─────┐ ┌──────▼─────┐ ┌──────▼─────┐
//! │  Chat API  │ │  STT API   │ │ TTS engine │
//! │ local/cloud│ │  (remote)  │ │ cloud/local│
//! └────────────┘ └────────────┘ └────────────┘
//! ```

pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod scenario;
pub mod session;
pub mod voice;

pub use chat::{CONNECT_FALLBACK, ChatClient, ChatProvider};
pub use config::Config;
pub use controller::ConversationController;
pub use error::{Error, Result};
pub use scenario::{Scenario, ScenarioCatalog};
pub use session::{HISTORY_WINDOW, History, Message, RecordingState, Role, SpeakingGate};
