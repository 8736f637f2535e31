//! Voice processing module
//!
//! Microphone capture, speech recognition, speech synthesis, and
//! in-process playback. The chat round trip lives in `chat`; the turn
//! logic that ties the two together lives in `controller`.

mod capture;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav, write_wav};
pub use playback::AudioPlayback;
pub use stt::{SpeechToText, SttProvider};
pub use tts::{AudioFormat, SpeechAudio, TextToSpeech};
