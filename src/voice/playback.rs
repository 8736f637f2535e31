//! Audio playback to speakers
//!
//! Plays decoded samples through the default output device and returns
//! once the stream has drained. Waiting for real playback completion is
//! what lets the speaking gate reflect audible speech rather than the
//! synthesis call returning.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use super::tts::{AudioFormat, SpeechAudio};
use crate::{Error, Result};

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Decode and play a synthesized reply, returning after playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    #[allow(clippy::unused_async)]
    pub async fn play(&self, audio: &SpeechAudio) -> Result<()> {
        let (samples, sample_rate) = match audio.format {
            AudioFormat::Mp3 => decode_mp3(&audio.bytes)?,
            AudioFormat::Wav => decode_wav(&audio.bytes)?,
        };

        self.play_samples(&samples, sample_rate)
    }

    /// Play mono f32 samples at the given rate, blocking until drained
    ///
    /// # Errors
    ///
    /// Returns error if no output configuration supports the rate or the
    /// stream fails
    pub fn play_samples(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let config = self.output_config(sample_rate)?;
        let channels = config.channels as usize;

        let samples: Arc<[f32]> = Arc::from(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cb_position.load(Ordering::Relaxed);

                    for frame in data.chunks_mut(channels) {
                        let sample = if pos < cb_samples.len() {
                            let s = cb_samples[pos];
                            pos += 1;
                            s
                        } else {
                            cb_finished.store(true, Ordering::Relaxed);
                            0.0
                        };

                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }

                    cb_position.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Expected duration plus slack bounds the completion wait
        let duration_ms = (samples.len() as u64 * 1000) / u64::from(sample_rate);
        let timeout = std::time::Duration::from_millis(duration_ms + 500);
        let start = std::time::Instant::now();

        while !finished.load(Ordering::Relaxed) {
            if start.elapsed() > timeout {
                tracing::warn!("playback did not signal completion before timeout");
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // Let the device buffer drain
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = samples.len(), sample_rate, "playback complete");

        Ok(())
    }

    /// Pick an output configuration for the source rate, preferring mono
    fn output_config(&self, sample_rate: u32) -> Result<StreamConfig> {
        let rate = SampleRate(sample_rate);

        let matches_rate =
            |c: &cpal::SupportedStreamConfigRange| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate;

        let supported = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| c.channels() == 1 && matches_rate(c))
            .or_else(|| {
                self.device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| c.channels() == 2 && matches_rate(c))
            })
            .ok_or_else(|| {
                Error::Audio(format!("no output config supports {sample_rate} Hz"))
            })?;

        Ok(supported.with_sample_rate(rate).config())
    }
}

/// Decode MP3 bytes to mono f32 samples and their rate
fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                sample_rate.get_or_insert(frame.sample_rate as u32);

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| Error::Audio("MP3 contained no frames".to_string()))?;
    Ok((samples, sample_rate))
}

/// Decode WAV bytes to mono f32 samples and their rate
fn decode_wav(wav_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_data))
        .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?
        }
    };

    let samples = if spec.channels == 2 {
        interleaved
            .chunks(2)
            .map(|chunk| f32::midpoint(chunk[0], *chunk.get(1).unwrap_or(&chunk[0])))
            .collect()
    } else {
        interleaved
    };

    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::samples_to_wav;

    #[test]
    fn wav_decode_recovers_rate_and_length() {
        let original: Vec<f32> = (0..480).map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / 16_000.0;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        }).collect();

        let wav = samples_to_wav(&original, 16_000).unwrap();
        let (decoded, rate) = decode_wav(&wav).unwrap();

        assert_eq!(rate, 16_000);
        assert_eq!(decoded.len(), original.len());
    }

    #[test]
    fn empty_mp3_is_an_error() {
        assert!(decode_mp3(&[]).is_err());
    }
}
