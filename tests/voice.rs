//! Audio encoding tests
//!
//! Exercises the capture-file format without requiring audio hardware

use std::io::Cursor;

use parlando::voice::{SAMPLE_RATE, samples_to_wav, write_wav};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

#[test]
fn wav_bytes_carry_riff_header() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");
    assert!(wav_data.len() > 44);
}

#[test]
fn wav_spec_is_mono_16_bit_at_capture_rate() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
}

#[test]
fn wav_length_tracks_recording_duration() {
    // Half a second of audio: sample count fixed by the rate, two bytes each
    let samples = generate_sine_samples(440.0, 0.5, 0.3);
    assert_eq!(samples.len(), SAMPLE_RATE as usize / 2);

    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();
    assert_eq!(wav_data.len(), 44 + samples.len() * 2);
}

#[test]
fn wav_roundtrip_preserves_sample_count() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
}

#[test]
fn out_of_range_samples_are_clamped() {
    let samples = vec![2.0f32, -2.0];
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(wav_data)).unwrap();
    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples[0], i16::MAX);
    assert_eq!(read_samples[1], i16::MIN);
}

#[test]
fn capture_file_is_overwritten_each_turn() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording.wav");

    let long_take = generate_sine_samples(440.0, 1.0, 0.3);
    write_wav(&path, &long_take, SAMPLE_RATE).unwrap();
    let first_len = std::fs::metadata(&path).unwrap().len();

    let short_take = generate_sine_samples(440.0, 0.2, 0.3);
    write_wav(&path, &short_take, SAMPLE_RATE).unwrap();
    let second_len = std::fs::metadata(&path).unwrap().len();

    assert!(second_len < first_len);
    assert_eq!(second_len, 44 + short_take.len() as u64 * 2);
}
