use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parlando::controller::{self, ConversationController};
use parlando::voice::{
    AudioCapture, AudioPlayback, SAMPLE_RATE, SpeechToText, SttProvider, TextToSpeech,
    samples_to_wav, write_wav,
};
use parlando::{ChatClient, Config, Scenario, ScenarioCatalog};

/// Parlando - spoken-English practice with an AI conversation partner
#[derive(Parser)]
#[command(name = "parlando", version, about)]
struct Cli {
    /// Scenario to start immediately (skips the picker)
    #[arg(short, long, env = "PARLANDO_SCENARIO")]
    scenario: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List available scenarios
    Scenarios,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Quiet by default so log lines don't interleave with the conversation
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info,parlando=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Scenarios => list_scenarios(),
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&text).await,
        };
    }

    practice(cli.scenario.as_deref()).await
}

/// Run the interactive practice loop
#[allow(clippy::future_not_send, clippy::too_many_lines)]
async fn practice(initial_scenario: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let catalog = ScenarioCatalog::load(config.scenario_dir.as_deref())?;

    let scenario = match initial_scenario {
        Some(name) => catalog.get(name)?.clone(),
        None => pick_scenario(&catalog)?,
    };

    let chat = ChatClient::new(
        config.chat_provider()?,
        config.chat.model.clone(),
        config.chat.stream,
        config.chat_timeout(),
    )?;
    let stt = build_stt(&config)?;
    let tts = build_tts(&config)?;

    let mut capture = AudioCapture::new()?;
    let playback = AudioPlayback::new()?;
    let mut controller = ConversationController::new(chat);

    println!("\n=== {} ===", scenario.name);
    println!("{}\n", scenario.description);

    // Opening turn: the assistant speaks first
    print!("AI: ");
    flush_stdout();
    let opener = controller
        .start_conversation(scenario, &mut print_delta)
        .await;
    println!("\n");
    say(&tts, &playback, &controller, &config, &opener).await;

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        println!("[Enter] record your reply, [q + Enter] quit");
        line.clear();
        stdin.read_line(&mut line)?;
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        if !controller.can_record() {
            println!("Not ready yet, one moment...");
            continue;
        }

        controller.begin_recording()?;
        capture.start()?;
        println!("Recording... [Enter] to stop");
        line.clear();
        stdin.read_line(&mut line)?;

        let samples = capture.stop();
        controller.finish_recording()?;
        println!("Processing...");

        write_wav(&config.capture_path(), &samples, SAMPLE_RATE)?;
        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;

        match controller::usable_transcript(stt.transcribe(&wav).await) {
            Some(text) => {
                println!("You: {text}\n");

                print!("AI: ");
                flush_stdout();
                let reply = controller.submit_user_utterance(&text, &mut print_delta).await;
                println!("\n");
                say(&tts, &playback, &controller, &config, &reply).await;
            }
            None => {
                println!("Could not understand audio, please try again");
            }
        }

        controller.finish_turn();
        println!("Ready for your response");
    }

    Ok(())
}

/// Speak a reply; synthesis problems become a status line, never a stop
async fn say(
    tts: &TextToSpeech,
    playback: &AudioPlayback,
    controller: &ConversationController,
    config: &Config,
    text: &str,
) {
    if let Err(e) = controller::speak(
        tts,
        playback,
        controller.speaking_gate(),
        &config.data_dir,
        text,
    )
    .await
    {
        tracing::warn!(error = %e, "speech synthesis failed");
        println!("(speech unavailable: {e})");
    }
}

/// Print a streamed reply fragment as it arrives
fn print_delta(delta: &str) {
    print!("{delta}");
    flush_stdout();
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

/// Interactive scenario picker
fn pick_scenario(catalog: &ScenarioCatalog) -> anyhow::Result<Scenario> {
    let names: Vec<&str> = catalog
        .scenarios()
        .iter()
        .map(|s| s.name.as_str())
        .collect();

    let selection = dialoguer::Select::new()
        .with_prompt("Select a scenario")
        .items(&names)
        .default(0)
        .interact()?;

    let scenario = &catalog.scenarios()[selection];
    println!("{}", scenario.description);
    Ok(scenario.clone())
}

/// Build the configured speech recognizer
fn build_stt(config: &Config) -> parlando::Result<SpeechToText> {
    let provider = SttProvider::from_name(&config.voice.stt_provider)?;
    let api_key = match provider {
        SttProvider::Whisper => config.api_keys.openai.clone(),
        SttProvider::Deepgram => config.api_keys.deepgram.clone(),
    }
    .unwrap_or_default();

    SpeechToText::new(provider, api_key, config.voice.stt_model.clone())
}

/// Build the configured speech synthesizer
fn build_tts(config: &Config) -> parlando::Result<TextToSpeech> {
    match config.voice.tts_backend.to_lowercase().as_str() {
        "openai" => TextToSpeech::new_openai(
            config.api_keys.openai.clone().unwrap_or_default(),
            config.voice.tts_voice.clone(),
            config.voice.tts_speed,
        ),
        "elevenlabs" => TextToSpeech::new_elevenlabs(
            config.api_keys.elevenlabs.clone().unwrap_or_default(),
            config.voice.tts_voice.clone(),
        ),
        "piper" => {
            let voice = config.voice.piper_voice.clone().ok_or_else(|| {
                parlando::Error::Config(
                    "PARLANDO_PIPER_VOICE required for the piper backend".to_string(),
                )
            })?;
            Ok(TextToSpeech::new_piper(
                config.voice.piper_binary.clone(),
                voice,
            ))
        }
        other => Err(parlando::Error::Config(format!(
            "unknown TTS backend: {other}"
        ))),
    }
}

/// List available scenarios with their descriptions
fn list_scenarios() -> anyhow::Result<()> {
    let config = Config::load()?;
    let catalog = ScenarioCatalog::load(config.scenario_dir.as_deref())?;

    for scenario in catalog.scenarios() {
        println!("{}", scenario.name);
        println!("    {}\n", scenario.description);
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);
    playback.play_samples(&samples, sample_rate)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output with the configured backend
#[allow(clippy::future_not_send)]
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let tts = build_tts(&config)?;

    println!("Synthesizing speech...");
    let audio = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", audio.bytes.len());

    let path = config.data_dir.join(audio.format.reply_file_name());
    std::fs::write(&path, &audio.bytes)?;
    println!("Wrote {}", path.display());

    println!("Playing audio...");
    let playback = AudioPlayback::new()?;
    playback.play(&audio).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
