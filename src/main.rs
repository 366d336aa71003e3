use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use tracing_subscriber::EnvFilter;

use emote::speech::SERVICE_SAMPLE_RATE;
use emote::{
    AudioBuffer, AudioPlayback, Config, Emotion, GeminiClient, RequestParameters, SpeakingRate,
    SpeechOrchestrator, Voice,
};

/// emote - speak text with an emotion through a generative speech API
#[derive(Parser)]
#[command(name = "emote", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/emote/config.toml)
    #[arg(short, long, env = "EMOTE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak a single piece of text
    Speak {
        /// Text to speak
        text: String,
        /// Emotional delivery
        #[arg(short, long, value_enum)]
        emotion: Option<Emotion>,
        /// Voice
        #[arg(long, value_enum)]
        voice: Option<Voice>,
        /// Speaking rate (0.75 to 1.25)
        #[arg(short, long)]
        rate: Option<SpeakingRate>,
        /// Also write the audio to a WAV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Don't play the audio
        #[arg(long)]
        no_play: bool,
    },
    /// Prompt for text repeatedly
    Interactive,
    /// List available voices
    Voices,
    /// List available emotions
    Emotions,
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn,emote=info",
        1 => "info,emote=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli
        .config
        .as_deref()
        .map_or_else(Config::load, Config::load_from);
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Speak {
            text,
            emotion,
            voice,
            rate,
            output,
            no_play,
        } => {
            let params = RequestParameters::new(
                text,
                emotion.unwrap_or(config.defaults.emotion),
                voice.unwrap_or(config.defaults.voice),
                rate.unwrap_or(config.defaults.rate),
            );
            speak(&config, params, output, no_play).await
        }
        Command::Interactive => interactive(&config).await,
        Command::Voices => {
            for voice in Voice::ALL {
                println!("{:<6} {}", voice.name(), voice.description());
            }
            Ok(())
        }
        Command::Emotions => {
            for emotion in Emotion::ALL {
                println!("{:<11} \"{}: ...\"", emotion.label(), emotion.prefix());
            }
            Ok(())
        }
        Command::TestSpeaker => test_speaker().await,
    }
}

fn orchestrator(config: &Config) -> anyhow::Result<SpeechOrchestrator<GeminiClient>> {
    let client = GeminiClient::new(
        config.service.base_url.clone(),
        config.service.model.clone(),
        config.service.timeout,
    )?;
    Ok(SpeechOrchestrator::new(client, config.credential.clone()))
}

async fn speak(
    config: &Config,
    params: RequestParameters,
    output: Option<PathBuf>,
    no_play: bool,
) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config)?;
    let buffer = orchestrator.generate_speech(params).await?;

    if let Some(path) = output {
        std::fs::write(&path, buffer.to_wav()?)?;
        tracing::info!(path = %path.display(), "wrote audio");
    }

    if !no_play {
        AudioPlayback::new().play_blocking(buffer).await?;
    }

    Ok(())
}

/// Prompt loop: plain lines are spoken, `/`-commands change settings
async fn interactive(config: &Config) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config)?;
    let playback = AudioPlayback::new();

    let mut emotion = config.defaults.emotion;
    let mut voice = config.defaults.voice;
    let mut rate = config.defaults.rate;

    println!("Type text to speak. Commands: /emotion, /voice, /rate <0.75-1.25>, /quit\n");

    loop {
        let prompt = format!("[{emotion} | {voice} | {rate}]");
        let line: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(c, a)| (c, a.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/emotion", arg) => {
                emotion = if arg.is_empty() {
                    select("Emotion", &Emotion::ALL, emotion)?
                } else {
                    match arg.parse() {
                        Ok(e) => e,
                        Err(e) => {
                            println!("{e}");
                            continue;
                        }
                    }
                };
            }
            ("/voice", arg) => {
                voice = if arg.is_empty() {
                    select("Voice", &Voice::ALL, voice)?
                } else {
                    match arg.parse() {
                        Ok(v) => v,
                        Err(e) => {
                            println!("{e}");
                            continue;
                        }
                    }
                };
            }
            ("/rate", arg) => match arg.parse() {
                Ok(r) => rate = r,
                Err(e) => println!("{e}"),
            },
            (cmd, _) if cmd.starts_with('/') => println!("unknown command: {cmd}"),
            _ => {
                let params = RequestParameters::new(line, emotion, voice, rate);
                println!("generating...");
                match orchestrator.generate_speech(params).await {
                    Ok(buffer) => {
                        println!("playing {:.1}s of audio", buffer.duration().as_secs_f32());
                        if let Err(e) = playback.play(buffer) {
                            println!("{e}");
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    Ok(())
}

fn select<T: Copy + PartialEq + std::fmt::Display>(
    prompt: &str,
    items: &[T],
    current: T,
) -> anyhow::Result<T> {
    let labels: Vec<String> = items.iter().map(ToString::to_string).collect();
    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(items.iter().position(|i| *i == current).unwrap_or(0))
        .interact()?;
    Ok(items[idx])
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    let num_samples = SERVICE_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / SERVICE_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    let buffer = AudioBuffer::from_channels(vec![samples], SERVICE_SAMPLE_RATE)?;
    println!("Playing {} samples at {} Hz...", buffer.frames(), SERVICE_SAMPLE_RATE);

    AudioPlayback::new().play_blocking(Arc::new(buffer)).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Try: pavucontrol (to check levels)");

    Ok(())
}
