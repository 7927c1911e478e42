use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pixel_core::router::IntentRouter;
use pixel_core::server::ClientRegistry;
use pixel_core::services::{
    ChatService, DuckDuckGoSearch, GroqChat, OpenWeather, SearchService, WeatherService,
};
use pixel_core::skills::TimerScheduler;
use pixel_core::voice::{AudioCapture, AudioPlayback, NullSink, SAMPLE_RATE, Speaker};
use pixel_core::{Config, Daemon};

/// Pixel - German voice assistant daemon
#[derive(Parser)]
#[command(name = "pixel", version, about)]
struct Cli {
    /// Port for the remote display server
    #[arg(long, env = "PIXEL_PORT", default_value = "5000")]
    port: u16,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable microphone capture (for headless servers without audio hardware)
    #[arg(long, env = "PIXEL_DISABLE_VOICE")]
    disable_voice: bool,

    /// Fallback city for weather queries
    #[arg(long)]
    city: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Route a single text query and print the answer
    Ask {
        /// The query text (no wake word needed)
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,pixel_core=info",
        1 => "info,pixel_core=debug",
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
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::Ask { text } => ask(&text, cli.city).await,
        };
    }

    let mut config = Config::from_env();
    if cli.disable_voice {
        config.voice.enabled = false;
    }
    if let Some(city) = cli.city {
        config.default_city = city;
    }

    tracing::info!(
        port = cli.port,
        wake_word = config.wake_word,
        voice = config.voice.enabled,
        camera = config.camera.is_some(),
        "starting pixel"
    );

    Daemon::new(config, cli.port).run().await?;

    Ok(())
}

/// Test microphone input with a live level meter
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

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
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
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

    let sample_rate = 24000.0_f32;
    let frequency = 440.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples...", samples.len());
    playback.play_samples(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Route one query through the full intent cascade without audio
async fn ask(text: &str, city: Option<String>) -> anyhow::Result<()> {
    let config = Config::from_env();
    let registry = Arc::new(ClientRegistry::new());
    let speaker = Arc::new(Speaker::new(None, Arc::new(NullSink), Arc::clone(&registry)));
    let timer = Arc::new(TimerScheduler::new(speaker));

    let chat: Option<Arc<dyn ChatService>> = match &config.api_keys.groq {
        Some(key) => Some(Arc::new(GroqChat::new(
            key.clone(),
            pixel_core::config::DEFAULT_CHAT_MODEL.to_string(),
        )?)),
        None => None,
    };
    let weather: Option<Arc<dyn WeatherService>> = match &config.api_keys.openweather {
        Some(key) => Some(Arc::new(OpenWeather::new(
            key.clone(),
            config.voice.language.clone(),
        )?)),
        None => None,
    };
    let search: Option<Arc<dyn SearchService>> = Some(Arc::new(DuckDuckGoSearch::new()?));

    let router = IntentRouter::new(
        timer,
        registry,
        None,
        chat,
        weather,
        search,
        city.unwrap_or(config.default_city),
    );

    println!("{}", router.route(text).await);

    Ok(())
}
