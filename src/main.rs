use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use localguard_voice::audio::{
    AudioCapture, AudioPlayback, find_input_device, find_output_device,
};
use localguard_voice::config::SAMPLE_RATE;
use localguard_voice::{Assistant, Config};

/// LocalGuard voice node - wake-word assistant for the security network
#[derive(Parser)]
#[command(name = "localguard-voice", version, about)]
struct Cli {
    /// Port for the control API
    #[arg(long, env = "LOCALGUARD_PORT", default_value = "8070")]
    port: u16,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Stay idle until POST /start instead of listening immediately
    #[arg(long)]
    no_auto_start: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,localguard_voice=info",
        1 => "info,localguard_voice=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration),
            Command::TestSpeaker => test_speaker(),
        };
    }

    let config = Config::from_env();
    tracing::info!(
        wake_word = %config.wake_word,
        device = %config.audio_device,
        port = cli.port,
        "starting localguard voice node"
    );

    let assistant = Arc::new(Assistant::new(config));
    if !cli.no_auto_start {
        assistant.start();
    }

    let app = localguard_voice::api::router(Arc::clone(&assistant));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "control API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Joining the dialogue worker can block on an in-flight turn
    let assistant = Arc::clone(&assistant);
    tokio::task::spawn_blocking(move || assistant.shutdown()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

/// Test microphone input
fn test_mic(duration: u64) -> anyhow::Result<()> {
    let config = Config::from_env();
    println!(
        "Testing microphone matching \"{}\" for {duration} seconds...",
        config.audio_device
    );
    println!("Speak into your microphone!\n");

    let device = find_input_device(&config.audio_device)
        .ok_or_else(|| anyhow::anyhow!("no input device matching \"{}\"", config.audio_device))?;
    let mut capture = AudioCapture::new(device)?;
    capture.start()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        std::thread::sleep(Duration::from_secs(1));

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
    println!("If RMS stayed near 0, check:");
    println!("  1. Is the headset plugged in?");
    println!("  2. Run: arecord -l (to list devices)");
    println!("  3. Check LOCALGUARD_AUDIO_DEVICE matches the device name");

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
    let config = Config::from_env();
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let device = find_output_device(&config.audio_device)
        .ok_or_else(|| anyhow::anyhow!("no output device available"))?;
    let playback = AudioPlayback::new(device);

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {SAMPLE_RATE} Hz...", samples.len());
    playback.play_samples(&samples, SAMPLE_RATE)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}
