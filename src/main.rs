//! Indic TTS CLI - serve the HTTP API or run synthesis and transliteration locally

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use indic_tts::engine::{discover, model_key, TtsPipeline};
use indic_tts::server::{ServerConfig, ServerState, TransliterationRequest, TtsServer};
use indic_tts::{AudioOutput, VERSION};

/// Indic text-to-speech and transliteration service
#[derive(Parser, Debug)]
#[command(name = "indic-tts")]
#[command(author, version, about, long_about = None)]
#[command(long_about = "
Text-to-speech for Indian languages (Glow-TTS + HiFi-GAN) and transliteration
between Indic scripts.

Examples:
  # Start the HTTP server
  indic-tts serve --config server.yaml

  # Synthesize a sentence to a WAV file
  indic-tts synth --language hi --gender female --text \"नमस्ते\" --output out.wav

  # Transliterate text into Gujarati
  indic-tts translit --target gu --text \"नमस्ते\"
")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the server configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Synthesize speech from text
    Synth {
        /// Language code, e.g. hi, ta, en
        #[arg(short, long)]
        language: String,

        /// Speaker gender
        #[arg(short, long, default_value = "female")]
        gender: String,

        /// Text to synthesize
        #[arg(short, long)]
        text: String,

        /// Output audio file path
        #[arg(short, long, default_value = "output.wav")]
        output: PathBuf,
    },

    /// Transliterate text into an Indic script
    Translit {
        /// Source language code
        #[arg(long, default_value = "en")]
        source: String,

        /// Target language code
        #[arg(long)]
        target: String,

        /// Text to transliterate
        #[arg(short, long)]
        text: String,
    },

    /// List configured and discoverable models
    Models,
}

fn setup_logging(level: &str, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn load_config(path: Option<&PathBuf>) -> Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path).with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(ServerConfig::default()),
    }
}

async fn build_pipeline(config: ServerConfig) -> Result<TtsPipeline> {
    let state = ServerState::from_config(config).await?;
    Ok(state.pipeline)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    setup_logging(&config.logging.level, cli.verbose)?;

    info!("Indic TTS v{}", VERSION);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            TtsServer::new(config).await?.run().await?;
        }

        Commands::Synth {
            language,
            gender,
            text,
            output,
        } => {
            let pipeline = build_pipeline(config).await?;

            let start = Instant::now();
            let audio = pipeline.synthesize(&language, &gender, &text).await?;
            let elapsed = start.elapsed().as_secs_f64();

            AudioOutput::save_int16(&audio.samples, audio.sample_rate, &output)?;
            let duration = audio.samples.len() as f64 / audio.sample_rate as f64;
            info!(
                "Saved {:.2}s of audio to {:?} in {:.2}s (RTF {:.3})",
                duration,
                output,
                elapsed,
                if duration > 0.0 { elapsed / duration } else { 0.0 }
            );
        }

        Commands::Translit { source, target, text } => {
            // transliteration needs no models
            config.models.models_dir = None;
            config.models.entries.clear();
            let pipeline = build_pipeline(config).await?;

            let request = TransliterationRequest::new(&[text.as_str()], &source, &target);
            let response = pipeline.infer_transliterate_request(&request).await?;
            for item in response.output {
                println!("{}", item.target);
            }
        }

        Commands::Models => {
            for entry in &config.models.entries {
                println!(
                    "{:<16} glow={:?} hifi={:?} (configured)",
                    model_key(&entry.language, &entry.gender),
                    entry.glow,
                    entry.hifi
                );
            }

            match config.models.models_dir.as_ref().filter(|dir| dir.is_dir()) {
                Some(dir) => {
                    for spec in discover(dir)? {
                        println!(
                            "{:<16} glow={:?} hifi={:?}",
                            model_key(&spec.language, &spec.gender),
                            spec.glow,
                            spec.hifi
                        );
                    }
                }
                None => info!("No models directory to scan"),
            }
        }
    }

    Ok(())
}
