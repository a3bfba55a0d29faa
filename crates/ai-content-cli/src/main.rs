//! ai-content CLI - generate music, video and images from the terminal.

use std::path::{Path, PathBuf};

use ai_content_core::{ContentType, GenerationOptions, GenerativeEngine, Settings};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Generate music, video and images with hosted AI providers
#[derive(Parser, Debug)]
#[command(name = "ai-content")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for generated files (overrides config and environment)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a music track
    Music(GenerateArgs),
    /// Generate a video clip
    Video(GenerateArgs),
    /// Generate an image
    Image(GenerateArgs),
    /// List registered providers
    Providers,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Text prompt
    prompt: String,

    /// Provider name (defaults: music=lyria, video=veo, image=imagen)
    #[arg(short, long)]
    provider: Option<String>,

    /// Length in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Tempo for music
    #[arg(long)]
    bpm: Option<u32>,

    /// Lyrics for vocal music
    #[arg(long)]
    lyrics: Option<String>,

    /// Reference audio URL for music
    #[arg(long)]
    reference_audio_url: Option<String>,

    /// Content to avoid
    #[arg(long)]
    negative_prompt: Option<String>,

    /// Aspect ratio for video and images, e.g. 16:9
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Write the result to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ask the vendor for a non-billed test render
    #[arg(long)]
    test_mode: bool,
}

impl GenerateArgs {
    fn provider_or_default(&self, content_type: ContentType) -> &str {
        self.provider
            .as_deref()
            .unwrap_or_else(|| default_provider(content_type))
    }

    fn to_options(&self) -> GenerationOptions {
        GenerationOptions {
            duration_seconds: self.duration,
            bpm: self.bpm,
            lyrics: self.lyrics.clone(),
            reference_audio_url: self.reference_audio_url.clone(),
            output_path: self.output.clone(),
            test_mode: self.test_mode,
            negative_prompt: self.negative_prompt.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
            seed: self.seed,
            ..GenerationOptions::default()
        }
    }
}

fn default_provider(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Music => "lyria",
        ContentType::Video => "veo",
        ContentType::Image => "imagen",
    }
}

/// Sets up stderr logging plus a daily rolling file when `log_dir` is set.
///
/// The returned guard must stay alive for the file writer to flush.
fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) if std::fs::create_dir_all(dir).is_ok() => {
            let file_appender = tracing_appender::rolling::daily(dir, "ai-content.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    // Ignore the error when a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;

    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    Ok(settings)
}

async fn generate(
    engine: &GenerativeEngine,
    content_type: ContentType,
    args: &GenerateArgs,
) -> anyhow::Result<()> {
    let provider = args.provider_or_default(content_type);
    let options = args.to_options();
    debug!("Options: {:?}", options);

    let result = engine
        .generate(content_type, provider, &args.prompt, &options)
        .await
        .with_context(|| format!("{} generation with '{}' failed", content_type, provider))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_providers(engine: &GenerativeEngine) -> anyhow::Result<()> {
    let listing: serde_json::Map<String, serde_json::Value> = ContentType::ALL
        .iter()
        .map(|ct| (ct.to_string(), serde_json::json!(engine.providers(*ct))))
        .collect();
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let _guard = init_logging(cli.verbose, settings.log_dir.as_deref());

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read .env: {}", e),
    }

    let engine = GenerativeEngine::from_settings(settings);

    match &cli.command {
        Command::Music(args) => generate(&engine, ContentType::Music, args).await,
        Command::Video(args) => generate(&engine, ContentType::Video, args).await,
        Command::Image(args) => generate(&engine, ContentType::Image, args).await,
        Command::Providers => print_providers(&engine),
    }
}
