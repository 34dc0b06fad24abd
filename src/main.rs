//! Fabula CLI
//!
//! One-shot driver around the story generator: turn a prompt into a story,
//! or inspect the key pool with `--status`.

use anyhow::{Context, Result};
use clap::Parser;
use fabula::{
    config::Settings, logging, GeminiClient, GenerationConfig, KeyPool, StoryGenerator,
};
use std::sync::Arc;
use std::time::Duration;

/// Fabula
///
/// Grounded story generation over the Gemini API with API-key rotation.
#[derive(Parser, Debug)]
#[command(name = "fabula")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Question or prompt to turn into a story
    #[arg(short, long)]
    prompt: Option<String>,

    /// Model id (overrides GEMINI_MODEL env var)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature in [0, 1]
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum generated tokens
    #[arg(long)]
    max_output_tokens: Option<u32>,

    /// Retry budget (attempts = retries + 1, overrides MAX_RETRIES)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-attempt timeout in seconds (overrides ATTEMPT_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the key pool status as JSON and exit
    #[arg(long)]
    status: bool,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON-formatted logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load()?;
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }
    logging::init(&settings.log_level, args.json_logs);

    tracing::info!(
        app_name = %settings.app_name,
        key_count = settings.api_keys.len(),
        model = %settings.default_model,
        "starting"
    );

    let pool = Arc::new(KeyPool::new(settings.credentials())?);
    let mut client = GeminiClient::new().context("failed to build HTTP client")?;
    if let Some(base_url) = settings.gemini_base_url.clone() {
        client = client.with_base_url(base_url);
    }
    let generator =
        StoryGenerator::with_config(Arc::new(client), pool, settings.generator_config());

    if args.status {
        println!("{}", serde_json::to_string_pretty(&generator.pool_status())?);
        return Ok(());
    }

    let prompt = args
        .prompt
        .context("--prompt is required unless --status is given")?;
    let model = args.model.unwrap_or_else(|| settings.default_model.clone());

    let defaults = GenerationConfig::default();
    let config = GenerationConfig {
        temperature: args.temperature.unwrap_or(defaults.temperature),
        max_output_tokens: args.max_output_tokens.unwrap_or(defaults.max_output_tokens),
    };
    let max_retries = args.max_retries.unwrap_or(settings.max_retries);
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.attempt_timeout());

    let story = generator
        .generate(&model, &prompt, &config, max_retries, timeout)
        .await
        .map_err(anyhow::Error::new)?;

    println!("{story}");
    Ok(())
}
