use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deeptube::cli::{Cli, Commands};
use deeptube::http::{create_router, AppState};
use deeptube::pipeline::{Source, TranscribeRequest, TranscriptionPipeline};
use deeptube::{Config, DeepgramTranscriber, SupabaseStore, YoutubeSource};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "deeptube=debug,tower_http=debug"
    } else {
        "deeptube=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Serve { bind } => {
            config.validate()?;

            let pipeline = Arc::new(build_pipeline(&config)?);
            let router = create_router(AppState::new(pipeline));

            let addr = bind.unwrap_or_else(|| config.app.bind.clone());
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "listening for transcription requests");

            axum::serve(listener, router).await?;
        }
        Commands::Transcribe { url, features } => {
            config.validate()?;

            let pipeline = build_pipeline(&config)?;
            let request = TranscribeRequest {
                source: Source { url: url.clone() },
                features: features.to_features(),
            };

            tracing::info!(%url, "starting transcription");

            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap(),
            );
            progress.set_message("Downloading and transcribing...");
            progress.enable_steady_tick(std::time::Duration::from_millis(120));

            match pipeline.run(&request).await {
                Ok(receipt) => {
                    progress.finish_with_message("Transcription persisted");
                    println!("Request id: {}", receipt.request_id);
                }
                Err(err) => {
                    progress.finish_with_message("Transcription failed");
                    return Err(err.into());
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Config file: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

/// Wire the pipeline to the real collaborators.
fn build_pipeline(config: &Config) -> Result<TranscriptionPipeline> {
    let source = Arc::new(YoutubeSource::new());
    let transcriber = Arc::new(DeepgramTranscriber::new(&config.deepgram));
    let store = Arc::new(SupabaseStore::new(&config.supabase));

    let scratch_dir = match &config.app.temp_dir {
        Some(dir) => TempDir::new_in(dir)?,
        None => TempDir::new()?,
    };

    Ok(TranscriptionPipeline::with_scratch_dir(
        source,
        transcriber,
        store,
        scratch_dir,
    ))
}
