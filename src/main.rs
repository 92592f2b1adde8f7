mod args;
mod audio;
mod background;
mod config;
mod dialogue;
mod error;
mod ffmpeg;
mod lang;
mod llm;
mod manifest;
mod mastering;
mod metadata;
mod mode;
mod pipeline;
mod render;
mod subtitle;
mod thumbnail;
mod timeline;
mod topic;
mod translate;
mod tts;
mod upload;

use args::Args;
use clap::Parser;
use config::{Config, Paths};
use llm::OpenAiChat;
use pipeline::{Pipeline, RunOptions};
use topic::TopicArg;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tts::OpenAiSpeech;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("Starting short video pipeline (mode={})", args.mode.name());

    let paths = Paths {
        temp: args.temp_dir.clone(),
        output: args.output_dir.clone(),
        tokens: args.tokens_dir.clone(),
        fonts: args.fonts_dir.clone(),
    };
    let config = Config::load(&args.combos, paths)?;
    info!("Loaded {} combos from {}", config.combos.len(), args.combos.display());

    let llm = OpenAiChat::new(&config)?;
    let tts = OpenAiSpeech::new(&config)?;
    let options = RunOptions {
        mode: args.mode,
        turns: args.turns,
        privacy: args.privacy,
        lines_only: args.lines_only,
        upload: !args.no_upload,
        chunk: args.chunk as usize,
    };
    let pipeline = Pipeline::new(&config, &llm, &tts, options);

    let topic = pipeline.resolve_topic(&TopicArg::parse(&args.topic)).await;
    info!("Topic: {}", topic);

    let summary = pipeline.run_all(&topic).await;
    info!(
        "Process complete: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    if summary.failed > 0 {
        anyhow::bail!("{} of {} combos failed", summary.failed, summary.failed + summary.succeeded);
    }
    Ok(())
}
