//! ytqa CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ytqa::cli::{Cli, Commands, Output};
use ytqa::config::Settings;
use ytqa::models::format_timestamp;
use ytqa::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("ytqa={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    if !ytqa::openai::is_api_key_configured() {
        Output::error("OPENAI_API_KEY not found in environment variables");
        anyhow::bail!("missing OPENAI_API_KEY");
    }

    let mut orchestrator = Orchestrator::new(&settings)?;

    match &cli.command {
        Commands::Process { url } => {
            Output::info(&format!("Processing {}", url));
            let summary = orchestrator.process_video(url).await?;

            Output::success(&format!(
                "Processed video {}: {} chunks indexed",
                summary.video_id,
                summary.chunks.len()
            ));

            Output::header("Topics");
            for topic in &summary.topics {
                println!("  [{}] {}", format_timestamp(topic.start), topic.title);
            }
        }

        Commands::Search { query, k, video_id } => {
            Output::info(&format!("Searching for: {}", query));
            if let Some(id) = video_id {
                Output::info(&format!("Restricting search to video: {}", id));
            }

            let spinner = Output::spinner("Searching...");
            let answer = orchestrator
                .answer_question(query, video_id.as_deref(), *k)
                .await;
            spinner.finish_and_clear();

            let answer = answer?;
            Output::header("Answer");
            println!("{}", answer.answer);

            if !answer.context.is_empty() {
                Output::header("Sources");
                for chunk in &answer.context {
                    println!(
                        "  [{}] {} (distance: {:.3})",
                        format_timestamp(chunk.metadata.start),
                        chunk.metadata.video_id,
                        chunk.distance
                    );
                }
            }
        }

        Commands::Transcript { video_id } => {
            let chunks = orchestrator.get_video_transcript(video_id);
            if chunks.is_empty() {
                Output::error(&format!("No indexed transcript for video {}", video_id));
            } else {
                Output::header(&format!("Transcript for video {}", video_id));
                for chunk in &chunks {
                    Output::transcript_line(chunk.start, &chunk.text);
                }
            }
        }

        Commands::Topics { video_id } => {
            let topics = orchestrator.analyze_topics(video_id).await?;
            Output::header(&format!("Topics for video {}", video_id));
            for topic in &topics {
                println!("  [{}] {}", format_timestamp(topic.start), topic.title);
            }
        }

        Commands::Clear => {
            orchestrator.clear_store()?;
            Output::success("Vector store cleared");
        }
    }

    Ok(())
}
