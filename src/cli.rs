//! CLI definitions and output formatting.

use clap::{Parser, Subcommand};
use console::style;

/// ytqa - YouTube transcript retrieval, indexing, and question answering.
#[derive(Parser, Debug)]
#[command(name = "ytqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a YouTube video: transcribe, embed, index, and analyze topics
    Process {
        /// YouTube video URL
        url: String,
    },

    /// Search indexed transcripts and answer a question
    Search {
        /// Search query
        query: String,

        /// Number of chunks to retrieve
        #[arg(short, long, default_value = "5")]
        k: usize,

        /// Restrict search to a specific video
        #[arg(long)]
        video_id: Option<String>,
    },

    /// Print the indexed transcript for a video
    Transcript {
        /// YouTube video id
        video_id: String,
    },

    /// Print topic chapters for a video
    Topics {
        /// YouTube video id
        video_id: String,
    },

    /// Clear the vector store
    Clear,
}

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a timestamped transcript line.
    pub fn transcript_line(start: f64, text: &str) {
        println!("[{}] {}", style(crate::models::format_timestamp(start)).cyan(), text);
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> indicatif::ProgressBar {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
