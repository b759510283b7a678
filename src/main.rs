mod config;
mod lyrics;
mod proxy;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lyrics::{NormalizedQuery, Resolver, TimedLyricLine};

#[derive(Debug, Parser)]
#[command(
    name = "lyricsmith",
    version,
    about = "Lyrics resolver for noisy catalog metadata, with a caching proxy"
)]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the caching proxy (default).
    Serve {
        /// Listen port, overrides config and $PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Resolve lyrics for one track and print them (headless).
    Resolve {
        #[arg(long)]
        artist: String,
        #[arg(long)]
        title: String,
        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the artist/title candidates a track is looked up with.
    Candidates {
        #[arg(long)]
        artist: String,
        #[arg(long)]
        title: String,
    },
    /// Parse a synced lyrics (.lrc) file and print its timed lines.
    Lrc { path: std::path::PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref()).context("load config")?;
    cfg.apply_env().context("apply environment overrides")?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                cfg.server.port = port;
            }
            proxy::serve(&cfg).await?;
        }
        Command::Resolve {
            artist,
            title,
            json,
        } => {
            let resolver = Arc::new(Resolver::from_config(&cfg)?);
            let result = resolver.resolve(&artist, &title).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if !result.timed_lines.is_empty() {
                print_timed_lines(&result.timed_lines);
            } else if let Some(text) = result.lyrics {
                println!("{text}");
            } else {
                println!("No lyrics found.");
            }
        }
        Command::Candidates { artist, title } => {
            let q = NormalizedQuery::from_raw(&artist, &title);
            println!("artists:");
            for a in &q.artist_candidates {
                println!("  {a}");
            }
            println!("titles:");
            for t in &q.title_candidates {
                println!("  {t}");
            }
        }
        Command::Lrc { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            print_timed_lines(&lyrics::parser::parse_synced_lyrics(&raw));
        }
    }

    Ok(())
}

fn print_timed_lines(lines: &[TimedLyricLine]) {
    for l in lines {
        let total_cs = (l.time_sec * 100.0).round() as u64;
        println!(
            "[{:02}:{:02}.{:02}] {}",
            total_cs / 6000,
            (total_cs / 100) % 60,
            total_cs % 100,
            l.text
        );
    }
}
