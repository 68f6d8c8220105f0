//! CLI entry point - the composition root.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use novelcast_cli::handlers::{follow, serve, speak, voices};
use novelcast_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Serve {
            port,
            static_dir,
            max_segment_chars,
            concurrency,
            stream_timeout_secs,
            allowed_origins,
        } => {
            serve::execute(serve::ServeOptions {
                port,
                static_dir,
                max_segment_chars,
                concurrency,
                stream_timeout_secs,
                allowed_origins,
            })
            .await
        }
        Commands::Speak {
            text,
            file,
            out,
            voice,
            max_segment_chars,
            concurrency,
        } => {
            speak::execute(speak::SpeakOptions {
                text,
                file,
                out,
                voice,
                max_segment_chars,
                concurrency,
            })
            .await
        }
        Commands::Voices { server } => voices::execute(&server).await,
        Commands::Follow {
            server,
            chapter,
            out_dir,
            max_chapters,
            speed,
            voice,
            rate,
            settings,
        } => {
            follow::execute(follow::FollowOptions {
                server,
                chapter,
                out_dir,
                max_chapters,
                speed,
                voice,
                rate,
                settings,
            })
            .await
        }
    }
}
