//! Available subcommands.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (`/api/tts/convert`, `/api/tts/voices`)
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "NOVELCAST_PORT")]
        port: Option<u16>,
        /// Directory with the browser client, served with SPA fallback
        #[arg(long, env = "NOVELCAST_STATIC_DIR")]
        static_dir: Option<PathBuf>,
        /// Maximum characters per synthesis request
        #[arg(long, env = "NOVELCAST_MAX_SEGMENT_CHARS")]
        max_segment_chars: Option<usize>,
        /// Provider calls in flight per stream
        #[arg(long, env = "NOVELCAST_CONCURRENCY")]
        concurrency: Option<usize>,
        /// Hard limit on one conversion request, in seconds
        #[arg(long, env = "NOVELCAST_STREAM_TIMEOUT_SECS")]
        stream_timeout_secs: Option<u64>,
        /// Allowed CORS origins (repeatable); all origins if omitted
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },

    /// Synthesize text straight to an audio file
    Speak {
        /// Text to read
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// Read the text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output file (MP3)
        #[arg(short, long)]
        out: PathBuf,
        /// Voice short name, e.g. vi-VN-GTTS-Male
        #[arg(long)]
        voice: Option<String>,
        /// Maximum characters per synthesis request
        #[arg(long, env = "NOVELCAST_MAX_SEGMENT_CHARS")]
        max_segment_chars: Option<usize>,
        /// Provider calls in flight
        #[arg(long, env = "NOVELCAST_CONCURRENCY")]
        concurrency: Option<usize>,
    },

    /// List the voices offered by a server
    Voices {
        /// Base URL of a novelcast server
        #[arg(long, env = "NOVELCAST_SERVER", default_value = "http://localhost:3000")]
        server: String,
    },

    /// Listen to a story headlessly, chapter after chapter, saving each one
    Follow {
        /// Base URL of a novelcast server
        #[arg(long, env = "NOVELCAST_SERVER", default_value = "http://localhost:3000")]
        server: String,
        /// URL of the first chapter
        #[arg(long)]
        chapter: String,
        /// Directory for the finished chapters
        #[arg(long)]
        out_dir: PathBuf,
        /// Stop after this many chapters
        #[arg(long, default_value_t = 1)]
        max_chapters: usize,
        /// Playback speed multiplier for the virtual clock
        #[arg(long, default_value_t = 1)]
        speed: u32,
        /// Voice short name, e.g. vi-VN-GTTS-Male
        #[arg(long)]
        voice: Option<String>,
        /// Speaking rate, e.g. +10% or 1.2
        #[arg(long)]
        rate: Option<String>,
        /// Settings file to load and update
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}
