//! Top-level CLI parser.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the novelcast audio pipeline.
#[derive(Parser)]
#[command(name = "novelcast")]
#[command(about = "Stream web-novel chapters as speech")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["novelcast", "--verbose", "voices", "--server", "http://x:1"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Voices { ref server } if server == "http://x:1"));
    }

    #[test]
    fn test_speak_requires_a_source() {
        let missing = Cli::try_parse_from(["novelcast", "speak", "--out", "a.mp3"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "novelcast", "speak", "--text", "Xin chào", "--file", "a.txt", "--out", "a.mp3",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_follow_defaults() {
        let cli = Cli::parse_from([
            "novelcast",
            "follow",
            "--server",
            "http://localhost:3000",
            "--chapter",
            "https://bnsach.com/c/1",
            "--out-dir",
            "out",
        ]);
        let Commands::Follow {
            max_chapters,
            speed,
            ..
        } = cli.command
        else {
            panic!("expected follow");
        };
        assert_eq!(max_chapters, 1);
        assert_eq!(speed, 1);
    }
}
