//! Speak command handler.
//!
//! Runs the synthesis engine in-process and appends audio to the output file
//! as soon as each in-order chunk is ready.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use novelcast_core::VoiceOptions;
use novelcast_tts::{EngineConfig, GoogleTranslateProvider, SynthesisEngine};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct SpeakOptions {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub out: PathBuf,
    pub voice: Option<String>,
    pub max_segment_chars: Option<usize>,
    pub concurrency: Option<usize>,
}

impl SpeakOptions {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::with_defaults();
        if let Some(chars) = self.max_segment_chars {
            config = config.max_segment_chars(chars);
        }
        if let Some(concurrency) = self.concurrency {
            config = config.concurrency(concurrency);
        }
        config
    }
}

/// Execute the speak command. Ctrl-C stops synthesis and keeps what was
/// written so far.
pub async fn execute(options: SpeakOptions) -> Result<()> {
    let text = match (&options.text, &options.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Either --text or --file is required"),
    };

    let provider = Arc::new(GoogleTranslateProvider::new()?);
    let engine = SynthesisEngine::new(provider, options.engine_config());
    let voice = VoiceOptions {
        voice_short_name: options.voice.clone(),
        ..VoiceOptions::default()
    };

    let cancel = CancellationToken::new();
    let mut audio = engine.synthesize(&text, &voice, &cancel)?;
    let mut file = tokio::fs::File::create(&options.out)
        .await
        .with_context(|| format!("Failed to create {}", options.out.display()))?;

    let mut written = 0usize;
    loop {
        let next = tokio::select! {
            next = audio.next() => next,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                println!("Interrupted");
                break;
            }
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len();
        tracing::debug!(bytes = chunk.len(), total = written, "Chunk written");
    }
    file.flush().await?;

    println!("Wrote {written} bytes to {}", options.out.display());
    Ok(())
}
