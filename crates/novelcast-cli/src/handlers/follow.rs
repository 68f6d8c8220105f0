//! Follow command handler.
//!
//! A headless listener: plays a story through [`PlaybackSession`] on a
//! virtual clock, so prefetch and chapter handoff run exactly as they would
//! in a browser, and writes every finished chapter to disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use novelcast_core::{ChapterRef, SettingsStore, TtsSettings, load_settings, save_settings};
use novelcast_player::{
    ClockMedia, FinishedChapter, PlaybackSession, PlaybackState, SessionConfig, TtsClient,
};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct FollowOptions {
    pub server: String,
    pub chapter: String,
    pub out_dir: PathBuf,
    pub max_chapters: usize,
    pub speed: u32,
    pub voice: Option<String>,
    pub rate: Option<String>,
    pub settings: Option<PathBuf>,
}

/// Execute the follow command.
pub async fn execute(options: FollowOptions) -> Result<()> {
    tokio::fs::create_dir_all(&options.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", options.out_dir.display()))?;

    let client = TtsClient::new(&options.server)?;
    let settings = prepare_settings(&client, &options).await?;

    let media = ClockMedia::default();
    let session = PlaybackSession::new(
        Arc::new(client),
        Box::new(media.clone()),
        settings,
        SessionConfig::with_defaults(),
    );

    tokio::select! {
        result = listen(session, media, &options) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
            Ok(())
        }
    }
}

/// Load the settings file (if any), apply command-line overrides, drop a
/// voice the server no longer offers, and write the result back.
async fn prepare_settings(client: &TtsClient, options: &FollowOptions) -> Result<SettingsStore> {
    let raw = match &options.settings {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        },
        None => None,
    };

    let mut settings = load_settings(raw.as_deref());
    if options.voice.is_some() {
        settings.voice_short_name.clone_from(&options.voice);
    }
    if options.rate.is_some() {
        settings.rate.clone_from(&options.rate);
    }

    match client.voices().await {
        Ok(voices) => settings = settings.resolve_against(&voices),
        Err(e) => tracing::warn!(error = %e, "Could not list voices, keeping stored voice"),
    }

    let store = SettingsStore::new(TtsSettings::default());
    store.update(settings)?;

    if let Some(path) = &options.settings {
        tokio::fs::write(path, save_settings(&store.get())?)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(store)
}

async fn listen(mut session: PlaybackSession, media: ClockMedia, options: &FollowOptions) -> Result<()> {
    let navigation = session.play_chapter(&options.chapter).await?;
    print_now_playing(navigation.current.as_ref());

    let step = TICK * options.speed.max(1);
    let mut ticker = tokio::time::interval(TICK);
    let mut saved = 0usize;

    loop {
        ticker.tick().await;
        if let Some(e) = session.take_stream_error() {
            tracing::warn!(error = %e, "Chapter stream ended early");
        }

        let ended = media.advance(step) || session.state() == PlaybackState::Ended;
        if !ended {
            session.on_time_update();
            continue;
        }

        let Some(finished) = session.chapter_ended() else {
            tracing::debug!("Waiting for more audio");
            continue;
        };
        saved += 1;
        save_chapter(&options.out_dir, saved, &finished).await?;
        if saved >= options.max_chapters {
            break;
        }

        match session.on_chapter_end().await? {
            Some(next) => print_now_playing(next.current.as_ref()),
            None => {
                println!("End of story");
                break;
            }
        }
    }

    println!("Saved {saved} chapter(s) to {}", options.out_dir.display());
    Ok(())
}

fn print_now_playing(chapter: Option<&ChapterRef>) {
    let title = chapter
        .and_then(|c| c.title.as_deref())
        .unwrap_or("(untitled)");
    println!("▶ {title}");
}

async fn save_chapter(dir: &Path, index: usize, finished: &FinishedChapter) -> Result<PathBuf> {
    let path = dir.join(chapter_file_name(index, finished.chapter.as_ref()));
    tokio::fs::write(&path, &finished.audio)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("  saved {} ({} bytes)", path.display(), finished.audio.len());
    Ok(path)
}

/// `003-chương-3.mp3`-style names: index plus a filesystem-safe title.
fn chapter_file_name(index: usize, chapter: Option<&ChapterRef>) -> String {
    let title = chapter.and_then(|c| c.title.as_deref()).unwrap_or_default();
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("{index:03}.mp3")
    } else {
        format!("{index:03}-{slug}.mp3")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn file_names_are_slugged() {
        let chapter = ChapterRef::new("https://bnsach.com/c/3", "Chương 3: Gặp gỡ!");
        assert_eq!(
            chapter_file_name(3, Some(&chapter)),
            "003-chương-3-gặp-gỡ.mp3"
        );
        assert_eq!(chapter_file_name(12, None), "012.mp3");
    }

    #[tokio::test]
    async fn finished_chapter_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let finished = FinishedChapter {
            chapter: Some(ChapterRef::new("https://bnsach.com/c/1", "Mở đầu")),
            audio: Bytes::from_static(&[1, 2, 3]),
        };

        let path = save_chapter(dir.path(), 1, &finished).await.unwrap();
        assert!(path.ends_with("001-mở-đầu.mp3"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![1, 2, 3]);
    }
}
