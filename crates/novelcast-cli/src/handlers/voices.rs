//! Voices command handler.

use anyhow::Result;
use novelcast_player::TtsClient;

pub async fn execute(server: &str) -> Result<()> {
    let voices = TtsClient::new(server)?.voices().await?;

    if voices.is_empty() {
        println!("The server offers no voices.");
        return Ok(());
    }

    println!("{:<24} {:<8} {:<8} Name", "ShortName", "Gender", "Locale");
    println!("{}", "-".repeat(80));
    for voice in voices {
        println!(
            "{:<24} {:<8} {:<8} {}",
            voice.short_name, voice.gender, voice.locale, voice.friendly_name
        );
    }
    Ok(())
}
