//! Voice descriptors and per-request voice options.

use serde::{Deserialize, Serialize};

/// A voice offered by a speech provider.
///
/// Serialized with PascalCase keys (`ShortName`, `Locale`, ...) because that
/// is the shape the browser client and the voice pickers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Voice {
    pub short_name: String,
    pub gender: String,
    pub locale: String,
    pub friendly_name: String,
    pub status: String,
}

/// Keep only voices whose locale starts with `prefix` (e.g. `"vi-"`).
#[must_use]
pub fn filter_by_locale(voices: Vec<Voice>, prefix: &str) -> Vec<Voice> {
    voices
        .into_iter()
        .filter(|v| v.locale.starts_with(prefix))
        .collect()
}

/// Voice parameters of one conversion request.
///
/// All fields are optional; providers fall back to their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOptions {
    pub voice_short_name: Option<String>,
    pub rate: Option<String>,
    pub pitch: Option<String>,
}

impl VoiceOptions {
    #[must_use]
    pub fn with_voice(mut self, short_name: impl Into<String>) -> Self {
        self.voice_short_name = Some(short_name.into());
        self
    }

    /// Language code derived from the voice name (`vi-VN-GTTS-Female` → `vi`).
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.voice_short_name
            .as_deref()
            .and_then(|name| name.split('-').next())
            .filter(|lang| !lang.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(short_name: &str, locale: &str) -> Voice {
        Voice {
            short_name: short_name.to_string(),
            gender: "Female".to_string(),
            locale: locale.to_string(),
            friendly_name: short_name.to_string(),
            status: "GA".to_string(),
        }
    }

    #[test]
    fn voice_serializes_with_pascal_case_keys() {
        let json = serde_json::to_value(voice("vi-VN-GTTS-Female", "vi-VN")).unwrap();
        assert_eq!(json["ShortName"], "vi-VN-GTTS-Female");
        assert_eq!(json["FriendlyName"], "vi-VN-GTTS-Female");
        assert_eq!(json["Locale"], "vi-VN");
    }

    #[test]
    fn filter_keeps_locale_family() {
        let voices = vec![voice("a", "vi-VN"), voice("b", "en-US"), voice("c", "vi-VN")];
        let kept = filter_by_locale(voices, "vi-");
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|v| v.locale == "vi-VN"));
    }

    #[test]
    fn language_comes_from_voice_prefix() {
        let opts = VoiceOptions::default().with_voice("vi-VN-GTTS-Male");
        assert_eq!(opts.language(), Some("vi"));
        assert_eq!(VoiceOptions::default().language(), None);
    }
}
