//! Request payloads.

use novelcast_core::VoiceOptions;
use serde::Deserialize;

use crate::error::HttpError;

/// Form body of `POST /api/tts/convert`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertForm {
    pub chapter_url: Option<String>,
    pub text: Option<String>,
    pub voice_short_name: Option<String>,
    pub rate: Option<String>,
    pub pitch: Option<String>,
}

/// Where the text to speak comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Chapter(String),
    Text(String),
}

impl ConvertForm {
    /// A non-blank `chapterUrl` wins over `text`.
    pub fn source(&self) -> Result<ContentSource, HttpError> {
        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }

        if let Some(url) = non_blank(&self.chapter_url) {
            return Ok(ContentSource::Chapter(url.trim().to_string()));
        }
        if let Some(text) = non_blank(&self.text) {
            return Ok(ContentSource::Text(text.to_string()));
        }
        Err(HttpError::BadRequest(
            "Either chapterUrl or text is required".to_string(),
        ))
    }

    pub fn voice_options(&self) -> VoiceOptions {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        VoiceOptions {
            voice_short_name: non_empty(&self.voice_short_name),
            rate: non_empty(&self.rate),
            pitch: non_empty(&self.pitch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_url_takes_precedence() {
        let form = ConvertForm {
            chapter_url: Some(" https://bnsach.com/c/1 ".into()),
            text: Some("ignored".into()),
            ..ConvertForm::default()
        };
        assert_eq!(
            form.source().unwrap(),
            ContentSource::Chapter("https://bnsach.com/c/1".into())
        );
    }

    #[test]
    fn blank_fields_are_missing() {
        let form = ConvertForm {
            chapter_url: Some(String::new()),
            text: Some("   ".into()),
            ..ConvertForm::default()
        };
        assert!(matches!(form.source(), Err(HttpError::BadRequest(_))));
    }

    #[test]
    fn empty_voice_fields_become_none() {
        let form = ConvertForm {
            voice_short_name: Some(String::new()),
            rate: Some("+10%".into()),
            ..ConvertForm::default()
        };
        let voice = form.voice_options();
        assert_eq!(voice.voice_short_name, None);
        assert_eq!(voice.rate.as_deref(), Some("+10%"));
    }
}
