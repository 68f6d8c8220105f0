//! Google Translate text-to-speech provider.
//!
//! Uses the public `translate_tts` endpoint, which returns one MP3 per
//! request for up to ~200 characters of text. Rate and pitch are not
//! supported by this endpoint and are ignored.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use novelcast_core::{SpeechError, SpeechProvider, Voice, VoiceOptions};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use url::Url;

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

const DEFAULT_LANGUAGE: &str = "vi";

/// First attempt uses the first agent; retries use the second.
const USER_AGENTS: [&str; 2] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

#[derive(Debug, Clone)]
pub struct GoogleTranslateProvider {
    client: reqwest::Client,
    endpoint: Url,
    first_attempt_timeout: Duration,
    retry_timeout: Duration,
}

impl GoogleTranslateProvider {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: default_endpoint(),
            first_attempt_timeout: Duration::from_secs(15),
            retry_timeout: Duration::from_secs(20),
        }
    }

    /// Point the provider at another endpoint (mirrors, local test servers).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, first_attempt: Duration, retries: Duration) -> Self {
        self.first_attempt_timeout = first_attempt;
        self.retry_timeout = retries;
        self
    }

    fn request_url(&self, text: &str, language: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("ie", "UTF-8")
            .append_pair("q", text)
            .append_pair("tl", language)
            .append_pair("client", "tw-ob");
        url
    }

    const fn timeout_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.first_attempt_timeout
        } else {
            self.retry_timeout
        }
    }
}

fn default_endpoint() -> Url {
    match Url::parse(TRANSLATE_TTS_URL) {
        Ok(url) => url,
        Err(e) => unreachable!("built-in endpoint is a valid URL: {e}"),
    }
}

const fn user_agent_for(attempt: u32) -> &'static str {
    if attempt <= 1 {
        USER_AGENTS[0]
    } else {
        USER_AGENTS[1]
    }
}

/// Map a non-success status to a provider error.
///
/// Throttling and request timeouts are worth retrying even though they are
/// 4xx; every other 4xx means the text itself was refused.
fn classify_status(status: StatusCode) -> SpeechError {
    let detail = format!("HTTP {status}");
    if status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
    {
        SpeechError::Rejected(detail)
    } else {
        SpeechError::Transient(detail)
    }
}

fn fixed_voices() -> Vec<Voice> {
    [("Female", "vi-VN-GTTS-Female"), ("Male", "vi-VN-GTTS-Male")]
        .into_iter()
        .map(|(gender, short_name)| Voice {
            short_name: short_name.to_string(),
            gender: gender.to_string(),
            locale: "vi-VN".to_string(),
            friendly_name: format!("Google Text-to-Speech Vietnamese ({gender})"),
            status: "GA".to_string(),
        })
        .collect()
}

#[async_trait]
impl SpeechProvider for GoogleTranslateProvider {
    async fn synthesize_one(
        &self,
        text: &str,
        voice: &VoiceOptions,
        attempt: u32,
    ) -> Result<Bytes, SpeechError> {
        let language = voice.language().unwrap_or(DEFAULT_LANGUAGE);
        let url = self.request_url(text, language);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout_for(attempt))
            .header(USER_AGENT, user_agent_for(attempt))
            .header(ACCEPT, "audio/mpeg, audio/*")
            .header(ACCEPT_LANGUAGE, "vi-VN,vi;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| SpeechError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Transient(e.to_string()))?;
        if audio.is_empty() {
            return Err(SpeechError::Transient("empty audio body".to_string()));
        }
        Ok(audio)
    }

    async fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(fixed_voices())
    }

    fn name(&self) -> &str {
        "google-translate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoogleTranslateProvider {
        GoogleTranslateProvider::with_client(reqwest::Client::new())
    }

    #[test]
    fn request_url_carries_text_and_language() {
        let url = provider().request_url("Xin chào & tạm biệt", "vi");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(url.host_str(), Some("translate.google.com"));
        assert_eq!(url.path(), "/translate_tts");
        assert!(pairs.contains(&("q".to_string(), "Xin chào & tạm biệt".to_string())));
        assert!(pairs.contains(&("tl".to_string(), "vi".to_string())));
        assert!(pairs.contains(&("client".to_string(), "tw-ob".to_string())));
        assert!(pairs.contains(&("ie".to_string(), "UTF-8".to_string())));
    }

    #[test]
    fn retries_get_longer_timeout_and_other_agent() {
        let p = provider();
        assert_eq!(p.timeout_for(1), Duration::from_secs(15));
        assert_eq!(p.timeout_for(2), Duration::from_secs(20));
        assert_ne!(user_agent_for(1), user_agent_for(2));
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            SpeechError::Rejected("HTTP 400 Bad Request".to_string())
        );
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT).is_retryable());
        assert!(classify_status(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(!classify_status(StatusCode::FORBIDDEN).is_retryable());
    }

    #[tokio::test]
    async fn offers_two_vietnamese_voices() {
        let voices = provider().voices().await.unwrap();
        let names: Vec<&str> = voices.iter().map(|v| v.short_name.as_str()).collect();
        assert_eq!(names, vec!["vi-VN-GTTS-Female", "vi-VN-GTTS-Male"]);
        assert!(voices.iter().all(|v| v.locale == "vi-VN" && v.status == "GA"));
        assert_eq!(
            voices[1].friendly_name,
            "Google Text-to-Speech Vietnamese (Male)"
        );
    }
}
