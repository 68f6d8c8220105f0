//! HTTP client for the stream transport.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use novelcast_core::{ChapterNavigation, Voice, VoiceOptions};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The read was cancelled locally. Expected during resets and handoffs.
    #[error("Request aborted")]
    Aborted,

    #[error("Network error: {0}")]
    Network(String),

    /// Non-OK response; `message` comes from the server's JSON body if any.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Audio body of an opened conversion.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// A conversion request, as sent by the browser client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertRequest {
    pub chapter_url: Option<String>,
    pub text: Option<String>,
    pub voice: VoiceOptions,
}

impl ConvertRequest {
    pub fn chapter(url: impl Into<String>, voice: VoiceOptions) -> Self {
        Self {
            chapter_url: Some(url.into()),
            text: None,
            voice,
        }
    }

    pub fn text(text: impl Into<String>, voice: VoiceOptions) -> Self {
        Self {
            chapter_url: None,
            text: Some(text.into()),
            voice,
        }
    }

    fn form_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("chapterUrl", self.chapter_url.as_deref()),
            ("text", self.text.as_deref()),
            ("voiceShortName", self.voice.voice_short_name.as_deref()),
            ("rate", self.voice.rate.as_deref()),
            ("pitch", self.voice.pitch.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Response head plus the live body.
pub struct OpenedStream {
    pub navigation: ChapterNavigation,
    pub body: ByteStream,
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("navigation", &self.navigation)
            .finish_non_exhaustive()
    }
}

/// The conversion endpoint as seen by the playback session.
///
/// `cancel` governs both the request and the returned body: once it fires,
/// the body yields [`ClientError::Aborted`] and ends.
#[async_trait]
pub trait ConvertApi: Send + Sync {
    async fn open(
        &self,
        request: &ConvertRequest,
        cancel: CancellationToken,
    ) -> Result<OpenedStream, ClientError>;
}

/// Wrap a body so that cancelling `cancel` ends it with `Aborted`.
pub fn abortable<S>(body: S, cancel: CancellationToken) -> ByteStream
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = body.next() => Some(next),
            };
            match next {
                None => {
                    yield Err(ClientError::Aborted);
                    break;
                }
                Some(Some(Ok(chunk))) => yield Ok(chunk),
                Some(Some(Err(e))) => {
                    yield Err(e);
                    break;
                }
                Some(None) => break,
            }
        }
    })
}

/// reqwest client for a novelcast server.
#[derive(Debug, Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    base: Url,
}

impl TtsClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }

    /// `GET /api/tts/voices`
    pub async fn voices(&self) -> Result<Vec<Voice>, ClientError> {
        let response = self.http.get(self.endpoint("api/tts/voices")?).send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ConvertApi for TtsClient {
    async fn open(
        &self,
        request: &ConvertRequest,
        cancel: CancellationToken,
    ) -> Result<OpenedStream, ClientError> {
        let send = self
            .http
            .post(self.endpoint("api/tts/convert")?)
            .form(&request.form_fields())
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Aborted),
            response = send => response?,
        };
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }

        let navigation = ChapterNavigation::from_headers(|name| {
            response.headers().get(name).and_then(|v| v.to_str().ok())
        });
        tracing::debug!(
            chapter = ?navigation.current.as_ref().and_then(|c| c.title.as_deref()),
            has_next = navigation.next_chapter().is_some(),
            "Audio stream opened"
        );

        let body = response.bytes_stream().map(|r| r.map_err(ClientError::from));
        Ok(OpenedStream {
            navigation,
            body: abortable(body, cancel),
        })
    }
}

async fn server_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    ClientError::Server { status, message }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    #[test]
    fn form_skips_absent_fields() {
        let request = ConvertRequest::chapter(
            "https://bnsach.com/c/1",
            VoiceOptions::default().with_voice("vi-VN-GTTS-Male"),
        );
        assert_eq!(
            request.form_fields(),
            vec![
                ("chapterUrl", "https://bnsach.com/c/1"),
                ("voiceShortName", "vi-VN-GTTS-Male"),
            ]
        );
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = TtsClient::new("http://localhost:3000/novel").unwrap();
        assert_eq!(
            client.endpoint("api/tts/convert").unwrap().as_str(),
            "http://localhost:3000/novel/api/tts/convert"
        );
        assert!(matches!(
            TtsClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn abortable_body_ends_with_aborted() {
        let cancel = CancellationToken::new();
        let chunks = stream::iter(vec![Ok(Bytes::from_static(b"a"))]).chain(stream::pending());
        let mut body = abortable(chunks, cancel.clone());

        assert_eq!(body.next().await, Some(Ok(Bytes::from_static(b"a"))));
        cancel.cancel();
        assert_eq!(body.next().await, Some(Err(ClientError::Aborted)));
        assert_eq!(body.next().await, None);
    }

    #[tokio::test]
    async fn abortable_body_passes_through_completion() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]);
        let body = abortable(chunks, CancellationToken::new());
        let all: Vec<_> = body.collect().await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(Result::is_ok));
    }
}
