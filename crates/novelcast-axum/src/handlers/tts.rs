//! Text-to-speech handlers.

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use novelcast_core::{StoryContent, Voice, filter_by_locale};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::dto::{ContentSource, ConvertForm};
use crate::error::HttpError;
use crate::state::AppState;
use crate::stream::{audio_body, first_chunk};

/// `GET /api/tts/voices`
pub async fn voices(State(state): State<AppState>) -> Result<Json<Vec<Voice>>, HttpError> {
    let voices = state.engine.provider().voices().await?;
    Ok(Json(filter_by_locale(
        voices,
        &state.transport.voice_locale_prefix,
    )))
}

/// `POST /api/tts/convert`
///
/// Streams `audio/mpeg` as segments are synthesized. The head is held back
/// until the first chunk exists so early failures still get a JSON error.
pub async fn convert(
    State(state): State<AppState>,
    Form(form): Form<ConvertForm>,
) -> Result<Response, HttpError> {
    let deadline = Instant::now() + state.transport.stream_timeout;
    let story = resolve_story(&state, form.source()?, deadline).await?;
    let navigation = story.navigation();

    let audio = state.engine.synthesize(
        &story.content,
        &form.voice_options(),
        &CancellationToken::new(),
    )?;
    let session = audio.session_id();
    let (first, rest) = first_chunk(audio, deadline).await?;

    tracing::info!(
        %session,
        chapter = ?navigation.current.as_ref().and_then(|c| c.title.as_deref()),
        first_chunk_bytes = first.len(),
        "Streaming audio"
    );

    let mut response = audio_body(first, rest, deadline).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    for (name, value) in navigation.to_headers() {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| HttpError::Internal(format!("Invalid {name} header: {e}")))?;
        headers.insert(name, value);
    }
    Ok(response)
}

async fn resolve_story(
    state: &AppState,
    source: ContentSource,
    deadline: Instant,
) -> Result<StoryContent, HttpError> {
    match source {
        ContentSource::Text(text) => Ok(StoryContent {
            content: text,
            ..StoryContent::default()
        }),
        ContentSource::Chapter(url) => {
            tracing::debug!(%url, "Resolving chapter");
            match timeout_at(deadline, state.resolver.resolve(&url)).await {
                Ok(story) => Ok(story?),
                Err(_) => Err(HttpError::Timeout(
                    "Timed out resolving chapter content".to_string(),
                )),
            }
        }
    }
}
