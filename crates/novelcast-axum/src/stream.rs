//! Deadline-bounded audio bodies.
//!
//! A conversion request has one deadline. Until the first chunk arrives the
//! deadline turns into a `408`; afterwards it can only cut the body short.

use std::io;

use axum::body::Body;
use bytes::Bytes;
use futures_util::StreamExt;
use novelcast_tts::{AudioStream, SynthesisError};
use tokio::time::{Instant, timeout_at};

use crate::error::HttpError;

/// Wait for the first audio chunk, or fail with a pre-head error.
///
/// Dropping `audio` on failure cancels the synthesis session.
pub async fn first_chunk(
    mut audio: AudioStream,
    deadline: Instant,
) -> Result<(Bytes, AudioStream), HttpError> {
    match timeout_at(deadline, audio.next()).await {
        Ok(Some(Ok(chunk))) => Ok((chunk, audio)),
        Ok(Some(Err(e))) => Err(e.into()),
        Ok(None) => Err(SynthesisError::NoAudioProduced { segments: 0 }.into()),
        Err(_) => {
            tracing::warn!(session = %audio.session_id(), "No audio before stream timeout");
            Err(SynthesisError::Timeout.into())
        }
    }
}

/// Body that replays `first` and then forwards `rest` until `deadline`.
///
/// Yielding an error aborts the chunked body instead of finishing it cleanly,
/// so the client can tell a truncated stream from a complete one.
pub fn audio_body(first: Bytes, mut rest: AudioStream, deadline: Instant) -> Body {
    let session = rest.session_id();
    let stream = async_stream::stream! {
        let mut sent = first.len();
        yield Ok::<Bytes, io::Error>(first);

        loop {
            match timeout_at(deadline, rest.next()).await {
                Ok(Some(Ok(chunk))) => {
                    sent += chunk.len();
                    yield Ok(chunk);
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(%session, error = %e, "Synthesis failed mid-stream");
                    yield Err(io::Error::other(e));
                    break;
                }
                Ok(None) => {
                    tracing::debug!(%session, bytes = sent, "Audio stream finished");
                    break;
                }
                Err(_) => {
                    tracing::warn!(%session, bytes = sent, "Stream timeout, terminating body");
                    rest.cancel();
                    yield Err(io::Error::new(io::ErrorKind::TimedOut, "stream timeout"));
                    break;
                }
            }
        }
    };
    Body::from_stream(stream)
}
