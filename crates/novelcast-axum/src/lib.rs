//! Axum stream transport for novelcast.
//!
//! Exposes the synthesis engine over HTTP:
//!
//! - `POST /api/tts/convert`: form-encoded chapter URL or raw text in,
//!   progressively streamed `audio/mpeg` out, with chapter navigation in the
//!   `X-Current-Chapter`, `X-Next-Chapter` and `X-Prev-Chapter` headers.
//! - `GET /api/tts/voices`: the provider's voices for the configured locale.
//! - `GET /health`
//!
//! The response head is only committed once the first audio chunk exists,
//! so every failure that happens earlier is reported as a JSON error.

#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings for tests that live in tests/
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod stream;

// Re-export primary types
pub use bootstrap::{AxumContext, CorsConfig, ServerConfig, TransportConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::{create_router, create_spa_router};
pub use state::AppState;
