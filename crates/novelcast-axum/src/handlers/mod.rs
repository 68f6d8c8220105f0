//! HTTP request handlers.

pub mod tts;
