//! Port definitions (trait abstractions) for external systems.
//!
//! Adapters implement these traits; the synthesis engine and the HTTP layer
//! only ever see `Arc<dyn ...>` handles.

mod content_resolver;
mod speech;

pub use content_resolver::{ContentResolver, ResolveError, ResolverRegistry};
pub use speech::{SpeechError, SpeechProvider};
