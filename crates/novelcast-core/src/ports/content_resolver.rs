//! Content resolver port and a registry that dispatches by site.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::domain::StoryContent;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Failed to extract chapter content: {0}")]
    ExtractionFailed(String),
}

/// Turns a chapter reference (usually a URL) into text plus navigation.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<StoryContent, ResolveError>;
}

/// Dispatches chapter URLs to site-specific resolvers by host name.
///
/// Hosts are matched without a leading `www.`.
#[derive(Default, Clone)]
pub struct ResolverRegistry {
    by_host: HashMap<String, Arc<dyn ContentResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resolver(mut self, host: &str, resolver: Arc<dyn ContentResolver>) -> Self {
        self.register(host, resolver);
        self
    }

    pub fn register(&mut self, host: &str, resolver: Arc<dyn ContentResolver>) {
        self.by_host.insert(normalize_host(host), resolver);
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.by_host.keys().map(String::as_str)
    }

    fn lookup(&self, reference: &str) -> Result<&Arc<dyn ContentResolver>, ResolveError> {
        let url = Url::parse(reference)
            .map_err(|e| ResolveError::UnsupportedSource(format!("{reference}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| ResolveError::UnsupportedSource(format!("{reference}: no host")))?;
        self.by_host
            .get(&normalize_host(host))
            .ok_or_else(|| ResolveError::UnsupportedSource(host.to_string()))
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("hosts", &self.by_host.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl ContentResolver for ResolverRegistry {
    async fn resolve(&self, reference: &str) -> Result<StoryContent, ResolveError> {
        let resolver = self.lookup(reference)?;
        tracing::debug!(reference, "Resolving chapter content");
        resolver.resolve(reference).await
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}
