//! Serve command handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use novelcast_axum::{ServerConfig, start_server};
use novelcast_core::{ContentResolver, ResolverRegistry};
use novelcast_tts::EngineConfig;

/// Options of the serve command; `None` keeps the server default.
#[derive(Debug, Default)]
pub struct ServeOptions {
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
    pub max_segment_chars: Option<usize>,
    pub concurrency: Option<usize>,
    pub stream_timeout_secs: Option<u64>,
    pub allowed_origins: Vec<String>,
}

impl ServeOptions {
    pub fn into_config(self) -> ServerConfig {
        let mut engine = EngineConfig::with_defaults();
        if let Some(chars) = self.max_segment_chars {
            engine = engine.max_segment_chars(chars);
        }
        if let Some(concurrency) = self.concurrency {
            engine = engine.concurrency(concurrency);
        }

        let mut config = ServerConfig::with_defaults().with_engine(engine);
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(dir) = self.static_dir {
            config = config.with_static_dir(dir);
        }
        if let Some(secs) = self.stream_timeout_secs {
            config = config.with_stream_timeout(Duration::from_secs(secs));
        }
        if !self.allowed_origins.is_empty() {
            config = config.with_allowed_origins(self.allowed_origins);
        }
        config
    }
}

/// Execute the serve command.
///
/// Chapter scraping is not bundled, so the resolver registry starts empty
/// and chapter URLs are rejected as unsupported; raw text works as is.
pub async fn execute(options: ServeOptions) -> Result<()> {
    let config = options.into_config();
    let resolver: Arc<dyn ContentResolver> = Arc::new(ResolverRegistry::new());

    println!("novelcast server on http://localhost:{}", config.port);
    start_server(config, resolver).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_kept() {
        let config = ServeOptions::default().into_config();
        assert_eq!(config.port, 3000);
        assert_eq!(config.engine, EngineConfig::with_defaults());
        assert_eq!(config.transport.stream_timeout, Duration::from_secs(300));
    }

    #[test]
    fn overrides_apply() {
        let config = ServeOptions {
            port: Some(8080),
            max_segment_chars: Some(120),
            concurrency: Some(5),
            stream_timeout_secs: Some(60),
            ..ServeOptions::default()
        }
        .into_config();
        assert_eq!(config.port, 8080);
        assert_eq!(config.engine.max_segment_chars, 120);
        assert_eq!(config.engine.concurrency, 5);
        assert_eq!(config.transport.stream_timeout, Duration::from_secs(60));
    }
}
