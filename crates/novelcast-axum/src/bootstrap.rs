//! Axum server bootstrap - the composition root.
//!
//! This module is the only place where the speech provider, the synthesis
//! engine and the content resolver are wired together for the web adapter.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use novelcast_core::{ContentResolver, SpeechProvider};
use novelcast_tts::{EngineConfig, GoogleTranslateProvider, SynthesisEngine};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Per-request transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Hard limit on a whole conversion request, streaming included.
    pub stream_timeout: Duration,
    /// Only voices whose locale starts with this prefix are listed.
    pub voice_locale_prefix: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            stream_timeout: Duration::from_secs(5 * 60),
            voice_locale_prefix: "vi-".to_string(),
        }
    }
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// Optional path to static assets for SPA serving.
    pub static_dir: Option<PathBuf>,
    /// CORS configuration.
    pub cors: CorsConfig,
    pub engine: EngineConfig,
    pub transport: TransportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ServerConfig {
    pub fn with_defaults() -> Self {
        Self {
            port: 3000,
            static_dir: None,
            cors: CorsConfig::default(),
            engine: EngineConfig::with_defaults(),
            transport: TransportConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the static directory for SPA serving.
    #[must_use]
    pub fn with_static_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(path.into());
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    #[must_use]
    pub const fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub const fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.transport.stream_timeout = timeout;
        self
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    pub engine: SynthesisEngine,
    pub resolver: Arc<dyn ContentResolver>,
    pub transport: TransportConfig,
}

impl AxumContext {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        resolver: Arc<dyn ContentResolver>,
        engine: EngineConfig,
        transport: TransportConfig,
    ) -> Self {
        Self {
            engine: SynthesisEngine::new(provider, engine),
            resolver,
            transport,
        }
    }
}

/// Build the context with the bundled Google Translate provider.
pub fn bootstrap(config: &ServerConfig, resolver: Arc<dyn ContentResolver>) -> Result<AxumContext> {
    let provider: Arc<dyn SpeechProvider> = Arc::new(GoogleTranslateProvider::new()?);

    tracing::info!(
        provider = provider.name(),
        concurrency = config.engine.concurrency,
        max_segment_chars = config.engine.max_segment_chars,
        stream_timeout_secs = config.transport.stream_timeout.as_secs(),
        "Axum bootstrap complete"
    );

    Ok(AxumContext::new(
        provider,
        resolver,
        config.engine,
        config.transport.clone(),
    ))
}

/// Start the web server and serve until the process is stopped.
pub async fn start_server(config: ServerConfig, resolver: Arc<dyn ContentResolver>) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let ctx = bootstrap(&config, resolver)?;

    // Choose router based on whether static serving is configured
    let app = if let Some(ref static_dir) = config.static_dir {
        info!("Serving static assets from: {}", static_dir.display());
        crate::routes::create_spa_router(ctx, static_dir, &config.cors)
    } else {
        crate::routes::create_router(ctx, &config.cors)
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("novelcast server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
