//! chat0-server - HTTP gateway in front of the supported LLM providers
//!
//! The server resolves a display model name to a provider, takes the
//! caller's key from the model's credential header, and streams the reply
//! back as one UI message stream regardless of which provider produced it.
//!
//! Routes:
//! - `POST /api/chat` - streaming chat
//! - `POST /api/completion` - one-shot title/summary text
//! - `GET /api/models` - model catalog
//! - `GET /api/health` - liveness

mod error;
pub mod http;
pub mod prompts;
mod state;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

pub use error::{ApiError, ServerError};
pub use http::create_router;
pub use state::{AppState, DEFAULT_SUMMARY_MODEL};

/// The main chat0 server
pub struct Chat0Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Chat0Server {
    /// Create a server over `state`, applying the configured limits
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let state = state
            .with_request_timeout(config.request_timeout)
            .with_smoothing_delay(config.smoothing_delay);
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Create a server with state used as given (for testing)
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener).await
    }

    /// Run the server on an already-bound listener until Ctrl-C
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("chat0 server listening on {}", addr);
        }

        let state = Arc::clone(&self.state);
        let router = create_router(Arc::clone(&self.state));
        let shutdown = state.shutdown.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
                    _ = shutdown.cancelled() => {}
                }
                shutdown.cancel();
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        state.tasks.close();
        state.tasks.wait().await;
        tracing::info!("chat0 server stopped");
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Ceiling on the duration of one streamed response
    pub request_timeout: Duration,
    /// Pause between word-sized output increments
    pub smoothing_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7743,
            request_timeout: Duration::from_secs(60),
            smoothing_delay: Duration::from_millis(10),
        }
    }
}

impl ServerConfig {
    /// Create a new config with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
