//! The HTTP service.
//!
//! ## Startup
//!
//! 1. privilege check (`REQUIRE_NON_ROOT`)
//! 2. bind the listener on `HOST:PORT`
//! 3. start serving; `/health` answers 503 meanwhile
//! 4. converter warm-up: scratch dir, pdfium bind or `pdf2htmlEX` lookup
//! 5. mark ready; `/health` answers 200
//!
//! Every step is fatal on failure and nothing is retried. Restart policy
//! belongs to the orchestrator.
//!
//! ## Example
//! ```no_run
//! use edgequake_pdf2html::server::{Server, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! Server::builder()
//!     .config(ServerConfig::from_env())
//!     .build()?
//!     .bind()
//!     .await?
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;

use crate::converter::{HtmlConverter, PipelineConverter};
use crate::error::Pdf2HtmlError;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Fatal service errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Refusing to run as root (REQUIRE_NON_ROOT is set)")]
    RunningAsRoot,

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Startup check failed: {0}")]
    Startup(#[source] Pdf2HtmlError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fluent builder for the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Default)]
pub struct ServerBuilder {
    config: ServerConfig,
    converter: Option<Arc<dyn HtmlConverter>>,
}

impl ServerBuilder {
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Use a custom converter instead of the pipeline built from the config.
    pub fn converter(mut self, converter: Arc<dyn HtmlConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// # Errors
    /// Returns [`ServerError::Startup`] if the conversion settings are invalid.
    pub fn build(self) -> Result<Server, ServerError> {
        let converter = match self.converter {
            Some(c) => c,
            None => {
                let conversion = self
                    .config
                    .conversion_config()
                    .map_err(ServerError::Startup)?;
                Arc::new(PipelineConverter::new(conversion))
            }
        };
        Ok(Server {
            config: self.config,
            converter,
        })
    }
}

/// A configured service, not yet listening.
#[must_use = "call .bind().await to start listening"]
pub struct Server {
    config: ServerConfig,
    converter: Arc<dyn HtmlConverter>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the privilege check and bind the listening socket.
    ///
    /// # Errors
    /// [`ServerError::RunningAsRoot`] or [`ServerError::Bind`] (port in use,
    /// address unavailable).
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        bootstrap::check_privileges(self.config.require_non_root, bootstrap::effective_uid())?;

        let addr = self.config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, app = %self.config.app_name, "Listening");

        let state = AppState::new(
            self.converter,
            self.config.app_name.clone(),
            self.config.workers,
            self.config.request_timeout(),
        );
        let router = build_router(state.clone(), self.config.max_body_bytes());

        Ok(BoundServer {
            listener,
            local_addr,
            state,
            router,
        })
    }
}

/// A service with its socket bound.
#[must_use = "call .run().await to serve requests"]
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: AppState,
    router: Router,
}

impl BoundServer {
    /// The bound address (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
    }

    /// Serve until `shutdown` completes, then drain in-flight requests.
    ///
    /// Requests are accepted immediately; `/health` reports ready only after
    /// the converter's warm-up succeeded. A failed warm-up stops the server
    /// and is returned as [`ServerError::Startup`].
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let BoundServer {
            listener,
            state,
            router,
            ..
        } = self;

        let serve = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
        });

        if let Err(e) = state.converter.warm_up().await {
            error!("Startup check failed: {e}");
            serve.abort();
            return Err(ServerError::Startup(e));
        }
        state.mark_ready();
        info!(
            converter = %state.converter.kind(),
            workers = state.workers,
            "Service ready"
        );

        serve
            .await
            .map_err(|e| ServerError::Io(std::io::Error::other(e)))??;
        info!("Server shutdown complete");
        Ok(())
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
pub async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<_, std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
