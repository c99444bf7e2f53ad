//! HTTP server for the scholar pipeline

pub mod routes;
pub mod state;

use axum::{http::HeaderValue, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ScholarConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Scholar HTTP server
pub struct ScholarServer {
    config: ScholarConfig,
    state: AppState,
}

impl ScholarServer {
    /// Create a new server
    pub fn new(config: ScholarConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Shared application state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let origin = match self.config.server.cors_origin_list() {
            None => AllowOrigin::from(Any),
            Some(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match o.parse() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                            None
                        }
                    })
                    .collect();
                AllowOrigin::list(origins)
            }
        };
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any);

        let api = routes::api_routes(self.config.server.max_upload_size);
        let prefix = self.config.server.api_prefix.trim_end_matches('/');
        let router = if prefix.is_empty() {
            Router::new().merge(api)
        } else {
            Router::new().nest(prefix, api)
        };

        router
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting scholar server on http://{}", addr);
        tracing::info!("API info: http://{}{}/info", addr, self.config.server.api_prefix);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}
