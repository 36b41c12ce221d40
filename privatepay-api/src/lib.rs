//! # PrivatePay API Server
//!
//! REST API for PrivatePay stealth payments on Mantle, consumed by the web app.
//!
//! ## Endpoints
//!
//! - `POST /api/v1/keys/generate` - Generate a spend/viewing key set
//! - `POST /api/v1/stealth/create` - Derive a stealth address for a recipient
//! - `POST /api/v1/stealth/scan` - Scan announcements for payments
//! - `POST /api/v1/stealth/recover` - Recover a stealth private key
//! - `GET|POST /api/v1/announcements` - List or publish announcements
//! - `POST /api/v1/meta-addresses` - Register a meta-address
//! - `POST /api/v1/aliases` - Claim an alias
//! - `POST /api/v1/links` - Create a payment link
//! - `POST /api/v1/transactions` - Record a transaction
//!
//! ## Example
//!
//! ```rust,ignore
//! use privatepay_api::{ApiConfig, ApiServer};
//!
//! let config = ApiConfig::from_env()?;
//! let server = ApiServer::open(config).await?;
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AnnouncementStore, ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use privatepay_core::error::{PrivatePayError, Result};

/// Largest request body accepted.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// API server for PrivatePay.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server with every store in memory.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Creates a server, opening the announcement file if one is configured.
    pub async fn open(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::open(config).await?),
        })
    }

    /// Shared state behind the routes.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    fn cors(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        let allow_origin = if origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any)
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            %addr,
            network = %self.state.config.network.network,
            "PrivatePay API server listening"
        );

        axum::serve(listener, self.router()).await
    }
}

/// Starts the API server with configuration from the environment.
pub async fn start_server() -> Result<()> {
    let config = ApiConfig::from_env()?;
    let bind = config.bind_address();
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| {
            PrivatePayError::config("PRIVATEPAY_API_HOST", format!("cannot bind {}", bind))
        })?;

    let server = ApiServer::open(config).await?;
    server.run(addr).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let server = ApiServer::new(ApiConfig {
            cors_origins: vec!["https://privatepay.me".into()],
            ..ApiConfig::default()
        });

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://privatepay.me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://privatepay.me"
        );
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = ApiServer::new(ApiConfig::default());
        let body = vec![b' '; MAX_BODY_BYTES + 1];

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/announcements")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
