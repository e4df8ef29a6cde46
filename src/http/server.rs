//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, tracing, timeout, body limit, security headers)
//! - Rate limit `/api/auth/*` per client
//! - Serve on a bound listener until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderName;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, Environment};
use crate::http::handlers;
use crate::http::request::X_REQUEST_ID;
use crate::security::headers::security_headers;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::store::TieredStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TieredStore>,
    pub environment: Environment,
    pub started_at: Instant,
}

/// HTTP front end of the credential service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &AppConfig, store: Arc<TieredStore>) -> Self {
        let state = AppState {
            store,
            environment: config.environment,
            started_at: Instant::now(),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let listener = &config.listener;
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        let mut auth = Router::new()
            .route("/api/auth/register", post(handlers::register))
            .route("/api/auth/login", post(handlers::login));
        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
            auth = auth.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let mut router = Router::new()
            .merge(auth)
            .route("/api/users/{id}", get(handlers::get_user))
            .route("/health", get(handlers::health))
            .with_state(state);

        for (name, value) in security_headers(config.environment) {
            router = router.layer(SetResponseHeaderLayer::overriding(name, value));
        }

        router
            .layer(RequestBodyLimitLayer::new(listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(listener.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
