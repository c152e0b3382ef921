//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single dispatching fallback
//! - Wire up middleware (tracing, timeouts, limits, request ID)
//! - Give responses produced by the middleware the same JSON error body as dispatch errors
//! - Serve on a listener until shutdown, then drain within the grace period

use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::State,
    http::{header, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    BoxError, Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ServerConfig, SessionConfig};
use crate::dispatch::Dispatcher;
use crate::http::{request, response};
use crate::lifecycle::Shutdown;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub session: SessionConfig,
    pub max_body_size: usize,
    pub shutdown: Shutdown,
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around a dispatcher.
    pub fn new(config: ServerConfig, dispatcher: Dispatcher, shutdown: Shutdown) -> Self {
        let state = AppState {
            dispatcher,
            session: config.session.clone(),
            max_body_size: config.limits.max_body_size,
            shutdown: shutdown.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(middleware::map_response(json_layer_errors))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving or for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let HttpServer {
            router,
            config,
            shutdown,
        } = self;

        let signal = {
            let shutdown = shutdown.clone();
            async move { shutdown.wait().await }
        };
        let serve = async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
        };

        let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
        let deadline = async move {
            shutdown.wait().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = serve => result?,
            _ = deadline => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, dropping open connections");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Every request lands here; the route table decides what it means.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let parsed = request::parse_request(
        request,
        &state.session.cookie_name,
        state.max_body_size,
        state.shutdown.child_token(),
    )
    .await;

    let dispatched = state.dispatcher.dispatch(parsed).await;
    response::into_response(dispatched, &state.session)
}

/// Rewrite plain-text timeout and body-limit rejections into JSON errors.
async fn json_layer_errors<B>(response: Response<B>) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let status = response.status();
    let message = match status {
        StatusCode::PAYLOAD_TOO_LARGE => "Request body is too large",
        StatusCode::REQUEST_TIMEOUT => "Request timed out",
        _ => return response.map(Body::new),
    };
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response.map(Body::new);
    }
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_layer_rejections_become_json() {
        let plain = (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded").into_response();
        let response = json_layer_errors(plain).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Request body is too large" }));

        let empty = StatusCode::REQUEST_TIMEOUT.into_response();
        let response = json_layer_errors(empty).await;
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Request timed out" }));

        let ok = (StatusCode::OK, "fine").into_response();
        assert_eq!(json_layer_errors(ok).await.status(), StatusCode::OK);
    }
}
