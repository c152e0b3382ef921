//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use concept_server::{App, ServerConfig, Shutdown};

/// Build an app with default config and return it with its layered router.
pub fn test_app() -> (App, Router) {
    let config = ServerConfig::default();
    let app = App::new(&config).expect("route table builds");
    let router = app.clone().into_server(config, Shutdown::new()).router();
    (app, router)
}

/// A response as seen by tests.
pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

/// Drives the router in-process, carrying the session cookie like a browser.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    pub fn fresh() -> Self {
        Self::new(test_app().1)
    }

    /// Another caller against the same server (no cookie).
    pub fn another(&self) -> Self {
        Self::new(self.router.clone())
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str) -> TestResponse {
        self.send(Method::PUT, uri, None).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        self.send_raw(method, uri, body).await
    }

    pub async fn send_raw(&mut self, method: Method, uri: &str, body: Body) -> TestResponse {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = request.body(body).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let request_id = response
            .headers()
            .get("x-request-id")
            .map(|v| v.to_str().unwrap().to_string());
        if let Some(cookie) = &set_cookie {
            self.cookie = cookie.split(';').next().map(ToString::to_string);
        }

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            set_cookie,
            request_id,
            body,
        }
    }

    /// Register and log in.
    pub async fn sign_up(&mut self, username: &str) {
        let res = self
            .post("/api/users", serde_json::json!({ "username": username, "password": "pw" }))
            .await;
        assert_eq!(res.status, StatusCode::OK, "create user: {}", res.body);
        let res = self
            .post("/api/login", serde_json::json!({ "username": username, "password": "pw" }))
            .await;
        assert_eq!(res.status, StatusCode::OK, "login: {}", res.body);
    }
}

/// Start the full server on an ephemeral port.
pub async fn start_server() -> (SocketAddr, Shutdown, tokio::task::JoinHandle<()>) {
    let config = ServerConfig::default();
    let app = App::new(&config).unwrap();
    let shutdown = Shutdown::new();
    let server = app.into_server(config, shutdown.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });
    (addr, shutdown, handle)
}
