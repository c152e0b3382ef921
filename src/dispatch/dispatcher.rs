//! Per-request dispatch state machine.
//!
//! # Data Flow
//! ```text
//! Received → Matched → SessionResolved → Bound → Validated → Invoked → Responded
//!     │          │              │           │          │          │
//!     └──────────┴──────────────┴───────────┴──────────┴──────────┴──→ Responded (error)
//! ```
//!
//! # Design Decisions
//! - The core mutates nothing itself, so a failure needs no rollback
//! - Cancellation is honoured up to the moment the handler is invoked
//! - Handler panics are caught and reported as unexpected failures

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::Method;
use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::routing::router::SUPPORTED_METHODS;
use crate::routing::RouteTable;
use crate::session::{ResolvedSession, SessionResolver};

use super::binder::{self, RequestBody};
use super::error::DispatchError;
use super::validator;

/// A request reduced to what the dispatch core needs.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: RequestBody,
    /// Opaque session carrier (cookie value).
    pub session_carrier: Option<String>,
    pub request_id: String,
    pub cancel: CancellationToken,
}

impl ParsedRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            body: RequestBody::Empty,
            session_carrier: None,
            request_id: String::from("unknown"),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_session(mut self, carrier: impl Into<String>) -> Self {
        self.session_carrier = Some(carrier.into());
        self
    }
}

/// Outcome of one dispatch.
#[derive(Debug)]
pub struct Dispatched {
    /// Pattern of the matched route, if any.
    pub route: Option<String>,
    /// The session resolved for this request, if dispatch got that far.
    pub session: Option<ResolvedSession>,
    pub result: Result<Value, DispatchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchState {
    Received,
    Matched,
    SessionResolved,
    Bound,
    Validated,
    Invoked,
    Responded,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Received => "received",
            DispatchState::Matched => "matched",
            DispatchState::SessionResolved => "session_resolved",
            DispatchState::Bound => "bound",
            DispatchState::Validated => "validated",
            DispatchState::Invoked => "invoked",
            DispatchState::Responded => "responded",
        };
        f.write_str(name)
    }
}

fn enter(state: DispatchState) {
    tracing::trace!(state = %state, "Dispatch state");
}

/// Ties route lookup, session resolution, binding, validation and invocation together.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    sessions: Arc<dyn SessionResolver>,
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>, sessions: Arc<dyn SessionResolver>) -> Self {
        Self { table, sessions }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Dispatch one request. Never fails: errors are carried in the result.
    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(request_id = %req.request_id, method = %req.method, path = %req.path)
    )]
    pub async fn dispatch(&self, req: ParsedRequest) -> Dispatched {
        let start = Instant::now();
        enter(DispatchState::Received);

        let mut dispatched = Dispatched {
            route: None,
            session: None,
            result: Ok(Value::Null),
        };
        dispatched.result = self.run(&req, &mut dispatched).await;
        if let Some(resolved) = dispatched.session.as_mut() {
            resolved.created = self.sessions.commit(&resolved.session).await;
        }
        enter(DispatchState::Responded);

        let route = dispatched.route.as_deref().unwrap_or("none");
        let method = method_label(&req.method);
        match &dispatched.result {
            Ok(_) => {
                tracing::debug!(route = %route, status = 200, "Request handled");
                metrics::record_request(method, route, 200, start);
            }
            Err(err) => {
                let status = err.status();
                if status.is_server_error() {
                    tracing::error!(route = %route, status = status.as_u16(), error = %err, "Request failed");
                } else {
                    tracing::info!(route = %route, status = status.as_u16(), error = %err, "Request rejected");
                }
                metrics::record_request(method, route, status.as_u16(), start);
            }
        }

        dispatched
    }

    async fn run(&self, req: &ParsedRequest, out: &mut Dispatched) -> Result<Value, DispatchError> {
        let matched = self
            .table
            .lookup(&req.method, &req.path)
            .ok_or_else(|| DispatchError::RouteNotFound {
                method: req.method.clone(),
                path: req.path.clone(),
            })?;
        out.route = Some(matched.route.pattern.to_string());
        enter(DispatchState::Matched);

        let resolved = self.sessions.resolve(req.session_carrier.as_deref()).await;
        let session = resolved.session.clone();
        out.session = Some(resolved);
        ensure_live(&req.cancel)?;
        enter(DispatchState::SessionResolved);

        let args = binder::bind(
            matched.route,
            &matched.params,
            &req.query,
            &req.body,
            &session,
        )?;
        enter(DispatchState::Bound);

        if let Some(schema) = &matched.route.validator {
            validator::validate(schema, &args)?;
        }
        enter(DispatchState::Validated);

        ensure_live(&req.cancel)?;
        let handler = Arc::clone(&matched.route.handler);
        enter(DispatchState::Invoked);

        match AssertUnwindSafe(handler.call(args)).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(failure)) => Err(DispatchError::Business(failure)),
            Err(panic) => Err(DispatchError::Unexpected(panic_message(panic.as_ref()))),
        }
    }
}

/// Metrics label for a request method; extension methods share one label.
fn method_label(method: &Method) -> &str {
    if SUPPORTED_METHODS.contains(method) {
        method.as_str()
    } else {
        "other"
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), DispatchError> {
    if cancel.is_cancelled() {
        tracing::debug!("Request cancelled before handler invocation");
        return Err(DispatchError::Aborted);
    }
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
