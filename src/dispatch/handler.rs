//! Uniform handler contract between the dispatch core and the business layer.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::params::BoundArguments;

/// Outcome of a handler invocation.
pub type HandlerResult = Result<Value, Failure>;

/// Declared kinds of business failure.
///
/// The dispatcher maps a kind to a status and never looks past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    BadValues,
    Internal,
}

impl FailureKind {
    pub fn status(self) -> StatusCode {
        match self {
            FailureKind::NotFound => StatusCode::NOT_FOUND,
            FailureKind::Unauthorized => StatusCode::UNAUTHORIZED,
            FailureKind::Forbidden => StatusCode::FORBIDDEN,
            FailureKind::Conflict => StatusCode::CONFLICT,
            FailureKind::BadValues => StatusCode::BAD_REQUEST,
            FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A tagged failure reported by a handler.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Extra fields merged into the error body next to `error`.
    pub details: Map<String, Value>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Forbidden, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Conflict, message)
    }

    pub fn bad_values(message: impl Into<String>) -> Self {
        Self::new(FailureKind::BadValues, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// A business-layer capability invoked with bound, validated arguments.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: BoundArguments) -> HandlerResult;
}

/// Adapter turning an async function into a [`Handler`].
///
/// The function may return any serializable value; serialization failures
/// surface as internal failures.
pub struct HandlerFn<F, T> {
    f: F,
    _output: PhantomData<fn() -> T>,
}

/// Wrap an async function as a handler.
pub fn handler_fn<F, Fut, T>(f: F) -> HandlerFn<F, T>
where
    F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Failure>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    HandlerFn {
        f,
        _output: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, T> Handler for HandlerFn<F, T>
where
    F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Failure>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    async fn call(&self, args: BoundArguments) -> HandlerResult {
        let value = (self.f)(args).await?;
        serde_json::to_value(value)
            .map_err(|e| Failure::internal(format!("failed to serialize handler output: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_handler_fn_serializes_output() {
        #[derive(Serialize)]
        struct Msg {
            msg: &'static str,
        }

        let handler = handler_fn(|_args: BoundArguments| async { Ok(Msg { msg: "hi" }) });
        let result = handler.call(BoundArguments::default()).await.unwrap();
        assert_eq!(result, json!({ "msg": "hi" }));
    }

    #[tokio::test]
    async fn test_handler_fn_passes_failure_through() {
        let handler = handler_fn(|_args: BoundArguments| async {
            Err::<Value, _>(Failure::not_found("Post 1 does not exist!").with_detail("id", "1"))
        });
        let failure = handler.call(BoundArguments::default()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(failure.kind.status(), StatusCode::NOT_FOUND);
        assert_eq!(failure.details.get("id"), Some(&json!("1")));
    }
}
