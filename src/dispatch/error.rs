//! Dispatch errors and their wire representation.

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use thiserror::Error;

use super::binder::BindingError;
use super::handler::{Failure, FailureKind};
use super::validator::ValidationError;

/// Message sent for faults whose details must stay server-side.
const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Every way a dispatch can end without a handler success.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Cannot {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Business(#[from] Failure),

    #[error("request aborted before invocation")]
    Aborted,

    /// Uncaught fault; the payload is logged, never sent.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::Binding(BindingError::NotLoggedIn) => StatusCode::UNAUTHORIZED,
            DispatchError::Binding(BindingError::BodyTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            DispatchError::Binding(_) => StatusCode::BAD_REQUEST,
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Business(failure) => failure.kind.status(),
            DispatchError::Aborted => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON error body: `{ "error": message, ...details }`.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        match self {
            DispatchError::Binding(err) => {
                body.insert("error".into(), Value::String(err.to_string()));
                if let Some(field) = err.field() {
                    body.insert("field".into(), Value::String(field.to_string()));
                }
            }
            DispatchError::Validation(err) => {
                body.insert("error".into(), Value::String(err.to_string()));
                body.insert("field".into(), Value::String(err.field.clone()));
            }
            DispatchError::Business(failure) if failure.kind == FailureKind::Internal => {
                body.insert("error".into(), Value::String(INTERNAL_ERROR_MESSAGE.into()));
            }
            DispatchError::Business(failure) => {
                body.insert("error".into(), Value::String(failure.message.clone()));
                for (key, value) in &failure.details {
                    if key != "error" {
                        body.insert(key.clone(), value.clone());
                    }
                }
            }
            DispatchError::Unexpected(_) => {
                body.insert("error".into(), Value::String(INTERNAL_ERROR_MESSAGE.into()));
            }
            other => {
                body.insert("error".into(), Value::String(other.to_string()));
            }
        }
        Value::Object(body)
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_mapping() {
        let not_found = DispatchError::RouteNotFound {
            method: Method::GET,
            path: "/nope".into(),
        };
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.body(), json!({ "error": "Cannot GET /nope" }));

        let binding = DispatchError::from(BindingError::Missing {
            field: "content".into(),
        });
        assert_eq!(binding.status(), StatusCode::BAD_REQUEST);
        assert_eq!(binding.body()["field"], "content");

        assert_eq!(
            DispatchError::from(BindingError::NotLoggedIn).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DispatchError::from(BindingError::BodyTooLarge).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            DispatchError::from(Failure::conflict("taken")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DispatchError::from(Failure::forbidden("no")).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_business_details_merged() {
        let err = DispatchError::from(
            Failure::not_found("Post abc does not exist!").with_detail("id", "abc"),
        );
        assert_eq!(
            err.body(),
            json!({ "error": "Post abc does not exist!", "id": "abc" })
        );
    }

    #[test]
    fn test_internals_not_leaked() {
        let err = DispatchError::Unexpected("db password is hunter2".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), json!({ "error": "Internal Server Error" }));

        let err = DispatchError::from(Failure::internal("stack trace"));
        assert_eq!(err.body(), json!({ "error": "Internal Server Error" }));
    }
}
