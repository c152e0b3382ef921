//! Parameter binding.
//!
//! # Responsibilities
//! - Pick the field source: query string for GET, JSON body for writes
//! - Reassemble dotted keys (`options.backgroundColor`) into nested objects
//! - Resolve each declared parameter: path first, then session, then fields
//! - Coerce values to their declared kind
//!
//! # Design Decisions
//! - Empty strings and nulls count as "not provided"
//! - Path parameters win over same-named body or query fields
//! - Session values are never read from client input
//! - Binding failures name the offending field

use std::collections::HashMap;

use axum::http::Method;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::routing::matcher::PathParams;
use crate::routing::router::RouteDefinition;
use crate::session::Session;

use super::params::{Arg, BoundArguments, FieldKind, ParamSource, ParamSpec};

/// The request body as seen by the binder.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// The body could not be parsed; reported only once a route needs binding.
    Malformed(String),
    /// The body exceeded the configured size limit.
    TooLarge,
}

/// Errors raised while assembling handler arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("Missing required field `{field}`")]
    Missing { field: String },

    #[error("Field `{field}` is not valid JSON: {reason}")]
    MalformedPayload { field: String, reason: String },

    #[error("Field `{field}` must be {expected}")]
    UnexpectedType { field: String, expected: &'static str },

    #[error("Field `{field}` cannot be nested in a query string")]
    NestedQuery { field: String },

    #[error("Invalid nested field `{key}`: {reason}")]
    InvalidNesting { key: String, reason: String },

    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("Request body must be a JSON object")]
    BodyNotObject,

    #[error("Request body is too large")]
    BodyTooLarge,

    #[error("Path parameter `{0}` was not captured")]
    MissingPathParam(String),

    #[error("Must be logged in!")]
    NotLoggedIn,
}

impl BindingError {
    /// The field this error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            BindingError::Missing { field }
            | BindingError::MalformedPayload { field, .. }
            | BindingError::UnexpectedType { field, .. }
            | BindingError::NestedQuery { field } => Some(field),
            BindingError::InvalidNesting { key, .. } => Some(key),
            BindingError::MissingPathParam(field) => Some(field),
            _ => None,
        }
    }
}

/// Bind the arguments for a matched route.
pub fn bind(
    route: &RouteDefinition,
    path_params: &PathParams,
    query: &HashMap<String, String>,
    body: &RequestBody,
    session: &Session,
) -> Result<BoundArguments, BindingError> {
    bind_params(&route.method, &route.params, path_params, query, body, session)
}

/// Bind a declared parameter list.
pub fn bind_params(
    method: &Method,
    params: &[ParamSpec],
    path_params: &PathParams,
    query: &HashMap<String, String>,
    body: &RequestBody,
    session: &Session,
) -> Result<BoundArguments, BindingError> {
    let from_query = is_read_method(method);
    let fields = if from_query {
        query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    } else {
        match body {
            RequestBody::Empty => Map::new(),
            RequestBody::Json(Value::Object(map)) => unflatten(map.clone())?,
            RequestBody::Json(Value::Null) => Map::new(),
            RequestBody::Json(_) => return Err(BindingError::BodyNotObject),
            RequestBody::Malformed(reason) => return Err(BindingError::MalformedBody(reason.clone())),
            RequestBody::TooLarge => return Err(BindingError::BodyTooLarge),
        }
    };

    let mut args = BoundArguments::new();
    for spec in params {
        let arg = match spec.source {
            ParamSource::Session => Arg::Session(session.clone()),
            ParamSource::SessionUser => match session.user() {
                Some(user) => Arg::Value(Value::String(user)),
                None if spec.required => return Err(BindingError::NotLoggedIn),
                None => Arg::Absent,
            },
            ParamSource::Path => match path_params.get(&spec.name) {
                Some(value) => to_arg(coerce(&spec.name, &spec.kind, Value::String(value.clone()))?),
                None => return Err(BindingError::MissingPathParam(spec.name.clone())),
            },
            ParamSource::Field => {
                if let Some(value) = path_params.get(&spec.name) {
                    to_arg(coerce(&spec.name, &spec.kind, Value::String(value.clone()))?)
                } else {
                    if from_query && matches!(spec.kind, FieldKind::Group(_)) {
                        let nested_prefix = format!("{}.", spec.name);
                        if fields
                            .keys()
                            .any(|k| k == &spec.name || k.starts_with(&nested_prefix))
                        {
                            return Err(BindingError::NestedQuery {
                                field: spec.name.clone(),
                            });
                        }
                    }
                    match fields.get(&spec.name) {
                        Some(value) => to_arg(coerce(&spec.name, &spec.kind, value.clone())?),
                        None => Arg::Absent,
                    }
                }
            }
        };

        if spec.required && matches!(arg, Arg::Absent) {
            return Err(BindingError::Missing {
                field: spec.name.clone(),
            });
        }
        args.push(spec.name.clone(), arg);
    }

    Ok(args)
}

fn is_read_method(method: &Method) -> bool {
    method == Method::GET
}

fn to_arg(value: Option<Value>) -> Arg {
    value.map(Arg::Value).unwrap_or(Arg::Absent)
}

/// Coerce a raw value to its declared kind. `None` means "not provided".
fn coerce(field: &str, kind: &FieldKind, value: Value) -> Result<Option<Value>, BindingError> {
    match (kind, value) {
        (_, Value::Null) => Ok(None),
        (FieldKind::Text | FieldKind::Json, Value::String(s)) if s.is_empty() => Ok(None),

        (FieldKind::Text, Value::String(s)) => Ok(Some(Value::String(s))),
        (FieldKind::Text, Value::Number(n)) => Ok(Some(Value::String(n.to_string()))),
        (FieldKind::Text, Value::Bool(b)) => Ok(Some(Value::String(b.to_string()))),
        (FieldKind::Text, _) => Err(BindingError::UnexpectedType {
            field: field.to_string(),
            expected: "text",
        }),

        (FieldKind::Json, Value::String(s)) => {
            let parsed: Value =
                serde_json::from_str(&s).map_err(|e| BindingError::MalformedPayload {
                    field: field.to_string(),
                    reason: e.to_string(),
                })?;
            Ok((!parsed.is_null()).then_some(parsed))
        }
        (FieldKind::Json, value) => Ok(Some(value)),

        (FieldKind::Group(specs), Value::Object(mut map)) => {
            let mut out = Map::new();
            for spec in specs {
                if let Some(value) = map.remove(&spec.name) {
                    let nested = format!("{field}.{}", spec.name);
                    if let Some(value) = coerce(&nested, &spec.kind, value)? {
                        out.insert(spec.name.clone(), value);
                    }
                }
            }
            Ok((!out.is_empty()).then_some(Value::Object(out)))
        }
        (FieldKind::Group(_), Value::String(s)) if s.is_empty() => Ok(None),
        (FieldKind::Group(_), Value::String(s)) => {
            let parsed: Value =
                serde_json::from_str(&s).map_err(|e| BindingError::MalformedPayload {
                    field: field.to_string(),
                    reason: e.to_string(),
                })?;
            match parsed {
                Value::Object(_) | Value::Null => coerce(field, kind, parsed),
                _ => Err(BindingError::UnexpectedType {
                    field: field.to_string(),
                    expected: "an object",
                }),
            }
        }
        (FieldKind::Group(_), _) => Err(BindingError::UnexpectedType {
            field: field.to_string(),
            expected: "an object",
        }),
    }
}

/// Reassemble dotted top-level keys into nested objects.
///
/// `{"options.backgroundColor": "red"}` becomes
/// `{"options": {"backgroundColor": "red"}}`. The rightmost segment is the
/// leaf key. Dotted keys merge into objects given under their prefix. Values
/// are never rewritten, and a key with an empty segment (`"e.g."`) is kept
/// verbatim.
pub fn unflatten(fields: Map<String, Value>) -> Result<Map<String, Value>, BindingError> {
    let mut out = Map::new();
    let mut dotted = Vec::new();

    for (key, value) in fields {
        if is_nested_path(&key) {
            dotted.push((key, value));
        } else {
            out.insert(key, value);
        }
    }

    for (key, value) in dotted {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(leaf) = parts.pop() else {
            continue;
        };

        let mut current = &mut out;
        for part in parts {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(BindingError::InvalidNesting {
                        key: key.clone(),
                        reason: format!("`{part}` is not an object"),
                    })
                }
            };
        }
        insert_merged(current, leaf, value, &key)?;
    }

    Ok(out)
}

fn is_nested_path(key: &str) -> bool {
    key.contains('.') && key.split('.').all(|part| !part.is_empty())
}

fn insert_merged(
    target: &mut Map<String, Value>,
    leaf: &str,
    value: Value,
    key: &str,
) -> Result<(), BindingError> {
    if let Some(existing) = target.get_mut(leaf) {
        return match (existing, value) {
            (Value::Object(existing), Value::Object(incoming)) => {
                for (k, v) in incoming {
                    insert_merged(existing, &k, v, key)?;
                }
                Ok(())
            }
            _ => Err(BindingError::InvalidNesting {
                key: key.to_string(),
                reason: format!("`{leaf}` is given more than once"),
            }),
        };
    }
    target.insert(leaf.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::params::FieldSpec;
    use serde_json::json;

    fn session_for(user: Option<&str>) -> Session {
        let session = Session::new("s1");
        if let Some(user) = user {
            session.start(user);
        }
        session
    }

    fn post_params() -> Vec<ParamSpec> {
        vec![
            ParamSpec::user(),
            ParamSpec::path("id"),
            ParamSpec::text("content"),
            ParamSpec::group("options", [FieldSpec::text("backgroundColor")]),
        ]
    }

    fn path(pairs: &[(&str, &str)]) -> PathParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unflatten_deep() {
        let flat = json!({ "a.b.c.d": "x", "a.b.e": 1, "top": true });
        let Value::Object(map) = flat else { unreachable!() };
        let nested = unflatten(map).unwrap();
        assert_eq!(
            Value::Object(nested),
            json!({ "a": { "b": { "c": { "d": "x" }, "e": 1 } }, "top": true })
        );
    }

    #[test]
    fn test_unflatten_merges_top_level_only() {
        let flat = json!({ "options": { "font": "serif", "inner.x": 1 }, "options.backgroundColor": "red" });
        let Value::Object(map) = flat else { unreachable!() };
        let nested = unflatten(map).unwrap();
        assert_eq!(
            Value::Object(nested),
            json!({ "options": { "font": "serif", "inner.x": 1, "backgroundColor": "red" } })
        );
    }

    #[test]
    fn test_unflatten_conflicts() {
        let Value::Object(map) = json!({ "options": "x", "options.backgroundColor": "red" }) else {
            unreachable!()
        };
        let err = unflatten(map).unwrap_err();
        assert!(matches!(err, BindingError::InvalidNesting { .. }));
        assert_eq!(err.field(), Some("options.backgroundColor"));
    }

    #[test]
    fn test_unflatten_keeps_keys_with_empty_segments() {
        let Value::Object(map) = json!({ "a..b": 1, "e.g.": 2, ".x": 3 }) else {
            unreachable!()
        };
        let nested = unflatten(map).unwrap();
        assert_eq!(Value::Object(nested), json!({ "a..b": 1, "e.g.": 2, ".x": 3 }));
    }

    #[test]
    fn test_structured_payload_keeps_dotted_keys() {
        let params = vec![ParamSpec::json("meta")];
        let body = RequestBody::Json(json!({
            "meta": { "v1.0": "x", "list": [{ "a.b": 1 }] }
        }));
        let args = bind_params(
            &Method::POST,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap();
        assert_eq!(
            args.get("meta"),
            Some(&json!({ "v1.0": "x", "list": [{ "a.b": 1 }] }))
        );
    }

    #[test]
    fn test_undeclared_odd_key_is_ignored() {
        let params = vec![ParamSpec::text("content").required()];
        let body = RequestBody::Json(json!({ "content": "hi", "e.g.": 1 }));
        let args = bind_params(
            &Method::POST,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap();
        assert_eq!(args.get("content"), Some(&json!("hi")));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_patch_path_wins_over_body() {
        let body = RequestBody::Json(json!({
            "id": "evil",
            "content": "x",
            "options": { "backgroundColor": "blue" }
        }));
        let args = bind_params(
            &Method::PATCH,
            &post_params(),
            &path(&[("id", "abc123")]),
            &HashMap::new(),
            &body,
            &session_for(Some("U1")),
        )
        .unwrap();

        assert_eq!(args.len(), 4);
        assert_eq!(args.user().unwrap(), "U1");
        assert_eq!(args.text("id").as_deref(), Some("abc123"));
        assert_eq!(args.text("content").as_deref(), Some("x"));
        assert_eq!(args.get("options"), Some(&json!({ "backgroundColor": "blue" })));
    }

    #[test]
    fn test_field_param_also_prefers_path() {
        let params = vec![ParamSpec::text("id").required()];
        let body = RequestBody::Json(json!({ "id": "from-body" }));
        let args = bind_params(
            &Method::DELETE,
            &params,
            &path(&[("id", "from-path")]),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap();
        assert_eq!(args.text("id").as_deref(), Some("from-path"));
    }

    #[test]
    fn test_empty_string_is_absent() {
        let body = RequestBody::Json(json!({ "content": "", "options.backgroundColor": "" }));
        let args = bind_params(
            &Method::PATCH,
            &post_params(),
            &path(&[("id", "abc123")]),
            &HashMap::new(),
            &body,
            &session_for(Some("U1")),
        )
        .unwrap();
        assert!(!args.contains("content"));
        assert!(!args.contains("options"));
        assert!(args.arg("content").is_some());
    }

    #[test]
    fn test_required_missing() {
        let params = vec![ParamSpec::text("username").required()];
        let body = RequestBody::Json(json!({ "username": "" }));
        let err = bind_params(
            &Method::POST,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BindingError::Missing {
                field: "username".into()
            }
        );
    }

    #[test]
    fn test_session_user_never_from_input() {
        let params = vec![ParamSpec::user()];
        let body = RequestBody::Json(json!({ "user": "U2" }));
        let err = bind_params(
            &Method::POST,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap_err();
        assert_eq!(err, BindingError::NotLoggedIn);

        let args = bind_params(
            &Method::POST,
            &[ParamSpec::user().optional()],
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap();
        assert!(!args.contains("user"));
    }

    #[test]
    fn test_get_binds_from_query() {
        let query = HashMap::from([("author".to_string(), "alice".to_string())]);
        let args = bind_params(
            &Method::GET,
            &[ParamSpec::text("author")],
            &PathParams::new(),
            &query,
            &RequestBody::Json(json!({ "author": "ignored" })),
            &session_for(None),
        )
        .unwrap();
        assert_eq!(args.text("author").as_deref(), Some("alice"));
    }

    #[test]
    fn test_query_rejects_nested_groups() {
        let query = HashMap::from([("options.backgroundColor".to_string(), "red".to_string())]);
        let err = bind_params(
            &Method::GET,
            &[ParamSpec::group("options", [FieldSpec::text("backgroundColor")])],
            &PathParams::new(),
            &query,
            &RequestBody::Empty,
            &session_for(None),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("options"));
    }

    #[test]
    fn test_json_payload_parsed_from_string() {
        let params = vec![ParamSpec::json("goals")];
        let body = RequestBody::Json(json!({ "goals": "[\"run\", \"read\"]" }));
        let args = bind_params(
            &Method::PUT,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap();
        assert_eq!(args.get("goals"), Some(&json!(["run", "read"])));

        let body = RequestBody::Json(json!({ "goals": "{not json" }));
        let err = bind_params(
            &Method::PUT,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap_err();
        assert!(matches!(err, BindingError::MalformedPayload { ref field, .. } if field == "goals"));
    }

    #[test]
    fn test_group_parsed_from_string() {
        let params = vec![ParamSpec::group("options", [FieldSpec::text("backgroundColor")])];
        let bind = |body: Value| {
            bind_params(
                &Method::POST,
                &params,
                &PathParams::new(),
                &HashMap::new(),
                &RequestBody::Json(body),
                &session_for(None),
            )
        };

        let args = bind(json!({ "options": "{\"backgroundColor\":\"red\",\"x\":1}" })).unwrap();
        assert_eq!(args.get("options"), Some(&json!({ "backgroundColor": "red" })));

        let err = bind(json!({ "options": "[1]" })).unwrap_err();
        assert_eq!(err.field(), Some("options"));
        let err = bind(json!({ "options": "{bad" })).unwrap_err();
        assert!(matches!(err, BindingError::MalformedPayload { .. }));
    }

    #[test]
    fn test_text_coercion() {
        let params = vec![ParamSpec::text("count"), ParamSpec::text("flag"), ParamSpec::text("obj")];
        let body = RequestBody::Json(json!({ "count": 3, "flag": false }));
        let args = bind_params(
            &Method::POST,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap();
        assert_eq!(args.text("count").as_deref(), Some("3"));
        assert_eq!(args.text("flag").as_deref(), Some("false"));

        let body = RequestBody::Json(json!({ "obj": { "a": 1 } }));
        let err = bind_params(
            &Method::POST,
            &params,
            &PathParams::new(),
            &HashMap::new(),
            &body,
            &session_for(None),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("obj"));
    }

    #[test]
    fn test_body_errors() {
        let params = vec![ParamSpec::text("content")];
        for (body, expected) in [
            (
                RequestBody::Malformed("EOF".into()),
                BindingError::MalformedBody("EOF".into()),
            ),
            (RequestBody::Json(json!([1, 2])), BindingError::BodyNotObject),
            (RequestBody::TooLarge, BindingError::BodyTooLarge),
        ] {
            let err = bind_params(
                &Method::POST,
                &params,
                &PathParams::new(),
                &HashMap::new(),
                &body,
                &session_for(None),
            )
            .unwrap_err();
            assert_eq!(err, expected);
        }
    }
}
