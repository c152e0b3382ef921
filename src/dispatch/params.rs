//! Declared handler parameters and the arguments bound to them.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::session::Session;

use super::handler::Failure;

/// Where a parameter's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// Must be captured by the route pattern.
    Path,
    /// Path parameter of the same name if any, else query (GET) or body.
    Field,
    /// The identity bound to the caller's session.
    SessionUser,
    /// The caller's session handle itself.
    Session,
}

/// How a field value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Scalar text. Numbers and booleans are rendered as strings.
    Text,
    /// Structured payload; strings are parsed as JSON.
    Json,
    /// Nested object with its own declared fields.
    Group(Vec<FieldSpec>),
}

/// A field inside a [`FieldKind::Group`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Json,
        }
    }

    pub fn group(name: impl Into<String>, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Group(fields.into_iter().collect()),
        }
    }
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub source: ParamSource,
    pub kind: FieldKind,
    pub required: bool,
}

impl ParamSpec {
    /// A path parameter. Always required.
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ParamSource::Path,
            kind: FieldKind::Text,
            required: true,
        }
    }

    /// An optional text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::field(FieldSpec::text(name))
    }

    /// An optional structured payload field.
    pub fn json(name: impl Into<String>) -> Self {
        Self::field(FieldSpec::json(name))
    }

    /// An optional nested group field.
    pub fn group(name: impl Into<String>, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self::field(FieldSpec::group(name, fields))
    }

    fn field(spec: FieldSpec) -> Self {
        Self {
            name: spec.name,
            source: ParamSource::Field,
            kind: spec.kind,
            required: false,
        }
    }

    /// The logged-in user, bound as `user`. Required unless marked optional.
    pub fn user() -> Self {
        Self {
            name: "user".to_string(),
            source: ParamSource::SessionUser,
            kind: FieldKind::Text,
            required: true,
        }
    }

    /// The session handle, bound as `session`.
    pub fn session() -> Self {
        Self {
            name: "session".to_string(),
            source: ParamSource::Session,
            kind: FieldKind::Text,
            required: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A single bound argument.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Declared but not provided.
    Absent,
    Value(Value),
    Session(Session),
}

/// Arguments bound for one invocation, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct BoundArguments {
    args: Vec<(String, Arg)>,
}

impl BoundArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, arg: Arg) {
        self.args.push((name.into(), arg));
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.args.iter().map(|(name, arg)| (name.as_str(), arg))
    }

    pub fn arg(&self, name: &str) -> Option<&Arg> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, arg)| arg)
    }

    /// The bound JSON value, or `None` when absent or undeclared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.arg(name)? {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// An optional text argument.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(Value::as_str)
            .map(ToString::to_string)
    }

    /// A text argument the route declared as required.
    pub fn required_text(&self, name: &str) -> Result<String, Failure> {
        self.text(name)
            .ok_or_else(|| Failure::internal(format!("argument `{name}` was not bound")))
    }

    /// The session user bound through [`ParamSpec::user`].
    pub fn user(&self) -> Result<String, Failure> {
        self.required_text("user")
    }

    /// Deserialize a structured or group argument.
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, Failure> {
        self.get(name)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| Failure::bad_values(format!("Invalid {name}: {e}")))
            })
            .transpose()
    }

    /// The session handle bound through [`ParamSpec::session`].
    pub fn session(&self) -> Result<&Session, Failure> {
        match self.arg("session") {
            Some(Arg::Session(session)) => Ok(session),
            _ => Err(Failure::internal("session was not bound")),
        }
    }
}
