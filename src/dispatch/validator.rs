//! Declarative validation of bound arguments.
//!
//! # Design Decisions
//! - Runs strictly after binding and before the handler
//! - Rules on absent optional arguments are skipped
//! - The first failing rule is reported with its field and a readable reason

use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use serde_json::Value;
use thiserror::Error;

use super::params::BoundArguments;

/// A validation failure on one field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value for `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

type Predicate = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A single check applied to a field value.
#[derive(Clone)]
pub enum Check {
    /// Text must be at least this many characters long.
    MinLen(usize),
    /// Text must be at most this many characters long.
    MaxLen(usize),
    /// Text must be one of the given values.
    OneOf(Vec<String>),
    /// Text must be a 24 character hex document id.
    ObjectId,
    /// Text must be an RFC 3339 timestamp.
    DateTime,
    /// Value must be a JSON array.
    Array,
    Custom(Predicate),
}

impl Check {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Check::Custom(Arc::new(f))
    }

    fn apply(&self, value: &Value) -> Result<(), String> {
        match self {
            Check::MinLen(min) => {
                let len = text(value)?.chars().count();
                if len < *min {
                    return Err(format!("must be at least {min} characters"));
                }
            }
            Check::MaxLen(max) => {
                let len = text(value)?.chars().count();
                if len > *max {
                    return Err(format!("must be at most {max} characters"));
                }
            }
            Check::OneOf(allowed) => {
                let s = text(value)?;
                if !allowed.iter().any(|a| a == s) {
                    return Err(format!("must be one of: {}", allowed.join(", ")));
                }
            }
            Check::ObjectId => {
                let s = text(value)?;
                if s.len() != 24 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(format!("`{s}` is not a valid id"));
                }
            }
            Check::DateTime => {
                let s = text(value)?;
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| format!("`{s}` is not an RFC 3339 timestamp ({e})"))?;
            }
            Check::Array => {
                if !value.is_array() {
                    return Err("must be an array".to_string());
                }
            }
            Check::Custom(f) => f(value)?,
        }
        Ok(())
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::MinLen(n) => write!(f, "MinLen({n})"),
            Check::MaxLen(n) => write!(f, "MaxLen({n})"),
            Check::OneOf(values) => write!(f, "OneOf({values:?})"),
            Check::ObjectId => f.write_str("ObjectId"),
            Check::DateTime => f.write_str("DateTime"),
            Check::Array => f.write_str("Array"),
            Check::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn text(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "must be text".to_string())
}

/// Rules checked against the bound arguments of one route.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: Vec<(String, Check)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add checks for a field. Use a dotted name to reach into groups.
    pub fn field(mut self, name: impl Into<String>, checks: impl IntoIterator<Item = Check>) -> Self {
        let name = name.into();
        for check in checks {
            self.rules.push((name.clone(), check));
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Check bound arguments against a schema.
pub fn validate(schema: &Schema, args: &BoundArguments) -> Result<(), ValidationError> {
    for (field, check) in &schema.rules {
        let Some(value) = lookup(args, field) else {
            continue;
        };
        check.apply(value).map_err(|reason| ValidationError {
            field: field.clone(),
            reason,
        })?;
    }
    Ok(())
}

fn lookup<'a>(args: &'a BoundArguments, field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let mut value = args.get(parts.next()?)?;
    for part in parts {
        value = value.get(part)?;
    }
    Some(value)
}
