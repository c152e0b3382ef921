//! Route table: registration and lookup.
//!
//! # Responsibilities
//! - Store route definitions in registration order
//! - Reject malformed or colliding routes at startup
//! - Look up the most specific route for a method and path
//!
//! # Design Decisions
//! - Built once by the composition root, then frozen behind an `Arc`
//! - Lookup is a linear scan (route counts are small)
//! - Specificity decides between overlapping patterns; equal shapes cannot coexist
//! - Explicit NotFound rather than a silent default

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::dispatch::handler::Handler;
use crate::dispatch::params::{ParamSource, ParamSpec};
use crate::dispatch::validator::Schema;

use super::matcher::{PathParams, PathPattern, PatternError};

/// Index of a route in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(pub usize);

/// Methods routes may be registered under.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Startup-time route registration errors.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("method {0} is not supported for routes")]
    UnsupportedMethod(Method),

    #[error("route {method} {pattern} collides with {method} {existing}")]
    Collision {
        method: Method,
        pattern: String,
        existing: String,
    },

    #[error("route {method} {pattern} declares path parameter `{param}` missing from the pattern")]
    UnknownPathParam {
        method: Method,
        pattern: String,
        param: String,
    },

    #[error("route {method} {pattern} does not declare a parameter for `:{param}`")]
    UndeclaredPathParam {
        method: Method,
        pattern: String,
        param: String,
    },

    #[error("route {method} {pattern} declares parameter `{param}` twice")]
    DuplicateParam {
        method: Method,
        pattern: String,
        param: String,
    },
}

/// A registered route.
pub struct RouteDefinition {
    pub id: RouteId,
    pub method: Method,
    pub pattern: PathPattern,
    pub params: Vec<ParamSpec>,
    pub validator: Option<Schema>,
    pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("pattern", &self.pattern.to_string())
            .field("params", &self.params)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDefinition,
    pub params: PathParams,
}

/// Ordered collection of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    prefix: String,
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose patterns are all registered under `prefix` (e.g. `/api`).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            routes: Vec::new(),
        }
    }

    /// Start declaring a route.
    pub fn route(&mut self, method: Method, pattern: &str) -> RouteBuilder<'_> {
        RouteBuilder {
            table: self,
            method,
            pattern: pattern.to_string(),
            params: Vec::new(),
            validator: None,
        }
    }

    /// Register a route.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
        params: Vec<ParamSpec>,
        validator: Option<Schema>,
    ) -> Result<RouteId, RouteError> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(RouteError::UnsupportedMethod(method));
        }

        let pattern = PathPattern::parse(pattern)?.prefixed(&self.prefix);
        check_params(&method, &pattern, &params)?;

        let shape = pattern.shape();
        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.pattern.shape() == shape)
        {
            return Err(RouteError::Collision {
                method,
                pattern: pattern.to_string(),
                existing: existing.pattern.to_string(),
            });
        }

        let id = RouteId(self.routes.len());
        tracing::debug!(route_id = id.0, method = %method, pattern = %pattern, "Route registered");
        self.routes.push(RouteDefinition {
            id,
            method,
            pattern,
            params,
            validator,
            handler,
        });
        Ok(id)
    }

    /// Find the most specific route for a method and path.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let mut best: Option<RouteMatch<'_>> = None;

        for route in self.routes.iter().filter(|r| &r.method == method) {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some(current) => {
                    route.pattern.specificity_cmp(&current.route.pattern) == Ordering::Greater
                }
            };
            if better {
                best = Some(RouteMatch { route, params });
            }
        }

        best
    }

    pub fn get(&self, id: RouteId) -> Option<&RouteDefinition> {
        self.routes.get(id.0)
    }

    /// All routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDefinition> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn check_params(method: &Method, pattern: &PathPattern, params: &[ParamSpec]) -> Result<(), RouteError> {
    for (i, spec) in params.iter().enumerate() {
        if params[..i].iter().any(|p| p.name == spec.name) {
            return Err(RouteError::DuplicateParam {
                method: method.clone(),
                pattern: pattern.to_string(),
                param: spec.name.clone(),
            });
        }
        if spec.source == ParamSource::Path && !pattern.param_names().any(|n| n == spec.name) {
            return Err(RouteError::UnknownPathParam {
                method: method.clone(),
                pattern: pattern.to_string(),
                param: spec.name.clone(),
            });
        }
    }

    for name in pattern.param_names() {
        let declared = params.iter().any(|p| {
            p.name == name && matches!(p.source, ParamSource::Path | ParamSource::Field)
        });
        if !declared {
            return Err(RouteError::UndeclaredPathParam {
                method: method.clone(),
                pattern: pattern.to_string(),
                param: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Fluent route declaration, finished by [`RouteBuilder::handler`].
pub struct RouteBuilder<'a> {
    table: &'a mut RouteTable,
    method: Method,
    pattern: String,
    params: Vec<ParamSpec>,
    validator: Option<Schema>,
}

impl RouteBuilder<'_> {
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(mut self, specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params.extend(specs);
        self
    }

    pub fn validate(mut self, schema: Schema) -> Self {
        self.validator = Some(schema);
        self
    }

    pub fn handler(self, handler: impl Handler) -> Result<RouteId, RouteError> {
        self.table.register(
            self.method,
            &self.pattern,
            Arc::new(handler),
            self.params,
            self.validator,
        )
    }
}
