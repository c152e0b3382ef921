//! Route declarations.
//!
//! # Responsibilities
//! - Declare every API route with its parameters and validation rules
//! - Combine concepts inside handlers
//! - Publish the route listing
//!
//! # Design Decisions
//! - One registration function per resource, called in a fixed order
//! - Handlers are plain async functions taking the concepts and bound arguments
//! - Ids are validated as object ids before any handler runs

mod comments;
mod events;
mod friends;
mod groups;
mod posts;
mod users;

use std::future::Future;
use std::sync::{Arc, OnceLock};

use axum::http::Method;
use serde::Serialize;
use serde_json::{json, Value};

use crate::concepts::{Concepts, ObjectId};
use crate::dispatch::{
    handler_fn, BoundArguments, Check, Failure, FieldKind, Handler, ParamSource, ParamSpec, Schema,
};
use crate::routing::{RouteDefinition, RouteError, RouteTable};

/// Build the complete, frozen route table.
pub fn build_route_table(prefix: &str, concepts: &Concepts) -> Result<RouteTable, RouteError> {
    let mut table = RouteTable::with_prefix(prefix);

    users::register(&mut table, concepts)?;
    posts::register(&mut table, concepts)?;
    comments::register(&mut table, concepts)?;
    groups::register(&mut table, concepts)?;
    friends::register(&mut table, concepts)?;
    events::register(&mut table, concepts)?;

    let listing = Arc::new(OnceLock::new());
    let published = listing.clone();
    table.route(Method::GET, "/routes").handler(handler_fn(move |_args| {
        let listing = published.clone();
        async move {
            listing
                .get()
                .cloned()
                .ok_or_else(|| Failure::internal("route listing is not ready"))
        }
    }))?;

    // The table is complete; the listing includes its own route.
    let _ = listing.set(Value::Array(table.routes().map(describe).collect()));

    tracing::info!(routes = table.len(), prefix, "Route table built");
    Ok(table)
}

/// Describe a route for the listing: method, pattern, parameters and rules.
pub fn describe(route: &RouteDefinition) -> Value {
    let params: Vec<Value> = route
        .params
        .iter()
        .map(|p| {
            let source = match p.source {
                ParamSource::Path => "path",
                ParamSource::Field if route.method == Method::GET => "query",
                ParamSource::Field => "body",
                ParamSource::SessionUser => "session user",
                ParamSource::Session => "session",
            };
            let mut param = json!({
                "name": p.name,
                "source": source,
                "required": p.required,
            });
            if let FieldKind::Group(fields) = &p.kind {
                param["fields"] = fields.iter().map(|f| f.name.clone()).collect();
            }
            param
        })
        .collect();

    let validated: Vec<&str> = route
        .validator
        .iter()
        .flat_map(|schema| schema.fields())
        .collect();

    json!({
        "method": route.method.as_str(),
        "pattern": route.pattern.to_string(),
        "params": params,
        "validated": validated,
    })
}

/// Adapt an async function over the concepts into a route handler.
pub(crate) fn with<F, Fut, T>(concepts: &Concepts, f: F) -> impl Handler
where
    F: Fn(Concepts, BoundArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Failure>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let concepts = concepts.clone();
    handler_fn(move |args| f(concepts.clone(), args))
}

/// A bound argument that holds an object id.
pub(crate) fn id_arg(args: &BoundArguments, name: &str) -> Result<ObjectId, Failure> {
    Ok(ObjectId::parse(&args.required_text(name)?)?)
}

/// The logged-in user's id.
pub(crate) fn current_user(args: &BoundArguments) -> Result<ObjectId, Failure> {
    Ok(ObjectId::parse(&args.user()?)?)
}

/// A schema requiring each named field to be an object id.
pub(crate) fn ids(names: &[&str]) -> Schema {
    names
        .iter()
        .fold(Schema::new(), |schema, name| schema.field(*name, [Check::ObjectId]))
}

pub(crate) fn msg(message: &str) -> Value {
    json!({ "msg": message })
}

/// Path parameter `id`, declared first in most resource routes.
pub(crate) fn path_id() -> ParamSpec {
    ParamSpec::path("id")
}
