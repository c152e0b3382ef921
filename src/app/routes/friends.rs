//! Friends and friend requests. Other users are named by username.

use axum::http::Method;
use serde_json::Value;

use crate::app::responses::Responses;
use crate::concepts::{Concepts, ObjectId};
use crate::dispatch::{BoundArguments, Failure, ParamSpec};
use crate::routing::{RouteError, RouteTable};

use super::{current_user, msg, with};

pub(super) fn register(table: &mut RouteTable, concepts: &Concepts) -> Result<(), RouteError> {
    table
        .route(Method::GET, "/friends")
        .param(ParamSpec::user())
        .handler(with(concepts, get_friends))?;

    table
        .route(Method::DELETE, "/friends/:friend")
        .params([ParamSpec::path("friend"), ParamSpec::user()])
        .handler(with(concepts, remove_friend))?;

    table
        .route(Method::GET, "/friend/requests")
        .param(ParamSpec::user())
        .handler(with(concepts, get_requests))?;

    table
        .route(Method::POST, "/friend/requests/:to")
        .params([ParamSpec::path("to"), ParamSpec::user()])
        .handler(with(concepts, send_request))?;

    table
        .route(Method::DELETE, "/friend/requests/:to")
        .params([ParamSpec::path("to"), ParamSpec::user()])
        .handler(with(concepts, remove_request))?;

    table
        .route(Method::PUT, "/friend/accept/:from")
        .params([ParamSpec::path("from"), ParamSpec::user()])
        .handler(with(concepts, accept_request))?;

    table
        .route(Method::PUT, "/friend/reject/:from")
        .params([ParamSpec::path("from"), ParamSpec::user()])
        .handler(with(concepts, reject_request))?;

    Ok(())
}

/// Resolve a username argument to a user id.
fn user_named(c: &Concepts, args: &BoundArguments, name: &str) -> Result<ObjectId, Failure> {
    Ok(c.authing.get_user_by_username(&args.required_text(name)?)?.id)
}

async fn get_friends(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    Ok(Responses::new(&c.authing).usernames(&c.friending.get_friends(&user)))
}

async fn remove_friend(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let friend = user_named(&c, &args, "friend")?;
    c.friending.remove_friend(&user, &friend)?;
    Ok(msg("Unfriended!"))
}

async fn get_requests(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    Responses::new(&c.authing).friend_requests(&c.friending.get_requests(&user))
}

async fn send_request(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let to = user_named(&c, &args, "to")?;
    c.friending.send_request(&user, &to)?;
    Ok(msg("Sent request!"))
}

async fn remove_request(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let to = user_named(&c, &args, "to")?;
    c.friending.remove_request(&user, &to)?;
    Ok(msg("Removed request!"))
}

async fn accept_request(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let from = user_named(&c, &args, "from")?;
    c.friending.accept_request(&from, &user)?;
    Ok(msg("Accepted request!"))
}

async fn reject_request(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let from = user_named(&c, &args, "from")?;
    c.friending.reject_request(&from, &user)?;
    Ok(msg("Rejected request!"))
}
